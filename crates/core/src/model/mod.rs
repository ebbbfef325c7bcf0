mod answer;
mod config;
mod ids;
mod media;
mod question;

pub use answer::Answer;
pub use config::{
    ConfigError, NavigationMode, SessionConfig, SessionConfigDraft, TimeLimits,
    DEFAULT_FEEDBACK_DISPLAY_MS, DEFAULT_INFO_POPUP_MS, DEFAULT_THRESHOLD,
    DEFAULT_TIME_PER_QUESTION_MS,
};
pub use ids::{ParseIdError, QuestionId, SectionId, SessionId};
pub use media::{MediaError, MediaKind, MediaRef, Solution, SolutionKind};
pub use question::{
    BaseType, InteractionOption, MappingEntry, OptionValue, Question, QuestionDraft,
    QuestionError, QuestionTag, QuestionType, ResponseDeclaration,
};
