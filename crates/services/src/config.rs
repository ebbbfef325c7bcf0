//! Session configuration files.
//!
//! A config is a flat TOML document matching `SessionConfigDraft`:
//!
//! ```toml
//! question_ids = ["do_1", "do_2", "do_3"]
//! navigation_mode = "non-linear"
//! requires_submit = true
//!
//! [time_limits]
//! total_ms = 600000
//! warning_ms = 60000
//! ```

use std::path::Path;

use quml_core::model::{SessionConfig, SessionConfigDraft};

use crate::error::ConfigLoadError;

/// Parse and validate a TOML session config.
///
/// # Errors
///
/// Returns `ConfigLoadError::Parse` for malformed TOML and
/// `ConfigLoadError::Invalid` when the draft fails validation.
pub fn parse_session_config(raw: &str) -> Result<SessionConfig, ConfigLoadError> {
    let draft: SessionConfigDraft = toml::from_str(raw)?;
    let config = draft.validate()?;
    tracing::debug!(
        questions = config.question_count(),
        mode = ?config.navigation_mode(),
        "session config loaded"
    );
    Ok(config)
}

/// Read, parse and validate a TOML session config from disk.
///
/// # Errors
///
/// Returns `ConfigLoadError::Io` if the file cannot be read, otherwise as
/// `parse_session_config`.
pub fn load_session_config(path: impl AsRef<Path>) -> Result<SessionConfig, ConfigLoadError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_session_config(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quml_core::model::{NavigationMode, QuestionId};
    use quml_core::scoring::MultiSelectScoring;

    #[test]
    fn parses_full_config() {
        let raw = r#"
question_ids = ["do_1", "do_2", "do_3"]
navigation_mode = "non-linear"
show_feedback = false
requires_submit = true
allow_skip = false
threshold = 2
feedback_display_ms = 3000
multi_select_scoring = "all-or-nothing"

[time_limits]
total_ms = 600000
warning_ms = 60000
"#;
        let config = parse_session_config(raw).unwrap();
        assert_eq!(config.navigation_mode(), NavigationMode::NonLinear);
        assert!(!config.show_feedback());
        assert!(config.requires_submit());
        assert!(!config.allow_skip());
        assert_eq!(config.threshold(), 2);
        assert_eq!(config.feedback_display_ms(), 3_000);
        assert_eq!(config.total_time_ms(), 600_000);
        assert_eq!(config.warning_time_ms(), Some(60_000));
        assert_eq!(
            config.multi_select_scoring(),
            MultiSelectScoring::AllOrNothing
        );
        assert_eq!(config.question_ids()[2], QuestionId::new("do_3"));
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = parse_session_config(r#"question_ids = ["a"]"#).unwrap();
        assert!(config.is_linear());
        assert!(config.show_feedback());
        assert_eq!(config.feedback_display_ms(), 4_000);
    }

    #[test]
    fn invalid_toml_and_invalid_draft_are_distinguished() {
        assert!(matches!(
            parse_session_config("question_ids = ["),
            Err(ConfigLoadError::Parse(_))
        ));
        assert!(matches!(
            parse_session_config("question_ids = []"),
            Err(ConfigLoadError::Invalid(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_session_config("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigLoadError::Io { .. }));
    }
}
