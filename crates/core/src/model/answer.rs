use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::model::question::OptionValue;

/// A learner's submission for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cardinality", content = "value", rename_all = "lowercase")]
pub enum Answer {
    Single(OptionValue),
    Multiple(BTreeSet<OptionValue>),
    /// Free-text response to a subjective question.
    Text(String),
}

impl Answer {
    #[must_use]
    pub fn single(value: impl Into<OptionValue>) -> Self {
        Self::Single(value.into())
    }

    #[must_use]
    pub fn multiple<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<OptionValue>,
    {
        Self::Multiple(values.into_iter().map(Into::into).collect())
    }

    /// True when nothing was actually chosen (the "try again" reset).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Answer::Single(v) => v.as_str().trim().is_empty(),
            Answer::Multiple(set) => set.is_empty(),
            Answer::Text(text) => text.trim().is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiple_deduplicates_values() {
        let answer = Answer::multiple(["A", "B", "A"]);
        let Answer::Multiple(set) = &answer else {
            panic!("expected multiple");
        };
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn empty_detection() {
        assert!(Answer::single("").is_empty());
        assert!(Answer::multiple(Vec::<&str>::new()).is_empty());
        assert!(Answer::Text("  ".into()).is_empty());
        assert!(!Answer::single("1").is_empty());
    }
}
