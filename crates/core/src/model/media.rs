use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MediaError {
    #[error("media source cannot be empty")]
    EmptySource,

    #[error("media source is not a valid URL: {0}")]
    InvalidUrl(String),
}

//
// ─── MEDIA REFERENCES ──────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

/// A media asset referenced from a question body, option, or solution.
///
/// The engine never renders media; it only resolves where an asset lives so
/// the renderer does not have to know about local vs remote packaging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub src: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

impl MediaRef {
    /// Resolve the absolute location of this asset.
    ///
    /// Content packaged for offline use lives under `<local_base>/<question_id>/<src>`;
    /// otherwise the asset's own `base_url` is prefixed to `src`. A `src` that is
    /// already absolute is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::EmptySource` for a blank `src`, or
    /// `MediaError::InvalidUrl` when no absolute URL can be formed.
    pub fn resolve(
        &self,
        question_id: &QuestionId,
        local_base: Option<&Url>,
    ) -> Result<Url, MediaError> {
        let src = self.src.trim();
        if src.is_empty() {
            return Err(MediaError::EmptySource);
        }

        if let Some(base) = local_base {
            let mut base = base.clone();
            if !base.path().ends_with('/') {
                let path = format!("{}/", base.path());
                base.set_path(&path);
            }
            return base
                .join(&format!("{question_id}/{}", src.trim_start_matches('/')))
                .map_err(|_| MediaError::InvalidUrl(src.to_owned()));
        }

        if let Some(prefix) = self.base_url.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
            let joined = format!("{prefix}{src}");
            return Url::parse(&joined).map_err(|_| MediaError::InvalidUrl(joined));
        }

        Url::parse(src).map_err(|_| MediaError::InvalidUrl(src.to_owned()))
    }
}

//
// ─── SOLUTIONS ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolutionKind {
    Html,
    Video,
}

/// Worked solution attached to a question. For video solutions `value` is
/// the id of a `MediaRef` on the same question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SolutionKind,
    pub value: String,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn image(src: &str, base_url: Option<&str>) -> MediaRef {
        MediaRef {
            id: "img-1".into(),
            kind: MediaKind::Image,
            src: src.into(),
            base_url: base_url.map(Into::into),
            thumbnail: None,
        }
    }

    #[test]
    fn resolves_against_local_package() {
        let base = Url::parse("file:///content/pkg").unwrap();
        let url = image("/assets/a.png", None)
            .resolve(&QuestionId::new("do_1"), Some(&base))
            .unwrap();
        assert_eq!(url.as_str(), "file:///content/pkg/do_1/assets/a.png");
    }

    #[test]
    fn resolves_with_asset_base_url() {
        let url = image("/assets/a.png", Some("https://cdn.example.org"))
            .resolve(&QuestionId::new("do_1"), None)
            .unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.org/assets/a.png");
    }

    #[test]
    fn relative_source_without_base_is_rejected() {
        let err = image("assets/a.png", None)
            .resolve(&QuestionId::new("do_1"), None)
            .unwrap_err();
        assert!(matches!(err, MediaError::InvalidUrl(_)));
    }

    #[test]
    fn blank_source_is_rejected() {
        let err = image("  ", None)
            .resolve(&QuestionId::new("do_1"), None)
            .unwrap_err();
        assert_eq!(err, MediaError::EmptySource);
    }
}
