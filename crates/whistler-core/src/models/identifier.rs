use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;

/// Client-generated identifier naming one physical upload.
///
/// Only the canonical hyphenated form (`8-4-4-4-12` hex digits) is accepted. The original
/// spelling is kept as-is because it doubles as the on-disk file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        if is_uuid(raw) {
            Ok(ResourceId(raw.to_string()))
        } else {
            Err(AppError::MalformedInput(format!(
                "'{}' is not a valid resource identifier",
                raw
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// True for the 36-character hyphenated UUID form.
pub(crate) fn is_uuid(raw: &str) -> bool {
    raw.len() == 36 && Uuid::try_parse(raw).is_ok()
}

/// Extension of the last path element including the leading dot, or an empty string.
///
/// `"dir/a.b/photo.JPG"` yields `".JPG"`; `"dir.d/photo"` yields `""`.
pub fn file_extension(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(idx) => name[idx..].to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_hyphenated_uuid() {
        let raw = "0f8fad5b-d9cb-469f-a165-70867728950e";
        let id = ResourceId::parse(raw).unwrap();
        assert_eq!(id.as_str(), raw);
    }

    #[test]
    fn test_parse_rejects_other_shapes() {
        for raw in [
            "",
            "f1",
            "0f8fad5bd9cb469fa16570867728950e",
            "{0f8fad5b-d9cb-469f-a165-70867728950e}",
            "../0f8fad5b-d9cb-469f-a165-70867728950",
        ] {
            assert!(
                matches!(ResourceId::parse(raw), Err(AppError::MalformedInput(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("photo.jpg"), ".jpg");
        assert_eq!(file_extension("dir/a.b/photo.JPG"), ".JPG");
        assert_eq!(file_extension("dir.d/photo"), "");
        assert_eq!(file_extension(""), "");
        assert_eq!(file_extension("archive.tar.gz"), ".gz");
    }
}
