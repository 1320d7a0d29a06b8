use serde::{Deserialize, Serialize};

use super::Audit;

pub const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/gif"];

/// Metadata of an uploaded image. The bytes live in the blob store under `file_name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub id: i64,
    pub file_name: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone)]
pub struct NewMedia {
    pub file_name: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
}

/// File extension used for a stored upload of the given MIME type.
pub fn extension_for(mime_type: &str) -> Option<&'static str> {
    match mime_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_allowed_type_has_an_extension() {
        for mime in ALLOWED_IMAGE_TYPES {
            assert!(extension_for(mime).is_some(), "{mime}");
        }
        assert_eq!(extension_for("application/pdf"), None);
    }
}
