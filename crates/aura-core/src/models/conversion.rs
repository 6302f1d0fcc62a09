use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// JSON body for converting a document that was already uploaded to the bucket.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ConvertByKeyRequest {
    /// Storage key of the previously uploaded `.docx`
    #[validate(length(min = 1, max = 620, message = "Key must be between 1 and 620 characters"))]
    pub key: String,
    /// Optional display filename; defaults to the key's basename
    #[serde(default)]
    #[validate(length(max = 220, message = "Filename must be at most 220 characters"))]
    pub filename: Option<String>,
}

/// An extracted asset as reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UploadedAsset {
    pub filename: String,
    pub key: String,
    pub url: String,
}

/// Successful conversion response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub ok: bool,
    pub markdown: String,
    pub uploaded_count: usize,
    pub assets: Vec<UploadedAsset>,
}

impl ConvertResponse {
    pub fn new(markdown: String, assets: Vec<UploadedAsset>) -> Self {
        Self {
            ok: true,
            markdown,
            uploaded_count: assets.len(),
            assets,
        }
    }
}
