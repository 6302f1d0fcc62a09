use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// One entry of the shared media index.
///
/// `id`, `key` and `url` never change once written. `display_name` and `tags`
/// may be edited later by the media browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MediaAsset {
    pub id: Uuid,
    pub key: String,
    pub url: String,
    pub filename: String,
    pub display_name: String,
    pub content_type: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Content type for a file name, judged by extension only.
pub fn content_type_for_filename(filename: &str) -> &'static str {
    match file_extension(filename).as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "emf" => "image/emf",
        "wmf" => "image/wmf",
        _ => "application/octet-stream",
    }
}

/// Lowercased extension of `name` with anything outside `[a-z0-9]` removed.
/// Returns an empty string when there is no extension.
pub fn file_extension(name: &str) -> String {
    let basename = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match basename.rfind('.') {
        Some(idx) => basename[idx + 1..]
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for_filename() {
        assert_eq!(content_type_for_filename("media/image1.PNG"), "image/png");
        assert_eq!(content_type_for_filename("photo.jpeg"), "image/jpeg");
        assert_eq!(content_type_for_filename("chart.emf"), "image/emf");
        assert_eq!(
            content_type_for_filename("blob"),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("a/b/c.Jp-G"), "jpg");
        assert_eq!(file_extension("dir.v2/noext"), "");
        assert_eq!(file_extension("report.docx"), "docx");
    }

    #[test]
    fn test_media_asset_uses_camel_case() {
        let now = Utc::now();
        let asset = MediaAsset {
            id: Uuid::new_v4(),
            key: "uploads/pandoc/k.png".to_string(),
            url: "https://cdn.example.com/uploads/pandoc/k.png".to_string(),
            filename: "image1.png".to_string(),
            display_name: "aura-pandoc-word-report-img-001-image1".to_string(),
            content_type: "image/png".to_string(),
            size: 42,
            created_at: now,
            updated_at: now,
            tags: vec!["pandoc".to_string()],
        };
        let json = serde_json::to_value(&asset).expect("serialize");
        assert!(json.get("displayName").is_some());
        assert!(json.get("contentType").is_some());
        assert!(json.get("createdAt").is_some());

        let back: MediaAsset = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, asset);
    }
}
