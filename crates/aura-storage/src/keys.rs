//! Key allocation for extracted assets.
//!
//! Key format: `{namespace}/YYYY/MM/DD/{base}[-vN]-YYYYMMDD-HHMMSS-{random8}.{ext}`.
//! The base name carries the source document token and the asset's position, so a
//! key can be traced back to where it came from. Timestamp and random suffix are
//! recomputed on every attempt.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Marker placed between the document token and the asset index.
const ASSET_KIND: &str = "img";
const DOC_TOKEN_MAX: usize = 48;
const ASSET_TOKEN_MAX: usize = 32;
const EXT_MAX: usize = 10;

/// Reduce arbitrary text to `[a-z0-9._-]`.
///
/// Lowercases, turns whitespace runs into a hyphen, strips everything else outside
/// the allowed set, collapses repeated dots and hyphens, trims separators from both
/// ends and caps the length. Returns `fallback` when nothing survives.
pub fn sanitize_token(input: &str, fallback: &str, max_len: usize) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_space = false;

    for c in input.trim().to_lowercase().chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            out.push('-');
            pending_space = false;
        }
        if c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-') {
            let last = out.chars().last();
            if (c == '-' || c == '.') && last == Some(c) {
                continue;
            }
            out.push(c);
        }
    }

    let mut token: String = out
        .trim_matches(|c| c == '-' || c == '.')
        .chars()
        .take(max_len)
        .collect();
    // Truncation can leave a separator at the end again.
    while token.ends_with('-') || token.ends_with('.') {
        token.pop();
    }

    if token.is_empty() {
        fallback.to_string()
    } else {
        token
    }
}

/// Strip the final extension from a file name (path components are dropped too).
pub fn file_stem(name: &str) -> &str {
    let basename = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match basename.rfind('.') {
        Some(idx) if idx > 0 => &basename[..idx],
        _ => basename,
    }
}

/// Token identifying the source document inside asset keys.
pub fn document_token(source_file_name: &str) -> String {
    sanitize_token(file_stem(source_file_name), "document", DOC_TOKEN_MAX)
}

/// Human-traceable base name: `{prefix}-{doc}-img-{NNN}-{asset}` with a 1-based index.
pub fn asset_base_name(prefix: &str, doc_token: &str, index: usize, asset_name: &str) -> String {
    let asset_token = sanitize_token(file_stem(asset_name), "image", ASSET_TOKEN_MAX);
    format!(
        "{}-{}-{}-{:03}-{}",
        prefix,
        doc_token,
        ASSET_KIND,
        index + 1,
        asset_token
    )
}

/// Allocate a fresh key for `base_name`. See [`allocate_key_at`].
pub fn allocate_key(namespace: &str, base_name: &str, ext: &str, attempt: u32) -> String {
    allocate_key_at(namespace, base_name, ext, attempt, Utc::now())
}

/// Allocate a key using `now` as the timestamp.
///
/// `attempt` is 0-based; retries after a collision append `-v{attempt+1}` to the base.
/// An empty or unusable extension becomes `bin`.
pub fn allocate_key_at(
    namespace: &str,
    base_name: &str,
    ext: &str,
    attempt: u32,
    now: DateTime<Utc>,
) -> String {
    let namespace = namespace.trim_matches('/');
    let base = sanitize_token(base_name, "asset", 200);
    let base = if attempt > 0 {
        format!("{}-v{}", base, attempt + 1)
    } else {
        base
    };
    let ext = sanitize_token(ext.trim_start_matches('.'), "bin", EXT_MAX).replace('.', "");
    let ext = if ext.is_empty() { "bin".to_string() } else { ext };
    let random = Uuid::new_v4().simple().to_string();

    format!(
        "{}/{}/{}-{}-{}.{}",
        namespace,
        now.format("%Y/%m/%d"),
        base,
        now.format("%Y%m%d-%H%M%S"),
        &random[..8],
        ext
    )
}

/// Reject keys that could escape a namespace or address the bucket root.
pub fn validate_storage_key(key: &str) -> Result<(), String> {
    if key.trim().is_empty() {
        return Err("Storage key must not be empty".to_string());
    }
    if key.contains("..") || key.starts_with('/') || key.contains('\\') {
        return Err("Storage key contains invalid characters".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sanitize_token() {
        assert_eq!(sanitize_token("Quarterly Report  2024", "x", 40), "quarterly-report-2024");
        assert_eq!(sanitize_token("Résumé (final)", "x", 40), "rsum-final");
        assert_eq!(sanitize_token("../../etc/passwd", "x", 40), "etcpasswd");
        assert_eq!(sanitize_token("a---b", "x", 40), "a-b");
        assert_eq!(sanitize_token("   ", "fallback", 40), "fallback");
        assert_eq!(sanitize_token("abcdef-ghij", "x", 7), "abcdef");
    }

    #[test]
    fn test_asset_base_name() {
        let doc = document_token("Report Q3.docx");
        assert_eq!(doc, "report-q3");
        assert_eq!(
            asset_base_name("aura-pandoc-word", &doc, 0, "media/image1.png"),
            "aura-pandoc-word-report-q3-img-001-image1"
        );
        assert_eq!(
            asset_base_name("aura-pandoc-word", &doc, 11, "Chart 7.JPEG"),
            "aura-pandoc-word-report-q3-img-012-chart-7"
        );
    }

    #[test]
    fn test_allocate_key_layout() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let key = allocate_key_at("uploads/pandoc", "doc-img-001-image1", "PNG", 0, now);
        assert!(key.starts_with("uploads/pandoc/2024/03/09/doc-img-001-image1-20240309-140507-"));
        assert!(key.ends_with(".png"));
        assert!(validate_storage_key(&key).is_ok());
    }

    #[test]
    fn test_allocate_key_retry_suffix() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let key = allocate_key_at("uploads/pandoc", "base", "png", 2, now);
        assert!(key.contains("/base-v3-20240309-140507-"));
    }

    #[test]
    fn test_allocate_key_diverges_within_same_second() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let a = allocate_key_at("ns", "base", "png", 0, now);
        let b = allocate_key_at("ns", "base", "png", 0, now);
        assert_ne!(a, b);
    }

    #[test]
    fn test_allocate_key_missing_extension_is_bin() {
        let key = allocate_key("ns", "base", "", 0);
        assert!(key.ends_with(".bin"));
        let key = allocate_key("ns", "base", "..", 0);
        assert!(key.ends_with(".bin"));
        assert!(!key.contains(".."));
    }

    #[test]
    fn test_validate_storage_key() {
        assert!(validate_storage_key("uploads/source/a.docx").is_ok());
        assert!(validate_storage_key("/etc/passwd").is_err());
        assert!(validate_storage_key("uploads/../secret").is_err());
        assert!(validate_storage_key("").is_err());
    }
}
