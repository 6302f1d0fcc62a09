//! Input acquisition: the three accepted request shapes, normalized into one
//! [`InputDocument`].
//!
//! [`InputSource`] is resolved once from the request's content type. Everything after
//! [`acquire`] only sees the buffered document and its trusted file name.

use crate::constants::{DEFAULT_SOURCE_NAME, DOCX_EXTENSION, DOCX_MIME, MAX_FILENAME_LEN, UPLOAD_FILENAME_HEADER};
use crate::error::HttpAppError;
use aura_core::models::ConvertByKeyRequest;
use aura_core::AppError;
use aura_processing::InputDocument;
use aura_storage::{Storage, StorageError};
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::Json;
use bytes::Bytes;
use percent_encoding::percent_decode_str;
use thiserror::Error;
use validator::Validate;

/// Size ceilings for the two ways bytes can arrive.
#[derive(Debug, Clone, Copy)]
pub struct InputLimits {
    /// Multipart and raw-body uploads
    pub max_upload_bytes: usize,
    /// Documents fetched by key; they were validated once when uploaded
    pub max_stored_source_bytes: usize,
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("Uploaded source file was not found")]
    SourceNotFound(String),

    #[error("Uploaded source file is empty")]
    Empty,

    #[error(transparent)]
    Storage(StorageError),
}

impl From<InputError> for AppError {
    fn from(err: InputError) -> Self {
        match err {
            InputError::BadRequest(msg) => AppError::BadRequest(msg),
            InputError::PayloadTooLarge(msg) => AppError::PayloadTooLarge(msg),
            InputError::SourceNotFound(_) => {
                AppError::NotFound("Uploaded source file was not found".to_string())
            }
            InputError::Empty => AppError::BadRequest("Uploaded source file is empty".to_string()),
            InputError::Storage(err) => err.into(),
        }
    }
}

impl From<InputError> for HttpAppError {
    fn from(err: InputError) -> Self {
        HttpAppError(err.into())
    }
}

fn unsupported_format() -> InputError {
    InputError::BadRequest("Only .docx is supported for now".to_string())
}

fn too_large(limit: usize) -> InputError {
    InputError::PayloadTooLarge(format!("File too large (max {}MB)", limit / 1024 / 1024))
}

fn is_docx_name(name: &str) -> bool {
    name.to_lowercase().ends_with(DOCX_EXTENSION)
}

/// The request body, classified by content type.
pub enum InputSource {
    /// `multipart/form-data` with a `file` part and an optional `filename` field
    Multipart(Multipart),
    /// `application/json` naming a previously stored object
    StoredKey(ConvertByKeyRequest),
    /// Any other body, named by the `x-upload-filename` header
    Raw {
        bytes: Bytes,
        declared_length: Option<u64>,
        filename_header: Option<String>,
    },
}

impl<S> FromRequest<S> for InputSource
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_lowercase();

        if content_type.contains("application/json") {
            let Json(body) = Json::<ConvertByKeyRequest>::from_request(req, state).await?;
            return Ok(InputSource::StoredKey(body));
        }

        if content_type.contains("multipart/form-data") {
            let multipart = Multipart::from_request(req, state).await.map_err(|e| {
                HttpAppError(AppError::BadRequest(format!("Invalid multipart body: {}", e)))
            })?;
            return Ok(InputSource::Multipart(multipart));
        }

        let declared_length = req
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let filename_header = req
            .headers()
            .get(UPLOAD_FILENAME_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                HttpAppError(AppError::PayloadTooLarge("File too large".to_string()))
            } else {
                // The client stopped sending before the body was complete.
                HttpAppError(AppError::BadRequest(format!(
                    "Upload payload truncated: {}",
                    rejection.body_text()
                )))
            }
        })?;

        Ok(InputSource::Raw {
            bytes,
            declared_length,
            filename_header,
        })
    }
}

/// Resolve `source` into an [`InputDocument`], fetching from `storage` for by-key input.
pub async fn acquire(
    source: InputSource,
    storage: &dyn Storage,
    limits: &InputLimits,
) -> Result<InputDocument, InputError> {
    let input = match source {
        InputSource::StoredKey(request) => from_stored_key(request, storage, limits).await?,
        InputSource::Multipart(multipart) => from_multipart(multipart, limits).await?,
        InputSource::Raw {
            bytes,
            declared_length,
            filename_header,
        } => from_raw(bytes, declared_length, filename_header, limits)?,
    };

    tracing::info!(
        source_file_name = %input.source_file_name,
        size_bytes = input.bytes.len(),
        "Input document acquired"
    );
    Ok(input)
}

async fn from_stored_key(
    request: ConvertByKeyRequest,
    storage: &dyn Storage,
    limits: &InputLimits,
) -> Result<InputDocument, InputError> {
    request
        .validate()
        .map_err(|e| InputError::BadRequest(format!("Invalid payload: {}", e)))?;

    let key = request.key.trim();
    if key.contains("..") || key.starts_with('/') {
        return Err(InputError::BadRequest("Invalid source key".to_string()));
    }

    let source_file_name = request
        .filename
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| key.rsplit('/').next().unwrap_or(key))
        .to_string();
    if !is_docx_name(&source_file_name) {
        return Err(unsupported_format());
    }

    let object = match storage.get(key).await {
        Ok(object) => object,
        Err(StorageError::NotFound(_)) => return Err(InputError::SourceNotFound(key.to_string())),
        Err(e) => return Err(InputError::Storage(e)),
    };

    if object.data.is_empty() {
        return Err(InputError::Empty);
    }
    if object.data.len() > limits.max_stored_source_bytes {
        return Err(InputError::PayloadTooLarge("Source file too large".to_string()));
    }

    Ok(InputDocument {
        bytes: object.data,
        source_file_name,
    })
}

async fn from_multipart(
    mut multipart: Multipart,
    limits: &InputLimits,
) -> Result<InputDocument, InputError> {
    let mut file: Option<(Bytes, Option<String>, Option<String>)> = None;
    let mut preferred_name: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            too_large(limits.max_upload_bytes)
        } else {
            InputError::BadRequest(format!("Failed to read multipart: {}", e.body_text()))
        }
    })? {
        let field_name = field.name().map(String::from).unwrap_or_default();
        match field_name.as_str() {
            "file" => {
                if file.is_some() {
                    return Err(InputError::BadRequest(
                        "Multiple file fields are not allowed; send exactly one field named 'file'"
                            .to_string(),
                    ));
                }
                let file_name = field.file_name().map(String::from);
                let content_type = field.content_type().map(String::from);
                let data = field.bytes().await.map_err(|e| {
                    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                        too_large(limits.max_upload_bytes)
                    } else {
                        InputError::BadRequest(format!("Failed to read file data: {}", e.body_text()))
                    }
                })?;
                file = Some((data, file_name, content_type));
            }
            "filename" => {
                let text = field.text().await.map_err(|e| {
                    InputError::BadRequest(format!(
                        "Failed to read filename field: {}",
                        e.body_text()
                    ))
                })?;
                let text = text.trim();
                // Over-long names are ignored, not rejected.
                if !text.is_empty() && text.chars().count() <= MAX_FILENAME_LEN {
                    preferred_name = Some(text.to_string());
                }
            }
            _ => {}
        }
    }

    let Some((data, file_name, content_type)) = file else {
        return Err(InputError::BadRequest("No file uploaded".to_string()));
    };
    if data.len() > limits.max_upload_bytes {
        return Err(too_large(limits.max_upload_bytes));
    }

    let mime_is_docx = content_type
        .as_deref()
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim().eq_ignore_ascii_case(DOCX_MIME))
        .unwrap_or(false);
    let name_is_docx = file_name.as_deref().map(is_docx_name).unwrap_or(false);
    if !mime_is_docx && !name_is_docx {
        return Err(unsupported_format());
    }
    if data.is_empty() {
        return Err(InputError::BadRequest("No file uploaded".to_string()));
    }

    // The trusted name always carries the .docx extension.
    let source_file_name = preferred_name
        .filter(|name| is_docx_name(name))
        .or_else(|| file_name.filter(|name| is_docx_name(name)))
        .unwrap_or_else(|| DEFAULT_SOURCE_NAME.to_string());

    Ok(InputDocument {
        bytes: data,
        source_file_name,
    })
}

fn from_raw(
    bytes: Bytes,
    declared_length: Option<u64>,
    filename_header: Option<String>,
    limits: &InputLimits,
) -> Result<InputDocument, InputError> {
    let source_file_name = match filename_header.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => percent_decode_str(raw)
            .decode_utf8()
            .map_err(|_| InputError::BadRequest("Invalid x-upload-filename header".to_string()))?
            .into_owned(),
        _ => DEFAULT_SOURCE_NAME.to_string(),
    };
    if !is_docx_name(&source_file_name) {
        return Err(unsupported_format());
    }

    if bytes.is_empty() {
        return Err(InputError::BadRequest("No file uploaded".to_string()));
    }
    if bytes.len() > limits.max_upload_bytes {
        return Err(too_large(limits.max_upload_bytes));
    }
    if let Some(declared) = declared_length.filter(|d| *d > 0) {
        if bytes.len() as u64 != declared {
            return Err(InputError::BadRequest(format!(
                "Upload payload truncated ({}/{} bytes)",
                bytes.len(),
                declared
            )));
        }
    }

    Ok(InputDocument {
        bytes,
        source_file_name,
    })
}
