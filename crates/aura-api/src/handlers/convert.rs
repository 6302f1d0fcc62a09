use crate::error::{ErrorResponse, HttpAppError};
use crate::services::{acquire, InputSource};
use crate::state::ConversionState;
use aura_core::models::{ConvertByKeyRequest, ConvertResponse};
use axum::{extract::State, Json};

/// Convert a Word document to markdown, uploading its embedded images.
///
/// The body is either `multipart/form-data` (a `file` part plus an optional `filename`
/// field), JSON naming a previously stored `.docx`, or the raw document bytes with an
/// `x-upload-filename` header.
#[utoipa::path(
    post,
    path = "/api/pandoc/convert",
    tag = "conversion",
    request_body(
        content = ConvertByKeyRequest,
        content_type = "application/json",
        description = "Stored source by key; multipart/form-data and raw bodies are accepted too"
    ),
    responses(
        (status = 200, description = "Document converted", body = ConvertResponse),
        (status = 400, description = "Invalid input or truncated upload", body = ErrorResponse),
        (status = 404, description = "Referenced source not found", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Conversion or storage failure", body = ErrorResponse),
        (status = 503, description = "No converter available", body = ErrorResponse)
    )
)]
pub async fn convert_document(
    State(conversion): State<ConversionState>,
    source: InputSource,
) -> Result<Json<ConvertResponse>, HttpAppError> {
    let input = acquire(source, conversion.storage.as_ref(), &conversion.limits).await?;

    tracing::debug!(
        source = %input.source_file_name,
        size_bytes = input.bytes.len(),
        "Conversion input accepted"
    );

    let response = conversion.pipeline.run(input).await?;
    Ok(Json(response))
}
