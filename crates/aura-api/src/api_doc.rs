//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error::ErrorResponse;
use crate::handlers;
use crate::setup::routes::health;
use aura_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Aura Conversion API",
        version = "0.1.0",
        description = "Converts Word documents to GitHub-flavored markdown. Embedded images are uploaded to object storage, referenced by public URL in the markdown, and registered in the shared media index."
    ),
    paths(
        handlers::convert::convert_document,
        health::health_check,
    ),
    components(
        schemas(
            models::ConvertByKeyRequest,
            models::ConvertResponse,
            models::UploadedAsset,
            models::MediaAsset,
            health::HealthCheckResponse,
            ErrorResponse,
        )
    ),
    tags(
        (name = "conversion", description = "Document conversion"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
