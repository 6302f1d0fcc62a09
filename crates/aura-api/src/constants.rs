//! API constants
//!
//! Route paths and header names shared by the router, handlers, OpenAPI docs and tests.

/// Document conversion endpoint
pub const CONVERT_PATH: &str = "/api/pandoc/convert";

/// Health check endpoint
pub const HEALTH_PATH: &str = "/api/health";

/// OpenAPI document
pub const OPENAPI_PATH: &str = "/api/openapi.json";

/// Header carrying the (percent-encoded) file name of a raw-body upload
pub const UPLOAD_FILENAME_HEADER: &str = "x-upload-filename";

/// MIME type of Word `.docx` documents
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// The only accepted source extension
pub const DOCX_EXTENSION: &str = ".docx";

/// File name used when the request does not carry one
pub const DEFAULT_SOURCE_NAME: &str = "input.docx";

/// Longest accepted caller-supplied file name
pub const MAX_FILENAME_LEN: usize = 220;

/// Extra room above the upload ceiling for multipart framing
pub const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;
