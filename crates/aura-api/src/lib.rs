//! Aura API Library
//!
//! This crate provides the HTTP surface of the conversion service: input acquisition,
//! the conversion pipeline, asset upload, media index registration, and application setup.

// Module declarations
mod api_doc;
pub mod constants;
mod handlers;
pub mod middleware;
pub mod services;
pub mod setup;
mod telemetry;

// Public modules
pub mod error;
pub mod state;

// Re-exports
pub use api_doc::ApiDoc;
pub use error::{ErrorResponse, HttpAppError};
pub use state::{AppState, ConversionState};
