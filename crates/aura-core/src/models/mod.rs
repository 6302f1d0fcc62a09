//! Data models for the application
//!
//! `media` holds the persisted index entry; `conversion` holds the request and
//! response shapes of the document conversion endpoint.

mod conversion;
mod media;

pub use conversion::*;
pub use media::*;
