pub mod assets;
pub mod input;
pub mod media_index;
pub mod pipeline;

pub use assets::{AssetNaming, AssetUploader};
pub use input::{acquire, InputError, InputLimits, InputSource};
pub use media_index::{IndexRegistrar, MediaIndexHandle};
pub use pipeline::ConversionPipeline;
