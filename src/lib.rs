// Photo Watermark Library
// Text and logo watermark compositing for photos

pub mod config;
pub mod logging;
pub mod watermark;

pub use config::CompositorConfig;
pub use watermark::{
    CompositionError, CompositionRequest, CompositionResult, Compositor, EncodedImage, ErrorKind,
    OutputFormat,
};
