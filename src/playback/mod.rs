pub mod handle;
pub mod mirror;

pub use handle::{EngineTransport, PlaybackHandle};
pub use mirror::PlaybackMirror;
