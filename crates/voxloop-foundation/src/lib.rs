pub mod cancel;
pub mod config;
pub mod error;

pub use cancel::CancelToken;
pub use config::{VoiceMode, VoiceRuntimeConfig};
pub use error::{AudioError, CloneError, SttError, VadError, VoxloopError};
