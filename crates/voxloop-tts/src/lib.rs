pub mod adapter;
pub mod error;
pub mod mock;
pub mod sanitize;
pub mod stretch;

pub use adapter::{AudioEncoding, TtsAdapter};
pub use error::{TtsError, TtsResult};
pub use mock::MockTtsAdapter;
pub use sanitize::sanitize_markdown_for_speech;
pub use stretch::apply_speed_preserving_pitch;
