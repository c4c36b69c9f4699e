pub mod adapter;
pub mod mock;
pub mod stop_phrase;

pub use adapter::{SttAdapter, TranscribeOptions};
pub use mock::MockSttAdapter;
pub use stop_phrase::{is_stop_phrase, match_stop_phrase, normalize_phrase};
