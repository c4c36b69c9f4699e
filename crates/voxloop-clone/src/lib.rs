pub mod chunker;
pub mod engine;
pub mod mock;

pub use chunker::chunk_text_for_streaming;
pub use engine::{CloneEngine, CloneRequest};
pub use mock::MockCloneEngine;
