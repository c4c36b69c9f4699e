pub mod metrics;
pub mod pipeline;

pub use metrics::{MetricsSlot, VoiceMetrics};
pub use pipeline::PipelineCounters;
