//! Per-camera stream processing: a dedicated worker thread that grabs frames,
//! runs motion detection, drives recording and reports health.

mod handle;
mod metrics;
mod types;
mod worker;


pub use handle::StreamProcessor;
pub use metrics::FpsMeter;
pub use types::{ProcessorState, ProcessorStatus};
pub use worker::frame_period;
