// OCR meter logger
// Library entry point: capture, recognition, reading log and aggregation

pub mod core;
pub mod models;
pub mod pipeline;
pub mod state;
pub mod utils;
pub mod vision;

// Re-export main types
pub use core::error::{MeterError, Result};
pub use core::format::{AggregateBucket, BucketWidth, Reading};
pub use core::reader::ReadingLogReader;
pub use core::writer::ReadingLogWriter;
pub use models::config_model::MeterConfig;
pub use pipeline::processor::Processor;
pub use pipeline::sampler::Sampler;
