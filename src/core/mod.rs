// Reading log, aggregation and table persistence

pub mod aggregate;
pub mod constants;
pub mod error;
pub mod format;
pub mod reader;
pub mod table;
pub mod writer;
