// Sampling and aggregation loops

pub mod deadline;
pub mod processor;
pub mod sampler;
