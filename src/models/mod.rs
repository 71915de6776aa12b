// Configuration model

pub mod config_model;
