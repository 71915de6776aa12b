// Configuration loading, platform defaults and process plumbing

pub mod conf_helper;
pub mod logging;
pub mod platform;
pub mod shutdown;
