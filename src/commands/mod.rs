// Subcommand implementations

pub mod collect;
pub mod process;
pub mod recent;
pub mod scan;
