// Shared runtime state

pub mod region_state;
