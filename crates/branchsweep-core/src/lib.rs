pub mod branch;
pub(crate) mod command_adapter;
pub mod command_runner;
pub mod config;
pub mod doctor;
pub mod git;
pub mod metadata;
pub mod probe;
#[cfg(test)]
pub(crate) mod test_support;
pub mod time;
