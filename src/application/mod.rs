pub mod classifier;
pub mod command;
pub mod query;
pub mod retry;
