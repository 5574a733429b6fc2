pub mod config;
pub mod executor;
pub mod logging;
pub mod network;
pub mod storage;
