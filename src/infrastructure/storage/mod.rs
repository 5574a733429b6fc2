pub mod cache;
pub mod keys;
