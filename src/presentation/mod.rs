pub mod notify;
pub mod render;
