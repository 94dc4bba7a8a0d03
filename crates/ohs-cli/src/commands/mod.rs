pub mod auth_cmd;
pub mod common;
pub mod completions;
pub mod pending;
pub mod records;
pub mod request;
pub mod sync;
pub mod upload;
