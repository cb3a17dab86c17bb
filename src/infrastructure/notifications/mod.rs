pub mod chat;
pub mod composite;
pub mod disabled;
pub mod email;
pub mod log_file;
pub mod webhook;
