// RESP front end

pub mod handler;
pub mod server;
pub mod utils;

pub use handler::handle_command;
pub use server::{RespConfig, RespServer};
