mod file_handler;
mod serve_handler;

pub use file_handler::*;
pub use serve_handler::*;
