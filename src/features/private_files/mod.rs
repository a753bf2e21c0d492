pub mod descriptor;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use descriptor::{FieldDescriptor, FieldRegistry};
pub use services::GatedFileService;
