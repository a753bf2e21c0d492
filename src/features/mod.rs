pub mod auth;
pub mod private_files;
