mod file_reference;

pub use file_reference::{FileReference, NewFileReference};
