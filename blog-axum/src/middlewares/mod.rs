pub mod auth;
pub mod upload;

pub use upload::{ImageUpload, UploadConfig, UploadError};
