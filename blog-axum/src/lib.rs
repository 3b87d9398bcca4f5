//! blog-axum: the HTTP surface of the blog posts API.
//!
//! Routes live in [`rest`], guards and uploads in [`middlewares`];
//! [`BlogAxumApp`] assembles them with request ids and tracing.

pub mod app;
pub mod middlewares;
pub mod params;
pub mod response;
pub mod rest;
pub mod state;
mod error;
pub use error::BlogAxumError;
pub use state::BlogAxumState;

pub use app::{BlogAxumApp, API_PREFIX};
