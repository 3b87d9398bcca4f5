//! blog-auth: JWT access tokens and the `protect` / `restrict_to` guards.

pub mod core;
pub mod options;

pub use crate::core::*;
pub use options::*;
