//! blog-core: framework-agnostic core of the blog posts API.
//!
//! - [`features`]: the QueryFeatures builder (filter, sort, field
//!   selection, pagination) turning a [`QuerySpec`] into a [`Query`]
//! - [`store`]: the record-store seam, with [`MemoryStore`] as the
//!   bundled implementation
//! - [`service`]: validated CRUD operations over a store

pub mod config;
pub mod errors;
pub mod features;
pub mod memory;
pub mod model;
pub mod query;
pub mod schema;
pub mod service;
pub mod store;

pub use config::{BlogConfig, BlogConfigSnapshot};
pub use errors::{BlogError, ErrorKind};
pub use features::{Query, QueryFeatures, Stage};
pub use memory::MemoryStore;
pub use model::{BlogPost, BlogPostPatch, NewBlogPost, TAGS};
pub use query::{QuerySpec, QueryValue, RESERVED_KEYS};
pub use service::BlogService;
pub use store::BlogStore;
