use std::sync::Arc;

use anyhow::Result;
use blog_axum::{BlogAxumApp, BlogAxumState};
use blog_core::{BlogConfig, BlogService, BlogStore, MemoryStore};

/// The application over a fresh in-memory store.
pub fn build(config: &BlogConfig) -> Result<BlogAxumApp> {
    build_with_store(config, Arc::new(MemoryStore::new()))
}

pub fn build_with_store(config: &BlogConfig, store: Arc<dyn BlogStore>) -> Result<BlogAxumApp> {
    let snapshot = config.snapshot();
    let state = BlogAxumState::from_config(BlogService::new(store), &snapshot);

    if let Err(reason) = state.auth.options().validate() {
        tracing::warn!(%reason, "auth is not fully configured; guarded routes will reject every request");
    }

    let ax = BlogAxumApp::new(state);
    Ok(ax)
}
