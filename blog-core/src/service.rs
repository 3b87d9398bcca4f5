use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;

use crate::config::BlogConfigSnapshot;
use crate::errors::BlogError;
use crate::features::{Query, QueryFeatures, DEFAULT_LIMIT};
use crate::model::{BlogPost, BlogPostPatch, NewBlogPost};
use crate::query::QuerySpec;
use crate::schema::validate;
use crate::store::BlogStore;

const NOT_FOUND: &str = "No blog found with that ID";

/// Blog operations exposed to transports (HTTP, CLI, jobs).
///
/// Validation and not-found handling live here; storage is delegated
/// to the [`BlogStore`].
#[derive(Clone)]
pub struct BlogService {
    store: Arc<dyn BlogStore>,
    default_limit: usize,
}

impl BlogService {
    pub fn new(store: Arc<dyn BlogStore>) -> Self {
        Self {
            store,
            default_limit: DEFAULT_LIMIT,
        }
    }

    /// Picks up `paginate.default` from the config.
    pub fn with_config(mut self, config: &BlogConfigSnapshot) -> Self {
        if let Some(limit) = config.get_usize("paginate.default").filter(|n| *n > 0) {
            self.default_limit = limit;
        }
        self
    }

    /// The query a list request resolves to.
    pub fn list_query(&self, spec: &QuerySpec) -> Query {
        QueryFeatures::new(Query::find_all(), spec)
            .with_default_limit(self.default_limit)
            .build()
    }

    pub async fn list(&self, spec: &QuerySpec) -> Result<Vec<Value>> {
        let query = self.list_query(spec);
        self.store.find(&query).await
    }

    pub async fn get(&self, id: &str) -> Result<BlogPost> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| BlogError::not_found(NOT_FOUND).into_anyhow())
    }

    /// Number of stored posts. An empty collection is reported as not
    /// found.
    pub async fn count(&self) -> Result<usize> {
        let n = self.store.count().await?;
        if n == 0 {
            crate::bail_blog!(not_found, "No blogs found");
        }
        Ok(n)
    }

    pub async fn create(&self, data: &Value) -> Result<BlogPost> {
        let input: NewBlogPost = validate(data)?;
        let post = self.store.insert(input).await?;
        tracing::info!(id = %post.id, title = %post.title, "blog created");
        Ok(post)
    }

    pub async fn update(&self, id: &str, data: &Value) -> Result<BlogPost> {
        let patch: BlogPostPatch = validate(data)?;
        let post = self
            .store
            .update(id, patch)
            .await?
            .ok_or_else(|| BlogError::not_found(NOT_FOUND).into_anyhow())?;
        tracing::info!(id = %post.id, "blog updated");
        Ok(post)
    }

    pub async fn delete(&self, id: &str) -> Result<BlogPost> {
        let post = self
            .store
            .remove(id)
            .await?
            .ok_or_else(|| BlogError::not_found(NOT_FOUND).into_anyhow())?;
        tracing::info!(id = %post.id, "blog deleted");
        Ok(post)
    }

    /// Distinct tags in use, sorted.
    pub async fn tags(&self) -> Result<Vec<Value>> {
        self.store.distinct("tag").await
    }
}
