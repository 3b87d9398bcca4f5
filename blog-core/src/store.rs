use async_trait::async_trait;
use anyhow::{anyhow, Result};
use serde_json::Value;

use crate::features::Query;
use crate::model::{BlogPost, BlogPostPatch, NewBlogPost};

/// The record store behind the blog service.
///
/// Queries are descriptions built by [`crate::features::QueryFeatures`];
/// the store runs their stages in order and returns projected documents.
/// Every method defaults to "not implemented" so a store can override
/// only what it supports.
#[async_trait]
pub trait BlogStore: Send + Sync {
    /// Run `query` and return the matching documents, projected.
    async fn find(&self, _query: &Query) -> Result<Vec<Value>> {
        Err(anyhow!("Method not implemented: find"))
    }

    async fn get(&self, _id: &str) -> Result<Option<BlogPost>> {
        Err(anyhow!("Method not implemented: get"))
    }

    async fn count(&self) -> Result<usize> {
        Err(anyhow!("Method not implemented: count"))
    }

    /// Insert a validated post; the store assigns `id` and `createdAt`.
    async fn insert(&self, _input: NewBlogPost) -> Result<BlogPost> {
        Err(anyhow!("Method not implemented: insert"))
    }

    /// Apply a validated patch. `None` when no post has this id.
    async fn update(&self, _id: &str, _patch: BlogPostPatch) -> Result<Option<BlogPost>> {
        Err(anyhow!("Method not implemented: update"))
    }

    /// Delete a post. `None` when no post has this id.
    async fn remove(&self, _id: &str) -> Result<Option<BlogPost>> {
        Err(anyhow!("Method not implemented: remove"))
    }

    /// Distinct non-null values of `field`.
    async fn distinct(&self, _field: &str) -> Result<Vec<Value>> {
        Err(anyhow!("Method not implemented: distinct"))
    }
}
