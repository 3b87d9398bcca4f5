//! In-memory record store.
//!
//! Posts are kept in insertion order behind a `tokio` read/write lock.
//! Queries run their stages front to back over JSON documents, so any
//! field name works in a filter or sort even if the model lacks it.

use std::cmp::Ordering;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::BlogError;
use crate::features::{CompareOp, Direction, Predicate, Projection, Query, SortKey, Stage};
use crate::model::{strip_hidden, BlogPost, BlogPostPatch, NewBlogPost, HIDDEN_FIELDS};
use crate::store::BlogStore;

#[derive(Default)]
pub struct MemoryStore {
    posts: RwLock<Vec<BlogPost>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding `posts` as-is, ids and timestamps included.
    pub fn with_posts(posts: Vec<BlogPost>) -> Self {
        Self {
            posts: RwLock::new(posts),
        }
    }

    fn duplicate_title(title: &str) -> anyhow::Error {
        BlogError::bad_request(format!(
            "Duplicate title: \"{title}\". Please use another value!"
        ))
        .into_anyhow()
    }
}

#[async_trait]
impl BlogStore for MemoryStore {
    async fn find(&self, query: &Query) -> Result<Vec<Value>> {
        let mut docs = {
            let posts = self.posts.read().await;
            posts
                .iter()
                .map(serde_json::to_value)
                .collect::<Result<Vec<Value>, _>>()?
        };

        for stage in query.stages() {
            docs = run_stage(docs, stage);
        }

        let reveal: Vec<&str> = HIDDEN_FIELDS
            .iter()
            .copied()
            .filter(|f| query.projection().is_some_and(|p| p.names(f)))
            .collect();
        for doc in docs.iter_mut() {
            strip_hidden(doc, &reveal);
        }

        tracing::debug!(stages = query.stages().len(), results = docs.len(), "memory store find");
        Ok(docs)
    }

    async fn get(&self, id: &str) -> Result<Option<BlogPost>> {
        let posts = self.posts.read().await;
        Ok(posts.iter().find(|p| p.id == id).cloned())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.posts.read().await.len())
    }

    async fn insert(&self, input: NewBlogPost) -> Result<BlogPost> {
        let mut posts = self.posts.write().await;

        if let Some(title) = input.title.as_deref() {
            if posts.iter().any(|p| p.title == title) {
                return Err(Self::duplicate_title(title));
            }
        }

        // Strictly increasing, so newest-first never ties.
        let mut created_at = Utc::now();
        if let Some(last) = posts.iter().map(|p| p.created_at).max() {
            if created_at <= last {
                created_at = last + Duration::microseconds(1);
            }
        }

        let post = BlogPost::new(input, Uuid::new_v4().to_string(), created_at);
        posts.push(post.clone());
        Ok(post)
    }

    async fn update(&self, id: &str, patch: BlogPostPatch) -> Result<Option<BlogPost>> {
        let mut posts = self.posts.write().await;

        if let Some(title) = patch.title.as_deref() {
            if posts.iter().any(|p| p.id != id && p.title == title) {
                return Err(Self::duplicate_title(title));
            }
        }

        let Some(post) = posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        post.apply(patch);
        Ok(Some(post.clone()))
    }

    async fn remove(&self, id: &str) -> Result<Option<BlogPost>> {
        let mut posts = self.posts.write().await;
        let Some(idx) = posts.iter().position(|p| p.id == id) else {
            return Ok(None);
        };
        Ok(Some(posts.remove(idx)))
    }

    async fn distinct(&self, field: &str) -> Result<Vec<Value>> {
        let posts = self.posts.read().await;

        let mut out: Vec<Value> = Vec::new();
        for post in posts.iter() {
            let doc = serde_json::to_value(post)?;
            match doc.get(field) {
                None | Some(Value::Null) => {}
                Some(v) if out.contains(v) => {}
                Some(v) => out.push(v.clone()),
            }
        }
        out.sort_by(|a, b| compare_values(Some(a), Some(b)));
        Ok(out)
    }
}

fn run_stage(docs: Vec<Value>, stage: &Stage) -> Vec<Value> {
    match stage {
        Stage::Match(predicates) => docs
            .into_iter()
            .filter(|doc| predicates.iter().all(|p| matches(doc, p)))
            .collect(),
        Stage::Sort(keys) => {
            let mut docs = docs;
            docs.sort_by(|a, b| compare_docs(a, b, keys));
            docs
        }
        Stage::Project(projection) => docs.into_iter().map(|doc| project(doc, projection)).collect(),
        Stage::Window { skip, limit } => docs.into_iter().skip(*skip).take(*limit).collect(),
    }
}

fn matches(doc: &Value, predicate: &Predicate) -> bool {
    let Some(value) = doc.get(&predicate.field) else {
        return false;
    };
    let Some(ord) = compare_to_raw(value, &predicate.value) else {
        return false;
    };

    match predicate.op {
        CompareOp::Eq => ord == Ordering::Equal,
        CompareOp::Gt => ord == Ordering::Greater,
        CompareOp::Gte => ord != Ordering::Less,
        CompareOp::Lt => ord == Ordering::Less,
        CompareOp::Lte => ord != Ordering::Greater,
    }
}

/// Order a stored value against a raw query-string value.
fn compare_to_raw(value: &Value, raw: &str) -> Option<Ordering> {
    match value {
        Value::Number(n) => {
            let rhs = raw.trim().parse::<f64>().ok()?;
            n.as_f64()?.partial_cmp(&rhs)
        }
        Value::Bool(b) => {
            let rhs = raw.trim().parse::<bool>().ok()?;
            Some(b.cmp(&rhs))
        }
        Value::String(s) => match (parse_timestamp(s), parse_timestamp(raw)) {
            (Some(lhs), Some(rhs)) => Some(lhs.cmp(&rhs)),
            _ => Some(s.as_str().cmp(raw)),
        },
        _ => None,
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn compare_docs(a: &Value, b: &Value, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let ord = compare_values(a.get(&key.field), b.get(&key.field));
        let ord = match key.direction {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn type_rank(v: Option<&Value>) -> u8 {
    match v {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Bool(_)) => 3,
        Some(_) => 4,
    }
}

/// Missing < numbers < strings < booleans; timestamps chronologically.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (parse_timestamp(x), parse_timestamp(y)) {
                (Some(dx), Some(dy)) => dx.cmp(&dy),
                _ => x.cmp(y),
            }
        }
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn project(doc: Value, projection: &Projection) -> Value {
    match doc {
        Value::Object(map) => {
            let kept: Map<String, Value> = map
                .into_iter()
                .filter(|(k, _)| projection.keeps(k))
                .collect();
            Value::Object(kept)
        }
        other => other,
    }
}
