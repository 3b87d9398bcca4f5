use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError};

/// Categories a post may be filed under.
pub const TAGS: [&str; 13] = [
    "finance",
    "energy",
    "foreign exchange",
    "tech",
    "science",
    "health",
    "politics",
    "sports",
    "entertainment",
    "business",
    "travel",
    "lifestyle",
    "other",
];

/// Fields left out of responses unless a projection names them.
pub const HIDDEN_FIELDS: [&str; 1] = ["createdAt"];

/// Drop [`HIDDEN_FIELDS`] from `doc` except those listed in `reveal`.
pub fn strip_hidden(doc: &mut Value, reveal: &[&str]) {
    if let Value::Object(map) = doc {
        for field in HIDDEN_FIELDS.iter().filter(|f| !reveal.contains(*f)) {
            map.remove(*field);
        }
    }
}

/// A stored blog post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: String,
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub author: String,
    pub author_image: String,
    pub image: String,
    pub created_at: DateTime<Utc>,
}

impl BlogPost {
    pub fn new(input: NewBlogPost, id: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: input.title.unwrap_or_default(),
            body: input.body.unwrap_or_default(),
            tag: input.tag,
            author: input.author.unwrap_or_default(),
            author_image: input.author_image.unwrap_or_default(),
            image: input.image.unwrap_or_default(),
            created_at,
        }
    }

    /// The post as returned to clients, hidden fields removed.
    pub fn to_public(&self) -> serde_json::Result<Value> {
        let mut doc = serde_json::to_value(self)?;
        strip_hidden(&mut doc, &[]);
        Ok(doc)
    }

    pub fn apply(&mut self, patch: BlogPostPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(body) = patch.body {
            self.body = body;
        }
        if let Some(tag) = patch.tag {
            self.tag = Some(tag);
        }
        if let Some(author) = patch.author {
            self.author = author;
        }
        if let Some(author_image) = patch.author_image {
            self.author_image = author_image;
        }
        if let Some(image) = patch.image {
            self.image = image;
        }
    }
}

/// Payload for creating a post. Every field is optional at the serde
/// level so a missing field is reported by `required`, not by serde.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewBlogPost {
    #[validate(required(message = "A blog must have a title"), custom(function = "title_length"))]
    #[serde(default, deserialize_with = "trimmed")]
    pub title: Option<String>,

    #[validate(required(message = "A blog must have a body"), custom(function = "body_length"))]
    #[serde(default, deserialize_with = "trimmed")]
    pub body: Option<String>,

    #[validate(custom(function = "known_tag"))]
    #[serde(default, deserialize_with = "trimmed")]
    pub tag: Option<String>,

    #[validate(required(message = "A blog must have an author"), custom(function = "author_length"))]
    #[serde(default, deserialize_with = "trimmed")]
    pub author: Option<String>,

    #[validate(
        required(message = "A blog must have an author image"),
        custom(function = "not_blank_author_image")
    )]
    #[serde(rename = "authorImage", default, deserialize_with = "trimmed")]
    pub author_image: Option<String>,

    #[validate(required(message = "A blog must have an image"), custom(function = "not_blank_image"))]
    #[serde(default, deserialize_with = "trimmed")]
    pub image: Option<String>,
}

/// Partial update; only the provided fields are validated.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BlogPostPatch {
    #[validate(custom(function = "title_length"))]
    #[serde(default, deserialize_with = "trimmed")]
    pub title: Option<String>,

    #[validate(custom(function = "body_length"))]
    #[serde(default, deserialize_with = "trimmed")]
    pub body: Option<String>,

    #[validate(custom(function = "known_tag"))]
    #[serde(default, deserialize_with = "trimmed")]
    pub tag: Option<String>,

    #[validate(custom(function = "author_length"))]
    #[serde(default, deserialize_with = "trimmed")]
    pub author: Option<String>,

    #[validate(custom(function = "not_blank_author_image"))]
    #[serde(rename = "authorImage", default, deserialize_with = "trimmed")]
    pub author_image: Option<String>,

    #[validate(custom(function = "not_blank_image"))]
    #[serde(default, deserialize_with = "trimmed")]
    pub image: Option<String>,
}

/// String fields are stored trimmed; validation sees the trimmed value.
fn trimmed<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(|v| v.map(|s| s.trim().to_string()))
}

fn failure(code: &'static str, message: String) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Owned(message));
    err
}

fn bounded(value: &str, min: usize, max: usize, subject: &str) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len > max {
        return Err(failure(
            "length",
            format!("{subject} must have less or equal than {max} characters"),
        ));
    }
    if len < min {
        return Err(failure(
            "length",
            format!("{subject} must have more or equal than {min} characters"),
        ));
    }
    Ok(())
}

fn title_length(value: &str) -> Result<(), ValidationError> {
    bounded(value, 10, 40, "A blog title")
}

fn body_length(value: &str) -> Result<(), ValidationError> {
    bounded(value, 10, 1000, "A blog body")
}

fn author_length(value: &str) -> Result<(), ValidationError> {
    bounded(value, 10, 40, "An author name")
}

fn known_tag(value: &str) -> Result<(), ValidationError> {
    if TAGS.contains(&value) {
        return Ok(());
    }
    Err(failure(
        "enum",
        "Tag is either: tech, science, health, politics, sports, entertainment, business, \
         travel, lifestyle, finance, energy, foreign exchange or other"
            .to_string(),
    ))
}

fn not_blank_author_image(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(failure("required", "A blog must have an author image".to_string()));
    }
    Ok(())
}

fn not_blank_image(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(failure("required", "A blog must have an image".to_string()));
    }
    Ok(())
}
