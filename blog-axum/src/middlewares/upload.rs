//! Image upload middleware.
//!
//! [`ImageUpload`] turns a `multipart/form-data` request into a JSON
//! request before it reaches the handler. Text parts become string
//! fields. A single file part named `image` is streamed to the upload
//! directory and its stored path is written to both `image` and
//! `authorImage`. Other content types pass through untouched.
//!
//! Text parts are capped at `max_text_bytes` each and the whole body at
//! `max_bytes` plus [`TEXT_ALLOWANCE`]. If the handler does not succeed,
//! the stored image is removed again.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use blog_core::{BlogConfigSnapshot, BlogError};
use rand::Rng;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tower::{Layer, Service};

use crate::BlogAxumError;

pub const IMAGE_FIELD: &str = "image";
pub const DEFAULT_MAX_BYTES: u64 = 5 * 1024 * 1024;
pub const DEFAULT_MAX_TEXT_BYTES: u64 = 64 * 1024;
/// Room left in the whole-body limit for text parts and multipart framing.
pub const TEXT_ALLOWANCE: u64 = 1024 * 1024;

/// Errors raised while converting an upload.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Not an image! Please upload only images.")]
    NotAnImage,

    #[error("Upload too large. The limit is {max} bytes.")]
    TooLarge { max: u64 },

    #[error("Unexpected field: {name}")]
    UnexpectedField { name: String },

    #[error("Malformed multipart body: {source}")]
    Multipart { source: multer::Error },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

impl From<multer::Error> for UploadError {
    fn from(source: multer::Error) -> Self {
        match source {
            multer::Error::FieldSizeExceeded { limit, .. }
            | multer::Error::StreamSizeExceeded { limit } => UploadError::TooLarge { max: limit },
            source => UploadError::Multipart { source },
        }
    }
}

impl UploadError {
    /// Client mistakes are `BadRequest`; storage failures are server errors.
    pub fn into_anyhow(self) -> anyhow::Error {
        match self {
            UploadError::Io { .. } | UploadError::Serialization { .. } => {
                BlogError::general_error("Could not store the uploaded image")
                    .with_source(self.into())
                    .into_anyhow()
            }
            other => BlogError::bad_request(other.to_string()).into_anyhow(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Directory images are written to; created on first upload.
    pub dir: PathBuf,
    pub max_bytes: u64,
    /// Per text part.
    pub max_text_bytes: u64,
    pub allowed_content_types: HashSet<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("public/images"),
            max_bytes: DEFAULT_MAX_BYTES,
            max_text_bytes: DEFAULT_MAX_TEXT_BYTES,
            allowed_content_types: ["image/jpeg", "image/jpg", "image/png", "image/webp"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl UploadConfig {
    /// `uploads.dir`, `uploads.maxBytes` and `uploads.maxTextBytes`,
    /// defaults otherwise.
    pub fn from_config(config: &BlogConfigSnapshot) -> Self {
        let mut out = Self::default();
        if let Some(dir) = config.get_string("uploads.dir").filter(|d| !d.trim().is_empty()) {
            out.dir = PathBuf::from(dir);
        }
        if let Some(max) = config.get_u64("uploads.maxBytes").filter(|m| *m > 0) {
            out.max_bytes = max;
        }
        if let Some(max) = config.get_u64("uploads.maxTextBytes").filter(|m| *m > 0) {
            out.max_text_bytes = max;
        }
        out
    }

    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    pub fn max_bytes(mut self, max: u64) -> Self {
        self.max_bytes = max;
        self
    }

    pub fn max_text_bytes(mut self, max: u64) -> Self {
        self.max_text_bytes = max;
        self
    }

    fn constraints(&self) -> multer::Constraints {
        multer::Constraints::new().size_limit(
            multer::SizeLimit::new()
                .whole_stream(self.max_bytes.saturating_add(TEXT_ALLOWANCE))
                .per_field(self.max_text_bytes)
                .for_field(IMAGE_FIELD, self.max_bytes),
        )
    }

    fn allows(&self, content_type: Option<&str>) -> bool {
        content_type.is_some_and(|ct| self.allowed_content_types.contains(ct))
    }
}

#[derive(Clone)]
pub struct ImageUpload {
    config: Arc<UploadConfig>,
}

impl ImageUpload {
    pub fn new(config: UploadConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl<S> Layer<S> for ImageUpload {
    type Service = ImageUploadService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ImageUploadService {
            inner,
            config: Arc::clone(&self.config),
        }
    }
}

#[derive(Clone)]
pub struct ImageUploadService<S> {
    inner: S,
    config: Arc<UploadConfig>,
}

impl<S> Service<Request<Body>> for ImageUploadService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let mut inner = self.inner.clone();
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            let boundary = req
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .and_then(|ct| multer::parse_boundary(ct).ok());

            let Some(boundary) = boundary else {
                return inner.call(req).await;
            };

            match multipart_to_json(req, boundary, &config).await {
                Ok((json_req, stored)) => {
                    let res = inner.call(json_req).await?;
                    if let Some(path) = stored.filter(|_| !res.status().is_success()) {
                        tracing::debug!(path = %path.display(), status = %res.status(), "discarding upload");
                        let _ = tokio::fs::remove_file(&path).await;
                    }
                    Ok(res)
                }
                Err(e) => {
                    tracing::debug!(error = %e, "upload rejected");
                    Ok(BlogAxumError(e.into_anyhow()).into_response())
                }
            }
        })
    }
}

/// `image-<millis>-<random><ext>`, the extension taken from the client's
/// file name.
fn stored_file_name(original: Option<&str>) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    let ext = original
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();
    format!("{IMAGE_FIELD}-{millis}-{suffix}{ext}")
}

async fn store_image(
    mut field: multer::Field<'static>,
    config: &UploadConfig,
) -> Result<PathBuf, UploadError> {
    tokio::fs::create_dir_all(&config.dir).await?;
    let path = config.dir.join(stored_file_name(field.file_name()));

    let mut file = tokio::fs::File::create(&path).await?;
    let mut total = 0u64;

    let written = async {
        while let Some(chunk) = field.chunk().await? {
            total += chunk.len() as u64;
            if total > config.max_bytes {
                return Err(UploadError::TooLarge { max: config.max_bytes });
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok::<(), UploadError>(())
    }
    .await;
    drop(file);

    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&path).await;
        return Err(e);
    }

    tracing::info!(path = %path.display(), bytes = total, "image stored");
    Ok(path)
}

async fn multipart_to_json(
    req: Request<Body>,
    boundary: String,
    config: &UploadConfig,
) -> Result<(Request<Body>, Option<PathBuf>), UploadError> {
    let (mut parts, body) = req.into_parts();
    let mut multipart =
        multer::Multipart::with_constraints(body.into_data_stream(), boundary, config.constraints());

    let mut fields = Map::new();
    let mut stored: Option<PathBuf> = None;

    let result = async {
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            if field.file_name().is_none() {
                let value = field.text().await?;
                fields.insert(name, Value::String(value));
                continue;
            }

            if name != IMAGE_FIELD || stored.is_some() {
                return Err(UploadError::UnexpectedField { name });
            }
            if !config.allows(field.content_type().map(|m| m.essence_str())) {
                return Err(UploadError::NotAnImage);
            }

            stored = Some(store_image(field, config).await?);
        }
        Ok::<(), UploadError>(())
    }
    .await;

    if let Err(e) = result {
        if let Some(path) = &stored {
            let _ = tokio::fs::remove_file(path).await;
        }
        return Err(e);
    }

    if let Some(path) = &stored {
        let path = Value::String(path.to_string_lossy().into_owned());
        fields.insert("image".to_string(), path.clone());
        fields.insert("authorImage".to_string(), path);
    }

    let json_bytes = match serde_json::to_vec(&Value::Object(fields)) {
        Ok(bytes) => bytes,
        Err(e) => {
            if let Some(path) = &stored {
                let _ = tokio::fs::remove_file(path).await;
            }
            return Err(e.into());
        }
    };

    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    parts.headers.insert(header::CONTENT_LENGTH, HeaderValue::from(json_bytes.len()));

    Ok((Request::from_parts(parts, Body::from(json_bytes)), stored))
}
