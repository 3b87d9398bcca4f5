use blog_auth::BlogAuth;
use blog_core::{BlogConfigSnapshot, BlogService};

use crate::middlewares::UploadConfig;

/// Shared handler state: the blog service, the token checker and the
/// upload settings.
#[derive(Clone)]
pub struct BlogAxumState {
    pub service: BlogService,
    pub auth: BlogAuth,
    pub uploads: UploadConfig,
}

impl BlogAxumState {
    pub fn new(service: BlogService, auth: BlogAuth, uploads: UploadConfig) -> Self {
        Self {
            service,
            auth,
            uploads,
        }
    }

    /// Wire auth and uploads from config around an existing service.
    pub fn from_config(service: BlogService, config: &BlogConfigSnapshot) -> Self {
        Self::new(
            service.with_config(config),
            BlogAuth::from_config(config),
            UploadConfig::from_config(config),
        )
    }
}
