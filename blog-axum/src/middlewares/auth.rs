//! Route guards.
//!
//! [`protect`] resolves the caller from the bearer token and stores the
//! [`AuthUser`] in the request extensions; [`admin_only`] then requires
//! the `admin` role. Layer them so `protect` runs first.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use blog_auth::{restrict_to, AuthUser, ADMIN_ROLE, NOT_LOGGED_IN};
use blog_core::BlogError;

use crate::{BlogAxumError, BlogAxumState};

pub async fn protect(State(state): State<BlogAxumState>, mut req: Request, next: Next) -> Response {
    match state.auth.protect(req.headers()) {
        Ok(user) => {
            tracing::debug!(user = %user.id, "authenticated");
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(e) => BlogAxumError(e).into_response(),
    }
}

pub async fn admin_only(req: Request, next: Next) -> Response {
    let Some(user) = req.extensions().get::<AuthUser>() else {
        return BlogAxumError(BlogError::not_authenticated(NOT_LOGGED_IN).into_anyhow())
            .into_response();
    };

    if let Err(e) = restrict_to(user, &[ADMIN_ROLE]) {
        return BlogAxumError(e).into_response();
    }
    next.run(req).await
}
