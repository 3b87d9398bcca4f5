use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, patch, post, MethodRouter},
    Json, Router,
};
use blog_core::{errors::BlogError, BlogPost};
use serde_json::{json, Value};

use crate::{
    middlewares::{
        auth::{admin_only, protect},
        ImageUpload,
    },
    params::RestQuery,
    response::{self, Envelope},
    BlogAxumError, BlogAxumState,
};

type RestResult<T> = Result<T, BlogAxumError>;

fn map_json_rejection(rejection: JsonRejection) -> BlogAxumError {
    BlogError::bad_request("Failed to parse the request body as JSON")
        .with_errors(json!({"_schema": [rejection.body_text()]}))
        .into_anyhow()
        .into()
}

/// A single post as it leaves the API; `createdAt` stays hidden.
fn public(blog: &BlogPost) -> RestResult<Value> {
    blog.to_public().map_err(|e| BlogAxumError(e.into()))
}

async fn list(State(state): State<BlogAxumState>, RestQuery(spec): RestQuery) -> RestResult<Envelope> {
    let blogs = state.service.list(&spec).await?;
    Ok(response::list("blogs", blogs))
}

async fn length(State(state): State<BlogAxumState>) -> RestResult<Envelope> {
    let n = state.service.count().await?;
    Ok(response::ok(json!({ "noOfBlogs": n })))
}

async fn tags(State(state): State<BlogAxumState>) -> RestResult<Envelope> {
    let tags = state.service.tags().await?;
    Ok(response::ok(json!({ "tags": tags })))
}

async fn get_one(State(state): State<BlogAxumState>, Path(id): Path<String>) -> RestResult<Envelope> {
    let blog = state.service.get(&id).await?;
    Ok(response::ok(json!({ "blog": public(&blog)? })))
}

async fn create(
    State(state): State<BlogAxumState>,
    body: Result<Json<Value>, JsonRejection>,
) -> RestResult<Envelope> {
    let Json(data) = body.map_err(map_json_rejection)?;
    let blog = state.service.create(&data).await?;
    Ok(response::created(json!({ "blog": public(&blog)? })))
}

async fn update(
    State(state): State<BlogAxumState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> RestResult<Envelope> {
    let Json(data) = body.map_err(map_json_rejection)?;
    let blog = state.service.update(&id, &data).await?;
    Ok(response::ok(json!({ "blog": public(&blog)? })))
}

async fn remove(State(state): State<BlogAxumState>, Path(id): Path<String>) -> RestResult<StatusCode> {
    state.service.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `protect` then `admin_only` in front of `route`.
fn admin(state: &BlogAxumState, route: MethodRouter<BlogAxumState>) -> MethodRouter<BlogAxumState> {
    route
        .layer(middleware::from_fn(admin_only))
        .layer(middleware::from_fn_with_state(state.clone(), protect))
}

/// Admin route that also accepts a multipart image upload. The upload
/// is only parsed once the caller is authorised.
fn admin_upload(state: &BlogAxumState, route: MethodRouter<BlogAxumState>) -> MethodRouter<BlogAxumState> {
    admin(state, route.layer(ImageUpload::new(state.uploads.clone())))
}

/// Routes for the blogs resource, to be nested under `/api/v1/blogs`.
pub fn blog_router(state: BlogAxumState) -> Router<()> {
    Router::new()
        .route("/", get(list).merge(admin_upload(&state, post(create))))
        .route("/length", get(length))
        .route("/tags", get(tags))
        .route(
            "/{id}",
            get(get_one)
                .merge(admin_upload(&state, patch(update)))
                .merge(admin(&state, delete(remove))),
        )
        .with_state(state)
}
