use axum::body::Body;
use axum::http::Request;
use axum::Router;
use blog_api::build;
use blog_auth::{BlogAuth, ADMIN_ROLE};
use blog_core::BlogConfig;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

struct Api {
    router: Router,
    admin: String,
    _uploads: tempfile::TempDir,
}

fn api_with(overrides: &[(&str, &str)]) -> Api {
    let uploads = tempfile::tempdir().unwrap();
    let mut config = BlogConfig::with_defaults();
    config.set("auth.secret", "http-test-secret");
    config.set("uploads.dir", uploads.path().to_string_lossy().into_owned());
    for (k, v) in overrides {
        config.set(*k, *v);
    }

    let auth = BlogAuth::from_config(&config.snapshot());
    let admin = format!("Bearer {}", auth.create_access_token("editor", ADMIN_ROLE).unwrap());

    Api {
        router: build(&config).unwrap().into_router(),
        admin,
        _uploads: uploads,
    }
}

fn api() -> Api {
    api_with(&[])
}

impl Api {
    async fn call(&self, method: &str, uri: &str, body: Option<Value>) -> (u16, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if method != "GET" {
            req = req.header("authorization", &self.admin);
        }
        let req = match body {
            Some(body) => req
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status().as_u16();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn create(&self, title: &str, tag: &str, author: &str) -> Value {
        let (status, body) = self
            .call(
                "POST",
                "/api/v1/blogs",
                Some(json!({
                    "title": title,
                    "body": format!("{title} explained in enough words."),
                    "tag": tag,
                    "author": author,
                    "authorImage": "public/images/author.png",
                    "image": "public/images/cover.png"
                })),
            )
            .await;
        assert_eq!(status, 201, "{body}");
        body["data"]["blog"].clone()
    }

    async fn seed(&self) -> Vec<Value> {
        let mut out = Vec::new();
        for (title, tag, author) in [
            ("Lifetimes in practice", "tech", "Ferris the Crab"),
            ("Cooking with cast iron", "lifestyle", "Julia Childish"),
            ("Async Rust without fear", "tech", "Ferris the Crab"),
            ("Walking the Camino trail", "travel", "Wanderer McTrail"),
        ] {
            out.push(self.create(title, tag, author).await);
        }
        out
    }
}

fn titles(body: &Value) -> Vec<String> {
    body["data"]["blogs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["title"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn health_ok() {
    let api = api();
    let res = api
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 200);
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(std::str::from_utf8(&bytes).unwrap(), "ok");
}

#[tokio::test]
async fn list_defaults_to_newest_first_and_hides_created_at() {
    let api = api();
    api.seed().await;

    let (status, body) = api.call("GET", "/api/v1/blogs", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "success");
    assert_eq!(body["results"], 4);
    assert_eq!(titles(&body)[0], "Walking the Camino trail");
    assert!(body["data"]["blogs"][0].get("createdAt").is_none());
    assert!(body["data"]["blogs"][0].get("id").is_some());
}

#[tokio::test]
async fn list_filters_sorts_selects_and_pages() {
    let api = api();
    api.seed().await;

    let (_, body) = api.call("GET", "/api/v1/blogs?tag=tech&sort=title", None).await;
    assert_eq!(titles(&body), ["Async Rust without fear", "Lifetimes in practice"]);

    let (_, body) = api
        .call("GET", "/api/v1/blogs?sort=title&fields=title,author&page=2&limit=3", None)
        .await;
    assert_eq!(body["results"], 1);
    let only = &body["data"]["blogs"][0];
    assert_eq!(only["title"], "Walking the Camino trail");
    let mut keys: Vec<&str> = only.as_object().unwrap().keys().map(|k| k.as_str()).collect();
    keys.sort_unstable();
    assert_eq!(keys, ["author", "id", "title"]);

    let (status, body) = api.call("GET", "/api/v1/blogs?page=99&limit=10", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["results"], 0);

    let (status, body) = api.call("GET", "/api/v1/blogs?nonsense=1&page=abc", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["results"], 0);
}

#[tokio::test]
async fn configured_default_page_size_applies() {
    let api = api_with(&[("paginate.default", "2")]);
    api.seed().await;

    let (_, body) = api.call("GET", "/api/v1/blogs", None).await;
    assert_eq!(body["results"], 2);

    let (_, body) = api.call("GET", "/api/v1/blogs?limit=3", None).await;
    assert_eq!(body["results"], 3);
}

#[tokio::test]
async fn length_and_tags() {
    let api = api();

    let (status, body) = api.call("GET", "/api/v1/blogs/length", None).await;
    assert_eq!(status, 404);
    assert_eq!(body, json!({"status": "fail", "message": "No blogs found"}));

    api.seed().await;

    let (status, body) = api.call("GET", "/api/v1/blogs/length", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["noOfBlogs"], 4);

    let (_, body) = api.call("GET", "/api/v1/blogs/tags", None).await;
    assert_eq!(body["data"]["tags"], json!(["lifestyle", "tech", "travel"]));
}

#[tokio::test]
async fn projected_list_agrees_with_get_by_id() {
    let api = api();
    api.seed().await;

    let (_, list) = api.call("GET", "/api/v1/blogs?fields=title", None).await;
    for item in list["data"]["blogs"].as_array().unwrap() {
        let id = item["id"].as_str().unwrap();
        let (status, one) = api.call("GET", &format!("/api/v1/blogs/{id}"), None).await;
        assert_eq!(status, 200);
        assert_eq!(one["data"]["blog"]["title"], item["title"]);
    }
}

#[tokio::test]
async fn single_post_responses_hide_created_at() {
    let api = api();
    let created = api.create("Hidden timestamps stay hidden", "tech", "Ferris the Crab").await;
    assert!(created.get("createdAt").is_none());

    let uri = format!("/api/v1/blogs/{}", created["id"].as_str().unwrap());

    let (status, body) = api.call("GET", &uri, None).await;
    assert_eq!(status, 200);
    assert!(body["data"]["blog"].get("createdAt").is_none());
    assert_eq!(body["data"]["blog"]["title"], "Hidden timestamps stay hidden");

    let (status, body) = api.call("PATCH", &uri, Some(json!({"tag": "science"}))).await;
    assert_eq!(status, 200);
    assert!(body["data"]["blog"].get("createdAt").is_none());
    assert_eq!(body["data"]["blog"]["tag"], "science");

    let (_, body) = api.call("GET", "/api/v1/blogs?fields=title,createdAt", None).await;
    assert!(body["data"]["blogs"][0].get("createdAt").is_some());
}

#[tokio::test]
async fn patch_then_delete() {
    let api = api();
    let created = api.create("Borrow checker diaries", "tech", "Ferris the Crab").await;
    let id = created["id"].as_str().unwrap();
    let uri = format!("/api/v1/blogs/{id}");

    let (status, body) = api.call("PATCH", &uri, Some(json!({"tag": "science"}))).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["blog"]["tag"], "science");
    assert_eq!(body["data"]["blog"]["title"], "Borrow checker diaries");

    let (status, body) = api.call("PATCH", &uri, Some(json!({"tag": "gossip"}))).await;
    assert_eq!(status, 400);
    assert!(body["errors"]["tag"][0].as_str().unwrap().starts_with("Tag is either"));

    let (status, body) = api.call("DELETE", &uri, None).await;
    assert_eq!(status, 204);
    assert_eq!(body, Value::Null);

    let (status, _) = api.call("GET", &uri, None).await;
    assert_eq!(status, 404);

    let (status, _) = api.call("DELETE", &uri, None).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn duplicate_title_is_rejected() {
    let api = api();
    api.create("Only one of these please", "other", "Unique Author").await;

    let (status, body) = api
        .call(
            "POST",
            "/api/v1/blogs",
            Some(json!({
                "title": "Only one of these please",
                "body": "A second post with the same title.",
                "author": "Another Author",
                "authorImage": "a.png",
                "image": "b.png"
            })),
        )
        .await;
    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().starts_with("Duplicate title"));
}
