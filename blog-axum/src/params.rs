//! Query-string parsing.
//!
//! The raw query is decoded with `form_urlencoded` instead of axum's
//! `Query<HashMap>` so repeated keys survive into the [`QuerySpec`]
//! (`sort=title&sort=-author` is two values, not one).

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use blog_core::QuerySpec;

pub fn query_spec(raw: Option<&str>) -> QuerySpec {
    let Some(raw) = raw else {
        return QuerySpec::new();
    };
    QuerySpec::from_pairs(
        url::form_urlencoded::parse(raw.as_bytes())
            .filter(|(k, _)| !k.is_empty())
            .map(|(k, v)| (k.into_owned(), v.into_owned())),
    )
}

/// Extractor for the request's [`QuerySpec`]. Never rejects: an
/// unparsable query is just fewer entries.
#[derive(Debug, Clone, Default)]
pub struct RestQuery(pub QuerySpec);

impl<S> FromRequestParts<S> for RestQuery
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RestQuery(query_spec(parts.uri.query())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blog_core::QueryValue;

    #[test]
    fn decodes_brackets_and_repeats() {
        let spec = query_spec(Some(
            "createdAt%5Bgte%5D=2024-01-01&sort=title&sort=-author&tag=foreign+exchange&=x",
        ));

        assert_eq!(
            spec.get("createdAt[gte]"),
            Some(&QueryValue::One("2024-01-01".into()))
        );
        assert_eq!(spec.control("sort").as_deref(), Some("title,-author"));
        assert_eq!(spec.get("tag"), Some(&QueryValue::One("foreign exchange".into())));
        assert_eq!(spec.len(), 3);
    }

    #[test]
    fn absent_query_is_empty() {
        assert!(query_spec(None).is_empty());
        assert!(query_spec(Some("")).is_empty());
    }
}
