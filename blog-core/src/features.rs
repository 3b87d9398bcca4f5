//! # Query features
//!
//! Turns a [`QuerySpec`] into a refined [`Query`] against the record
//! store. A query is an ordered pipeline of [`Stage`]s; every transform
//! appends one stage and the store runs them front to back.
//!
//! ```rust
//! use blog_core::features::{Query, QueryFeatures};
//! use blog_core::query::QuerySpec;
//!
//! let spec = QuerySpec::from_pairs([("tag", "tech"), ("sort", "-title"), ("limit", "5")]);
//! let query = QueryFeatures::new(Query::find_all(), &spec)
//!     .filter()
//!     .sort()
//!     .limit_fields()
//!     .paginate()
//!     .into_query();
//!
//! assert_eq!(query.predicates().count(), 1);
//! ```
//!
//! The canonical order is filter, sort, field selection, paginate
//! ([`QueryFeatures::build`]): windowing must see the filtered and
//! sorted set, and projection must not hide a sort key.

use crate::query::QuerySpec;

pub const DEFAULT_PAGE: usize = 1;
pub const DEFAULT_LIMIT: usize = 100;

/// Field implicitly kept by every projection.
pub const ID_FIELD: &str = "id";

/// Sort applied when the request has no `sort` directive.
pub const DEFAULT_SORT: &str = "-createdAt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "gte" => Some(CompareOp::Gte),
            "gt" => Some(CompareOp::Gt),
            "lte" => Some(CompareOp::Lte),
            "lt" => Some(CompareOp::Lt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub field: String,
    pub op: CompareOp,
    pub value: String,
}

impl Predicate {
    /// Parse one filter entry. `price[gte]` yields a range predicate on
    /// `price`; any other key is equality on the key as written.
    pub fn parse(key: &str, value: &str) -> Self {
        let (field, op) = split_operator(key).unwrap_or((key, CompareOp::Eq));
        Self {
            field: field.to_string(),
            op,
            value: value.to_string(),
        }
    }
}

fn split_operator(key: &str) -> Option<(&str, CompareOp)> {
    let inner = key.strip_suffix(']')?;
    let (field, suffix) = inner.split_once('[')?;
    if field.is_empty() {
        return None;
    }
    CompareOp::from_suffix(suffix).map(|op| (field, op))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: Direction,
}

impl SortKey {
    pub fn parse_list(raw: &str) -> Vec<SortKey> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| match s.strip_prefix('-') {
                Some("") => None,
                Some(field) => Some(SortKey {
                    field: field.to_string(),
                    direction: Direction::Desc,
                }),
                None => Some(SortKey {
                    field: s.to_string(),
                    direction: Direction::Asc,
                }),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Keep only these fields (plus `id`).
    Include(Vec<String>),
    /// Drop these fields.
    Exclude(Vec<String>),
}

impl Projection {
    /// `title,author` includes; `-body,-image` excludes. In a mixed list
    /// the `-` entries are ignored.
    pub fn parse(raw: &str) -> Option<Projection> {
        let items: Vec<&str> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty() && *s != "-")
            .collect();
        if items.is_empty() {
            return None;
        }

        if items.iter().all(|s| s.starts_with('-')) {
            let fields = items.iter().map(|s| s[1..].to_string()).collect();
            return Some(Projection::Exclude(fields));
        }

        let fields = items
            .iter()
            .filter(|s| !s.starts_with('-'))
            .map(|s| s.to_string())
            .collect();
        Some(Projection::Include(fields))
    }

    /// Whether `field` survives this projection.
    pub fn keeps(&self, field: &str) -> bool {
        match self {
            Projection::Include(fields) => field == ID_FIELD || fields.iter().any(|f| f == field),
            Projection::Exclude(fields) => !fields.iter().any(|f| f == field),
        }
    }

    /// Whether the caller asked for `field` by name.
    pub fn names(&self, field: &str) -> bool {
        matches!(self, Projection::Include(fields) if fields.iter().any(|f| f == field))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Match(Vec<Predicate>),
    Sort(Vec<SortKey>),
    Project(Projection),
    Window { skip: usize, limit: usize },
}

/// A query description. Built by [`QueryFeatures`], executed by a store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    stages: Vec<Stage>,
}

impl Query {
    /// The base "select everything" query.
    pub fn find_all() -> Self {
        Self::default()
    }

    pub fn push(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.stages.iter().flat_map(|s| match s {
            Stage::Match(preds) => preds.as_slice(),
            _ => &[][..],
        })
    }

    /// The last projection stage, if any.
    pub fn projection(&self) -> Option<&Projection> {
        self.stages.iter().rev().find_map(|s| match s {
            Stage::Project(p) => Some(p),
            _ => None,
        })
    }
}

/// Builder applying the four transforms of a [`QuerySpec`] to a query.
pub struct QueryFeatures<'a> {
    query: Query,
    spec: &'a QuerySpec,
    default_limit: usize,
}

impl<'a> QueryFeatures<'a> {
    pub fn new(query: Query, spec: &'a QuerySpec) -> Self {
        Self {
            query,
            spec,
            default_limit: DEFAULT_LIMIT,
        }
    }

    /// Page size used when `limit` is absent or unparsable.
    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit.max(1);
        self
    }

    /// One predicate per non-reserved key; no keys, no stage.
    pub fn filter(mut self) -> Self {
        let predicates: Vec<Predicate> = self
            .spec
            .filter_entries()
            .filter_map(|(k, v)| v.last().map(|v| Predicate::parse(k, v)))
            .collect();

        if !predicates.is_empty() {
            self.query = self.query.push(Stage::Match(predicates));
        }
        self
    }

    pub fn sort(mut self) -> Self {
        let mut keys = self
            .spec
            .control("sort")
            .map(|raw| SortKey::parse_list(&raw))
            .unwrap_or_default();
        if keys.is_empty() {
            keys = SortKey::parse_list(DEFAULT_SORT);
        }

        self.query = self.query.push(Stage::Sort(keys));
        self
    }

    /// Projection from `fields`; absent, the query is left unmodified.
    pub fn limit_fields(mut self) -> Self {
        if let Some(projection) = self.spec.control("fields").and_then(|raw| Projection::parse(&raw)) {
            self.query = self.query.push(Stage::Project(projection));
        }
        self
    }

    pub fn paginate(mut self) -> Self {
        let page = positive(self.spec.control("page").as_deref(), DEFAULT_PAGE);
        let limit = positive(self.spec.control("limit").as_deref(), self.default_limit);
        let skip = (page - 1).saturating_mul(limit);

        self.query = self.query.push(Stage::Window { skip, limit });
        self
    }

    /// All four transforms in their canonical order.
    pub fn build(self) -> Query {
        self.filter().sort().limit_fields().paginate().into_query()
    }

    pub fn into_query(self) -> Query {
        self.query
    }
}

/// Parse a page/limit value. Missing or non-numeric gives the default;
/// zero and negatives clamp to 1.
fn positive(raw: Option<&str>, default: usize) -> usize {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return default;
    };

    match raw.parse::<i64>() {
        Ok(n) if n < 1 => 1,
        Ok(n) => usize::try_from(n).unwrap_or(usize::MAX),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> QuerySpec {
        QuerySpec::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn every_non_reserved_key_is_one_predicate() {
        let s = params(&[
            ("tag", "tech"),
            ("author", "Jane Doe Smith"),
            ("createdAt[gte]", "2024-01-01"),
            ("page", "2"),
            ("sort", "title"),
            ("limit", "3"),
            ("fields", "title"),
        ]);
        let q = QueryFeatures::new(Query::find_all(), &s).filter().into_query();
        let preds: Vec<_> = q.predicates().collect();

        assert_eq!(preds.len(), 3);
        assert!(preds.contains(&&Predicate {
            field: "createdAt".into(),
            op: CompareOp::Gte,
            value: "2024-01-01".into(),
        }));
    }

    #[test]
    fn empty_filter_adds_no_stage() {
        let s = params(&[("page", "1")]);
        let q = QueryFeatures::new(Query::find_all(), &s).filter().into_query();
        assert!(q.stages().is_empty());
    }

    #[test]
    fn operator_suffixes() {
        assert_eq!(Predicate::parse("views[gt]", "5").op, CompareOp::Gt);
        assert_eq!(Predicate::parse("views[lte]", "5").op, CompareOp::Lte);
        assert_eq!(Predicate::parse("views[lt]", "5").field, "views");

        let unknown = Predicate::parse("views[ne]", "5");
        assert_eq!(unknown.op, CompareOp::Eq);
        assert_eq!(unknown.field, "views[ne]");

        assert_eq!(Predicate::parse("[gt]", "5").op, CompareOp::Eq);
    }

    #[test]
    fn repeated_filter_key_keeps_last_value() {
        let s = params(&[("tag", "tech"), ("tag", "science")]);
        let q = QueryFeatures::new(Query::find_all(), &s).filter().into_query();
        let preds: Vec<_> = q.predicates().collect();
        assert_eq!(preds.len(), 1);
        assert_eq!(preds[0].value, "science");
    }

    #[test]
    fn sort_defaults_to_newest_first() {
        let implicit = QueryFeatures::new(Query::find_all(), &params(&[])).sort().into_query();
        let explicit = QueryFeatures::new(Query::find_all(), &params(&[("sort", "-createdAt")]))
            .sort()
            .into_query();
        let blank = QueryFeatures::new(Query::find_all(), &params(&[("sort", " ")])).sort().into_query();

        assert_eq!(implicit, explicit);
        assert_eq!(implicit, blank);
    }

    #[test]
    fn sort_list_keeps_order_and_direction() {
        let keys = SortKey::parse_list("tag, -title,,-");
        assert_eq!(
            keys,
            vec![
                SortKey { field: "tag".into(), direction: Direction::Asc },
                SortKey { field: "title".into(), direction: Direction::Desc },
            ]
        );
    }

    #[test]
    fn projection_forms() {
        assert_eq!(
            Projection::parse("title,author"),
            Some(Projection::Include(vec!["title".into(), "author".into()]))
        );
        assert_eq!(
            Projection::parse("-body,-image"),
            Some(Projection::Exclude(vec!["body".into(), "image".into()]))
        );
        assert_eq!(
            Projection::parse("title,-body"),
            Some(Projection::Include(vec!["title".into()]))
        );
        assert_eq!(Projection::parse(" , "), None);

        let p = Projection::Include(vec!["title".into()]);
        assert!(p.keeps("id"));
        assert!(!p.keeps("body"));
    }

    #[test]
    fn absent_fields_leave_query_unmodified() {
        let q = QueryFeatures::new(Query::find_all(), &params(&[])).limit_fields().into_query();
        assert_eq!(q, Query::find_all());
    }

    #[test]
    fn pagination_window() {
        let q = QueryFeatures::new(Query::find_all(), &params(&[("page", "3"), ("limit", "10")]))
            .paginate()
            .into_query();
        assert_eq!(q.stages(), &[Stage::Window { skip: 20, limit: 10 }]);
    }

    #[test]
    fn pagination_defaults_and_clamping() {
        let window = |pairs: &[(&str, &str)]| {
            QueryFeatures::new(Query::find_all(), &params(pairs))
                .with_default_limit(100)
                .paginate()
                .into_query()
                .stages()[0]
                .clone()
        };

        assert_eq!(window(&[]), Stage::Window { skip: 0, limit: 100 });
        assert_eq!(window(&[("page", "abc"), ("limit", "x")]), Stage::Window { skip: 0, limit: 100 });
        assert_eq!(window(&[("page", "0"), ("limit", "-5")]), Stage::Window { skip: 0, limit: 1 });
        assert_eq!(window(&[("page", "-2"), ("limit", "7")]), Stage::Window { skip: 0, limit: 7 });
    }

    #[test]
    fn build_uses_canonical_order() {
        let s = params(&[("tag", "tech"), ("fields", "title"), ("sort", "title"), ("page", "2")]);
        let q = QueryFeatures::new(Query::find_all(), &s).build();
        let kinds: Vec<&str> = q
            .stages()
            .iter()
            .map(|s| match s {
                Stage::Match(_) => "match",
                Stage::Sort(_) => "sort",
                Stage::Project(_) => "project",
                Stage::Window { .. } => "window",
            })
            .collect();
        assert_eq!(kinds, ["match", "sort", "project", "window"]);
    }
}
