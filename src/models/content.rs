use std::sync::LazyLock;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::pagination::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT, PageRequest};
use crate::validation::{FieldSpec, Schema, Validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    Draft,
    Published,
    Archived,
}

impl ContentStatus {
    pub const ALL: &'static [&'static str] = &["draft", "published", "archived"];
}

/// An article, case study or announcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub body: String,
    pub category: String,
    pub status: ContentStatus,
    pub tags: Vec<String>,
    pub author: String,
    pub published_at: DateTime<Utc>,
}

/// Query of `GET /api/content`.
///
/// Every filter is optional; `tags` matches items carrying any of the
/// requested tags.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentQuery {
    pub page: u32,
    pub limit: u32,
    pub category: Option<String>,
    pub status: Option<ContentStatus>,
    pub search: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Default for ContentQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
            category: None,
            status: None,
            search: None,
            tags: Vec::new(),
        }
    }
}

impl ContentQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }

    pub fn matches(&self, item: &ContentItem) -> bool {
        if let Some(category) = &self.category
            && !item.category.eq_ignore_ascii_case(category)
        {
            return false;
        }

        if let Some(status) = self.status
            && item.status != status
        {
            return false;
        }

        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let found = [&item.title, &item.excerpt, &item.body]
                .iter()
                .any(|text| text.to_lowercase().contains(&needle));
            if !found {
                return false;
            }
        }

        self.tags.is_empty()
            || self
                .tags
                .iter()
                .any(|wanted| item.tags.iter().any(|tag| tag.eq_ignore_ascii_case(wanted)))
    }
}

static CONTENT_QUERY_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new()
        .field(FieldSpec::integer("page").default_value(1).min(1))
        .field(
            FieldSpec::integer("limit")
                .default_value(DEFAULT_PAGE_LIMIT)
                .min(1)
                .max(i64::from(MAX_PAGE_LIMIT)),
        )
        .field(FieldSpec::string("category").max_length(50))
        .field(FieldSpec::string("status").one_of(ContentStatus::ALL))
        .field(FieldSpec::string("search").max_length(100))
        .field(FieldSpec::string_list("tags").max_length(50).max_items(10))
});

impl Validate for ContentQuery {
    fn schema() -> &'static Schema {
        &CONTENT_QUERY_SCHEMA
    }
}

/// Demo catalogue loaded into the content store at startup.
pub fn seed_content() -> Vec<ContentItem> {
    let at = |y, m, d| {
        Utc.with_ymd_and_hms(y, m, d, 9, 0, 0)
            .single()
            .unwrap_or_default()
    };

    vec![
        ContentItem {
            id: "content_seed_0001".to_string(),
            slug: "scaling-event-driven-systems".to_string(),
            title: "Scaling Event-Driven Systems".to_string(),
            excerpt: "Lessons from moving a monolith to streams.".to_string(),
            body: "Partitioning, backpressure and idempotent consumers are the three \
                   topics every migration ends up revisiting."
                .to_string(),
            category: "engineering".to_string(),
            status: ContentStatus::Published,
            tags: vec!["architecture".to_string(), "streaming".to_string()],
            author: "Engineering Team".to_string(),
            published_at: at(2024, 3, 12),
        },
        ContentItem {
            id: "content_seed_0002".to_string(),
            slug: "retail-platform-case-study".to_string(),
            title: "Case Study: Rebuilding a Retail Platform".to_string(),
            excerpt: "Cutting checkout latency in half for a regional retailer.".to_string(),
            body: "We replaced a synchronous order pipeline with queued fulfilment and \
                   a read-optimized catalogue."
                .to_string(),
            category: "case-study".to_string(),
            status: ContentStatus::Published,
            tags: vec!["retail".to_string(), "performance".to_string()],
            author: "Delivery Team".to_string(),
            published_at: at(2024, 5, 2),
        },
        ContentItem {
            id: "content_seed_0003".to_string(),
            slug: "choosing-a-cloud-strategy".to_string(),
            title: "Choosing a Cloud Strategy".to_string(),
            excerpt: "A pragmatic framework for build, buy or migrate decisions.".to_string(),
            body: "Start from the workloads, not the vendor. Cost models follow from \
                   traffic shape and data gravity."
                .to_string(),
            category: "strategy".to_string(),
            status: ContentStatus::Published,
            tags: vec!["cloud".to_string(), "architecture".to_string()],
            author: "Advisory Team".to_string(),
            published_at: at(2024, 7, 18),
        },
        ContentItem {
            id: "content_seed_0004".to_string(),
            slug: "observability-playbook".to_string(),
            title: "An Observability Playbook".to_string(),
            excerpt: "Tracing, metrics and logs that answer real questions.".to_string(),
            body: "Draft: instrument the request path first, then the background work."
                .to_string(),
            category: "engineering".to_string(),
            status: ContentStatus::Draft,
            tags: vec!["observability".to_string()],
            author: "Engineering Team".to_string(),
            published_at: at(2024, 9, 1),
        },
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::validation::{RawInput, validate};

    fn query(raw: &str) -> ContentQuery {
        validate(RawInput::Query(raw), ContentQuery::schema()).unwrap()
    }

    fn count(q: &ContentQuery) -> usize {
        seed_content().iter().filter(|item| q.matches(item)).count()
    }

    #[test]
    fn test_defaults_apply() {
        let q = query("");
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, DEFAULT_PAGE_LIMIT);
        assert!(q.tags.is_empty());
        assert_eq!(count(&q), seed_content().len());
    }

    #[test]
    fn test_category_and_status_filters() {
        assert_eq!(count(&query("category=engineering")), 2);
        assert_eq!(count(&query("category=engineering&status=published")), 1);
        assert_eq!(count(&query("status=draft")), 1);
    }

    #[test]
    fn test_search_is_case_insensitive_over_body() {
        assert_eq!(count(&query("search=BACKPRESSURE")), 1);
        assert_eq!(count(&query("search=nothing-matches-this")), 0);
    }

    #[test]
    fn test_tags_match_any() {
        assert_eq!(count(&query("tags=architecture")), 2);
        assert_eq!(count(&query("tags=retail&tags=cloud")), 2);
        assert_eq!(count(&query("tags=unknown")), 0);
    }

    #[test]
    fn test_limit_above_maximum_rejected() {
        assert!(validate::<ContentQuery>(RawInput::Query("limit=1000"), ContentQuery::schema()).is_err());
    }
}
