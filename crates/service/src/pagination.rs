//! List query construction for the service layer
//!
//! Turns untrusted list parameters (`page`, `pageSize`, `orderColumn`,
//! `orderType`, `filterColumn`, `word`) into a bounded [`ListQuery`].
//! Field names stay plain strings here; resolving them against an entity is
//! the caller's job.

use serde::{Deserialize, Serialize};

use crate::filter::{split_fields, to_regexp_query, RegexFilter};

/// Field filtered on when `word` is given without `filterColumn`.
pub const DEFAULT_FILTER_COLUMN: &str = "name";

/// Raw list parameters as they arrive in the query string.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub order_column: Option<String>,
    pub order_type: Option<String>,
    pub filter_column: Option<String>,
    pub word: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// `asc`/`desc` in any case, plus the `ascending`/`descending`/`1`/`-1` spellings.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" | "1" => Some(SortDirection::Asc),
            "desc" | "descending" | "-1" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortSpec<F = String> {
    pub field: F,
    pub direction: SortDirection,
}

/// An active page window; both numbers are at least 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page index
    pub page: u64,
    /// items per page
    pub page_size: u64,
}

impl PageRequest {
    /// Rows to skip before this page, capped at `i64::MAX` so SQL drivers can bind it.
    /// A capped offset lies past any real table and yields an empty page.
    pub fn offset(&self) -> u64 {
        self.page_size.saturating_mul(self.page.saturating_sub(1)).min(MAX_OFFSET)
    }

    pub fn limit(&self) -> u64 {
        self.page_size
    }
}

/// Fully validated list query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListQuery<F = String> {
    pub sort: SortSpec<F>,
    pub filter: Option<RegexFilter<F>>,
    /// `None` means pagination is inactive: return every matching row, no total.
    pub page: Option<PageRequest>,
}

impl<F> ListQuery<F> {
    /// Resolve field names into another representation.
    ///
    /// `sort` replaces the whole sort spec when the field does not resolve.
    /// Filter fields that do not resolve are dropped; a filter left without
    /// fields matches nothing.
    pub fn resolve_fields<G>(
        self,
        sort: impl FnOnce(F) -> Option<G>,
        fallback_sort: impl FnOnce() -> SortSpec<G>,
        filter_field: impl FnMut(F) -> Option<G>,
    ) -> ListQuery<G> {
        let direction = self.sort.direction;
        let sort = match sort(self.sort.field) {
            Some(field) => SortSpec { field, direction },
            None => fallback_sort(),
        };
        let filter = self.filter.map(|f| f.filter_map_fields(filter_field));
        ListQuery { sort, filter, page: self.page }
    }
}

/// Defaults applied when a parameter is missing or unusable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaginationDefaults {
    pub page_size: u64,
    pub order_column: String,
    pub order_direction: SortDirection,
    pub max_page_size: u64,
    /// Whether `total` counts only rows matching the filter.
    pub filtered_total: bool,
}

impl Default for PaginationDefaults {
    fn default() -> Self {
        Self {
            page_size: 10,
            order_column: "createTime".into(),
            order_direction: SortDirection::Desc,
            max_page_size: 100,
            filtered_total: false,
        }
    }
}

impl From<&configs::PaginationConfig> for PaginationDefaults {
    fn from(cfg: &configs::PaginationConfig) -> Self {
        Self {
            page_size: cfg.page_size.max(1),
            order_column: cfg.order_column.clone(),
            order_direction: SortDirection::parse(&cfg.order_type).unwrap_or(SortDirection::Desc),
            max_page_size: cfg.max_page_size.max(1),
            filtered_total: cfg.filtered_total,
        }
    }
}

const MAX_OFFSET: u64 = i64::MAX as u64;

/// Positive integer or nothing.
fn parse_positive(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|n| *n > 0)
}

#[derive(Clone, Debug, Default)]
pub struct ListQueryBuilder {
    defaults: PaginationDefaults,
}

impl ListQueryBuilder {
    pub fn new(defaults: PaginationDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &PaginationDefaults {
        &self.defaults
    }

    pub fn build(&self, params: &ListParams) -> ListQuery {
        ListQuery {
            sort: self.sort(params),
            filter: self.filter(params),
            page: self.page(params),
        }
    }

    fn sort(&self, params: &ListParams) -> SortSpec {
        let field = params
            .order_column
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(self.defaults.order_column.as_str())
            .to_string();
        let direction = params
            .order_type
            .as_deref()
            .and_then(SortDirection::parse)
            .unwrap_or(self.defaults.order_direction);
        SortSpec { field, direction }
    }

    fn filter(&self, params: &ListParams) -> Option<RegexFilter> {
        let word = params.word.as_deref()?;
        let mut fields = params.filter_column.as_deref().map(split_fields).unwrap_or_default();
        if fields.is_empty() {
            fields.push(DEFAULT_FILTER_COLUMN.to_string());
        }
        Some(to_regexp_query(fields, word))
    }

    fn page(&self, params: &ListParams) -> Option<PageRequest> {
        let page = parse_positive(params.page.as_deref()?)?;
        let page_size = match params.page_size.as_deref() {
            None => self.defaults.page_size,
            Some(raw) => parse_positive(raw)?,
        };
        Some(PageRequest { page, page_size: page_size.min(self.defaults.max_page_size) })
    }
}
