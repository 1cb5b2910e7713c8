use std::sync::Arc;

use models::category::{CategoryField, NAME_REQUIRED};
use serde::Serialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::repository::{Category, CategoryQuery, CategoryRepository};
use crate::errors::ServiceError;
use crate::pagination::{ListParams, ListQuery, ListQueryBuilder, PaginationDefaults, SortSpec};

pub const CATEGORY_EXISTS: &str = "category already exists";
pub const NAME_TAKEN: &str = "category name already exists";
pub const ID_REQUIRED: &str = "category id is required";

/// `page` block of a paginated listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
}

/// `data` payload of `GET /categories`; `page` is omitted when pagination is inactive.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ListResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<PageInfo>,
    pub items: Vec<Category>,
}

/// Application service encapsulating category business rules.
///
/// Name uniqueness is a read-then-write check without a transaction: two
/// concurrent requests for the same new name can both pass it.
pub struct CategoryService<R: CategoryRepository + ?Sized> {
    repo: Arc<R>,
    builder: ListQueryBuilder,
}

impl<R: CategoryRepository + ?Sized> CategoryService<R> {
    /// Example:
    /// ```
    /// use std::sync::Arc;
    /// use service::category::{repository::mock::InMemoryCategoryRepository, CategoryService};
    /// use service::pagination::PaginationDefaults;
    ///
    /// let repo = Arc::new(InMemoryCategoryRepository::default());
    /// let svc = CategoryService::new(repo, PaginationDefaults::default());
    /// assert_eq!(svc.query_builder().defaults().page_size, 10);
    /// ```
    pub fn new(repo: Arc<R>, defaults: PaginationDefaults) -> Self {
        Self { repo, builder: ListQueryBuilder::new(defaults) }
    }

    pub fn query_builder(&self) -> &ListQueryBuilder { &self.builder }

    /// Resolve string field names from the request against the category entity.
    ///
    /// Only entity fields ever reach storage. An unknown sort column falls back
    /// to the configured default order; an unknown filter column matches nothing.
    pub fn resolve(&self, query: ListQuery) -> CategoryQuery {
        query.resolve_fields(
            |name| known_field(&name, "orderColumn"),
            || self.default_sort(),
            |name| known_field(&name, "filterColumn"),
        )
    }

    fn default_sort(&self) -> SortSpec<CategoryField> {
        let defaults = self.builder.defaults();
        // 启动时已校验默认排序列，这里的回退仅为兜底
        let field = defaults.order_column.parse().unwrap_or(CategoryField::CreateTime);
        SortSpec { field, direction: defaults.order_direction }
    }

    pub async fn list(&self, params: &ListParams) -> Result<ListResult, ServiceError> {
        let query = self.resolve(self.builder.build(params));
        debug!(?query, "category list query");
        let items = self.repo.find_page(&query).await?;
        let page = match query.page {
            Some(p) => {
                let filter = if self.builder.defaults().filtered_total { query.filter.as_ref() } else { None };
                let total = self.repo.count(filter).await?;
                Some(PageInfo { page: p.page, page_size: p.page_size, total })
            }
            None => None,
        };
        Ok(ListResult { page, items })
    }

    pub async fn get(&self, id: &str) -> Result<Category, ServiceError> {
        let id = parse_id(id)?;
        self.repo.find_by_id(id).await?.ok_or_else(|| ServiceError::not_found("category"))
    }

    /// Create a category; rejects a missing name or one already in use.
    #[instrument(skip(self))]
    pub async fn add(&self, name: Option<&str>) -> Result<Category, ServiceError> {
        let name = require_name(name)?;
        if self.repo.find_by_name(name).await?.is_some() {
            debug!(%name, "category name collision on create");
            return Err(ServiceError::validation("name", CATEGORY_EXISTS));
        }
        let created = self.repo.create(name).await?;
        info!(id = %created.id, name = %created.name, "created category");
        Ok(created)
    }

    /// Rename a category.
    ///
    /// The collision check looks up the new name without excluding `id`, so
    /// renaming a category to its current name is rejected as a collision.
    /// An unknown `id` yields `Ok(None)`.
    #[instrument(skip(self))]
    pub async fn update(&self, id: &str, name: Option<&str>) -> Result<Option<Category>, ServiceError> {
        let name = require_name(name)?;
        let id = parse_id(id)?;
        if let Some(existing) = self.repo.find_by_name(name).await? {
            debug!(%name, existing = %existing.id, "category name collision on update");
            return Err(ServiceError::validation("name", NAME_TAKEN));
        }
        let updated = self.repo.update_name(id, name).await?;
        match &updated {
            Some(c) => info!(id = %c.id, name = %c.name, "updated category"),
            None => debug!(%id, "update target does not exist"),
        }
        Ok(updated)
    }

    /// Delete by id. Succeeds whether or not the category existed.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: Option<&str>) -> Result<(), ServiceError> {
        let raw = id.map(str::trim).filter(|s| !s.is_empty()).ok_or_else(|| ServiceError::validation("id", ID_REQUIRED))?;
        let id = parse_id(raw)?;
        let deleted = self.repo.delete_by_id(id).await?;
        info!(%id, deleted, "removed category");
        Ok(())
    }
}

fn require_name(name: Option<&str>) -> Result<&str, ServiceError> {
    match name {
        Some(n) if !n.trim().is_empty() => Ok(n),
        _ => Err(ServiceError::validation("name", NAME_REQUIRED)),
    }
}

fn parse_id(raw: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ServiceError::InvalidId(raw.to_string()))
}

fn known_field(name: &str, param: &str) -> Option<CategoryField> {
    match name.parse::<CategoryField>() {
        Ok(field) => Some(field),
        Err(_) => {
            debug!(%param, column = %name, "ignoring unknown column");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::repository::mock::InMemoryCategoryRepository;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, FixedOffset, Utc};
    use tokio::sync::Barrier;

    use crate::category::repository::CategoryFilter;

    fn at(ts: i64) -> DateTime<FixedOffset> {
        DateTime::from_timestamp(1_700_000_000 + ts, 0).unwrap().fixed_offset()
    }

    fn row(name: &str, ts: i64) -> Category {
        Category { id: Uuid::new_v4(), name: name.into(), create_time: at(ts), update_time: at(ts) }
    }

    fn service_with(rows: Vec<Category>) -> (Arc<InMemoryCategoryRepository>, CategoryService<InMemoryCategoryRepository>) {
        let repo = Arc::new(InMemoryCategoryRepository::with_rows(rows));
        let svc = CategoryService::new(Arc::clone(&repo), PaginationDefaults::default());
        (repo, svc)
    }

    fn params(page: Option<&str>, page_size: Option<&str>, word: Option<&str>, filter_column: Option<&str>) -> ListParams {
        ListParams {
            page: page.map(Into::into),
            page_size: page_size.map(Into::into),
            word: word.map(Into::into),
            filter_column: filter_column.map(Into::into),
            ..Default::default()
        }
    }

    fn names(items: &[Category]) -> Vec<&str> {
        items.iter().map(|c| c.name.as_str()).collect()
    }

    #[tokio::test]
    async fn list_without_params_returns_all_newest_first() -> Result<(), ServiceError> {
        let (_, svc) = service_with(vec![row("old", 1), row("new", 3), row("mid", 2)]);
        let res = svc.list(&ListParams::default()).await?;
        assert!(res.page.is_none());
        assert_eq!(names(&res.items), ["new", "mid", "old"]);
        let json = serde_json::to_value(&res).unwrap();
        assert!(json.get("page").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn second_page_of_25_has_items_11_to_20() -> Result<(), ServiceError> {
        let rows: Vec<Category> = (1..=25).map(|i| row(&format!("c{i:02}"), i)).collect();
        let (_, svc) = service_with(rows);
        let mut p = params(Some("2"), Some("10"), None, None);
        p.order_type = Some("asc".into());
        let res = svc.list(&p).await?;
        assert_eq!(res.page, Some(PageInfo { page: 2, page_size: 10, total: 25 }));
        assert_eq!(res.items.len(), 10);
        assert_eq!(res.items.first().map(|c| c.name.as_str()), Some("c11"));
        assert_eq!(res.items.last().map(|c| c.name.as_str()), Some("c20"));
        Ok(())
    }

    #[tokio::test]
    async fn total_ignores_filter_by_default() -> Result<(), ServiceError> {
        let (_, svc) = service_with(vec![row("Food", 1), row("foobar", 2), row("Drinks", 3)]);
        let res = svc.list(&params(Some("1"), None, Some("foo"), None)).await?;
        assert_eq!(res.items.len(), 2);
        assert_eq!(res.page.map(|p| p.total), Some(3));
        Ok(())
    }

    #[tokio::test]
    async fn total_can_follow_filter() -> Result<(), ServiceError> {
        let repo = Arc::new(InMemoryCategoryRepository::with_rows(vec![row("Food", 1), row("foobar", 2), row("Drinks", 3)]));
        let defaults = PaginationDefaults { filtered_total: true, ..Default::default() };
        let svc = CategoryService::new(repo, defaults);
        let res = svc.list(&params(Some("1"), None, Some("foo"), None)).await?;
        assert_eq!(res.page.map(|p| p.total), Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn word_matches_name_case_insensitively() -> Result<(), ServiceError> {
        let (_, svc) = service_with(vec![row("FOOD", 1), row("seafood", 2), row("Drinks", 3)]);
        let res = svc.list(&params(None, None, Some("foo"), None)).await?;
        assert_eq!(names(&res.items), ["seafood", "FOOD"]);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_filter_column_matches_nothing() -> Result<(), ServiceError> {
        let (_, svc) = service_with(vec![row("Food", 1), row("Seafood", 2)]);
        let res = svc.list(&params(None, None, Some("foo"), Some("description"))).await?;
        assert!(res.items.is_empty());
        assert!(res.page.is_none());

        let res = svc.list(&params(Some("1"), None, Some("foo"), Some("description"))).await?;
        assert!(res.items.is_empty());
        assert_eq!(res.page.map(|p| p.total), Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_filter_column_is_ignored_next_to_known_one() -> Result<(), ServiceError> {
        let (_, svc) = service_with(vec![row("Food", 1), row("Drinks", 2)]);
        let res = svc.list(&params(None, None, Some("foo"), Some("description,name"))).await?;
        assert_eq!(names(&res.items), ["Food"]);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_order_column_falls_back_to_default_order() -> Result<(), ServiceError> {
        let (_, svc) = service_with(vec![row("b", 1), row("c", 3), row("a", 2)]);
        let p = ListParams { order_column: Some("$where".into()), order_type: Some("asc".into()), ..Default::default() };
        let res = svc.list(&p).await?;
        assert_eq!(names(&res.items), ["c", "a", "b"]);
        Ok(())
    }

    #[tokio::test]
    async fn add_requires_name() {
        let (repo, svc) = service_with(vec![]);
        for name in [None, Some(""), Some("  ")] {
            let err = svc.add(name).await.unwrap_err();
            assert!(matches!(err, ServiceError::Validation { ref field, ref message } if field == "name" && message == NAME_REQUIRED));
        }
        assert!(repo.snapshot().is_empty());
    }

    #[tokio::test]
    async fn add_rejects_duplicate_name() {
        let (repo, svc) = service_with(vec![row("Tea", 1)]);
        let err = svc.add(Some("Tea")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation { ref message, .. } if message == CATEGORY_EXISTS));
        assert_eq!(repo.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn add_is_case_sensitive_on_duplicates() -> Result<(), ServiceError> {
        let (repo, svc) = service_with(vec![row("Tea", 1)]);
        svc.add(Some("tea")).await?;
        assert_eq!(repo.snapshot().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn add_creates_with_equal_timestamps() -> Result<(), ServiceError> {
        let (repo, svc) = service_with(vec![]);
        let created = svc.add(Some("Tea")).await?;
        let rows = repo.snapshot();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, created.id);
        assert_eq!(rows[0].create_time, rows[0].update_time);
        Ok(())
    }

    #[tokio::test]
    async fn update_to_own_name_collides() {
        let tea = row("Tea", 1);
        let (repo, svc) = service_with(vec![tea.clone()]);
        let err = svc.update(&tea.id.to_string(), Some("Tea")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation { ref message, .. } if message == NAME_TAKEN));
        assert_eq!(repo.snapshot(), vec![tea]);
    }

    #[tokio::test]
    async fn update_to_free_name_bumps_update_time_only() -> Result<(), ServiceError> {
        let tea = row("Tea", -3600);
        let (_, svc) = service_with(vec![tea.clone()]);
        let updated = svc.update(&tea.id.to_string(), Some("Green tea")).await?.expect("exists");
        assert_eq!(updated.name, "Green tea");
        assert_eq!(updated.create_time, tea.create_time);
        assert!(updated.update_time > tea.update_time);
        assert!(updated.update_time <= Utc::now().fixed_offset() + Duration::seconds(1));
        Ok(())
    }

    #[tokio::test]
    async fn update_unknown_id_returns_none() -> Result<(), ServiceError> {
        let (_, svc) = service_with(vec![]);
        assert!(svc.update(&Uuid::new_v4().to_string(), Some("x")).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn update_requires_name_and_valid_id() {
        let (_, svc) = service_with(vec![]);
        assert!(matches!(svc.update("not-a-uuid", Some("x")).await, Err(ServiceError::InvalidId(_))));
        assert!(matches!(svc.update(&Uuid::new_v4().to_string(), None).await, Err(ServiceError::Validation { .. })));
    }

    #[tokio::test]
    async fn remove_unknown_id_succeeds_without_deleting() -> Result<(), ServiceError> {
        let (repo, svc) = service_with(vec![row("Tea", 1)]);
        svc.remove(Some(&Uuid::new_v4().to_string())).await?;
        assert_eq!(repo.snapshot().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn remove_existing_id_deletes() -> Result<(), ServiceError> {
        let tea = row("Tea", 1);
        let (repo, svc) = service_with(vec![tea.clone()]);
        svc.remove(Some(&tea.id.to_string())).await?;
        assert!(repo.snapshot().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn remove_without_id_is_rejected() {
        let (_, svc) = service_with(vec![]);
        for id in [None, Some(""), Some(" ")] {
            let err = svc.remove(id).await.unwrap_err();
            assert!(matches!(err, ServiceError::Validation { ref field, .. } if field == "id"));
        }
    }

    #[tokio::test]
    async fn get_maps_missing_to_not_found() {
        let (_, svc) = service_with(vec![]);
        assert!(matches!(svc.get(&Uuid::new_v4().to_string()).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn storage_errors_propagate() {
        let (repo, svc) = service_with(vec![]);
        repo.fail_with("connection reset");
        assert!(matches!(svc.list(&ListParams::default()).await, Err(ServiceError::Db(_))));
        assert!(matches!(svc.add(Some("Tea")).await, Err(ServiceError::Db(_))));
    }

    /// Holds every name lookup until two callers have reached it.
    struct RacingRepository {
        inner: InMemoryCategoryRepository,
        gate: Barrier,
    }

    #[async_trait]
    impl CategoryRepository for RacingRepository {
        async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, ServiceError> { self.inner.find_by_id(id).await }
        async fn find_by_name(&self, name: &str) -> Result<Option<Category>, ServiceError> {
            let found = self.inner.find_by_name(name).await;
            self.gate.wait().await;
            found
        }
        async fn find_page(&self, query: &CategoryQuery) -> Result<Vec<Category>, ServiceError> { self.inner.find_page(query).await }
        async fn count(&self, filter: Option<&CategoryFilter>) -> Result<u64, ServiceError> { self.inner.count(filter).await }
        async fn create(&self, name: &str) -> Result<Category, ServiceError> { self.inner.create(name).await }
        async fn update_name(&self, id: Uuid, name: &str) -> Result<Option<Category>, ServiceError> { self.inner.update_name(id, name).await }
        async fn delete_by_id(&self, id: Uuid) -> Result<bool, ServiceError> { self.inner.delete_by_id(id).await }
    }

    #[tokio::test]
    async fn concurrent_adds_with_same_name_can_both_succeed() {
        let repo = Arc::new(RacingRepository { inner: InMemoryCategoryRepository::default(), gate: Barrier::new(2) });
        let svc = CategoryService::new(Arc::clone(&repo), PaginationDefaults::default());
        let (a, b) = tokio::join!(svc.add(Some("Tea")), svc.add(Some("Tea")));
        assert!(a.is_ok() && b.is_ok());
        let dupes = repo.inner.snapshot().into_iter().filter(|c| c.name == "Tea").count();
        assert_eq!(dupes, 2);
    }

    #[tokio::test]
    async fn works_behind_a_trait_object() -> Result<(), ServiceError> {
        let repo: Arc<dyn CategoryRepository> = Arc::new(InMemoryCategoryRepository::default());
        let svc = CategoryService::new(repo, PaginationDefaults::default());
        svc.add(Some("Tea")).await?;
        assert_eq!(svc.list(&ListParams::default()).await?.items.len(), 1);
        Ok(())
    }
}
