use async_trait::async_trait;
use models::category::{self, CategoryField};
use sea_orm::sea_query::{Alias, Expr, Func, LikeExpr};
use sea_orm::{Condition, DatabaseConnection, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::filter::RegexFilter;
use crate::pagination::{ListQuery, SortDirection};

pub type Category = category::Model;
/// List query with field names resolved against the category entity.
pub type CategoryQuery = ListQuery<CategoryField>;
pub type CategoryFilter = RegexFilter<CategoryField>;

/// Persistence operations the category service depends on.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, ServiceError>;
    /// Case-sensitive exact match.
    async fn find_by_name(&self, name: &str) -> Result<Option<Category>, ServiceError>;
    /// Filtered, sorted rows; windowed when `query.page` is set.
    async fn find_page(&self, query: &CategoryQuery) -> Result<Vec<Category>, ServiceError>;
    async fn count(&self, filter: Option<&CategoryFilter>) -> Result<u64, ServiceError>;
    async fn create(&self, name: &str) -> Result<Category, ServiceError>;
    /// `None` when no category has this id.
    async fn update_name(&self, id: Uuid, name: &str) -> Result<Option<Category>, ServiceError>;
    /// Returns whether a category was removed.
    async fn delete_by_id(&self, id: Uuid) -> Result<bool, ServiceError>;
}

/// SeaORM-backed repository implementation.
pub struct SeaOrmCategoryRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmCategoryRepository {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }
}

/// `LOWER(CAST(col AS text)) LIKE '%word%'` for each field, OR-ed together.
/// A filter without fields is `FALSE`.
fn filter_condition(filter: &CategoryFilter) -> Condition {
    if filter.fields.is_empty() {
        return Condition::all().add(Expr::cust("FALSE"));
    }
    let pattern = filter.like_pattern();
    filter.fields.iter().fold(Condition::any(), |cond, field| {
        let text = Func::lower(Func::cast_as(Expr::col((category::Entity, field.column())), Alias::new("text")));
        cond.add(Expr::expr(text).like(LikeExpr::new(pattern.clone()).escape('\\')))
    })
}

fn filtered(filter: Option<&CategoryFilter>) -> Select<category::Entity> {
    let select = category::Entity::find();
    match filter {
        Some(f) => select.filter(filter_condition(f)),
        None => select,
    }
}

/// Filtered, ordered select for one list request; ties are broken by id.
fn page_select(query: &CategoryQuery) -> Select<category::Entity> {
    let order = match query.sort.direction {
        SortDirection::Asc => Order::Asc,
        SortDirection::Desc => Order::Desc,
    };
    let select = filtered(query.filter.as_ref())
        .order_by(query.sort.field.column(), order)
        .order_by(category::Column::Id, Order::Asc);
    match query.page {
        Some(page) => select.offset(page.offset()).limit(page.limit()),
        None => select,
    }
}

#[async_trait]
impl CategoryRepository for SeaOrmCategoryRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, ServiceError> {
        Ok(category::find_by_id(&self.db, id).await?)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Category>, ServiceError> {
        Ok(category::find_by_name(&self.db, name).await?)
    }

    async fn find_page(&self, query: &CategoryQuery) -> Result<Vec<Category>, ServiceError> {
        page_select(query).all(&self.db).await.map_err(|e| ServiceError::Db(e.to_string()))
    }

    async fn count(&self, filter: Option<&CategoryFilter>) -> Result<u64, ServiceError> {
        filtered(filter).count(&self.db).await.map_err(|e| ServiceError::Db(e.to_string()))
    }

    async fn create(&self, name: &str) -> Result<Category, ServiceError> {
        Ok(category::create(&self.db, name).await?)
    }

    async fn update_name(&self, id: Uuid, name: &str) -> Result<Option<Category>, ServiceError> {
        Ok(category::update_name(&self.db, id, name).await?)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool, ServiceError> {
        Ok(category::delete_by_id(&self.db, id).await?)
    }
}

/// Whether `c` satisfies `filter` (any listed field contains the word).
pub(crate) fn matches_filter(c: &Category, filter: &CategoryFilter) -> bool {
    filter.fields.iter().any(|f| filter.matches_text(&c.field_text(*f)))
}

/// Filter, sort and window an in-memory set the same way the SQL query does.
pub(crate) fn select_in_memory(rows: Vec<Category>, query: &CategoryQuery) -> Vec<Category> {
    let mut rows: Vec<Category> = match &query.filter {
        Some(f) => rows.into_iter().filter(|c| matches_filter(c, f)).collect(),
        None => rows,
    };
    let field = query.sort.field;
    rows.sort_by(|a, b| {
        let ord = a.cmp_field(b, field);
        let ord = match query.sort.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        };
        ord.then_with(|| a.id.cmp(&b.id))
    });
    match query.page {
        Some(page) => {
            let skip = usize::try_from(page.offset()).unwrap_or(usize::MAX);
            let take = usize::try_from(page.limit()).unwrap_or(usize::MAX);
            rows.into_iter().skip(skip).take(take).collect()
        }
        None => rows,
    }
}

/// Simple in-memory repository for tests and doc examples
pub mod mock {
    use super::*;
    use chrono::Utc;
    use std::sync::{Mutex, MutexGuard};

    #[derive(Default)]
    pub struct InMemoryCategoryRepository {
        rows: Mutex<Vec<Category>>,
        failure: Mutex<Option<String>>,
    }

    impl InMemoryCategoryRepository {
        pub fn with_rows(rows: Vec<Category>) -> Self {
            Self { rows: Mutex::new(rows), failure: Mutex::new(None) }
        }

        /// Make every subsequent call fail with a storage error.
        pub fn fail_with(&self, message: &str) {
            *lock(&self.failure) = Some(message.to_string());
        }

        pub fn snapshot(&self) -> Vec<Category> {
            lock(&self.rows).clone()
        }

        fn check(&self) -> Result<(), ServiceError> {
            match lock(&self.failure).as_ref() {
                Some(msg) => Err(ServiceError::Db(msg.clone())),
                None => Ok(()),
            }
        }
    }

    fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
        m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[async_trait]
    impl CategoryRepository for InMemoryCategoryRepository {
        async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, ServiceError> {
            self.check()?;
            Ok(lock(&self.rows).iter().find(|c| c.id == id).cloned())
        }

        async fn find_by_name(&self, name: &str) -> Result<Option<Category>, ServiceError> {
            self.check()?;
            Ok(lock(&self.rows).iter().find(|c| c.name == name).cloned())
        }

        async fn find_page(&self, query: &CategoryQuery) -> Result<Vec<Category>, ServiceError> {
            self.check()?;
            Ok(select_in_memory(self.snapshot(), query))
        }

        async fn count(&self, filter: Option<&CategoryFilter>) -> Result<u64, ServiceError> {
            self.check()?;
            let rows = lock(&self.rows);
            let n = match filter {
                Some(f) => rows.iter().filter(|c| matches_filter(c, f)).count(),
                None => rows.len(),
            };
            Ok(n as u64)
        }

        async fn create(&self, name: &str) -> Result<Category, ServiceError> {
            self.check()?;
            category::validate_name(name)?;
            let now = Utc::now().fixed_offset();
            let c = Category { id: Uuid::new_v4(), name: name.to_string(), create_time: now, update_time: now };
            lock(&self.rows).push(c.clone());
            Ok(c)
        }

        async fn update_name(&self, id: Uuid, name: &str) -> Result<Option<Category>, ServiceError> {
            self.check()?;
            category::validate_name(name)?;
            let mut rows = lock(&self.rows);
            let Some(c) = rows.iter_mut().find(|c| c.id == id) else { return Ok(None) };
            c.name = name.to_string();
            c.update_time = Utc::now().fixed_offset();
            Ok(Some(c.clone()))
        }

        async fn delete_by_id(&self, id: Uuid) -> Result<bool, ServiceError> {
            self.check()?;
            let mut rows = lock(&self.rows);
            let before = rows.len();
            rows.retain(|c| c.id != id);
            Ok(rows.len() < before)
        }
    }
}
