use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use models::category;
use uuid::Uuid;

use super::repository::{select_in_memory, matches_filter, Category, CategoryFilter, CategoryQuery, CategoryRepository};
use crate::errors::ServiceError;
use crate::storage::json_store::JsonStore;

/// 文件存储：以 JSON 文件持久化分类，适用于无数据库的单机部署
pub struct JsonFileCategoryRepository {
    store: JsonStore<Uuid, Category>,
}

impl JsonFileCategoryRepository {
    /// 打开存储，若文件不存在则创建空文件
    pub async fn open<P: Into<PathBuf>>(path: P) -> Result<Self, ServiceError> {
        Ok(Self { store: JsonStore::open(path).await? })
    }
}

#[async_trait]
impl CategoryRepository for JsonFileCategoryRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, ServiceError> {
        Ok(self.store.get(&id).await)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Category>, ServiceError> {
        Ok(self.store.find(|c| c.name == name).await)
    }

    async fn find_page(&self, query: &CategoryQuery) -> Result<Vec<Category>, ServiceError> {
        Ok(select_in_memory(self.store.values().await, query))
    }

    async fn count(&self, filter: Option<&CategoryFilter>) -> Result<u64, ServiceError> {
        let n = match filter {
            Some(f) => self.store.values().await.iter().filter(|c| matches_filter(c, f)).count(),
            None => self.store.len().await,
        };
        Ok(n as u64)
    }

    async fn create(&self, name: &str) -> Result<Category, ServiceError> {
        category::validate_name(name)?;
        let now = Utc::now().fixed_offset();
        let c = Category { id: Uuid::new_v4(), name: name.to_string(), create_time: now, update_time: now };
        self.store.insert(c.id, c.clone()).await?;
        Ok(c)
    }

    async fn update_name(&self, id: Uuid, name: &str) -> Result<Option<Category>, ServiceError> {
        category::validate_name(name)?;
        self.store
            .modify(&id, |c| {
                c.name = name.to_string();
                c.update_time = Utc::now().fixed_offset();
                c.clone()
            })
            .await
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool, ServiceError> {
        self.store.remove(&id).await
    }
}
