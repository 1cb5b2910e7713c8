use std::sync::Arc;

use service::category::{CategoryRepository, CategoryService};
use service::pagination::PaginationDefaults;

/// Shared handler state; cloned per request.
#[derive(Clone)]
pub struct ServerState {
    pub categories: Arc<CategoryService<dyn CategoryRepository>>,
}

impl ServerState {
    pub fn new(repo: Arc<dyn CategoryRepository>, defaults: PaginationDefaults) -> Self {
        Self { categories: Arc::new(CategoryService::new(repo, defaults)) }
    }
}
