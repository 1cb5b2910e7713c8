//! Category persistence and business rules.

pub mod file_repository;
pub mod repository;
pub mod service;

pub use file_repository::JsonFileCategoryRepository;
pub use repository::{Category, CategoryRepository, SeaOrmCategoryRepository};
pub use service::{CategoryService, ListResult, PageInfo};
