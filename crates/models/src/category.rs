use std::{cmp::Ordering, fmt, str::FromStr};

use chrono::Utc;
use sea_orm::{entity::prelude::*, ActiveModelTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{self, ModelError};

pub const NAME_REQUIRED: &str = "category name is required";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "category")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub create_time: DateTimeWithTimeZone,
    pub update_time: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// A category attribute addressable from list parameters (`orderColumn`, `filterColumn`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CategoryField {
    Id,
    Name,
    CreateTime,
    UpdateTime,
}

impl CategoryField {
    pub const ALL: [CategoryField; 4] =
        [CategoryField::Id, CategoryField::Name, CategoryField::CreateTime, CategoryField::UpdateTime];

    pub fn column(self) -> Column {
        match self {
            CategoryField::Id => Column::Id,
            CategoryField::Name => Column::Name,
            CategoryField::CreateTime => Column::CreateTime,
            CategoryField::UpdateTime => Column::UpdateTime,
        }
    }

    /// Name used in JSON bodies and query strings.
    pub fn wire_name(self) -> &'static str {
        match self {
            CategoryField::Id => "id",
            CategoryField::Name => "name",
            CategoryField::CreateTime => "createTime",
            CategoryField::UpdateTime => "updateTime",
        }
    }
}

impl fmt::Display for CategoryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for CategoryField {
    type Err = ModelError;

    /// Accepts wire names, snake_case column names and the legacy `_id`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "id" | "_id" => Ok(CategoryField::Id),
            "name" => Ok(CategoryField::Name),
            "createTime" | "create_time" => Ok(CategoryField::CreateTime),
            "updateTime" | "update_time" => Ok(CategoryField::UpdateTime),
            other => Err(ModelError::UnknownField(other.to_string())),
        }
    }
}

impl Model {
    /// Text form of a field, as used for substring matching.
    pub fn field_text(&self, field: CategoryField) -> String {
        match field {
            CategoryField::Id => self.id.to_string(),
            CategoryField::Name => self.name.clone(),
            CategoryField::CreateTime => self.create_time.to_rfc3339(),
            CategoryField::UpdateTime => self.update_time.to_rfc3339(),
        }
    }

    /// Ascending comparison on a single field.
    pub fn cmp_field(&self, other: &Self, field: CategoryField) -> Ordering {
        match field {
            CategoryField::Id => self.id.cmp(&other.id),
            CategoryField::Name => self.name.cmp(&other.name),
            CategoryField::CreateTime => self.create_time.cmp(&other.create_time),
            CategoryField::UpdateTime => self.update_time.cmp(&other.update_time),
        }
    }
}

/// Empty or whitespace-only names are rejected.
pub fn validate_name(name: &str) -> Result<(), errors::ModelError> {
    if name.trim().is_empty() {
        return Err(ModelError::validation("name", NAME_REQUIRED));
    }
    Ok(())
}

pub async fn create(db: &DatabaseConnection, name: &str) -> Result<Model, errors::ModelError> {
    validate_name(name)?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        create_time: Set(now),
        update_time: Set(now),
    };
    am.insert(db).await.map_err(|e| ModelError::Db(e.to_string()))
}

pub async fn find_by_id(db: &DatabaseConnection, id: Uuid) -> Result<Option<Model>, errors::ModelError> {
    Entity::find_by_id(id).one(db).await.map_err(|e| ModelError::Db(e.to_string()))
}

/// Case-sensitive exact match on `name`.
pub async fn find_by_name(db: &DatabaseConnection, name: &str) -> Result<Option<Model>, errors::ModelError> {
    Entity::find()
        .filter(Column::Name.eq(name))
        .one(db)
        .await
        .map_err(|e| ModelError::Db(e.to_string()))
}

/// Rename and bump `update_time`; `None` when no row has this id.
pub async fn update_name(db: &DatabaseConnection, id: Uuid, name: &str) -> Result<Option<Model>, errors::ModelError> {
    validate_name(name)?;
    let Some(existing) = find_by_id(db, id).await? else { return Ok(None) };
    let mut am: ActiveModel = existing.into();
    am.name = Set(name.to_string());
    am.update_time = Set(Utc::now().into());
    let updated = am.update(db).await.map_err(|e| ModelError::Db(e.to_string()))?;
    Ok(Some(updated))
}

/// Returns whether a row was removed.
pub async fn delete_by_id(db: &DatabaseConnection, id: Uuid) -> Result<bool, errors::ModelError> {
    let res = Entity::delete_by_id(id).exec(db).await.map_err(|e| ModelError::Db(e.to_string()))?;
    Ok(res.rows_affected > 0)
}
