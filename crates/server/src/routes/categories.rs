use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use common::types::{MessageBody, OPERATION_SUCCEEDED};
use serde::{Deserialize, Serialize};
use service::category::{Category, ListResult};
use service::pagination::ListParams;
use tracing::{debug, info};

use crate::{errors::JsonApiError, state::ServerState};

/// Request body of create and update; `name` may be absent.
#[derive(Debug, Default, Deserialize)]
pub struct CategoryInput {
    #[serde(default)]
    pub name: Option<String>,
}

pub const NAME_NOT_STRING: &str = "category name must be a string";

/// Unwrap a create/update body. A body whose shape does not fit (`{"name": 123}`)
/// is a field error on `name`; malformed JSON keeps axum's status.
fn category_input(body: Result<Json<CategoryInput>, JsonRejection>) -> Result<CategoryInput, JsonApiError> {
    match body {
        Ok(Json(input)) => Ok(input),
        Err(JsonRejection::JsonDataError(e)) => {
            debug!(error = %e.body_text(), "category body has wrong shape");
            Err(JsonApiError::field("name", NAME_NOT_STRING))
        }
        Err(rejection) => {
            let status = rejection.status();
            Err(JsonApiError::new(status, status.canonical_reason().unwrap_or("Bad Request"), Some(rejection.body_text())))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RemoveQuery {
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DataBody<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct UpdatedBody {
    pub message: &'static str,
    /// `null` when the id matched nothing
    pub category: Option<Category>,
}

#[utoipa::path(
    get, path = "/categories", tag = "category",
    params(crate::openapi::ListParamsDoc),
    responses(
        (status = 200, description = "List OK", body = crate::openapi::ListResponseDoc),
        (status = 400, description = "Unknown orderColumn or filterColumn"),
        (status = 500, description = "List Failed")
    )
)]
pub async fn list(
    State(state): State<ServerState>,
    Query(params): Query<ListParams>,
) -> Result<Json<DataBody<ListResult>>, JsonApiError> {
    let data = state.categories.list(&params).await?;
    info!(count = data.items.len(), paged = data.page.is_some(), "list categories");
    Ok(Json(DataBody { data }))
}

#[utoipa::path(
    get, path = "/categories/{id}", tag = "category",
    params(("id" = String, Path, description = "Category id (UUID)")),
    responses(
        (status = 200, description = "Found", body = crate::openapi::CategoryDataDoc),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<DataBody<Category>>, JsonApiError> {
    let data = state.categories.get(&id).await?;
    Ok(Json(DataBody { data }))
}

#[utoipa::path(
    post, path = "/categories", tag = "category",
    request_body = crate::openapi::CategoryInputDoc,
    responses(
        (status = 200, description = "Created", body = crate::openapi::MessageDoc),
        (status = 400, description = "Name missing, not a string or already taken"),
        (status = 500, description = "Create Failed")
    )
)]
pub async fn create(
    State(state): State<ServerState>,
    body: Result<Json<CategoryInput>, JsonRejection>,
) -> Result<Json<MessageBody>, JsonApiError> {
    let input = category_input(body)?;
    state.categories.add(input.name.as_deref()).await?;
    Ok(Json(MessageBody::new(OPERATION_SUCCEEDED)))
}

#[utoipa::path(
    put, path = "/categories/{id}", tag = "category",
    params(("id" = String, Path, description = "Category id (UUID)")),
    request_body = crate::openapi::CategoryInputDoc,
    responses(
        (status = 200, description = "Updated; category is null when the id does not exist", body = crate::openapi::UpdatedDoc),
        (status = 400, description = "Name missing, not a string or already taken"),
        (status = 500, description = "Update Failed")
    )
)]
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    body: Result<Json<CategoryInput>, JsonRejection>,
) -> Result<Json<UpdatedBody>, JsonApiError> {
    let input = category_input(body)?;
    let category = state.categories.update(&id, input.name.as_deref()).await?;
    Ok(Json(UpdatedBody { message: OPERATION_SUCCEEDED, category }))
}

#[utoipa::path(
    delete, path = "/categories/{id}", tag = "category",
    params(("id" = String, Path, description = "Category id (UUID)")),
    responses(
        (status = 200, description = "Deleted, or nothing to delete", body = crate::openapi::MessageDoc),
        (status = 400, description = "Malformed id"),
        (status = 500, description = "Delete Failed")
    )
)]
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<MessageBody>, JsonApiError> {
    state.categories.remove(Some(&id)).await?;
    Ok(Json(MessageBody::new(OPERATION_SUCCEEDED)))
}

// 未携带路径 id 的删除：允许 ?id= 查询参数，否则返回 400
#[utoipa::path(
    delete, path = "/categories", tag = "category",
    params(("id" = Option<String>, Query, description = "Category id (UUID)")),
    responses(
        (status = 200, description = "Deleted, or nothing to delete", body = crate::openapi::MessageDoc),
        (status = 400, description = "Id missing")
    )
)]
pub async fn delete_without_path(
    State(state): State<ServerState>,
    Query(q): Query<RemoveQuery>,
) -> Result<Json<MessageBody>, JsonApiError> {
    state.categories.remove(q.id.as_deref()).await?;
    Ok(Json(MessageBody::new(OPERATION_SUCCEEDED)))
}
