use utoipa::{IntoParams, OpenApi, ToSchema};

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

/// Query string of `GET /categories`; every value arrives as text.
#[derive(IntoParams)]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct ListParamsDoc {
    /// 1-based page; pagination is active only when this is a positive integer
    pub page: Option<String>,
    /// Page size, defaults to `pagination.page_size`
    pub page_size: Option<String>,
    /// `id`, `name`, `createTime` or `updateTime`
    pub order_column: Option<String>,
    /// `asc` or `desc`
    pub order_type: Option<String>,
    /// Comma-separated fields searched by `word`, defaults to `name`
    pub filter_column: Option<String>,
    /// Case-insensitive literal substring
    pub word: Option<String>,
}

#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct CategoryDoc {
    pub id: String,
    pub name: String,
    pub create_time: String,
    pub update_time: String,
}

#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct PageInfoDoc { pub page: u64, pub page_size: u64, pub total: u64 }

#[derive(ToSchema)]
pub struct ListDataDoc {
    pub page: Option<PageInfoDoc>,
    pub items: Vec<CategoryDoc>,
}

#[derive(ToSchema)]
pub struct ListResponseDoc { pub data: ListDataDoc }

#[derive(ToSchema)]
pub struct CategoryDataDoc { pub data: CategoryDoc }

#[derive(ToSchema)]
pub struct CategoryInputDoc { pub name: String }

#[derive(ToSchema)]
pub struct MessageDoc { pub message: String }

#[derive(ToSchema)]
pub struct UpdatedDoc { pub message: String, pub category: Option<CategoryDoc> }

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::categories::list,
        crate::routes::categories::get,
        crate::routes::categories::create,
        crate::routes::categories::update,
        crate::routes::categories::delete,
        crate::routes::categories::delete_without_path,
    ),
    components(
        schemas(
            HealthResponse,
            CategoryDoc,
            PageInfoDoc,
            ListDataDoc,
            ListResponseDoc,
            CategoryDataDoc,
            CategoryInputDoc,
            MessageDoc,
            UpdatedDoc,
        )
    ),
    tags(
        (name = "health"),
        (name = "category")
    )
)]
pub struct ApiDoc;
