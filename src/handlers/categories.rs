use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::extractors::AuthUser;
use crate::models::Category;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

impl From<&Category> for CategoryResponse {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id,
            name: category.name.clone(),
            description: category.description.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// GET /api/categories
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryResponse>>, AppError> {
    let categories = state.category_repo.list().await?;
    Ok(Json(categories.iter().map(CategoryResponse::from).collect()))
}

/// POST /api/categories
pub async fn create_category(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<Json<CategoryResponse>, AppError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("カテゴリ名は必須です".to_string()));
    }

    let category = state
        .category_repo
        .create(name, request.description.as_deref())
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e
                && db_err.constraint() == Some("categories_name_key")
            {
                return AppError::Validation("このカテゴリ名は既に存在します".to_string());
            }
            AppError::Database(e)
        })?;

    Ok(Json(CategoryResponse::from(&category)))
}
