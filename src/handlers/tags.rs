use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::extractors::AuthUser;
use crate::models::Tag;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TagResponse {
    pub id: Uuid,
    pub name: String,
}

impl From<&Tag> for TagResponse {
    fn from(tag: &Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
}

/// GET /api/tags
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<TagResponse>>, AppError> {
    let tags = state.tag_repo.list().await?;
    Ok(Json(tags.iter().map(TagResponse::from).collect()))
}

/// POST /api/tags
pub async fn create_tag(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Json(request): Json<CreateTagRequest>,
) -> Result<Json<TagResponse>, AppError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("タグ名は必須です".to_string()));
    }

    let tag = state.tag_repo.create(name).await.map_err(|e| {
        if let sqlx::Error::Database(db_err) = &e
            && db_err.constraint() == Some("tags_name_key")
        {
            return AppError::Validation("このタグ名は既に存在します".to_string());
        }
        AppError::Database(e)
    })?;

    Ok(Json(TagResponse::from(&tag)))
}
