use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;
use crate::extractors::AuthUser;
use crate::models::{Comment, User, UserPublic};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub article_id: Uuid,
    pub author: UserPublic,
    pub parent_comment_id: Option<Uuid>,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl CommentResponse {
    pub fn new(comment: &Comment, author: &User) -> Self {
        Self {
            id: comment.id,
            article_id: comment.article_id,
            author: UserPublic::from(author),
            parent_comment_id: comment.parent_comment_id,
            content: comment.content.clone(),
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
    #[serde(default)]
    pub parent_comment_id: Option<Uuid>,
}

/// GET /api/articles/{article_id}/comments
///
/// 記事のトップレベルコメント一覧（返信は含まない）
pub async fn list_comments(
    State(state): State<AppState>,
    Path(article_id): Path<Uuid>,
) -> Result<Json<Vec<CommentResponse>>, AppError> {
    state
        .article_repo
        .find_by_id(article_id)
        .await?
        .ok_or(AppError::NotFound("記事"))?;

    let comments = state.comment_repo.list_top_level(article_id).await?;

    let mut responses = Vec::with_capacity(comments.len());
    for comment in &comments {
        let author = state
            .user_repo
            .find_by_id(comment.author_id)
            .await?
            .ok_or(AppError::NotFound("ユーザー"))?;
        responses.push(CommentResponse::new(comment, &author));
    }

    Ok(Json(responses))
}

/// POST /api/articles/{article_id}/comments
///
/// コメントを作成し、記事の著者（自分以外）と返信先コメントの著者に通知を保存する
pub async fn create_comment(
    State(state): State<AppState>,
    Path(article_id): Path<Uuid>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreateCommentRequest>,
) -> Result<Json<CommentResponse>, AppError> {
    if request.content.trim().is_empty() {
        return Err(AppError::Validation("コメント本文は必須です".to_string()));
    }

    let article = state
        .article_repo
        .find_by_id(article_id)
        .await?
        .ok_or(AppError::NotFound("記事"))?;

    // 返信先は同じ記事のコメントであること
    let parent = match request.parent_comment_id {
        Some(parent_id) => {
            let parent = state
                .comment_repo
                .find_by_id(parent_id)
                .await?
                .ok_or(AppError::NotFound("返信先コメント"))?;
            if parent.article_id != article_id {
                return Err(AppError::Validation(
                    "返信先コメントが別の記事に属しています".to_string(),
                ));
            }
            Some(parent)
        }
        None => None,
    };

    let comment = state
        .comment_repo
        .create(
            article_id,
            user.id,
            request.parent_comment_id,
            request.content.trim(),
        )
        .await?;

    if article.author_id != user.id {
        state
            .notification_repo
            .create(
                article.author_id,
                &format!(
                    "{}さんが記事「{}」にコメントしました",
                    user.username, article.title
                ),
                &format!("/articles/{}#comment-{}", article.id, comment.id),
            )
            .await?;
    }

    if let Some(parent) = parent
        && parent.author_id != user.id
    {
        state
            .notification_repo
            .create(
                parent.author_id,
                &format!("{}さんがあなたのコメントに返信しました", user.username),
                &format!("/articles/{}#comment-{}", article.id, comment.id),
            )
            .await?;
    }

    tracing::info!(article_id = %article_id, comment_id = %comment.id, "コメント作成");

    Ok(Json(CommentResponse::new(&comment, &user)))
}
