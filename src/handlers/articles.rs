use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;
use crate::extractors::AuthUser;
use crate::models::{Article, UserPublic};
use crate::state::AppState;

use super::categories::CategoryResponse;
use super::comments::CommentResponse;
use super::tags::TagResponse;

#[derive(Debug, Serialize)]
pub struct ArticleResponse {
    pub id: Uuid,
    pub author: UserPublic,
    pub title: String,
    pub content: String,
    pub is_published: bool,
    pub categories: Vec<CategoryResponse>,
    pub tags: Vec<TagResponse>,
    /// 詳細取得時のみ（一覧では省略）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<CommentResponse>>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct ArticleRequest {
    pub title: String,
    pub content: String,
    #[serde(default = "default_is_published")]
    pub is_published: bool,
    pub category_ids: Vec<Uuid>,
    #[serde(default)]
    pub tag_ids: Vec<Uuid>,
}

fn default_is_published() -> bool {
    true
}

/// GET /api/articles
///
/// 公開済み記事の一覧（コメントは含まない）
pub async fn list_articles(
    State(state): State<AppState>,
) -> Result<Json<Vec<ArticleResponse>>, AppError> {
    let articles = state.article_repo.list_published().await?;

    let mut responses = Vec::with_capacity(articles.len());
    for article in articles {
        responses.push(build_response(&state, article, false).await?);
    }

    Ok(Json(responses))
}

/// POST /api/articles
pub async fn create_article(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<ArticleRequest>,
) -> Result<Json<ArticleResponse>, AppError> {
    validate_article_request(&request)?;

    let article = state
        .article_repo
        .create(
            user.id,
            request.title.trim(),
            &request.content,
            request.is_published,
            &request.category_ids,
            &request.tag_ids,
        )
        .await
        .map_err(map_link_error)?;

    tracing::info!(article_id = %article.id, author_id = %user.id, "記事作成");

    Ok(Json(build_response(&state, article, false).await?))
}

/// GET /api/articles/{article_id}
///
/// 記事詳細（コメント込み）
pub async fn get_article(
    State(state): State<AppState>,
    Path(article_id): Path<Uuid>,
) -> Result<Json<ArticleResponse>, AppError> {
    let article = state
        .article_repo
        .find_by_id(article_id)
        .await?
        .ok_or(AppError::NotFound("記事"))?;

    Ok(Json(build_response(&state, article, true).await?))
}

/// PUT /api/articles/{article_id}
///
/// 記事を更新し、著者に更新通知を保存する
pub async fn update_article(
    State(state): State<AppState>,
    Path(article_id): Path<Uuid>,
    AuthUser(_user): AuthUser,
    Json(request): Json<ArticleRequest>,
) -> Result<Json<ArticleResponse>, AppError> {
    validate_article_request(&request)?;

    let article = state
        .article_repo
        .update(
            article_id,
            request.title.trim(),
            &request.content,
            request.is_published,
            &request.category_ids,
            &request.tag_ids,
        )
        .await
        .map_err(map_link_error)?
        .ok_or(AppError::NotFound("記事"))?;

    state
        .notification_repo
        .create(
            article.author_id,
            &format!("あなたの記事「{}」が更新されました", article.title),
            &format!("/articles/{}", article.id),
        )
        .await?;

    tracing::info!(article_id = %article.id, "記事更新");

    Ok(Json(build_response(&state, article, true).await?))
}

/// DELETE /api/articles/{article_id}
pub async fn delete_article(
    State(state): State<AppState>,
    Path(article_id): Path<Uuid>,
    AuthUser(_user): AuthUser,
) -> Result<StatusCode, AppError> {
    if !state.article_repo.delete(article_id).await? {
        return Err(AppError::NotFound("記事"));
    }

    tracing::info!(article_id = %article_id, "記事削除");

    Ok(StatusCode::NO_CONTENT)
}

/// 記事リクエストのバリデーション
fn validate_article_request(request: &ArticleRequest) -> Result<(), AppError> {
    if request.title.trim().is_empty() {
        return Err(AppError::Validation("タイトルは必須です".to_string()));
    }
    if request.title.len() > 200 {
        return Err(AppError::Validation(
            "タイトルは200文字以内で入力してください".to_string(),
        ));
    }
    if request.content.trim().is_empty() {
        return Err(AppError::Validation("本文は必須です".to_string()));
    }
    if request.category_ids.is_empty() {
        return Err(AppError::Validation(
            "カテゴリを1つ以上指定してください".to_string(),
        ));
    }
    Ok(())
}

/// カテゴリ/タグの外部キー違反をバリデーションエラーに変換
fn map_link_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e
        && db_err.is_foreign_key_violation()
    {
        return AppError::Validation(
            "存在しないカテゴリまたはタグが指定されています".to_string(),
        );
    }
    AppError::Database(e)
}

/// 記事レスポンスを組み立てる
///
/// with_comments = true のときのみコメント一覧（返信含む）を埋める
async fn build_response(
    state: &AppState,
    article: Article,
    with_comments: bool,
) -> Result<ArticleResponse, AppError> {
    let author = state
        .user_repo
        .find_by_id(article.author_id)
        .await?
        .ok_or(AppError::NotFound("ユーザー"))?;

    let categories = state.article_repo.categories_of(article.id).await?;
    let tags = state.article_repo.tags_of(article.id).await?;

    let comments = if with_comments {
        let comments = state.comment_repo.list_for_article(article.id).await?;
        let mut responses = Vec::with_capacity(comments.len());
        for comment in &comments {
            let comment_author = state
                .user_repo
                .find_by_id(comment.author_id)
                .await?
                .ok_or(AppError::NotFound("ユーザー"))?;
            responses.push(CommentResponse::new(comment, &comment_author));
        }
        Some(responses)
    } else {
        None
    };

    Ok(ArticleResponse {
        id: article.id,
        author: UserPublic::from(&author),
        title: article.title,
        content: article.content,
        is_published: article.is_published,
        categories: categories.iter().map(CategoryResponse::from).collect(),
        tags: tags.iter().map(TagResponse::from).collect(),
        comments,
        created_at: article.created_at,
        updated_at: article.updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> ArticleRequest {
        ArticleRequest {
            title: "はじめての記事".to_string(),
            content: "本文です".to_string(),
            is_published: true,
            category_ids: vec![Uuid::new_v4()],
            tag_ids: vec![],
        }
    }

    #[test]
    fn test_validate_empty_title() {
        let mut request = valid_request();
        request.title = "  ".to_string();
        assert!(validate_article_request(&request).is_err());
    }

    #[test]
    fn test_validate_empty_content() {
        let mut request = valid_request();
        request.content = "".to_string();
        assert!(validate_article_request(&request).is_err());
    }

    #[test]
    fn test_validate_missing_categories() {
        let mut request = valid_request();
        request.category_ids = vec![];
        assert!(validate_article_request(&request).is_err());
    }

    #[test]
    fn test_validate_valid_request() {
        assert!(validate_article_request(&valid_request()).is_ok());
    }
}
