use crate::server::{
    MessageResponse, Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json,
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use postboard_common::{
    model::{
        Id,
        comment::{Comment, CommentContent, CommentMarker},
        post::PostMarker,
    },
    sentiment::analyze_and_rephrase,
};
use postboard_db::client::DbClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(add_comment)
        .typed_put(edit_comment)
        .typed_delete(delete_comment)
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct CommentResponse {
    message: &'static str,
    comment: Comment,
}

/// Rejects text the sentiment gate labels negative, handing back its softened version.
fn pass_sentiment_gate(author: &AuthenticatedUser, text: &str) -> Result<()> {
    let assessment = analyze_and_rephrase(text);

    if assessment.is_negative() {
        info!(author.id = %author.user_id(), "Comment held back by the sentiment gate");
        return Err(ServerError::NegativeComment {
            suggestion: assessment.rephrased,
        });
    }

    Ok(())
}

async fn ensure_post_exists(db: &DbClient, id: Id<PostMarker>) -> Result<()> {
    if db.post_exists(id).await? {
        Ok(())
    } else {
        Err(ServerError::PostByIdNotFound(id))
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/posts/{id}/comments", rejection(ServerError))]
struct CommentsPath {
    id: Id<PostMarker>,
}

async fn add_comment(
    CommentsPath { id }: CommentsPath,
    State(db): State<Arc<DbClient>>,
    caller: AuthenticatedUser,
    Json(content): Json<CommentContent>,
) -> Result<(StatusCode, Json<CommentResponse>)> {
    content.validate()?;
    ensure_post_exists(&db, id).await?;
    pass_sentiment_gate(&caller, &content.text)?;

    // The post can still vanish between the check and the insert.
    let comment = db
        .create_comment(id, caller.user_id(), &content)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    let response = CommentResponse {
        message: "Comment added successfully",
        comment,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/posts/{id}/comments/{comment_id}", rejection(ServerError))]
struct CommentPath {
    id: Id<PostMarker>,
    comment_id: Id<CommentMarker>,
}

async fn edit_comment(
    CommentPath { id, comment_id }: CommentPath,
    State(db): State<Arc<DbClient>>,
    caller: AuthenticatedUser,
    Json(content): Json<CommentContent>,
) -> Result<Json<CommentResponse>> {
    content.validate()?;
    ensure_post_exists(&db, id).await?;

    let comment = db
        .fetch_comment(id, comment_id)
        .await?
        .ok_or(ServerError::CommentByIdNotFound(comment_id))?;

    if comment.author.id != caller.user_id() {
        return Err(ServerError::NotCommentAuthor(comment_id));
    }

    pass_sentiment_gate(&caller, &content.text)?;

    let comment = db
        .update_comment(id, comment_id, &content)
        .await?
        .ok_or(ServerError::CommentByIdNotFound(comment_id))?;

    Ok(Json(CommentResponse {
        message: "Comment updated",
        comment,
    }))
}

async fn delete_comment(
    CommentPath { id, comment_id }: CommentPath,
    State(db): State<Arc<DbClient>>,
    caller: AuthenticatedUser,
) -> Result<Json<MessageResponse>> {
    ensure_post_exists(&db, id).await?;

    let comment = db
        .fetch_comment(id, comment_id)
        .await?
        .ok_or(ServerError::CommentByIdNotFound(comment_id))?;

    if comment.author.id != caller.user_id() && !caller.role().is_admin() {
        return Err(ServerError::CommentDeleteForbidden(comment_id));
    }

    if !db.delete_comment(id, comment_id).await? {
        return Err(ServerError::CommentByIdNotFound(comment_id));
    }

    info!(comment.id = %comment_id, user.id = %caller.user_id(), "Deleted comment");

    Ok(Json(MessageResponse {
        message: "Comment deleted",
    }))
}
