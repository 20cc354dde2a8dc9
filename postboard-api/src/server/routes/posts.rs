use crate::server::{
    MessageResponse, Result, ServerError, ServerRouter,
    auth::{AdminUser, AuthenticatedUser},
    json::Json,
    query::Query,
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use postboard_common::model::{
    Id,
    post::{PageMeta, Pagination, Post, PostContent, PostMarker, PostPage, PostPatch},
};
use postboard_db::client::DbClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_posts)
        .typed_post(create_post)
        .typed_get(get_post)
        .typed_put(update_post)
        .typed_delete(delete_post)
        .typed_post(toggle_like)
}

#[derive(TypedPath)]
#[typed_path("/api/posts")]
struct PostsPath;

/// Raw values, parsed leniently by [`Pagination::from_query`].
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
struct ListPostsQuery {
    page: Option<String>,
    limit: Option<String>,
}

async fn list_posts(
    _: PostsPath,
    State(db): State<Arc<DbClient>>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<PostPage>> {
    let pagination = Pagination::from_query(query.page.as_deref(), query.limit.as_deref());
    let (posts, total) = db.fetch_posts(pagination).await?;

    Ok(Json(PostPage {
        posts,
        meta: PageMeta {
            page: pagination.page,
            limit: pagination.limit,
            total,
        },
    }))
}

async fn create_post(
    _: PostsPath,
    State(db): State<Arc<DbClient>>,
    AdminUser(admin): AdminUser,
    Json(post): Json<PostContent>,
) -> Result<(StatusCode, Json<Post>)> {
    post.validate()?;

    let post = db.create_post(&post, admin.user_id()).await?;

    info!(post.id = %post.id, author.id = %admin.user_id(), "Created post");

    Ok((StatusCode::CREATED, Json(post)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/posts/{id}", rejection(ServerError))]
struct PostPath {
    id: Id<PostMarker>,
}

async fn get_post(PostPath { id }: PostPath, State(db): State<Arc<DbClient>>) -> Result<Json<Post>> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(post))
}

async fn update_post(
    PostPath { id }: PostPath,
    State(db): State<Arc<DbClient>>,
    AdminUser(admin): AdminUser,
    Json(patch): Json<PostPatch>,
) -> Result<Json<Post>> {
    patch.validate()?;

    let post = db
        .update_post(id, &patch)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    info!(post.id = %id, editor.id = %admin.user_id(), "Updated post");

    Ok(Json(post))
}

async fn delete_post(
    PostPath { id }: PostPath,
    State(db): State<Arc<DbClient>>,
    AdminUser(admin): AdminUser,
) -> Result<Json<MessageResponse>> {
    if !db.delete_post(id).await? {
        return Err(ServerError::PostByIdNotFound(id));
    }

    info!(post.id = %id, admin.id = %admin.user_id(), "Deleted post");

    Ok(Json(MessageResponse {
        message: "Post deleted",
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/posts/{id}/like", rejection(ServerError))]
struct LikePath {
    id: Id<PostMarker>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
struct LikeResponse {
    message: &'static str,
    likes_count: u64,
}

async fn toggle_like(
    LikePath { id }: LikePath,
    State(db): State<Arc<DbClient>>,
    caller: AuthenticatedUser,
) -> Result<Json<LikeResponse>> {
    let toggle = db
        .toggle_like(id, caller.user_id())
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    let message = if toggle.liked {
        "Post liked"
    } else {
        "Post unliked"
    };

    Ok(Json(LikeResponse {
        message,
        likes_count: toggle.likes_count,
    }))
}
