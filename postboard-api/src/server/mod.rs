use crate::server::auth::AuthConfig;
use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{any, get},
};
use axum_extra::typed_header::TypedHeaderRejection;
use json::Json;
use postboard_common::model::{
    Id,
    auth::{AuthTokenDecodeError, AuthTokenHashError, PasswordHashError},
    comment::CommentMarker,
    post::PostMarker,
    validation::{FieldMessage, field_messages},
};
use postboard_db::client::{DbClient, DbError};
use serde::Serialize;
use std::{borrow::Cow, path::Path, sync::Arc};
use thiserror::Error;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::{debug, error};
use validator::ValidationErrors;

pub mod auth;
mod json;
mod query;
mod routes;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, Debug, FromRef)]
pub struct ServerState {
    pub db_client: Arc<DbClient>,
    pub auth_config: Arc<AuthConfig>,
}

/// The complete application. With a `static_dir`, unmatched non-API paths are
/// served from it, falling back to its `index.html`.
pub fn app(state: ServerState, static_dir: Option<&Path>) -> Router {
    let router = routes::routes()
        .route("/api", any(fallback))
        .route("/api/{*path}", any(fallback));

    let router = match static_dir {
        Some(static_dir) => router.fallback_service(
            ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html"))),
        ),
        None => router.route("/", get(root)).fallback(fallback),
    };

    router
        .method_not_allowed_fallback(fallback)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root() -> &'static str {
    "Posts Backend is running"
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("Query string rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Request body failed validation: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("Authorization header was missing or invalid: {0}")]
    InvalidAuthorizationHeader(TypedHeaderRejection),
    #[error("The provided auth token could not be decoded: {0}")]
    InvalidAuthToken(#[from] AuthTokenDecodeError),
    #[error("The auth token could not be hashed: {0}")]
    AuthTokenHash(#[from] AuthTokenHashError),
    #[error(transparent)]
    PasswordHash(#[from] PasswordHashError),
    #[error("Provided token was invalid")]
    InvalidToken,
    #[error("Admin access was required")]
    AdminRequired,
    #[error("Email or password did not match")]
    InvalidCredentials,
    #[error("Email is already registered")]
    EmailTaken,
    #[error("Comment was rejected by the sentiment gate")]
    NegativeComment { suggestion: String },
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("Comment with id {0} was not found.")]
    CommentByIdNotFound(Id<CommentMarker>),
    #[error("Comment with id {0} is not owned by the editor")]
    NotCommentAuthor(Id<CommentMarker>),
    #[error("Comment with id {0} may not be deleted by this user")]
    CommentDeleteForbidden(Id<CommentMarker>),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::CommentByIdNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::InvalidAuthorizationHeader(rejection) if rejection.is_missing() => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::InvalidAuthToken(_)
            | ServerError::InvalidToken
            | ServerError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ServerError::AdminRequired
            | ServerError::NotCommentAuthor(_)
            | ServerError::CommentDeleteForbidden(_) => StatusCode::FORBIDDEN,
            ServerError::JsonRejection(_)
            | ServerError::QueryRejection(_)
            | ServerError::Validation(_)
            | ServerError::InvalidAuthorizationHeader(_)
            | ServerError::EmailTaken
            | ServerError::NegativeComment { .. } => StatusCode::BAD_REQUEST,
            ServerError::JsonResponse(_)
            | ServerError::Database(_)
            | ServerError::AuthTokenHash(_)
            | ServerError::PasswordHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message shown to clients. Internal failures stay opaque.
    fn public_message(&self) -> Cow<'static, str> {
        match self {
            ServerError::UnknownRoute(_) | ServerError::PathRejection(_) => {
                "Route not found".into()
            }
            ServerError::JsonRejection(rejection) => rejection.body_text().into(),
            ServerError::QueryRejection(rejection) => rejection.body_text().into(),
            ServerError::Validation(_) => "Validation failed".into(),
            ServerError::InvalidAuthorizationHeader(rejection) if rejection.is_missing() => {
                "No token, authorization denied".into()
            }
            ServerError::InvalidAuthorizationHeader(_) => "Invalid authorization header".into(),
            ServerError::InvalidAuthToken(_) | ServerError::InvalidToken => {
                "Token is not valid".into()
            }
            ServerError::AdminRequired => "Admin access required".into(),
            ServerError::InvalidCredentials => "Invalid email or password".into(),
            ServerError::EmailTaken => "Email is already registered".into(),
            ServerError::NegativeComment { .. } => {
                "Your comment seems negative or inappropriate.".into()
            }
            ServerError::PostByIdNotFound(_) => "Post not found".into(),
            ServerError::CommentByIdNotFound(_) => "Comment not found".into(),
            ServerError::NotCommentAuthor(_) => {
                "Only the comment author can edit this comment".into()
            }
            ServerError::CommentDeleteForbidden(_) => {
                "Not authorized to delete this comment".into()
            }
            ServerError::JsonResponse(_)
            | ServerError::Database(_)
            | ServerError::AuthTokenHash(_)
            | ServerError::PasswordHash(_) => "Server error".into(),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct ErrorResponse {
    status: u16,
    error: Cow<'static, str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<FieldMessage>>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct WarningResponse {
    warning: bool,
    message: Cow<'static, str>,
    suggestion: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!(error = %self, %status, "Replying with error");
        } else {
            debug!(error = %self, %status, "Replying with error");
        }

        let message = self.public_message();
        match self {
            ServerError::NegativeComment { suggestion } => {
                let warning_response = WarningResponse {
                    warning: true,
                    message,
                    suggestion,
                };
                (status, Json(warning_response)).into_response()
            }
            other => {
                let error_response = ErrorResponse {
                    status: status.as_u16(),
                    error: message,
                    errors: match &other {
                        ServerError::Validation(errors) => Some(field_messages(errors)),
                        _ => None,
                    },
                };
                (status, Json(error_response)).into_response()
            }
        }
    }
}

/// `{message}` acknowledgement body.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
