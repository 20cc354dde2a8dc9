use crate::server::{
    MessageResponse, Result, ServerError, ServerRouter,
    auth::{AuthConfig, AuthenticatedUser},
    json::Json,
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use postboard_common::model::{
    auth::{AuthToken, LoginResponse, PasswordDigest},
    user::{CreateUser, LoginRequest, RegisterRequest, User},
};
use postboard_db::client::DbClient;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(register)
        .typed_post(login)
        .typed_get(me)
        .typed_post(logout)
}

#[derive(TypedPath)]
#[typed_path("/api/auth/register")]
struct RegisterPath;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct RegisterResponse {
    message: &'static str,
    user: User,
}

async fn register(
    _: RegisterPath,
    State(db): State<Arc<DbClient>>,
    State(auth_config): State<Arc<AuthConfig>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let request = request.normalized();
    request.validate()?;

    let role = auth_config.role_for(&request.email);
    let new_user = CreateUser {
        password_digest: PasswordDigest::hash(&request.password)?,
        name: request.name,
        email: request.email,
        role,
    };

    let user = db
        .create_user(&new_user)
        .await?
        .ok_or(ServerError::EmailTaken)?;

    info!(user.id = %user.id, user.role = %user.role, "Registered user");

    let response = RegisterResponse {
        message: "User registered",
        user,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

#[derive(TypedPath)]
#[typed_path("/api/auth/login")]
struct LoginPath;

async fn login(
    _: LoginPath,
    State(db): State<Arc<DbClient>>,
    State(auth_config): State<Arc<AuthConfig>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let request = request.normalized();
    request.validate()?;

    let credentials = db
        .fetch_credentials(&request.email)
        .await?
        .ok_or(ServerError::InvalidCredentials)?;

    if !credentials.password_digest.verify(&request.password)? {
        return Err(ServerError::InvalidCredentials);
    }

    let user = credentials.user;
    let token = AuthToken::generate_random(user.id);
    db.create_auth(user.id, &token.hash()?, auth_config.token_lifetime)
        .await?;

    info!(user.id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        token: token.as_token_str(),
        user,
    }))
}

#[derive(TypedPath)]
#[typed_path("/api/auth/me")]
struct MePath;

async fn me(
    _: MePath,
    State(db): State<Arc<DbClient>>,
    caller: AuthenticatedUser,
) -> Result<Json<User>> {
    let user = db
        .fetch_user(caller.user_id())
        .await?
        .ok_or(ServerError::InvalidToken)?;

    Ok(Json(user))
}

#[derive(TypedPath)]
#[typed_path("/api/auth/logout")]
struct LogoutPath;

async fn logout(
    _: LogoutPath,
    State(db): State<Arc<DbClient>>,
    caller: AuthenticatedUser,
) -> Result<Json<MessageResponse>> {
    db.delete_auth(caller.token_hash()).await?;

    info!(user.id = %caller.user_id(), "User logged out");

    Ok(Json(MessageResponse {
        message: "Logged out",
    }))
}
