use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use postboard_common::{
    model::{
        Id,
        auth::{AuthToken, AuthTokenHash, Authentication},
        user::{Role, UserMarker, normalize_email},
    },
    util::PositiveDuration,
};
use postboard_db::client::DbClient;
use std::{collections::HashSet, sync::Arc};
use time::OffsetDateTime;

type AuthorizationHeader = TypedHeader<Authorization<Bearer>>;

/// Token issuing settings shared by all requests.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct AuthConfig {
    pub token_lifetime: Option<PositiveDuration>,
    admin_emails: HashSet<String>,
}

impl AuthConfig {
    pub fn new<I, S>(token_lifetime: Option<PositiveDuration>, admin_emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let admin_emails = admin_emails
            .into_iter()
            .map(|email| normalize_email(email.as_ref()))
            .filter(|email| !email.is_empty())
            .collect();

        Self {
            token_lifetime,
            admin_emails,
        }
    }

    /// The role a newly registered account with this (normalized) email gets.
    #[must_use]
    pub fn role_for(&self, email: &str) -> Role {
        if self.admin_emails.contains(email) {
            Role::Admin
        } else {
            Role::User
        }
    }
}

/// The caller, identified by a valid bearer token.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct AuthenticatedUser {
    authentication: Authentication,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn user_id(&self) -> Id<UserMarker> {
        self.authentication.user
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.authentication.role
    }

    #[must_use]
    pub fn token_hash(&self) -> &AuthTokenHash {
        &self.authentication.token_hash
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<DbClient>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let request_token: AuthToken = AuthorizationHeader::from_request_parts(parts, state)
            .await
            .map_err(ServerError::InvalidAuthorizationHeader)?
            .token()
            .parse()?;

        let token_hash = request_token.hash()?;

        let authentication = Arc::<DbClient>::from_ref(state)
            .fetch_auth(&token_hash)
            .await?
            .ok_or(ServerError::InvalidToken)?;

        if authentication.user != request_token.user_id
            || authentication.is_expired_at(OffsetDateTime::now_utc())
        {
            return Err(ServerError::InvalidToken);
        }

        Ok(Self { authentication })
    }
}

/// An [`AuthenticatedUser`] whose stored role is admin.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct AdminUser(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for AdminUser
where
    Arc<DbClient>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;

        if !user.role().is_admin() {
            return Err(ServerError::AdminRequired);
        }

        Ok(Self(user))
    }
}

#[cfg(test)]
mod tests {
    use super::AuthConfig;
    use postboard_common::model::user::Role;

    #[test]
    fn admin_emails_are_normalized() {
        let config = AuthConfig::new(None, [" Admin@Example.com ", "", "boss@example.com"]);

        assert_eq!(config.role_for("admin@example.com"), Role::Admin);
        assert_eq!(config.role_for("boss@example.com"), Role::Admin);
        assert_eq!(config.role_for("reader@example.com"), Role::User);
        assert_eq!(config.role_for(""), Role::User);
    }
}
