use crate::{
    model::{
        Id,
        user::{Role, User, UserMarker},
    },
    util::PositiveDuration,
};
use argon2::{
    Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{self, SaltString},
};
use base64::{DecodeError, Engine, display::Base64Display, prelude::BASE64_STANDARD};
use serde::Serialize;
use std::{
    fmt::{Debug, Formatter},
    num::ParseIntError,
    str::FromStr,
};
use thiserror::Error;
use time::OffsetDateTime;

pub const AUTH_TOKEN_CORE_LEN: usize = 24;
pub const AUTH_TOKEN_SALT_LEN: usize = 18;
pub const AUTH_TOKEN_HASH_LEN: usize = Params::DEFAULT_OUTPUT_LEN;
pub const PASSWORD_SALT_LEN: usize = 16;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Hashing auth token failed: {0}")]
pub struct AuthTokenHashError(argon2::Error);

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Hashing or checking a password failed: {0}")]
pub struct PasswordHashError(password_hash::Error);

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum AuthTokenDecodeError {
    #[error("Not enough parts separated by ':'")]
    NotEnoughParts,
    #[error("Invalid user id: {0}")]
    InvalidUserId(ParseIntError),
    #[error("Decoding base64 failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("The length of the core part is incorrect")]
    InvalidCoreLength,
    #[error("The length of the salt part is incorrect")]
    InvalidSaltLength,
}

/// Bearer token handed out on login: `<user id>:<base64 core>:<base64 salt>`.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct AuthToken {
    pub user_id: Id<UserMarker>,
    pub core: [u8; AUTH_TOKEN_CORE_LEN],
    pub salt: [u8; AUTH_TOKEN_SALT_LEN],
}

#[derive(Clone, Eq, PartialEq, Hash)]
pub struct AuthTokenHash(pub Box<[u8; AUTH_TOKEN_HASH_LEN]>);

/// A stored token together with the role of its owner.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Authentication {
    pub user: Id<UserMarker>,
    pub role: Role,
    pub token_hash: AuthTokenHash,
    pub created_at: OffsetDateTime,
    pub expires_after: Option<PositiveDuration>,
}

impl Authentication {
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_after
            .is_some_and(|expires_after| self.created_at + expires_after.get() < now)
    }
}

impl AuthToken {
    #[must_use]
    pub fn generate_random(user_id: Id<UserMarker>) -> Self {
        let core = rand::random();
        let salt = rand::random();

        Self {
            user_id,
            core,
            salt,
        }
    }

    #[must_use]
    pub fn as_token_str(&self) -> String {
        let user_id = self.user_id;
        let encoded_core = Base64Display::new(&self.core, &BASE64_STANDARD);
        let encoded_salt = Base64Display::new(&self.salt, &BASE64_STANDARD);

        format!("{user_id}:{encoded_core}:{encoded_salt}")
    }

    pub fn hash(&self) -> Result<AuthTokenHash, AuthTokenHashError> {
        let argon2 = Argon2::default();

        let mut hash = Box::new([0; AUTH_TOKEN_HASH_LEN]);
        argon2
            .hash_password_into(&self.core, &self.salt, &mut *hash)
            .map_err(AuthTokenHashError)?;

        Ok(AuthTokenHash(hash))
    }
}

impl FromStr for AuthToken {
    type Err = AuthTokenDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');

        let user_id_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;
        let core_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;
        let salt_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;

        let user_id = u64::from_str(user_id_part)
            .map_err(Self::Err::InvalidUserId)?
            .into();
        let core = BASE64_STANDARD
            .decode(core_part)?
            .try_into()
            .map_err(|_| Self::Err::InvalidCoreLength)?;
        let salt = BASE64_STANDARD
            .decode(salt_part)?
            .try_into()
            .map_err(|_| Self::Err::InvalidSaltLength)?;

        Ok(Self {
            user_id,
            core,
            salt,
        })
    }
}

impl Debug for AuthToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("user_id", &self.user_id)
            .field("core", &"[redacted]")
            .field("salt", &"[redacted]")
            .finish()
    }
}

impl Debug for AuthTokenHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AuthTokenHash").field(&"[redacted]").finish()
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The auth token hash had an invalid length")]
pub struct InvalidAuthTokenHashError;

impl TryFrom<Vec<u8>> for AuthTokenHash {
    type Error = InvalidAuthTokenHashError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        let bytes: [u8; AUTH_TOKEN_HASH_LEN] =
            value.try_into().map_err(|_| InvalidAuthTokenHashError)?;
        Ok(Self(Box::new(bytes)))
    }
}

/// Argon2 PHC string of a user's password.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    pub fn hash(password: &str) -> Result<Self, PasswordHashError> {
        let salt_bytes: [u8; PASSWORD_SALT_LEN] = rand::random();
        let salt = SaltString::encode_b64(&salt_bytes).map_err(PasswordHashError)?;

        let digest = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(PasswordHashError)?;

        Ok(Self(digest.to_string()))
    }

    /// Wraps a digest loaded from storage.
    #[must_use]
    pub fn from_stored(digest: String) -> Self {
        Self(digest)
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    pub fn verify(&self, password: &str) -> Result<bool, PasswordHashError> {
        let parsed = PasswordHash::new(&self.0).map_err(PasswordHashError)?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(err) => Err(PasswordHashError(err)),
        }
    }
}

impl Debug for PasswordDigest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PasswordDigest").field(&"[redacted]").finish()
    }
}

/// A stored user together with what is needed to check their password.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Credentials {
    pub user: User,
    pub password_digest: PasswordDigest,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

#[cfg(test)]
mod tests {
    use super::{
        AUTH_TOKEN_CORE_LEN, AuthToken, AuthTokenDecodeError, AuthTokenHash, Authentication,
        PasswordDigest,
    };
    use crate::{
        model::{Id, user::Role},
        util::PositiveDuration,
    };
    use base64::{Engine, prelude::BASE64_STANDARD};
    use time::{Duration, macros::datetime};

    #[test]
    fn token_string_round_trip() {
        let token = AuthToken::generate_random(Id::from(42));
        let token_str = token.as_token_str();

        assert!(token_str.starts_with("42:"));
        assert_eq!(token_str.parse::<AuthToken>(), Ok(token));
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert_eq!(
            "42:abc".parse::<AuthToken>(),
            Err(AuthTokenDecodeError::NotEnoughParts)
        );
        assert!(matches!(
            "user:AAAA:AAAA".parse::<AuthToken>(),
            Err(AuthTokenDecodeError::InvalidUserId(_))
        ));
        assert!(matches!(
            "42:!!!:AAAA".parse::<AuthToken>(),
            Err(AuthTokenDecodeError::Decode(_))
        ));

        let short_core = BASE64_STANDARD.encode([0_u8; AUTH_TOKEN_CORE_LEN - 1]);
        let salt = BASE64_STANDARD.encode([0_u8; 18]);
        assert_eq!(
            format!("42:{short_core}:{salt}").parse::<AuthToken>(),
            Err(AuthTokenDecodeError::InvalidCoreLength)
        );
    }

    #[test]
    fn token_hash_is_deterministic() {
        let token = AuthToken::generate_random(Id::from(7));
        let other = AuthToken::generate_random(Id::from(7));

        assert_eq!(token.hash().unwrap(), token.hash().unwrap());
        assert_ne!(token.hash().unwrap(), other.hash().unwrap());
    }

    #[test]
    fn debug_output_is_redacted() {
        let token = AuthToken::generate_random(Id::from(7));
        let rendered = format!("{token:?}");
        assert!(rendered.contains("[redacted]"));
        assert!(!rendered.contains(&BASE64_STANDARD.encode(token.core)));

        let digest = PasswordDigest::hash("hunter22").unwrap();
        assert_eq!(format!("{digest:?}"), "PasswordDigest(\"[redacted]\")");
    }

    #[test]
    fn token_hash_length_is_checked() {
        assert!(AuthTokenHash::try_from(vec![0; 31]).is_err());
        assert!(AuthTokenHash::try_from(vec![0; 32]).is_ok());
    }

    #[test]
    fn password_digest_verifies() {
        let digest = PasswordDigest::hash("correct horse").unwrap();

        assert!(digest.get().starts_with("$argon2"));
        assert_eq!(digest.verify("correct horse"), Ok(true));
        assert_eq!(digest.verify("wrong horse"), Ok(false));

        let stored = PasswordDigest::from_stored(digest.get().to_owned());
        assert_eq!(stored.verify("correct horse"), Ok(true));
        assert!(PasswordDigest::from_stored("garbage".to_owned()).verify("x").is_err());
    }

    #[test]
    fn expiry() {
        let created_at = datetime!(2025-06-01 12:00 UTC);
        let authentication = Authentication {
            user: Id::from(1),
            role: Role::User,
            token_hash: AuthTokenHash::try_from(vec![0; 32]).unwrap(),
            created_at,
            expires_after: PositiveDuration::new(Duration::hours(1)),
        };

        assert!(!authentication.is_expired_at(created_at + Duration::minutes(59)));
        assert!(authentication.is_expired_at(created_at + Duration::minutes(61)));

        let forever = Authentication {
            expires_after: None,
            ..authentication
        };
        assert!(!forever.is_expired_at(created_at + Duration::days(10_000)));
    }
}
