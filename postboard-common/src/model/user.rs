use crate::model::{Id, auth::PasswordDigest};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;
use time::OffsetDateTime;
use validator::Validate;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The role is invalid: {0}")]
pub struct InvalidRoleError(String);

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    #[must_use]
    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = InvalidRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(InvalidRoleError(other.to_owned())),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", alias = "id")]
    pub id: Id<UserMarker>,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// What other records embed when they refer to a user.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct UserSummary {
    #[serde(rename = "_id", alias = "id")]
    pub id: Id<UserMarker>,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// A user as it is about to be stored.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password_digest: PasswordDigest,
    pub role: Role,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RegisterRequest {
    #[validate(length(min = 2, message = "Name must have at least 2 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 chars"))]
    pub password: String,
}

impl RegisterRequest {
    /// Trims the name and normalizes the email before validation.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_owned(),
            email: normalize_email(&self.email),
            password: self.password,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password required"))]
    pub password: String,
}

impl LoginRequest {
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            email: normalize_email(&self.email),
            password: self.password,
        }
    }
}

#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::{LoginRequest, RegisterRequest, Role};
    use validator::Validate;

    fn register(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: name.to_owned(),
            email: email.to_owned(),
            password: password.to_owned(),
        }
        .normalized()
    }

    #[test]
    fn role_parses_and_prints() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("user".parse::<Role>(), Ok(Role::User));
        assert!("root".parse::<Role>().is_err());
        assert_eq!(Role::Admin.to_string(), "admin");
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
    }

    #[test]
    fn register_validation() {
        assert!(register("Ada", "ada@example.com", "secret").validate().is_ok());

        let errors = register("A", "not-an-email", "12345").validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn register_name_is_trimmed_before_length_check() {
        assert!(register("  A  ", "ada@example.com", "secret").validate().is_err());
    }

    #[test]
    fn register_email_is_normalized() {
        let request = register("Ada", "  Ada@Example.COM ", "secret");
        assert_eq!(request.email, "ada@example.com");
    }

    #[test]
    fn missing_fields_fail_validation_instead_of_parsing() {
        let request: RegisterRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.validate().unwrap_err().field_errors().len(), 3);

        let login: LoginRequest =
            serde_json::from_str(r#"{"email": "ada@example.com"}"#).unwrap();
        let errors = login.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));
    }
}
