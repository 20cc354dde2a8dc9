use postboard_common::model::{
    Id, ModelValidationError,
    auth::{Authentication, Credentials, PasswordDigest},
    comment::Comment,
    post::Post,
    user::{User, UserMarker, UserSummary},
};
use sqlx::FromRow;
use std::collections::HashMap;
use time::{Duration, OffsetDateTime};

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct UserRecord {
    pub user_snowflake: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct CredentialsRecord {
    #[sqlx(flatten)]
    pub user: UserRecord,
    pub password_hash: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct AuthenticationRecord {
    pub user_snowflake: i64,
    pub role: String,
    pub token_hash: Vec<u8>,
    pub created_at: OffsetDateTime,
    pub expires_after_seconds: Option<i64>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PostRecord {
    pub post_snowflake: i64,
    pub title: String,
    pub body: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub author_snowflake: i64,
    pub author_name: String,
    pub author_email: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct LikeRecord {
    pub post_snowflake: i64,
    pub user_snowflake: i64,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct CommentRecord {
    pub comment_snowflake: i64,
    pub post_snowflake: i64,
    pub text: String,
    pub created_at: OffsetDateTime,
    pub updated_at: Option<OffsetDateTime>,
    pub author_snowflake: i64,
    pub author_name: String,
    pub author_email: String,
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_db(value.user_snowflake),
            name: value.name,
            email: value.email,
            role: value.role.parse()?,
            created_at: value.created_at,
        })
    }
}

impl TryFrom<CredentialsRecord> for Credentials {
    type Error = ModelValidationError;

    fn try_from(value: CredentialsRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: value.user.try_into()?,
            password_digest: PasswordDigest::from_stored(value.password_hash),
        })
    }
}

impl TryFrom<AuthenticationRecord> for Authentication {
    type Error = ModelValidationError;

    fn try_from(value: AuthenticationRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: Id::from_db(value.user_snowflake),
            role: value.role.parse()?,
            token_hash: value.token_hash.try_into()?,
            created_at: value.created_at,
            expires_after: value
                .expires_after_seconds
                .map(|seconds| Duration::seconds(seconds).try_into())
                .transpose()?,
        })
    }
}

impl From<CommentRecord> for Comment {
    fn from(value: CommentRecord) -> Self {
        Self {
            id: Id::from_db(value.comment_snowflake),
            author: UserSummary {
                id: Id::from_db(value.author_snowflake),
                name: value.author_name,
                email: value.author_email,
            },
            text: value.text,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

impl PostRecord {
    pub(crate) fn into_post(self, likes: Vec<Id<UserMarker>>, comments: Vec<Comment>) -> Post {
        Post {
            id: Id::from_db(self.post_snowflake),
            title: self.title,
            body: self.body,
            author: UserSummary {
                id: Id::from_db(self.author_snowflake),
                name: self.author_name,
                email: self.author_email,
            },
            likes,
            comments,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Joins posts with their likes and comments, keeping the order of `posts`.
/// Likes and comments are expected in display order already.
pub(crate) fn assemble_posts(
    posts: Vec<PostRecord>,
    likes: Vec<LikeRecord>,
    comments: Vec<CommentRecord>,
) -> Vec<Post> {
    let mut likes_by_post: HashMap<i64, Vec<_>> = HashMap::new();
    for like in likes {
        likes_by_post
            .entry(like.post_snowflake)
            .or_default()
            .push(Id::from_db(like.user_snowflake));
    }

    let mut comments_by_post: HashMap<i64, Vec<Comment>> = HashMap::new();
    for comment in comments {
        comments_by_post
            .entry(comment.post_snowflake)
            .or_default()
            .push(comment.into());
    }

    posts
        .into_iter()
        .map(|post| {
            let likes = likes_by_post
                .remove(&post.post_snowflake)
                .unwrap_or_default();
            let comments = comments_by_post
                .remove(&post.post_snowflake)
                .unwrap_or_default();
            post.into_post(likes, comments)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{
        AuthenticationRecord, CommentRecord, LikeRecord, PostRecord, UserRecord, assemble_posts,
    };
    use postboard_common::model::{
        Id, ModelValidationError,
        auth::Authentication,
        user::{Role, User},
    };
    use time::macros::datetime;

    fn post(snowflake: i64, title: &str) -> PostRecord {
        PostRecord {
            post_snowflake: snowflake,
            title: title.to_owned(),
            body: "body".to_owned(),
            created_at: datetime!(2025-05-01 10:00 UTC),
            updated_at: datetime!(2025-05-01 10:00 UTC),
            author_snowflake: 1,
            author_name: "Admin".to_owned(),
            author_email: "admin@example.com".to_owned(),
        }
    }

    fn comment(snowflake: i64, post_snowflake: i64) -> CommentRecord {
        CommentRecord {
            comment_snowflake: snowflake,
            post_snowflake,
            text: format!("comment {snowflake}"),
            created_at: datetime!(2025-05-02 10:00 UTC),
            updated_at: None,
            author_snowflake: 2,
            author_name: "Reader".to_owned(),
            author_email: "reader@example.com".to_owned(),
        }
    }

    #[test]
    fn user_record_with_unknown_role_is_rejected() {
        let record = UserRecord {
            user_snowflake: 5,
            name: "Ada".to_owned(),
            email: "ada@example.com".to_owned(),
            role: "superuser".to_owned(),
            created_at: datetime!(2025-05-01 10:00 UTC),
        };

        assert!(matches!(
            User::try_from(record.clone()),
            Err(ModelValidationError::Role(_))
        ));

        let user = User::try_from(UserRecord {
            role: "admin".to_owned(),
            ..record
        })
        .unwrap();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.id, Id::from(5));
    }

    #[test]
    fn authentication_record_conversion() {
        let record = AuthenticationRecord {
            user_snowflake: 9,
            role: "user".to_owned(),
            token_hash: vec![1; 32],
            created_at: datetime!(2025-05-01 10:00 UTC),
            expires_after_seconds: Some(60),
        };

        let authentication = Authentication::try_from(record.clone()).unwrap();
        assert_eq!(authentication.user, Id::from(9));
        assert_eq!(
            authentication.expires_after.map(|d| d.whole_seconds()),
            Some(60)
        );

        let zero_lifetime = AuthenticationRecord {
            expires_after_seconds: Some(0),
            ..record.clone()
        };
        assert!(matches!(
            Authentication::try_from(zero_lifetime),
            Err(ModelValidationError::NonPositiveDuration(_))
        ));

        let short_hash = AuthenticationRecord {
            token_hash: vec![1; 4],
            ..record
        };
        assert!(matches!(
            Authentication::try_from(short_hash),
            Err(ModelValidationError::TokenHash(_))
        ));
    }

    #[test]
    fn assemble_groups_likes_and_comments_per_post() {
        let posts = assemble_posts(
            vec![post(20, "newer"), post(10, "older")],
            vec![
                LikeRecord {
                    post_snowflake: 10,
                    user_snowflake: 3,
                },
                LikeRecord {
                    post_snowflake: 10,
                    user_snowflake: 4,
                },
            ],
            vec![comment(100, 20), comment(101, 10), comment(102, 20)],
        );

        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].title, "newer");
        assert!(posts[0].likes.is_empty());
        assert_eq!(
            posts[0]
                .comments
                .iter()
                .map(|comment| u64::from(comment.id))
                .collect::<Vec<_>>(),
            vec![100, 102]
        );

        assert_eq!(posts[1].likes, vec![Id::from(3), Id::from(4)]);
        assert_eq!(posts[1].comments.len(), 1);
        assert_eq!(posts[1].comments[0].author.name, "Reader");
    }
}
