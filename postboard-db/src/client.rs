use crate::record::{
    AuthenticationRecord, CommentRecord, CredentialsRecord, LikeRecord, PostRecord, UserRecord,
    assemble_posts,
};
use postboard_common::model::{
    Id, ModelValidationError, PostboardSnowflake, PostboardSnowflakeGenerator,
    auth::{AuthTokenHash, Authentication, Credentials},
    comment::{Comment, CommentContent, CommentMarker},
    count_from_db,
    post::{LikeToggle, Pagination, Post, PostContent, PostMarker, PostPatch},
    user::{CreateUser, User, UserMarker},
};
use postboard_common::snowflake::{ProcessId, WorkerId};
use postboard_common::util::PositiveDuration;
use sqlx::{
    PgPool, migrate::MigrateError, postgres::PgPoolOptions, query, query_as, query_scalar,
};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("Applying migrations failed: {0}")]
    Migrate(#[from] MigrateError),
}

const POST_COLUMNS: &str = "
    posts.post_snowflake,
    posts.title,
    posts.body,
    posts.created_at,
    posts.updated_at,
    users.user_snowflake AS author_snowflake,
    users.name AS author_name,
    users.email AS author_email
";

const COMMENT_COLUMNS: &str = "
    comments.comment_snowflake,
    comments.post_snowflake,
    comments.text,
    comments.created_at,
    comments.updated_at,
    users.user_snowflake AS author_snowflake,
    users.name AS author_name,
    users.email AS author_email
";

#[derive(Debug)]
pub struct DbClient {
    pool: PgPool,
    snowflake_generator: Mutex<PostboardSnowflakeGenerator>,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool, worker_id: WorkerId, process_id: ProcessId) -> Self {
        let snowflake_generator =
            Mutex::new(PostboardSnowflakeGenerator::new(worker_id, process_id));

        Self {
            pool,
            snowflake_generator,
        }
    }

    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        worker_id: WorkerId,
        process_id: ProcessId,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self::new(pool, worker_id, process_id))
    }

    /// Like [`DbClient::connect`], but connections are only opened once a query needs one.
    pub fn connect_lazy(
        database_url: &str,
        max_connections: u32,
        worker_id: WorkerId,
        process_id: ProcessId,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy(database_url)?;

        Ok(Self::new(pool, worker_id, process_id))
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    fn next_snowflake(&self) -> PostboardSnowflake {
        self.snowflake_generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate()
    }

    pub async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT
                users.user_snowflake,
                users.name,
                users.email,
                users.role,
                users.created_at
            FROM
                users.users
            WHERE
                users.user_snowflake = $1
            ",
        )
        .bind(user_id.to_db())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    pub async fn fetch_credentials(&self, email: &str) -> Result<Option<Credentials>> {
        let record = query_as::<_, CredentialsRecord>(
            "
            SELECT
                users.user_snowflake,
                users.name,
                users.email,
                users.role,
                users.created_at,
                users.password_hash
            FROM
                users.users
            WHERE
                users.email = $1
            ",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        let credentials = record.map(Credentials::try_from).transpose()?;
        Ok(credentials)
    }

    /// Stores a new user. Returns `None` when the email is already taken.
    pub async fn create_user(&self, user: &CreateUser) -> Result<Option<User>> {
        let user_snowflake = self.next_snowflake();

        let record = query_as::<_, UserRecord>(
            "
            INSERT INTO users.users (user_snowflake, name, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO NOTHING
            RETURNING user_snowflake, name, email, role, created_at
            ",
        )
        .bind(user_snowflake.get().cast_signed())
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.password_digest.get())
        .bind(user.role.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    pub async fn create_auth(
        &self,
        user_id: Id<UserMarker>,
        token_hash: &AuthTokenHash,
        expires_after: Option<PositiveDuration>,
    ) -> Result<()> {
        query(
            "
            INSERT INTO users.auth_tokens (token_hash, user_snowflake, expires_after_seconds)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(&token_hash.0[..])
        .bind(user_id.to_db())
        .bind(expires_after.map(|duration| duration.whole_seconds()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        let record = query_as::<_, AuthenticationRecord>(
            "
            SELECT
                auth_tokens.user_snowflake,
                users.role,
                auth_tokens.token_hash,
                auth_tokens.created_at,
                auth_tokens.expires_after_seconds
            FROM
                users.auth_tokens
                JOIN users.users ON users.user_snowflake = auth_tokens.user_snowflake
            WHERE
                auth_tokens.token_hash = $1
            ",
        )
        .bind(&token_hash.0[..])
        .fetch_optional(&self.pool)
        .await?;

        let authentication = record.map(Authentication::try_from).transpose()?;
        Ok(authentication)
    }

    /// Revokes a token. Returns whether it existed.
    pub async fn delete_auth(&self, token_hash: &AuthTokenHash) -> Result<bool> {
        let result = query("DELETE FROM users.auth_tokens WHERE token_hash = $1")
            .bind(&token_hash.0[..])
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn populate_posts(&self, records: Vec<PostRecord>) -> Result<Vec<Post>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let post_snowflakes: Vec<i64> = records.iter().map(|post| post.post_snowflake).collect();

        let likes = query_as::<_, LikeRecord>(
            "
            SELECT
                likes.post_snowflake,
                likes.user_snowflake
            FROM
                posts.likes
            WHERE
                likes.post_snowflake = ANY($1)
            ORDER BY
                likes.liked_at, likes.user_snowflake
            ",
        )
        .bind(&post_snowflakes)
        .fetch_all(&self.pool)
        .await?;

        let comments = query_as::<_, CommentRecord>(&format!(
            "
            SELECT {COMMENT_COLUMNS}
            FROM
                posts.comments
                JOIN users.users ON users.user_snowflake = comments.user_snowflake
            WHERE
                comments.post_snowflake = ANY($1)
            ORDER BY
                comments.created_at, comments.comment_snowflake
            "
        ))
        .bind(&post_snowflakes)
        .fetch_all(&self.pool)
        .await?;

        Ok(assemble_posts(records, likes, comments))
    }

    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(&format!(
            "
            SELECT {POST_COLUMNS}
            FROM
                posts.posts
                JOIN users.users ON users.user_snowflake = posts.user_snowflake
            WHERE
                posts.post_snowflake = $1
            "
        ))
        .bind(post_id.to_db())
        .fetch_optional(&self.pool)
        .await?;

        let Some(record) = record else {
            return Ok(None);
        };

        Ok(self.populate_posts(vec![record]).await?.pop())
    }

    /// One page of posts, newest first, and the total number of posts.
    pub async fn fetch_posts(&self, pagination: Pagination) -> Result<(Vec<Post>, u64)> {
        let records = query_as::<_, PostRecord>(&format!(
            "
            SELECT {POST_COLUMNS}
            FROM
                posts.posts
                JOIN users.users ON users.user_snowflake = posts.user_snowflake
            ORDER BY
                posts.created_at DESC, posts.post_snowflake DESC
            LIMIT $1
            OFFSET $2
            "
        ))
        .bind(i64::from(pagination.limit))
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = query_scalar("SELECT COUNT(*) FROM posts.posts")
            .fetch_one(&self.pool)
            .await?;

        let posts = self.populate_posts(records).await?;
        Ok((posts, count_from_db(total)?))
    }

    pub async fn post_exists(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let exists: bool = query_scalar(
            "SELECT EXISTS (SELECT 1 FROM posts.posts WHERE post_snowflake = $1)",
        )
        .bind(post_id.to_db())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    pub async fn create_post(&self, post: &PostContent, author: Id<UserMarker>) -> Result<Post> {
        let post_snowflake = self.next_snowflake();

        let record = query_as::<_, PostRecord>(&format!(
            "
            WITH posts AS (
                INSERT INTO posts.posts (post_snowflake, title, body, user_snowflake)
                VALUES ($1, $2, $3, $4)
                RETURNING *
            )
            SELECT {POST_COLUMNS}
            FROM
                posts
                JOIN users.users ON users.user_snowflake = posts.user_snowflake
            "
        ))
        .bind(post_snowflake.get().cast_signed())
        .bind(&post.title)
        .bind(&post.body)
        .bind(author.to_db())
        .fetch_one(&self.pool)
        .await?;

        Ok(record.into_post(Vec::new(), Vec::new()))
    }

    /// Applies the present fields of `patch`. Returns `None` if the post does not exist.
    pub async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        patch: &PostPatch,
    ) -> Result<Option<Post>> {
        let updated: Option<i64> = query_scalar(
            "
            UPDATE posts.posts
            SET
                title = COALESCE($2, title),
                body = COALESCE($3, body),
                updated_at = now()
            WHERE
                post_snowflake = $1
            RETURNING post_snowflake
            ",
        )
        .bind(post_id.to_db())
        .bind(patch.title.as_deref())
        .bind(patch.body.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        if updated.is_none() {
            return Ok(None);
        }

        self.fetch_post(post_id).await
    }

    /// Deletes a post with its likes and comments. Returns whether it existed.
    pub async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let result = query("DELETE FROM posts.posts WHERE post_snowflake = $1")
            .bind(post_id.to_db())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Likes the post for `user_id`, or removes the like if there already is one.
    /// Returns `None` if the post does not exist.
    pub async fn toggle_like(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<Option<LikeToggle>> {
        let mut transaction = self.pool.begin().await?;

        let locked: Option<i64> = query_scalar(
            "SELECT post_snowflake FROM posts.posts WHERE post_snowflake = $1 FOR UPDATE",
        )
        .bind(post_id.to_db())
        .fetch_optional(&mut *transaction)
        .await?;

        if locked.is_none() {
            return Ok(None);
        }

        let removed = query("DELETE FROM posts.likes WHERE post_snowflake = $1 AND user_snowflake = $2")
            .bind(post_id.to_db())
            .bind(user_id.to_db())
            .execute(&mut *transaction)
            .await?
            .rows_affected()
            > 0;

        if !removed {
            query("INSERT INTO posts.likes (post_snowflake, user_snowflake) VALUES ($1, $2)")
                .bind(post_id.to_db())
                .bind(user_id.to_db())
                .execute(&mut *transaction)
                .await?;
        }

        let likes_count: i64 =
            query_scalar("SELECT COUNT(*) FROM posts.likes WHERE post_snowflake = $1")
                .bind(post_id.to_db())
                .fetch_one(&mut *transaction)
                .await?;

        transaction.commit().await?;

        Ok(Some(LikeToggle {
            liked: !removed,
            likes_count: count_from_db(likes_count)?,
        }))
    }

    /// Returns `None` if the post does not exist.
    pub async fn create_comment(
        &self,
        post_id: Id<PostMarker>,
        author: Id<UserMarker>,
        comment: &CommentContent,
    ) -> Result<Option<Comment>> {
        let comment_snowflake = self.next_snowflake();

        let record = query_as::<_, CommentRecord>(&format!(
            "
            WITH comments AS (
                INSERT INTO posts.comments (comment_snowflake, post_snowflake, user_snowflake, text)
                SELECT $1, posts.post_snowflake, $3, $4
                FROM posts.posts
                WHERE posts.post_snowflake = $2
                RETURNING *
            )
            SELECT {COMMENT_COLUMNS}
            FROM
                comments
                JOIN users.users ON users.user_snowflake = comments.user_snowflake
            "
        ))
        .bind(comment_snowflake.get().cast_signed())
        .bind(post_id.to_db())
        .bind(author.to_db())
        .bind(&comment.text)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Comment::from))
    }

    pub async fn fetch_comment(
        &self,
        post_id: Id<PostMarker>,
        comment_id: Id<CommentMarker>,
    ) -> Result<Option<Comment>> {
        let record = query_as::<_, CommentRecord>(&format!(
            "
            SELECT {COMMENT_COLUMNS}
            FROM
                posts.comments
                JOIN users.users ON users.user_snowflake = comments.user_snowflake
            WHERE
                comments.post_snowflake = $1
                AND comments.comment_snowflake = $2
            "
        ))
        .bind(post_id.to_db())
        .bind(comment_id.to_db())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Comment::from))
    }

    pub async fn update_comment(
        &self,
        post_id: Id<PostMarker>,
        comment_id: Id<CommentMarker>,
        comment: &CommentContent,
    ) -> Result<Option<Comment>> {
        let record = query_as::<_, CommentRecord>(&format!(
            "
            WITH comments AS (
                UPDATE posts.comments
                SET
                    text = $3,
                    updated_at = now()
                WHERE
                    post_snowflake = $1
                    AND comment_snowflake = $2
                RETURNING *
            )
            SELECT {COMMENT_COLUMNS}
            FROM
                comments
                JOIN users.users ON users.user_snowflake = comments.user_snowflake
            "
        ))
        .bind(post_id.to_db())
        .bind(comment_id.to_db())
        .bind(&comment.text)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Comment::from))
    }

    pub async fn delete_comment(
        &self,
        post_id: Id<PostMarker>,
        comment_id: Id<CommentMarker>,
    ) -> Result<bool> {
        let result = query(
            "DELETE FROM posts.comments WHERE post_snowflake = $1 AND comment_snowflake = $2",
        )
        .bind(post_id.to_db())
        .bind(comment_id.to_db())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
