//! services/web/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete
//! implementation of the persistence ports from the `core` crate. It handles
//! all interactions with the PostgreSQL database using `sqlx`.
//!
//! Queries use the runtime `query_as`/`query` forms so the crate builds
//! without a live database.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use artblog_core::domain::{Flash, FlashKind, Post, Session, User, UserCredentials};
use artblog_core::ports::{PortError, PortResult, PostStore, SessionStore, UserStore};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `UserStore`, `PostStore` and
/// `SessionStore` ports on one shared connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    session_ttl: Duration,
}

impl PgStore {
    /// Creates a new `PgStore`.
    pub fn new(pool: PgPool, session_ttl_days: i64) -> Self {
        Self {
            pool,
            session_ttl: Duration::days(session_ttl_days),
        }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Maps a `sqlx` failure onto the port taxonomy. Pool exhaustion and socket
/// errors are `Unavailable` so one slow request answers 500 instead of
/// taking the process down.
fn map_sqlx(context: &str, e: sqlx::Error) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(context.to_string()),
        sqlx::Error::PoolTimedOut => {
            PortError::Unavailable("database connection pool timed out".to_string())
        }
        sqlx::Error::Io(io) => PortError::Unavailable(io.to_string()),
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            PortError::Duplicate(context.to_string())
        }
        other => PortError::Unexpected(other.to_string()),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
    email: String,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            username: self.username,
            email: self.email,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    username: String,
    password_hash: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            id: self.id,
            username: self.username,
            password_hash: self.password_hash,
        }
    }
}

#[derive(FromRow)]
struct PostRecord {
    id: Uuid,
    author: String,
    image: String,
    title: String,
    content: String,
    created_at: DateTime<Utc>,
    edited_at: Option<DateTime<Utc>>,
}
impl PostRecord {
    fn to_domain(self) -> Post {
        Post {
            id: self.id,
            author: self.author,
            image: self.image,
            title: self.title,
            content: self.content,
            created_at: self.created_at,
            edited_at: self.edited_at,
        }
    }
}

#[derive(FromRow)]
struct SessionRecord {
    token: Uuid,
    user_id: Option<Uuid>,
    flash_kind: Option<String>,
    flash_message: Option<String>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}
impl SessionRecord {
    fn to_domain(self) -> Session {
        Session {
            token: self.token,
            user_id: self.user_id,
            flash: flash_from_columns(self.flash_kind, self.flash_message),
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

fn flash_from_columns(kind: Option<String>, message: Option<String>) -> Option<Flash> {
    let message = message?;
    let kind = match kind.as_deref() {
        Some("success") => FlashKind::Success,
        _ => FlashKind::Error,
    };
    Some(Flash { kind, message })
}

fn flash_kind_column(kind: FlashKind) -> &'static str {
    match kind {
        FlashKind::Success => "success",
        FlashKind::Error => "error",
    }
}

//=========================================================================================
// `UserStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> PortResult<User> {
        // The unique indexes on username and email make this an atomic
        // check-and-insert: of two concurrent signups, exactly one wins.
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (id, username, email, password_hash) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, username, email, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx(&format!("user {}", username), e))?;
        Ok(record.to_domain())
    }

    async fn find_by_username(&self, username: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, username, password_hash FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx(&format!("user {}", username), e))?;
        Ok(record.to_domain())
    }

    async fn find_by_id(&self, id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, email, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx(&format!("user {}", id), e))?;
        Ok(record.to_domain())
    }
}

//=========================================================================================
// `PostStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl PostStore for PgStore {
    async fn insert(
        &self,
        author: &str,
        image: &str,
        title: &str,
        content: &str,
    ) -> PortResult<Post> {
        let record = sqlx::query_as::<_, PostRecord>(
            "INSERT INTO posts (id, author, image, title, content) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, author, image, title, content, created_at, edited_at",
        )
        .bind(Uuid::new_v4())
        .bind(author)
        .bind(image)
        .bind(title)
        .bind(content)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx("post", e))?;
        Ok(record.to_domain())
    }

    async fn find(&self, id: Uuid) -> PortResult<Post> {
        let record = sqlx::query_as::<_, PostRecord>(
            "SELECT id, author, image, title, content, created_at, edited_at \
             FROM posts WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx(&format!("post {}", id), e))?;
        Ok(record.to_domain())
    }

    async fn list_newest_first(&self) -> PortResult<Vec<Post>> {
        let records = sqlx::query_as::<_, PostRecord>(
            "SELECT id, author, image, title, content, created_at, edited_at \
             FROM posts ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx("posts", e))?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn update(
        &self,
        id: Uuid,
        image: &str,
        title: &str,
        content: &str,
        edited_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE posts SET image = $1, title = $2, content = $3, edited_at = $4 \
             WHERE id = $5",
        )
        .bind(image)
        .bind(title)
        .bind(content)
        .bind(edited_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx(&format!("post {}", id), e))?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("post {}", id)));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx(&format!("post {}", id), e))?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("post {}", id)));
        }
        Ok(())
    }
}

//=========================================================================================
// `SessionStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SessionStore for PgStore {
    async fn create(&self) -> PortResult<Session> {
        let record = sqlx::query_as::<_, SessionRecord>(
            "INSERT INTO sessions (token, expires_at) VALUES ($1, $2) \
             RETURNING token, user_id, flash_kind, flash_message, created_at, expires_at",
        )
        .bind(Uuid::new_v4())
        .bind(Utc::now() + self.session_ttl)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx("session", e))?;
        Ok(record.to_domain())
    }

    async fn find(&self, token: Uuid) -> PortResult<Session> {
        let record = sqlx::query_as::<_, SessionRecord>(
            "SELECT token, user_id, flash_kind, flash_message, created_at, expires_at \
             FROM sessions WHERE token = $1 AND expires_at > now()",
        )
        .bind(token)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx(&format!("session {}", token), e))?;
        Ok(record.to_domain())
    }

    async fn set_user(&self, token: Uuid, user_id: Option<Uuid>) -> PortResult<()> {
        let result = sqlx::query("UPDATE sessions SET user_id = $1 WHERE token = $2")
            .bind(user_id)
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx(&format!("session {}", token), e))?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("session {}", token)));
        }
        Ok(())
    }

    async fn set_flash(&self, token: Uuid, flash: Flash) -> PortResult<()> {
        let result =
            sqlx::query("UPDATE sessions SET flash_kind = $1, flash_message = $2 WHERE token = $3")
                .bind(flash_kind_column(flash.kind))
                .bind(&flash.message)
                .bind(token)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx(&format!("session {}", token), e))?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("session {}", token)));
        }
        Ok(())
    }

    async fn take_flash(&self, token: Uuid) -> PortResult<Option<Flash>> {
        // Clears and returns the previous value in one statement, so the
        // message renders exactly once even across concurrent requests.
        let row = sqlx::query_as::<_, (Option<String>, Option<String>)>(
            "UPDATE sessions s SET flash_kind = NULL, flash_message = NULL \
             FROM (SELECT token, flash_kind, flash_message FROM sessions \
                   WHERE token = $1 FOR UPDATE) old \
             WHERE s.token = old.token \
             RETURNING old.flash_kind, old.flash_message",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx(&format!("session {}", token), e))?;

        Ok(row.and_then(|(kind, message)| flash_from_columns(kind, message)))
    }

    async fn delete(&self, token: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx(&format!("session {}", token), e))?;
        Ok(())
    }
}
