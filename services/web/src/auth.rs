//! services/web/src/auth.rs
//!
//! The authentication service: signup, login, logout and per-request
//! resolution of the current identity. It owns no state of its own; it
//! composes the user store, the session store and the credential store
//! behind their ports.

use std::sync::Arc;

use artblog_core::domain::User;
use artblog_core::ports::{CredentialStore, CryptoError, PortError, SessionStore, UserStore};
use uuid::Uuid;

/// Why an authentication attempt was turned away. `Crypto` and `Store` are
/// infrastructure failures (request-fatal, 500); everything else is a
/// user-facing outcome that redirects with a flash message.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Invalid(&'static str),

    #[error("User with this username or email already exists")]
    AlreadyExists,

    #[error("User not found")]
    UserNotFound,

    #[error("Incorrect password")]
    BadPassword,

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Store(#[from] PortError),
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    credentials: Arc<dyn CredentialStore>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            users,
            sessions,
            credentials,
        }
    }

    /// Registers a new user and binds the session to it (auto-login).
    ///
    /// The store's uniqueness constraint decides between two concurrent
    /// signups for the same name; a lost race surfaces as `AlreadyExists`
    /// just like an ordinary duplicate.
    pub async fn signup(
        &self,
        token: Uuid,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let username = username.trim();
        let email = email.trim();
        if username.is_empty() {
            return Err(AuthError::Invalid("Username must not be empty"));
        }
        if email.is_empty() {
            return Err(AuthError::Invalid("Email must not be empty"));
        }
        if password.is_empty() {
            return Err(AuthError::Invalid("Password must not be empty"));
        }

        let password_hash = self.credentials.hash(password)?;
        let user = match self.users.create_user(username, email, &password_hash).await {
            Ok(user) => user,
            Err(PortError::Duplicate(_)) => return Err(AuthError::AlreadyExists),
            Err(e) => return Err(e.into()),
        };

        self.sessions.set_user(token, Some(user.id)).await?;
        Ok(user)
    }

    /// Verifies a username/password pair and binds the session on success.
    pub async fn login(
        &self,
        token: Uuid,
        username: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let creds = match self.users.find_by_username(username.trim()).await {
            Ok(creds) => creds,
            Err(PortError::NotFound(_)) => return Err(AuthError::UserNotFound),
            Err(e) => return Err(e.into()),
        };

        if !self.credentials.verify(password, &creds.password_hash) {
            return Err(AuthError::BadPassword);
        }

        self.sessions.set_user(token, Some(creds.id)).await?;
        let user = self.users.find_by_id(creds.id).await?;
        Ok(user)
    }

    /// Drops the session's identity. Idempotent: logging out an unknown or
    /// already-anonymous session is a no-op, not an error.
    pub async fn logout(&self, token: Uuid) -> Result<(), PortError> {
        match self.sessions.set_user(token, None).await {
            Ok(()) | Err(PortError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Rehydrates the current identity from a session token, once per
    /// request. A missing token, an unknown or expired session, an unbound
    /// session and a dangling user id all mean "anonymous", never an error.
    pub async fn resolve(&self, token: Option<Uuid>) -> Result<Option<User>, PortError> {
        let Some(token) = token else {
            return Ok(None);
        };

        let session = match self.sessions.find(token).await {
            Ok(session) => session,
            Err(PortError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        let Some(user_id) = session.user_id else {
            return Ok(None);
        };

        match self.users.find_by_id(user_id).await {
            Ok(user) => Ok(Some(user)),
            Err(PortError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artblog_core::domain::{Session, UserCredentials};
    use artblog_core::ports::PortResult;
    use artblog_core::Flash;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryUsers {
        rows: Mutex<Vec<(User, String)>>,
    }

    #[async_trait]
    impl UserStore for MemoryUsers {
        async fn create_user(
            &self,
            username: &str,
            email: &str,
            password_hash: &str,
        ) -> PortResult<User> {
            let mut rows = self.rows.lock().unwrap();
            if rows
                .iter()
                .any(|(u, _)| u.username == username || u.email == email)
            {
                return Err(PortError::Duplicate(username.to_string()));
            }
            let user = User {
                id: Uuid::new_v4(),
                username: username.to_string(),
                email: email.to_string(),
                created_at: Utc::now(),
            };
            rows.push((user.clone(), password_hash.to_string()));
            Ok(user)
        }

        async fn find_by_username(&self, username: &str) -> PortResult<UserCredentials> {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .find(|(u, _)| u.username == username)
                .map(|(u, hash)| UserCredentials {
                    id: u.id,
                    username: u.username.clone(),
                    password_hash: hash.clone(),
                })
                .ok_or_else(|| PortError::NotFound(username.to_string()))
        }

        async fn find_by_id(&self, id: Uuid) -> PortResult<User> {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .find(|(u, _)| u.id == id)
                .map(|(u, _)| u.clone())
                .ok_or_else(|| PortError::NotFound(id.to_string()))
        }
    }

    #[derive(Default)]
    struct MemorySessions {
        rows: Mutex<HashMap<Uuid, Session>>,
    }

    #[async_trait]
    impl SessionStore for MemorySessions {
        async fn create(&self) -> PortResult<Session> {
            let session = Session {
                token: Uuid::new_v4(),
                user_id: None,
                flash: None,
                created_at: Utc::now(),
                expires_at: Utc::now() + Duration::days(30),
            };
            self.rows
                .lock()
                .unwrap()
                .insert(session.token, session.clone());
            Ok(session)
        }

        async fn find(&self, token: Uuid) -> PortResult<Session> {
            self.rows
                .lock()
                .unwrap()
                .get(&token)
                .cloned()
                .ok_or_else(|| PortError::NotFound(token.to_string()))
        }

        async fn set_user(&self, token: Uuid, user_id: Option<Uuid>) -> PortResult<()> {
            let mut rows = self.rows.lock().unwrap();
            let session = rows
                .get_mut(&token)
                .ok_or_else(|| PortError::NotFound(token.to_string()))?;
            session.user_id = user_id;
            Ok(())
        }

        async fn set_flash(&self, token: Uuid, flash: Flash) -> PortResult<()> {
            let mut rows = self.rows.lock().unwrap();
            let session = rows
                .get_mut(&token)
                .ok_or_else(|| PortError::NotFound(token.to_string()))?;
            session.flash = Some(flash);
            Ok(())
        }

        async fn take_flash(&self, token: Uuid) -> PortResult<Option<Flash>> {
            let mut rows = self.rows.lock().unwrap();
            Ok(rows.get_mut(&token).and_then(|s| s.flash.take()))
        }

        async fn delete(&self, token: Uuid) -> PortResult<()> {
            self.rows.lock().unwrap().remove(&token);
            Ok(())
        }
    }

    /// Deliberately fake hasher so tests stay fast; the real Argon2 adapter
    /// has its own tests.
    struct FakeCredentials;

    impl CredentialStore for FakeCredentials {
        fn hash(&self, plaintext: &str) -> Result<String, CryptoError> {
            Ok(format!("hashed:{}", plaintext))
        }

        fn verify(&self, plaintext: &str, hash: &str) -> bool {
            hash == format!("hashed:{}", plaintext)
        }
    }

    fn service() -> (AuthService, Arc<MemoryUsers>, Arc<MemorySessions>) {
        let users = Arc::new(MemoryUsers::default());
        let sessions = Arc::new(MemorySessions::default());
        let auth = AuthService::new(
            users.clone(),
            sessions.clone(),
            Arc::new(FakeCredentials),
        );
        (auth, users, sessions)
    }

    async fn fresh_token(sessions: &MemorySessions) -> Uuid {
        sessions.create().await.unwrap().token
    }

    #[tokio::test]
    async fn signup_stores_hash_never_plaintext() {
        let (auth, users, sessions) = service();
        let token = fresh_token(&sessions).await;

        auth.signup(token, "alice", "a@x.com", "pw1").await.unwrap();

        let creds = users.find_by_username("alice").await.unwrap();
        assert_eq!(creds.password_hash, "hashed:pw1");
        assert_ne!(creds.password_hash, "pw1");
    }

    #[tokio::test]
    async fn signup_establishes_session() {
        let (auth, _, sessions) = service();
        let token = fresh_token(&sessions).await;

        let user = auth.signup(token, "alice", "a@x.com", "pw1").await.unwrap();

        let resolved = auth.resolve(Some(token)).await.unwrap().unwrap();
        assert_eq!(resolved.id, user.id);
        assert_eq!(resolved.username, "alice");
    }

    #[tokio::test]
    async fn duplicate_signup_is_rejected() {
        let (auth, _, sessions) = service();
        let token = fresh_token(&sessions).await;
        auth.signup(token, "alice", "a@x.com", "pw1").await.unwrap();

        let second = fresh_token(&sessions).await;
        let err = auth
            .signup(second, "alice", "other@x.com", "pw2")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AlreadyExists));

        // Email collisions count too.
        let err = auth
            .signup(second, "bob", "a@x.com", "pw2")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AlreadyExists));
    }

    #[tokio::test]
    async fn signup_rejects_blank_fields() {
        let (auth, _, sessions) = service();
        let token = fresh_token(&sessions).await;

        let err = auth.signup(token, "   ", "a@x.com", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::Invalid(_)));

        let err = auth.signup(token, "alice", "a@x.com", "").await.unwrap_err();
        assert!(matches!(err, AuthError::Invalid(_)));
    }

    #[tokio::test]
    async fn login_distinguishes_unknown_user_from_bad_password() {
        let (auth, _, sessions) = service();
        let token = fresh_token(&sessions).await;
        auth.signup(token, "alice", "a@x.com", "pw1").await.unwrap();

        let err = auth.login(token, "nobody", "pw1").await.unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));

        let err = auth.login(token, "alice", "wrong").await.unwrap_err();
        assert!(matches!(err, AuthError::BadPassword));

        let user = auth.login(token, "alice", "pw1").await.unwrap();
        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn resolve_after_logout_is_anonymous() {
        let (auth, _, sessions) = service();
        let token = fresh_token(&sessions).await;
        auth.signup(token, "alice", "a@x.com", "pw1").await.unwrap();
        assert!(auth.resolve(Some(token)).await.unwrap().is_some());

        auth.logout(token).await.unwrap();
        assert!(auth.resolve(Some(token)).await.unwrap().is_none());

        // Logging out again (or with a token that never existed) is a no-op.
        auth.logout(token).await.unwrap();
        auth.logout(Uuid::new_v4()).await.unwrap();
    }

    #[tokio::test]
    async fn resolve_treats_dangling_identity_as_anonymous() {
        let (auth, _, sessions) = service();
        let token = fresh_token(&sessions).await;

        // Session points at a user that no longer exists.
        sessions.set_user(token, Some(Uuid::new_v4())).await.unwrap();

        assert!(auth.resolve(Some(token)).await.unwrap().is_none());
        assert!(auth.resolve(None).await.unwrap().is_none());
        assert!(auth.resolve(Some(Uuid::new_v4())).await.unwrap().is_none());
    }
}
