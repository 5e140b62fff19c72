//! services/web/src/posts.rs
//!
//! The post service: CRUD over the post store, with the ownership guard on
//! every mutating operation. Reads are open to everyone, including anonymous
//! visitors.

use std::sync::Arc;

use artblog_core::domain::{Post, User};
use artblog_core::ports::{PortError, PostStore};
use chrono::Utc;
use uuid::Uuid;

/// `NotFound` and `Forbidden` stay distinct here even though the HTTP layer
/// answers both with the same redirect; collapsing them would make the
/// ownership contract untestable.
#[derive(Debug, thiserror::Error)]
pub enum PostError {
    #[error("Post not found")]
    NotFound,

    #[error("Only the post's owner may do that")]
    Forbidden,

    #[error(transparent)]
    Store(PortError),
}

impl From<PortError> for PostError {
    fn from(e: PortError) -> Self {
        match e {
            PortError::NotFound(_) => PostError::NotFound,
            other => PostError::Store(other),
        }
    }
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostStore>,
}

impl PostService {
    pub fn new(posts: Arc<dyn PostStore>) -> Self {
        Self { posts }
    }

    /// All posts, newest first.
    pub async fn list(&self) -> Result<Vec<Post>, PostError> {
        Ok(self.posts.list_newest_first().await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Post, PostError> {
        Ok(self.posts.find(id).await?)
    }

    /// Creates a post owned by `identity`. Title and content are stored as
    /// raw text; escaping happens when views render them.
    pub async fn create(
        &self,
        identity: &User,
        image: &str,
        title: &str,
        content: &str,
    ) -> Result<Post, PostError> {
        let post = self
            .posts
            .insert(
                &identity.username,
                image.trim(),
                title.trim(),
                content.trim(),
            )
            .await?;
        Ok(post)
    }

    /// Fetches a post for editing, enforcing ownership. Used by the edit
    /// form as well as `update` and `delete`.
    pub async fn owned(&self, identity: &User, id: Uuid) -> Result<Post, PostError> {
        let post = self.posts.find(id).await?;
        if post.author != identity.username {
            return Err(PostError::Forbidden);
        }
        Ok(post)
    }

    /// Replaces image/title/content and stamps the edited time. The author
    /// field is immutable after creation.
    pub async fn update(
        &self,
        identity: &User,
        id: Uuid,
        image: &str,
        title: &str,
        content: &str,
    ) -> Result<(), PostError> {
        self.owned(identity, id).await?;
        self.posts
            .update(id, image.trim(), title.trim(), content.trim(), Utc::now())
            .await?;
        Ok(())
    }

    pub async fn delete(&self, identity: &User, id: Uuid) -> Result<(), PostError> {
        self.owned(identity, id).await?;
        self.posts.delete(id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artblog_core::ports::PortResult;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};
    use std::sync::Mutex;

    /// Insertion-ordered in-memory store; timestamps are spaced a second
    /// apart so "newest first" is deterministic.
    #[derive(Default)]
    struct MemoryPosts {
        rows: Mutex<Vec<Post>>,
    }

    impl MemoryPosts {
        fn next_created_at(&self, n: usize) -> DateTime<Utc> {
            Utc::now() + Duration::seconds(n as i64)
        }
    }

    #[async_trait]
    impl PostStore for MemoryPosts {
        async fn insert(
            &self,
            author: &str,
            image: &str,
            title: &str,
            content: &str,
        ) -> PortResult<Post> {
            let mut rows = self.rows.lock().unwrap();
            let post = Post {
                id: Uuid::new_v4(),
                author: author.to_string(),
                image: image.to_string(),
                title: title.to_string(),
                content: content.to_string(),
                created_at: self.next_created_at(rows.len()),
                edited_at: None,
            };
            rows.push(post.clone());
            Ok(post)
        }

        async fn find(&self, id: Uuid) -> PortResult<Post> {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .find(|p| p.id == id)
                .cloned()
                .ok_or_else(|| PortError::NotFound(id.to_string()))
        }

        async fn list_newest_first(&self) -> PortResult<Vec<Post>> {
            let mut posts = self.rows.lock().unwrap().clone();
            posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(posts)
        }

        async fn update(
            &self,
            id: Uuid,
            image: &str,
            title: &str,
            content: &str,
            edited_at: DateTime<Utc>,
        ) -> PortResult<()> {
            let mut rows = self.rows.lock().unwrap();
            let post = rows
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or_else(|| PortError::NotFound(id.to_string()))?;
            post.image = image.to_string();
            post.title = title.to_string();
            post.content = content.to_string();
            post.edited_at = Some(edited_at);
            Ok(())
        }

        async fn delete(&self, id: Uuid) -> PortResult<()> {
            let mut rows = self.rows.lock().unwrap();
            let before = rows.len();
            rows.retain(|p| p.id != id);
            if rows.len() == before {
                return Err(PortError::NotFound(id.to_string()));
            }
            Ok(())
        }
    }

    fn user(name: &str) -> User {
        User {
            id: Uuid::new_v4(),
            username: name.to_string(),
            email: format!("{}@x.com", name),
            created_at: Utc::now(),
        }
    }

    fn service() -> PostService {
        PostService::new(Arc::new(MemoryPosts::default()))
    }

    #[tokio::test]
    async fn create_sets_owner_and_trims_input() {
        let posts = service();
        let alice = user("alice");

        let post = posts
            .create(&alice, " i.png ", " Hi ", " Hello ")
            .await
            .unwrap();

        assert_eq!(post.author, "alice");
        assert_eq!(post.image, "i.png");
        assert_eq!(post.title, "Hi");
        assert_eq!(post.content, "Hello");
        assert!(post.edited_at.is_none());
    }

    #[tokio::test]
    async fn list_returns_newest_first() {
        let posts = service();
        let alice = user("alice");

        let p1 = posts.create(&alice, "1.png", "P1", "first").await.unwrap();
        let p2 = posts.create(&alice, "2.png", "P2", "second").await.unwrap();

        let listed = posts.list().await.unwrap();
        let ids: Vec<Uuid> = listed.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![p2.id, p1.id]);
    }

    #[tokio::test]
    async fn update_is_owner_only() {
        let posts = service();
        let alice = user("alice");
        let bob = user("bob");
        let post = posts.create(&alice, "i.png", "Hi", "Hello").await.unwrap();

        let err = posts
            .update(&bob, post.id, "x.png", "Stolen", "Mine now")
            .await
            .unwrap_err();
        assert!(matches!(err, PostError::Forbidden));

        posts
            .update(&alice, post.id, "i2.png", "Hi!", "Hello again")
            .await
            .unwrap();
        let updated = posts.get(post.id).await.unwrap();
        assert_eq!(updated.title, "Hi!");
        assert_eq!(updated.author, "alice");
        assert!(updated.edited_at.is_some());
    }

    #[tokio::test]
    async fn delete_is_owner_only_and_then_gone() {
        let posts = service();
        let alice = user("alice");
        let bob = user("bob");
        let post = posts.create(&alice, "i.png", "Hi", "Hello").await.unwrap();

        let err = posts.delete(&bob, post.id).await.unwrap_err();
        assert!(matches!(err, PostError::Forbidden));

        posts.delete(&alice, post.id).await.unwrap();
        let err = posts.get(post.id).await.unwrap_err();
        assert!(matches!(err, PostError::NotFound));
    }

    #[tokio::test]
    async fn missing_post_is_not_found_not_forbidden() {
        let posts = service();
        let alice = user("alice");

        let err = posts
            .update(&alice, Uuid::new_v4(), "i", "t", "c")
            .await
            .unwrap_err();
        assert!(matches!(err, PostError::NotFound));

        let err = posts.delete(&alice, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, PostError::NotFound));
    }
}
