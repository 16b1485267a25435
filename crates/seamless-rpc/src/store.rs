//! In-memory store backing the sample functions.
//!
//! Installed as the per-call context state; functions reach it through
//! [`Store::from_context`].

use crate::api::models::{CreatePostData, CreateUserData, Post, User};
use chrono::{NaiveDate, Utc};
use seamless_core::{CallContext, RpcError, Timestamp};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
pub struct Store {
    users: RwLock<Vec<User>>,
    posts: RwLock<Vec<Post>>,
}

impl Store {
    /// Store holding two users and one welcome post.
    pub fn seeded() -> Self {
        let john = User {
            id: "user-1".into(),
            name: "John Doe".into(),
            email: "john@example.com".into(),
            created_at: seed_date(2024, 1, 1),
        };
        let jane = User {
            id: "user-2".into(),
            name: "Jane Smith".into(),
            email: "jane@example.com".into(),
            created_at: seed_date(2024, 1, 2),
        };
        let welcome = Post {
            id: "post-1".into(),
            title: "Welcome to Seamless RPC".into(),
            content: "This is a sample post demonstrating the seamless RPC system.".into(),
            author_id: john.id.clone(),
            created_at: seed_date(2024, 1, 3),
            updated_at: seed_date(2024, 1, 3),
        };

        Self {
            users: RwLock::new(vec![john, jane]),
            posts: RwLock::new(vec![welcome]),
        }
    }

    /// The store installed in `ctx`.
    pub fn from_context(ctx: &CallContext) -> Result<Arc<Store>, RpcError> {
        ctx.get::<Store>()
            .ok_or_else(|| RpcError::internal("No store installed in the call context"))
    }

    pub async fn find_user(&self, id: &str) -> Option<User> {
        self.users.read().await.iter().find(|u| u.id == id).cloned()
    }

    pub async fn create_user(&self, data: CreateUserData) -> User {
        let user = User {
            id: generate_id("user"),
            name: data.name,
            email: data.email,
            created_at: Utc::now(),
        };
        debug!("Created user {}", user.id);
        self.users.write().await.push(user.clone());
        user
    }

    pub async fn all_users(&self) -> Vec<User> {
        self.users.read().await.clone()
    }

    pub async fn find_post(&self, id: &str) -> Option<Post> {
        self.posts.read().await.iter().find(|p| p.id == id).cloned()
    }

    pub async fn create_post(&self, data: CreatePostData) -> Post {
        let now = Utc::now();
        let post = Post {
            id: generate_id("post"),
            title: data.title,
            content: data.content,
            author_id: data.author_id,
            created_at: now,
            updated_at: now,
        };
        debug!("Created post {}", post.id);
        self.posts.write().await.push(post.clone());
        post
    }

    pub async fn posts_by_author(&self, author_id: &str) -> Vec<Post> {
        self.posts
            .read()
            .await
            .iter()
            .filter(|p| p.author_id == author_id)
            .cloned()
            .collect()
    }

    pub async fn all_posts(&self) -> Vec<Post> {
        self.posts.read().await.clone()
    }
}

fn generate_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}

fn seed_date(year: i32, month: u32, day: u32) -> Timestamp {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .unwrap_or_default()
}
