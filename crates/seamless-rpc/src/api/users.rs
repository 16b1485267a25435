//! User functions.

use super::models::{CreateUserData, User, UserProfile, UserStats};
use crate::store::Store;
use chrono::Utc;
use seamless_core::{CallContext, RpcError};

/// Look up a user by id.
///
/// @rpc (id: string) -> User
pub async fn get_user(ctx: &CallContext, id: String) -> anyhow::Result<User> {
    if id.is_empty() {
        return Err(RpcError::validation("User ID is required").into());
    }
    let store = Store::from_context(ctx)?;
    match store.find_user(&id).await {
        Some(user) => Ok(user),
        None => anyhow::bail!("User with ID {} not found", id),
    }
}

/// @rpc (input: CreateUserData) -> User
pub async fn create_user(ctx: &CallContext, input: CreateUserData) -> anyhow::Result<User> {
    if input.name.is_empty() || input.email.is_empty() {
        return Err(RpcError::validation("Name and email are required").into());
    }
    if !input.email.contains('@') {
        return Err(RpcError::validation("Invalid email format")
            .with_context("field", "email")
            .into());
    }
    let store = Store::from_context(ctx)?;
    Ok(store.create_user(input).await)
}

/// @rpc () -> User[]
pub async fn get_all_users(ctx: &CallContext) -> anyhow::Result<Vec<User>> {
    let store = Store::from_context(ctx)?;
    Ok(store.all_users().await)
}

/// A user with post count and account age in days.
///
/// @rpc (id: string) -> UserProfile
pub async fn get_user_profile(ctx: &CallContext, id: String) -> anyhow::Result<UserProfile> {
    let user = get_user(ctx, id).await?;
    let store = Store::from_context(ctx)?;
    let posts = store.posts_by_author(&user.id).await;
    let joined_days_ago = (Utc::now() - user.created_at).num_days();

    Ok(UserProfile {
        user,
        stats: UserStats {
            posts_count: posts.len(),
            joined_days_ago,
        },
    })
}
