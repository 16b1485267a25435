//! Post functions.

use super::models::{CreatePostData, Post, PostAuthor, PostWithAuthor};
use crate::store::Store;
use seamless_core::{CallContext, RpcError};

/// Look up a post by id.
///
/// @rpc (id: string) -> Post
pub async fn get_post(ctx: &CallContext, id: String) -> anyhow::Result<Post> {
    if id.is_empty() {
        return Err(RpcError::validation("Post ID is required").into());
    }
    let store = Store::from_context(ctx)?;
    match store.find_post(&id).await {
        Some(post) => Ok(post),
        None => anyhow::bail!("Post with ID {} not found", id),
    }
}

/// @rpc (input: CreatePostData) -> Post
pub async fn create_post(ctx: &CallContext, input: CreatePostData) -> anyhow::Result<Post> {
    if input.title.is_empty() || input.content.is_empty() || input.author_id.is_empty() {
        return Err(RpcError::validation("Title, content, and author ID are required").into());
    }
    if input.title.chars().count() < 3 {
        return Err(RpcError::validation("Title must be at least 3 characters long")
            .with_context("field", "title")
            .into());
    }
    if input.content.chars().count() < 10 {
        return Err(RpcError::validation("Content must be at least 10 characters long")
            .with_context("field", "content")
            .into());
    }

    let store = Store::from_context(ctx)?;
    if store.find_user(&input.author_id).await.is_none() {
        return Err(RpcError::validation("Author not found")
            .with_context("field", "authorId")
            .into());
    }
    Ok(store.create_post(input).await)
}

/// @rpc () -> Post[]
pub async fn get_all_posts(ctx: &CallContext) -> anyhow::Result<Vec<Post>> {
    let store = Store::from_context(ctx)?;
    Ok(store.all_posts().await)
}

/// @rpc (author_id: string) -> Post[]
pub async fn get_posts_by_author(ctx: &CallContext, author_id: String) -> anyhow::Result<Vec<Post>> {
    if author_id.is_empty() {
        return Err(RpcError::validation("Author ID is required").into());
    }
    let store = Store::from_context(ctx)?;
    Ok(store.posts_by_author(&author_id).await)
}

/// A post together with its author's public fields.
///
/// @rpc (id: string) -> PostWithAuthor
pub async fn get_post_with_author(ctx: &CallContext, id: String) -> anyhow::Result<PostWithAuthor> {
    let post = get_post(ctx, id).await?;
    let store = Store::from_context(ctx)?;
    let Some(author) = store.find_user(&post.author_id).await else {
        anyhow::bail!("Post author not found");
    };

    Ok(PostWithAuthor {
        post,
        author: PostAuthor {
            id: author.id,
            name: author.name,
            email: author.email,
        },
    })
}
