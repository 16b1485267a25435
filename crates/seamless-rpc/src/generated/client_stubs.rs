// @generated by seamless-compiler. Do not edit.
use seamless_core::{RpcClient, RpcError, Value, to_value};
use crate::api::models::{CreatePostData, CreateUserData, Post, PostWithAuthor, User, UserProfile};

/// Calls `api/posts.get_post` (api/posts.rs:10).
pub async fn get_post(client: &RpcClient, id: String) -> Result<Post, RpcError> {
    client
        .call_typed("api/posts.get_post", vec![Value::from(id)])
        .await
}

/// Calls `api/posts.create_post` (api/posts.rs:22).
pub async fn create_post(client: &RpcClient, input: CreatePostData) -> Result<Post, RpcError> {
    client
        .call_typed("api/posts.create_post", vec![to_value(&input)?])
        .await
}

/// Calls `api/posts.get_all_posts` (api/posts.rs:47).
pub async fn get_all_posts(client: &RpcClient) -> Result<Vec<Post>, RpcError> {
    client
        .call_typed("api/posts.get_all_posts", vec![])
        .await
}

/// Calls `api/posts.get_posts_by_author` (api/posts.rs:53).
pub async fn get_posts_by_author(client: &RpcClient, author_id: String) -> Result<Vec<Post>, RpcError> {
    client
        .call_typed("api/posts.get_posts_by_author", vec![Value::from(author_id)])
        .await
}

/// Calls `api/posts.get_post_with_author` (api/posts.rs:64).
pub async fn get_post_with_author(client: &RpcClient, id: String) -> Result<PostWithAuthor, RpcError> {
    client
        .call_typed("api/posts.get_post_with_author", vec![Value::from(id)])
        .await
}

/// Calls `api/users.get_user` (api/users.rs:11).
pub async fn get_user(client: &RpcClient, id: String) -> Result<User, RpcError> {
    client
        .call_typed("api/users.get_user", vec![Value::from(id)])
        .await
}

/// Calls `api/users.create_user` (api/users.rs:23).
pub async fn create_user(client: &RpcClient, input: CreateUserData) -> Result<User, RpcError> {
    client
        .call_typed("api/users.create_user", vec![to_value(&input)?])
        .await
}

/// Calls `api/users.get_all_users` (api/users.rs:37).
pub async fn get_all_users(client: &RpcClient) -> Result<Vec<User>, RpcError> {
    client
        .call_typed("api/users.get_all_users", vec![])
        .await
}

/// Calls `api/users.get_user_profile` (api/users.rs:45).
pub async fn get_user_profile(client: &RpcClient, id: String) -> Result<UserProfile, RpcError> {
    client
        .call_typed("api/users.get_user_profile", vec![Value::from(id)])
        .await
}
