// @generated by seamless-compiler. Do not edit.
use seamless_core::{BoxFuture, RpcError};
use crate::api::models::{CreatePostData, CreateUserData, Post, PostWithAuthor, User, UserProfile};

/// `api/posts.get_post`: (id: string) -> Post
pub type GetPostFunction = fn(String) -> BoxFuture<'static, Result<Post, RpcError>>;

/// `api/posts.create_post`: (input: CreatePostData) -> Post
pub type CreatePostFunction = fn(CreatePostData) -> BoxFuture<'static, Result<Post, RpcError>>;

/// `api/posts.get_all_posts`: () -> Post[]
pub type GetAllPostsFunction = fn() -> BoxFuture<'static, Result<Vec<Post>, RpcError>>;

/// `api/posts.get_posts_by_author`: (author_id: string) -> Post[]
pub type GetPostsByAuthorFunction = fn(String) -> BoxFuture<'static, Result<Vec<Post>, RpcError>>;

/// `api/posts.get_post_with_author`: (id: string) -> PostWithAuthor
pub type GetPostWithAuthorFunction = fn(String) -> BoxFuture<'static, Result<PostWithAuthor, RpcError>>;

/// `api/users.get_user`: (id: string) -> User
pub type GetUserFunction = fn(String) -> BoxFuture<'static, Result<User, RpcError>>;

/// `api/users.create_user`: (input: CreateUserData) -> User
pub type CreateUserFunction = fn(CreateUserData) -> BoxFuture<'static, Result<User, RpcError>>;

/// `api/users.get_all_users`: () -> User[]
pub type GetAllUsersFunction = fn() -> BoxFuture<'static, Result<Vec<User>, RpcError>>;

/// `api/users.get_user_profile`: (id: string) -> UserProfile
pub type GetUserProfileFunction = fn(String) -> BoxFuture<'static, Result<UserProfile, RpcError>>;
