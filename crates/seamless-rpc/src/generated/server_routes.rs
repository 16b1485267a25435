// @generated by seamless-compiler. Do not edit.
use seamless_core::{FunctionRegistry, handler_fn, to_value};
use crate::api::posts as api_posts;
use crate::api::users as api_users;

/// Registers every discovered function with `registry`.
pub fn register_functions(registry: &FunctionRegistry) {
    registry.register(
        "api/posts.get_post",
        handler_fn(|ctx, params| async move {
            let result = api_posts::get_post(&ctx, params.arg(0, "id")?).await?;
            Ok(to_value(&result)?)
        }),
    );
    registry.register(
        "api/posts.create_post",
        handler_fn(|ctx, params| async move {
            let result = api_posts::create_post(&ctx, params.arg(0, "input")?).await?;
            Ok(to_value(&result)?)
        }),
    );
    registry.register(
        "api/posts.get_all_posts",
        handler_fn(|ctx, _params| async move {
            let result = api_posts::get_all_posts(&ctx).await?;
            Ok(to_value(&result)?)
        }),
    );
    registry.register(
        "api/posts.get_posts_by_author",
        handler_fn(|ctx, params| async move {
            let result = api_posts::get_posts_by_author(&ctx, params.arg(0, "author_id")?).await?;
            Ok(to_value(&result)?)
        }),
    );
    registry.register(
        "api/posts.get_post_with_author",
        handler_fn(|ctx, params| async move {
            let result = api_posts::get_post_with_author(&ctx, params.arg(0, "id")?).await?;
            Ok(to_value(&result)?)
        }),
    );
    registry.register(
        "api/users.get_user",
        handler_fn(|ctx, params| async move {
            let result = api_users::get_user(&ctx, params.arg(0, "id")?).await?;
            Ok(to_value(&result)?)
        }),
    );
    registry.register(
        "api/users.create_user",
        handler_fn(|ctx, params| async move {
            let result = api_users::create_user(&ctx, params.arg(0, "input")?).await?;
            Ok(to_value(&result)?)
        }),
    );
    registry.register(
        "api/users.get_all_users",
        handler_fn(|ctx, _params| async move {
            let result = api_users::get_all_users(&ctx).await?;
            Ok(to_value(&result)?)
        }),
    );
    registry.register(
        "api/users.get_user_profile",
        handler_fn(|ctx, params| async move {
            let result = api_users::get_user_profile(&ctx, params.arg(0, "id")?).await?;
            Ok(to_value(&result)?)
        }),
    );
}
