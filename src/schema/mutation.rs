use async_graphql::{Context, Object, Result};
use uuid::Uuid;

use super::{registry, store};
use crate::model::{
    ChangePostInput, ChangeProfileInput, ChangeUserInput, CreatePostInput, CreateProfileInput,
    CreateUserInput, Post, Profile, User,
};
use crate::relations::{
    PostsByAuthorId, ProfileByUserId, SubscribersOfUser, SubscriptionsOfUser,
};

/// Single-record writes. Each one drops the cached entries it may have made stale so that later
/// fields of the same request read the new state.
#[derive(Debug, Default, Clone, Copy)]
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn create_post(&self, ctx: &Context<'_>, dto: CreatePostInput) -> Result<Post> {
        let post = store(ctx)?.create_post(dto).await?;
        registry(ctx)?.invalidate::<PostsByAuthorId>();
        Ok(post)
    }

    async fn change_post(&self, ctx: &Context<'_>, id: Uuid, dto: ChangePostInput) -> Result<Post> {
        let post = store(ctx)?.update_post(id, dto).await?;
        registry(ctx)?.invalidate::<PostsByAuthorId>();
        Ok(post)
    }

    async fn delete_post(&self, ctx: &Context<'_>, id: Uuid) -> Result<bool> {
        store(ctx)?.delete_post(id).await?;
        registry(ctx)?.invalidate::<PostsByAuthorId>();
        Ok(true)
    }

    async fn create_user(&self, ctx: &Context<'_>, dto: CreateUserInput) -> Result<User> {
        Ok(store(ctx)?.create_user(dto).await?)
    }

    async fn change_user(&self, ctx: &Context<'_>, id: Uuid, dto: ChangeUserInput) -> Result<User> {
        let user = store(ctx)?.update_user(id, dto).await?;
        let registry = registry(ctx)?;
        registry.invalidate::<SubscriptionsOfUser>();
        registry.invalidate::<SubscribersOfUser>();
        Ok(user)
    }

    async fn delete_user(&self, ctx: &Context<'_>, id: Uuid) -> Result<bool> {
        store(ctx)?.delete_user(id).await?;
        let registry = registry(ctx)?;
        registry.invalidate::<ProfileByUserId>();
        registry.invalidate::<PostsByAuthorId>();
        registry.invalidate::<SubscriptionsOfUser>();
        registry.invalidate::<SubscribersOfUser>();
        Ok(true)
    }

    async fn create_profile(&self, ctx: &Context<'_>, dto: CreateProfileInput) -> Result<Profile> {
        let profile = store(ctx)?.create_profile(dto).await?;
        registry(ctx)?.invalidate::<ProfileByUserId>();
        Ok(profile)
    }

    async fn change_profile(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        dto: ChangeProfileInput,
    ) -> Result<Profile> {
        let profile = store(ctx)?.update_profile(id, dto).await?;
        registry(ctx)?.invalidate::<ProfileByUserId>();
        Ok(profile)
    }

    async fn delete_profile(&self, ctx: &Context<'_>, id: Uuid) -> Result<bool> {
        store(ctx)?.delete_profile(id).await?;
        registry(ctx)?.invalidate::<ProfileByUserId>();
        Ok(true)
    }

    async fn subscribe_to(
        &self,
        ctx: &Context<'_>,
        user_id: Uuid,
        author_id: Uuid,
    ) -> Result<User> {
        let user = store(ctx)?.subscribe(user_id, author_id).await?;
        let registry = registry(ctx)?;
        registry.invalidate::<SubscriptionsOfUser>();
        registry.invalidate::<SubscribersOfUser>();
        Ok(user)
    }

    async fn unsubscribe_from(
        &self,
        ctx: &Context<'_>,
        user_id: Uuid,
        author_id: Uuid,
    ) -> Result<bool> {
        store(ctx)?.unsubscribe(user_id, author_id).await?;
        let registry = registry(ctx)?;
        registry.invalidate::<SubscriptionsOfUser>();
        registry.invalidate::<SubscribersOfUser>();
        Ok(true)
    }
}
