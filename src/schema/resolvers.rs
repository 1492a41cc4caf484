use async_graphql::{ComplexObject, Context, Result};

use super::registry;
use crate::model::{MemberType, Post, Profile, User};
use crate::relations::{
    MemberTypeById, PostsByAuthorId, ProfileByUserId, SubscribersOfUser, SubscriptionsOfUser,
};

#[ComplexObject]
impl User {
    async fn profile(&self, ctx: &Context<'_>) -> Result<Option<Profile>> {
        Ok(registry(ctx)?.get_or_create::<ProfileByUserId>().load(self.id).await?)
    }

    async fn posts(&self, ctx: &Context<'_>) -> Result<Option<Vec<Post>>> {
        let posts = registry(ctx)?.get_or_create::<PostsByAuthorId>().load(self.id).await?;
        Ok(Some(posts.unwrap_or_default()))
    }

    async fn user_subscribed_to(&self, ctx: &Context<'_>) -> Result<Option<Vec<User>>> {
        let authors = registry(ctx)?.get_or_create::<SubscriptionsOfUser>().load(self.id).await?;
        Ok(Some(authors.unwrap_or_default()))
    }

    async fn subscribed_to_user(&self, ctx: &Context<'_>) -> Result<Option<Vec<User>>> {
        let subscribers = registry(ctx)?.get_or_create::<SubscribersOfUser>().load(self.id).await?;
        Ok(Some(subscribers.unwrap_or_default()))
    }
}

#[ComplexObject]
impl Profile {
    async fn member_type(&self, ctx: &Context<'_>) -> Result<Option<MemberType>> {
        Ok(registry(ctx)?.get_or_create::<MemberTypeById>().load(self.member_type_id).await?)
    }
}
