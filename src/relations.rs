//! The relation kinds of the graph. Each one issues a single bulk fetch against the store and
//! partitions the rows back per key.

use std::sync::OnceLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::batch_function::{Batch, BatchFunction};
use crate::error::LoadError;
use crate::loader::Loader;
use crate::model::{MemberType, MemberTypeId, Post, Profile, User};
use crate::partition::{group_by, index_by};
use crate::registry::{Loaders, Relation, RelationKind};
use crate::store::StoreHandle;

/// The profile owned by a user.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProfileByUserId;

#[async_trait]
impl BatchFunction<Uuid, Profile> for ProfileByUserId {
    type Context = StoreHandle;
    async fn load(keys: &[Uuid], store: &StoreHandle) -> Result<Batch<Uuid, Profile>, LoadError> {
        let profiles = store.profiles_by_user_ids(keys).await?;
        Ok(index_by(profiles, |profile| profile.user_id))
    }
}

impl Relation for ProfileByUserId {
    const KIND: RelationKind = RelationKind::ProfileByUserId;
    type Key = Uuid;
    type Value = Profile;

    fn slot(loaders: &Loaders) -> &OnceLock<Loader<Uuid, Profile>> {
        &loaders.profile_by_user_id
    }
}

/// Every post written by an author.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostsByAuthorId;

#[async_trait]
impl BatchFunction<Uuid, Vec<Post>> for PostsByAuthorId {
    type Context = StoreHandle;
    async fn load(keys: &[Uuid], store: &StoreHandle) -> Result<Batch<Uuid, Vec<Post>>, LoadError> {
        let posts = store.posts_by_author_ids(keys).await?;
        Ok(group_by(keys, posts, |post| post.author_id, |post| post))
    }
}

impl Relation for PostsByAuthorId {
    const KIND: RelationKind = RelationKind::PostsByAuthorId;
    type Key = Uuid;
    type Value = Vec<Post>;

    fn slot(loaders: &Loaders) -> &OnceLock<Loader<Uuid, Vec<Post>>> {
        &loaders.posts_by_author_id
    }
}

/// Authors a user is subscribed to (`userSubscribedTo`).
#[derive(Debug, Default, Clone, Copy)]
pub struct SubscriptionsOfUser;

#[async_trait]
impl BatchFunction<Uuid, Vec<User>> for SubscriptionsOfUser {
    type Context = StoreHandle;
    async fn load(keys: &[Uuid], store: &StoreHandle) -> Result<Batch<Uuid, Vec<User>>, LoadError> {
        let rows = store.subscriptions_by_subscriber_ids(keys).await?;
        Ok(group_by(keys, rows, |(subscriber_id, _)| *subscriber_id, |(_, author)| author))
    }
}

impl Relation for SubscriptionsOfUser {
    const KIND: RelationKind = RelationKind::SubscriptionsOfUser;
    type Key = Uuid;
    type Value = Vec<User>;

    fn slot(loaders: &Loaders) -> &OnceLock<Loader<Uuid, Vec<User>>> {
        &loaders.subscriptions_of_user
    }
}

/// Users subscribed to an author (`subscribedToUser`).
#[derive(Debug, Default, Clone, Copy)]
pub struct SubscribersOfUser;

#[async_trait]
impl BatchFunction<Uuid, Vec<User>> for SubscribersOfUser {
    type Context = StoreHandle;
    async fn load(keys: &[Uuid], store: &StoreHandle) -> Result<Batch<Uuid, Vec<User>>, LoadError> {
        let rows = store.subscribers_by_author_ids(keys).await?;
        Ok(group_by(keys, rows, |(author_id, _)| *author_id, |(_, subscriber)| subscriber))
    }
}

impl Relation for SubscribersOfUser {
    const KIND: RelationKind = RelationKind::SubscribersOfUser;
    type Key = Uuid;
    type Value = Vec<User>;

    fn slot(loaders: &Loaders) -> &OnceLock<Loader<Uuid, Vec<User>>> {
        &loaders.subscribers_of_user
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MemberTypeById;

#[async_trait]
impl BatchFunction<MemberTypeId, MemberType> for MemberTypeById {
    type Context = StoreHandle;
    async fn load(
        keys: &[MemberTypeId],
        store: &StoreHandle,
    ) -> Result<Batch<MemberTypeId, MemberType>, LoadError> {
        let member_types = store.member_types_by_ids(keys).await?;
        Ok(index_by(member_types, |member_type| member_type.id))
    }
}

impl Relation for MemberTypeById {
    const KIND: RelationKind = RelationKind::MemberTypeById;
    type Key = MemberTypeId;
    type Value = MemberType;

    fn slot(loaders: &Loaders) -> &OnceLock<Loader<MemberTypeId, MemberType>> {
        &loaders.member_type_by_id
    }
}
