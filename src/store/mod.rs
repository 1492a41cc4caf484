//! Persistence collaborator consumed by the loaders and the root resolvers.
//!
//! Bulk fetches take a slice of distinct keys and may return rows in any order; the relation
//! kinds partition the rows back per key.

mod error;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::model::{
    ChangePostInput, ChangeProfileInput, ChangeUserInput, CreatePostInput, CreateProfileInput,
    CreateUserInput, MemberType, MemberTypeId, Post, Profile, Subscription, User,
};

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;

/// Shared handle passed to loaders and resolvers.
pub type StoreHandle = Arc<dyn Store>;

/// Abstract storage interface for the graph's records.
///
/// Implementations must be thread-safe (Send + Sync) and support async operations.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    // Bulk fetches

    async fn profiles_by_user_ids(&self, user_ids: &[Uuid]) -> StoreResult<Vec<Profile>>;

    async fn posts_by_author_ids(&self, author_ids: &[Uuid]) -> StoreResult<Vec<Post>>;

    /// Authors followed by each subscriber, as `(subscriber_id, author)` rows.
    async fn subscriptions_by_subscriber_ids(
        &self,
        subscriber_ids: &[Uuid],
    ) -> StoreResult<Vec<(Uuid, User)>>;

    /// Followers of each author, as `(author_id, subscriber)` rows.
    async fn subscribers_by_author_ids(
        &self,
        author_ids: &[Uuid],
    ) -> StoreResult<Vec<(Uuid, User)>>;

    async fn member_types_by_ids(&self, ids: &[MemberTypeId]) -> StoreResult<Vec<MemberType>>;

    /// Raw edges with either endpoint in `user_ids`.
    async fn subscriptions_touching(&self, user_ids: &[Uuid]) -> StoreResult<Vec<Subscription>>;

    // Root reads

    async fn users(&self) -> StoreResult<Vec<User>>;
    async fn user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn posts(&self) -> StoreResult<Vec<Post>>;
    async fn post(&self, id: Uuid) -> StoreResult<Option<Post>>;
    async fn profiles(&self) -> StoreResult<Vec<Profile>>;
    async fn profile(&self, id: Uuid) -> StoreResult<Option<Profile>>;
    async fn member_types(&self) -> StoreResult<Vec<MemberType>>;
    async fn member_type(&self, id: MemberTypeId) -> StoreResult<Option<MemberType>>;

    // Single record writes

    async fn create_user(&self, input: CreateUserInput) -> StoreResult<User>;
    async fn update_user(&self, id: Uuid, input: ChangeUserInput) -> StoreResult<User>;
    /// Also removes the user's profile, posts and subscription edges.
    async fn delete_user(&self, id: Uuid) -> StoreResult<()>;

    async fn create_post(&self, input: CreatePostInput) -> StoreResult<Post>;
    async fn update_post(&self, id: Uuid, input: ChangePostInput) -> StoreResult<Post>;
    async fn delete_post(&self, id: Uuid) -> StoreResult<()>;

    async fn create_profile(&self, input: CreateProfileInput) -> StoreResult<Profile>;
    async fn update_profile(&self, id: Uuid, input: ChangeProfileInput) -> StoreResult<Profile>;
    async fn delete_profile(&self, id: Uuid) -> StoreResult<()>;

    /// Makes `subscriber_id` follow `author_id` and returns the subscriber.
    async fn subscribe(&self, subscriber_id: Uuid, author_id: Uuid) -> StoreResult<User>;
    async fn unsubscribe(&self, subscriber_id: Uuid, author_id: Uuid) -> StoreResult<()>;
}
