//! In-memory storage implementation.
//!
//! Tables are `DashMap`s so the store can be shared between concurrent requests without an outer
//! lock. Every trait call is counted per operation name, and operations can be made to fail, which
//! lets tests observe how many round trips a query caused.

use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use tracing::instrument;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::model::{
    ChangePostInput, ChangeProfileInput, ChangeUserInput, CreatePostInput, CreateProfileInput,
    CreateUserInput, MemberType, MemberTypeId, Post, Profile, Subscription, User,
};

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: DashMap<Uuid, User>,
    profiles: DashMap<Uuid, Profile>,
    posts: DashMap<Uuid, Post>,
    member_types: DashMap<MemberTypeId, MemberType>,
    subscriptions: DashSet<Subscription>,
    calls: DashMap<&'static str, usize>,
    failing: DashSet<&'static str>,
}

impl MemoryStore {
    /// Creates a store holding only the two member types.
    pub fn new() -> Self {
        let store = Self::default();
        store.insert_member_type(MemberType {
            id: MemberTypeId::Basic,
            discount: 2.3,
            posts_limit_per_month: 20,
        });
        store.insert_member_type(MemberType {
            id: MemberTypeId::Business,
            discount: 7.7,
            posts_limit_per_month: 100,
        });
        store
    }

    // Fixtures. These bypass call counting.

    pub fn insert_user(&self, user: User) {
        self.users.insert(user.id, user);
    }

    pub fn insert_profile(&self, profile: Profile) {
        self.profiles.insert(profile.id, profile);
    }

    pub fn insert_post(&self, post: Post) {
        self.posts.insert(post.id, post);
    }

    pub fn insert_member_type(&self, member_type: MemberType) {
        self.member_types.insert(member_type.id, member_type);
    }

    pub fn insert_subscription(&self, subscriber_id: Uuid, author_id: Uuid) {
        self.subscriptions.insert(Subscription { subscriber_id, author_id });
    }

    // Observation and fault injection.

    /// Number of times `operation` (a `Store` method name) was called.
    pub fn calls(&self, operation: &str) -> usize {
        self.calls.get(operation).map(|count| *count).unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.iter().map(|entry| *entry.value()).sum()
    }

    pub fn reset_calls(&self) {
        self.calls.clear();
    }

    /// Makes every later call to `operation` fail with [`StoreError::Unavailable`].
    pub fn fail_on(&self, operation: &'static str) {
        self.failing.insert(operation);
    }

    pub fn recover(&self, operation: &'static str) {
        self.failing.remove(operation);
    }

    fn track(&self, operation: &'static str) -> StoreResult<()> {
        *self.calls.entry(operation).or_insert(0) += 1;
        if self.failing.contains(operation) {
            return Err(StoreError::Unavailable { operation });
        }
        Ok(())
    }

    fn follow_edges<F>(&self, keys: &[Uuid], split: F) -> Vec<(Uuid, User)>
    where
        F: Fn(&Subscription) -> (Uuid, Uuid),
    {
        let keys = keys.iter().collect::<HashSet<_>>();
        self.subscriptions
            .iter()
            .map(|edge| split(edge.key()))
            .filter(|(key, _)| keys.contains(key))
            .filter_map(|(key, other)| self.users.get(&other).map(|user| (key, user.clone())))
            .collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    #[instrument(skip(self))]
    async fn profiles_by_user_ids(&self, user_ids: &[Uuid]) -> StoreResult<Vec<Profile>> {
        self.track("profiles_by_user_ids")?;
        let keys = user_ids.iter().collect::<HashSet<_>>();
        Ok(self
            .profiles
            .iter()
            .filter(|profile| keys.contains(&profile.user_id))
            .map(|profile| profile.clone())
            .collect())
    }

    #[instrument(skip(self))]
    async fn posts_by_author_ids(&self, author_ids: &[Uuid]) -> StoreResult<Vec<Post>> {
        self.track("posts_by_author_ids")?;
        let keys = author_ids.iter().collect::<HashSet<_>>();
        Ok(self
            .posts
            .iter()
            .filter(|post| keys.contains(&post.author_id))
            .map(|post| post.clone())
            .collect())
    }

    #[instrument(skip(self))]
    async fn subscriptions_by_subscriber_ids(
        &self,
        subscriber_ids: &[Uuid],
    ) -> StoreResult<Vec<(Uuid, User)>> {
        self.track("subscriptions_by_subscriber_ids")?;
        Ok(self.follow_edges(subscriber_ids, |edge| (edge.subscriber_id, edge.author_id)))
    }

    #[instrument(skip(self))]
    async fn subscribers_by_author_ids(
        &self,
        author_ids: &[Uuid],
    ) -> StoreResult<Vec<(Uuid, User)>> {
        self.track("subscribers_by_author_ids")?;
        Ok(self.follow_edges(author_ids, |edge| (edge.author_id, edge.subscriber_id)))
    }

    #[instrument(skip(self))]
    async fn member_types_by_ids(&self, ids: &[MemberTypeId]) -> StoreResult<Vec<MemberType>> {
        self.track("member_types_by_ids")?;
        Ok(ids.iter().filter_map(|id| self.member_types.get(id).map(|m| m.clone())).collect())
    }

    #[instrument(skip(self))]
    async fn subscriptions_touching(&self, user_ids: &[Uuid]) -> StoreResult<Vec<Subscription>> {
        self.track("subscriptions_touching")?;
        let keys = user_ids.iter().collect::<HashSet<_>>();
        Ok(self
            .subscriptions
            .iter()
            .filter(|edge| keys.contains(&edge.subscriber_id) || keys.contains(&edge.author_id))
            .map(|edge| *edge)
            .collect())
    }

    async fn users(&self) -> StoreResult<Vec<User>> {
        self.track("users")?;
        let mut users = self.users.iter().map(|u| u.clone()).collect::<Vec<_>>();
        users.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn user(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.track("user")?;
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn posts(&self) -> StoreResult<Vec<Post>> {
        self.track("posts")?;
        let mut posts = self.posts.iter().map(|p| p.clone()).collect::<Vec<_>>();
        posts.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(posts)
    }

    async fn post(&self, id: Uuid) -> StoreResult<Option<Post>> {
        self.track("post")?;
        Ok(self.posts.get(&id).map(|p| p.clone()))
    }

    async fn profiles(&self) -> StoreResult<Vec<Profile>> {
        self.track("profiles")?;
        let mut profiles = self.profiles.iter().map(|p| p.clone()).collect::<Vec<_>>();
        profiles.sort_by_key(|p| p.id);
        Ok(profiles)
    }

    async fn profile(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        self.track("profile")?;
        Ok(self.profiles.get(&id).map(|p| p.clone()))
    }

    async fn member_types(&self) -> StoreResult<Vec<MemberType>> {
        self.track("member_types")?;
        let mut member_types = self.member_types.iter().map(|m| m.clone()).collect::<Vec<_>>();
        member_types.sort_by_key(|m| m.id);
        Ok(member_types)
    }

    async fn member_type(&self, id: MemberTypeId) -> StoreResult<Option<MemberType>> {
        self.track("member_type")?;
        Ok(self.member_types.get(&id).map(|m| m.clone()))
    }

    #[instrument(skip(self))]
    async fn create_user(&self, input: CreateUserInput) -> StoreResult<User> {
        self.track("create_user")?;
        let user = User { id: Uuid::new_v4(), name: input.name, balance: input.balance };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn update_user(&self, id: Uuid, input: ChangeUserInput) -> StoreResult<User> {
        self.track("update_user")?;
        let mut user = self.users.get_mut(&id).ok_or_else(|| StoreError::not_found("user", id))?;
        if let Some(name) = input.name {
            user.name = name;
        }
        if let Some(balance) = input.balance {
            user.balance = balance;
        }
        Ok(user.clone())
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, id: Uuid) -> StoreResult<()> {
        self.track("delete_user")?;
        if self.users.remove(&id).is_none() {
            return Err(StoreError::not_found("user", id));
        }
        self.profiles.retain(|_, profile| profile.user_id != id);
        self.posts.retain(|_, post| post.author_id != id);
        self.subscriptions.retain(|edge| edge.subscriber_id != id && edge.author_id != id);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn create_post(&self, input: CreatePostInput) -> StoreResult<Post> {
        self.track("create_post")?;
        if !self.users.contains_key(&input.author_id) {
            return Err(StoreError::not_found("user", input.author_id));
        }
        let post = Post {
            id: Uuid::new_v4(),
            title: input.title,
            content: input.content,
            author_id: input.author_id,
        };
        self.posts.insert(post.id, post.clone());
        Ok(post)
    }

    #[instrument(skip(self))]
    async fn update_post(&self, id: Uuid, input: ChangePostInput) -> StoreResult<Post> {
        self.track("update_post")?;
        let mut post = self.posts.get_mut(&id).ok_or_else(|| StoreError::not_found("post", id))?;
        if let Some(title) = input.title {
            post.title = title;
        }
        if let Some(content) = input.content {
            post.content = content;
        }
        Ok(post.clone())
    }

    #[instrument(skip(self))]
    async fn delete_post(&self, id: Uuid) -> StoreResult<()> {
        self.track("delete_post")?;
        self.posts.remove(&id).map(|_| ()).ok_or_else(|| StoreError::not_found("post", id))
    }

    #[instrument(skip(self))]
    async fn create_profile(&self, input: CreateProfileInput) -> StoreResult<Profile> {
        self.track("create_profile")?;
        if !self.users.contains_key(&input.user_id) {
            return Err(StoreError::not_found("user", input.user_id));
        }
        if !self.member_types.contains_key(&input.member_type_id) {
            return Err(StoreError::not_found("member type", input.member_type_id.as_str()));
        }
        if self.profiles.iter().any(|profile| profile.user_id == input.user_id) {
            return Err(StoreError::Conflict {
                message: format!("user {} already has a profile", input.user_id),
            });
        }
        let profile = Profile {
            id: Uuid::new_v4(),
            is_male: input.is_male,
            year_of_birth: input.year_of_birth,
            user_id: input.user_id,
            member_type_id: input.member_type_id,
        };
        self.profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }

    #[instrument(skip(self))]
    async fn update_profile(&self, id: Uuid, input: ChangeProfileInput) -> StoreResult<Profile> {
        self.track("update_profile")?;
        if let Some(member_type_id) = input.member_type_id {
            if !self.member_types.contains_key(&member_type_id) {
                return Err(StoreError::not_found("member type", member_type_id.as_str()));
            }
        }
        let mut profile =
            self.profiles.get_mut(&id).ok_or_else(|| StoreError::not_found("profile", id))?;
        if let Some(member_type_id) = input.member_type_id {
            profile.member_type_id = member_type_id;
        }
        if let Some(is_male) = input.is_male {
            profile.is_male = is_male;
        }
        if let Some(year_of_birth) = input.year_of_birth {
            profile.year_of_birth = year_of_birth;
        }
        Ok(profile.clone())
    }

    #[instrument(skip(self))]
    async fn delete_profile(&self, id: Uuid) -> StoreResult<()> {
        self.track("delete_profile")?;
        self.profiles.remove(&id).map(|_| ()).ok_or_else(|| StoreError::not_found("profile", id))
    }

    #[instrument(skip(self))]
    async fn subscribe(&self, subscriber_id: Uuid, author_id: Uuid) -> StoreResult<User> {
        self.track("subscribe")?;
        if !self.users.contains_key(&author_id) {
            return Err(StoreError::not_found("user", author_id));
        }
        let subscriber = self
            .users
            .get(&subscriber_id)
            .map(|user| user.clone())
            .ok_or_else(|| StoreError::not_found("user", subscriber_id))?;
        self.subscriptions.insert(Subscription { subscriber_id, author_id });
        Ok(subscriber)
    }

    #[instrument(skip(self))]
    async fn unsubscribe(&self, subscriber_id: Uuid, author_id: Uuid) -> StoreResult<()> {
        self.track("unsubscribe")?;
        self.subscriptions
            .remove(&Subscription { subscriber_id, author_id })
            .map(|_| ())
            .ok_or_else(|| {
                StoreError::not_found("subscription", format!("{subscriber_id}->{author_id}"))
            })
    }
}
