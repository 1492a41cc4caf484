use std::fmt;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::OnceLock;

use uuid::Uuid;

use crate::batch_function::BatchFunction;
use crate::config::LoaderConfig;
use crate::loader::Loader;
use crate::model::{MemberType, MemberTypeId, Post, Profile, User};
use crate::store::StoreHandle;

/// The closed set of relations the graph resolves through loaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelationKind {
    ProfileByUserId,
    PostsByAuthorId,
    /// Authors a user is subscribed to.
    SubscriptionsOfUser,
    /// Users subscribed to an author.
    SubscribersOfUser,
    MemberTypeById,
}

impl RelationKind {
    pub const ALL: [RelationKind; 5] = [
        RelationKind::ProfileByUserId,
        RelationKind::PostsByAuthorId,
        RelationKind::SubscriptionsOfUser,
        RelationKind::SubscribersOfUser,
        RelationKind::MemberTypeById,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::ProfileByUserId => "profile-by-user-id",
            RelationKind::PostsByAuthorId => "posts-by-author-id",
            RelationKind::SubscriptionsOfUser => "following-of-user",
            RelationKind::SubscribersOfUser => "followers-of-user",
            RelationKind::MemberTypeById => "member-type-by-id",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binds a [`RelationKind`] to its key and value types and to its slot in a [`LoaderRegistry`].
///
/// Implementors are also the [`BatchFunction`] of their kind, which is how a kind is tied to its
/// bulk fetch and partitioning at compile time.
pub trait Relation: Default + Send + 'static {
    const KIND: RelationKind;
    type Key: 'static + Eq + Hash + Clone + Debug + Send + Sync;
    type Value: 'static + Clone + Debug + Send + Sync;

    fn slot(loaders: &Loaders) -> &OnceLock<Loader<Self::Key, Self::Value>>;
}

/// One lazily created loader per relation kind.
#[derive(Default)]
pub struct Loaders {
    pub(crate) profile_by_user_id: OnceLock<Loader<Uuid, Profile>>,
    pub(crate) posts_by_author_id: OnceLock<Loader<Uuid, Vec<Post>>>,
    pub(crate) subscriptions_of_user: OnceLock<Loader<Uuid, Vec<User>>>,
    pub(crate) subscribers_of_user: OnceLock<Loader<Uuid, Vec<User>>>,
    pub(crate) member_type_by_id: OnceLock<Loader<MemberTypeId, MemberType>>,
}

impl Loaders {
    fn is_created(&self, kind: RelationKind) -> bool {
        match kind {
            RelationKind::ProfileByUserId => self.profile_by_user_id.get().is_some(),
            RelationKind::PostsByAuthorId => self.posts_by_author_id.get().is_some(),
            RelationKind::SubscriptionsOfUser => self.subscriptions_of_user.get().is_some(),
            RelationKind::SubscribersOfUser => self.subscribers_of_user.get().is_some(),
            RelationKind::MemberTypeById => self.member_type_by_id.get().is_some(),
        }
    }
}

/// Request-scoped owner of every loader used while resolving one top-level request.
///
/// Build a fresh registry per request and drop it when the response is ready: dropping it drops
/// the loaders, which stops their workers and discards their caches. Nothing is shared between
/// registries, so cached results never leak from one caller to another.
pub struct LoaderRegistry {
    store: StoreHandle,
    config: LoaderConfig,
    loaders: Loaders,
}

impl LoaderRegistry {
    pub fn new(store: StoreHandle, config: LoaderConfig) -> Self {
        Self { store, config, loaders: Loaders::default() }
    }

    /// Returns the loader for relation `R`, creating it on first use.
    ///
    /// Must be called from within a tokio runtime.
    pub fn get_or_create<R>(&self) -> &Loader<R::Key, R::Value>
    where
        R: Relation + BatchFunction<R::Key, R::Value, Context = StoreHandle>,
    {
        R::slot(&self.loaders).get_or_init(|| {
            tracing::debug!(kind = %R::KIND, "creating loader");
            Loader::with_config(R::default(), self.store.clone(), self.config)
        })
    }

    /// Returns the loader for relation `R` only if this request already created it.
    pub fn get<R: Relation>(&self) -> Option<&Loader<R::Key, R::Value>> {
        R::slot(&self.loaders).get()
    }

    /// Drops every cached entry of relation `R`, if its loader exists.
    pub fn invalidate<R: Relation>(&self) {
        if let Some(loader) = self.get::<R>() {
            if let Err(e) = loader.clear_all() {
                tracing::warn!(kind = %R::KIND, error = %e, "failed to invalidate loader");
            }
        }
    }

    pub fn contains(&self, kind: RelationKind) -> bool {
        self.loaders.is_created(kind)
    }

    /// Kinds whose loader has been created so far, in declaration order.
    pub fn created_kinds(&self) -> Vec<RelationKind> {
        RelationKind::ALL.into_iter().filter(|kind| self.contains(*kind)).collect()
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }
}

impl Debug for LoaderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderRegistry")
            .field("config", &self.config)
            .field("loaders", &self.created_kinds())
            .finish()
    }
}
