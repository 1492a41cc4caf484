//! Request-scoped batching and deduplication for resolving a graph of users, profiles, posts,
//! member types and subscriptions.
//!
//! Relational fields load through a [`Loader`] per relation kind, owned by a [`LoaderRegistry`]
//! that lives for exactly one request. Loads issued in the same execution frame are coalesced into
//! a single bulk fetch against the [`Store`].

mod batch_function;
mod cache;
mod collector;
mod config;
mod error;
mod executor;
mod loader;
mod loader_op;
mod loader_worker;
mod model;
mod partition;
mod registry;
mod relations;
mod schema;
mod service;
mod store;
mod worker_stats;

pub use batch_function::{Batch, BatchFunction};
pub use config::{ConfigError, GraphConfig, LoaderConfig, MULTI_THREAD_BATCH_DELAY};
pub use error::{LoadError, LoadResult};
pub use loader::Loader;
pub use model::{
    ChangePostInput, ChangeProfileInput, ChangeUserInput, CreatePostInput, CreateProfileInput,
    CreateUserInput, MemberType, MemberTypeId, Post, Profile, Subscription, User,
};
pub use partition::{group_by, index_by};
pub use registry::{LoaderRegistry, Loaders, Relation, RelationKind};
pub use relations::{
    MemberTypeById, PostsByAuthorId, ProfileByUserId, SubscribersOfUser, SubscriptionsOfUser,
};
pub use schema::{build_schema, GraphSchema, MutationRoot, QueryRoot};
pub use service::{GraphService, QueryError, QueryRequest, QueryResponse};
pub use store::{MemoryStore, Store, StoreError, StoreHandle, StoreResult};
pub use worker_stats::BatchStats;
