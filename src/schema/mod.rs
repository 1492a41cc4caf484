//! The graph's resolvers.
//!
//! Relational fields never query the store directly. They look up the request's
//! [`LoaderRegistry`] and load through the loader of their relation kind, so sibling resolvers
//! polled together share one bulk fetch.

mod mutation;
mod query;
mod resolvers;

use async_graphql::{Context, EmptySubscription, Result, Schema};

use crate::config::GraphConfig;
use crate::registry::LoaderRegistry;
use crate::store::StoreHandle;

pub use mutation::MutationRoot;
pub use query::QueryRoot;

pub type GraphSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Builds the schema. Queries nested deeper than `config.max_depth` are rejected during
/// validation, before any resolver runs.
pub fn build_schema(store: StoreHandle, config: &GraphConfig) -> GraphSchema {
    // `max_depth` counts levels below the root fields; async-graphql counts the root as level 1.
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(store)
        .limit_depth(config.max_depth + 1)
        .finish()
}

fn registry<'ctx>(ctx: &Context<'ctx>) -> Result<&'ctx LoaderRegistry> {
    ctx.data::<LoaderRegistry>()
}

fn store<'ctx>(ctx: &Context<'ctx>) -> Result<&'ctx StoreHandle> {
    ctx.data::<StoreHandle>()
}
