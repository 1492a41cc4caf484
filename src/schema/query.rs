use std::collections::{HashMap, HashSet};

use async_graphql::{Context, Object, Result};
use uuid::Uuid;

use super::{registry, store};
use crate::model::{MemberType, MemberTypeId, Post, Profile, Subscription, User};
use crate::registry::LoaderRegistry;
use crate::relations::{SubscribersOfUser, SubscriptionsOfUser};

#[derive(Debug, Default, Clone, Copy)]
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn member_types(&self, ctx: &Context<'_>) -> Result<Option<Vec<MemberType>>> {
        Ok(Some(store(ctx)?.member_types().await?))
    }

    async fn member_type(
        &self,
        ctx: &Context<'_>,
        id: MemberTypeId,
    ) -> Result<Option<MemberType>> {
        Ok(store(ctx)?.member_type(id).await?)
    }

    async fn posts(&self, ctx: &Context<'_>) -> Result<Option<Vec<Post>>> {
        Ok(Some(store(ctx)?.posts().await?))
    }

    async fn post(&self, ctx: &Context<'_>, id: Uuid) -> Result<Option<Post>> {
        Ok(store(ctx)?.post(id).await?)
    }

    /// Every user. When the selection asks for subscriptions, both subscription loaders are
    /// primed from one edge query so the per-user fields resolve without another store trip.
    async fn users(&self, ctx: &Context<'_>) -> Result<Option<Vec<User>>> {
        let users = store(ctx)?.users().await?;
        let wants_subscriptions = {
            let selection = ctx.look_ahead();
            selection.field("userSubscribedTo").exists()
                || selection.field("subscribedToUser").exists()
        };
        if wants_subscriptions {
            prime_subscriptions(registry(ctx)?, &users).await;
        }
        Ok(Some(users))
    }

    async fn user(&self, ctx: &Context<'_>, id: Uuid) -> Result<Option<User>> {
        Ok(store(ctx)?.user(id).await?)
    }

    async fn profiles(&self, ctx: &Context<'_>) -> Result<Option<Vec<Profile>>> {
        Ok(Some(store(ctx)?.profiles().await?))
    }

    async fn profile(&self, ctx: &Context<'_>, id: Uuid) -> Result<Option<Profile>> {
        Ok(store(ctx)?.profile(id).await?)
    }
}

async fn prime_subscriptions(registry: &LoaderRegistry, users: &[User]) {
    let ids = users.iter().map(|user| user.id).collect::<Vec<_>>();
    let edges = match registry.store().subscriptions_touching(&ids).await {
        Ok(edges) => edges,
        Err(e) => {
            tracing::warn!(error = %e, "subscription priming skipped");
            return;
        }
    };
    let page = users.iter().map(|user| (user.id, user)).collect::<HashMap<_, _>>();

    let following = adjacency(&page, &edges, |edge| (edge.subscriber_id, edge.author_id));
    let followers = adjacency(&page, &edges, |edge| (edge.author_id, edge.subscriber_id));
    tracing::debug!(users = ids.len(), edges = edges.len(), "priming subscription loaders");

    let primed = registry
        .get_or_create::<SubscriptionsOfUser>()
        .prime_many(following)
        .and_then(|_| registry.get_or_create::<SubscribersOfUser>().prime_many(followers));
    if let Err(e) = primed {
        tracing::warn!(error = %e, "subscription priming failed");
    }
}

/// Builds each page user's list of neighbours along `edges`.
///
/// A user with a neighbour outside the page is left out, its list would be incomplete.
fn adjacency<F>(
    page: &HashMap<Uuid, &User>,
    edges: &[Subscription],
    split: F,
) -> Vec<(Uuid, Vec<User>)>
where
    F: Fn(&Subscription) -> (Uuid, Uuid),
{
    let mut lists = page.keys().map(|id| (*id, Vec::new())).collect::<HashMap<_, _>>();
    let mut partial = HashSet::new();
    for (from, to) in edges.iter().map(split) {
        let Some(list) = lists.get_mut(&from) else { continue };
        match page.get(&to) {
            Some(user) => list.push((*user).clone()),
            None => {
                partial.insert(from);
            }
        }
    }
    lists.into_iter().filter(|(id, _)| !partial.contains(id)).collect()
}
