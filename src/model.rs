//! Records exposed through the graph.

use async_graphql::{Enum, InputObject, SimpleObject};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberTypeId {
    #[graphql(name = "basic")]
    Basic,
    #[graphql(name = "business")]
    Business,
}

impl MemberTypeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberTypeId::Basic => "basic",
            MemberTypeId::Business => "business",
        }
    }
}

#[derive(SimpleObject, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[graphql(name = "Member_Type")]
pub struct MemberType {
    pub id: MemberTypeId,
    pub discount: f64,
    pub posts_limit_per_month: i32,
}

#[derive(SimpleObject, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[graphql(complex)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub balance: f64,
}

#[derive(SimpleObject, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[graphql(complex)]
pub struct Profile {
    pub id: Uuid,
    pub is_male: bool,
    pub year_of_birth: i32,
    #[graphql(skip)]
    pub user_id: Uuid,
    #[graphql(skip)]
    pub member_type_id: MemberTypeId,
}

#[derive(SimpleObject, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    #[graphql(skip)]
    pub author_id: Uuid,
}

/// A subscription edge: `subscriber_id` follows `author_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subscription {
    pub subscriber_id: Uuid,
    pub author_id: Uuid,
}

#[derive(InputObject, Debug, Clone)]
pub struct CreateUserInput {
    pub name: String,
    pub balance: f64,
}

#[derive(InputObject, Debug, Clone, Default)]
pub struct ChangeUserInput {
    pub name: Option<String>,
    pub balance: Option<f64>,
}

#[derive(InputObject, Debug, Clone)]
pub struct CreatePostInput {
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
}

#[derive(InputObject, Debug, Clone, Default)]
pub struct ChangePostInput {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(InputObject, Debug, Clone)]
pub struct CreateProfileInput {
    pub user_id: Uuid,
    pub member_type_id: MemberTypeId,
    pub is_male: bool,
    pub year_of_birth: i32,
}

#[derive(InputObject, Debug, Clone, Default)]
pub struct ChangeProfileInput {
    pub member_type_id: Option<MemberTypeId>,
    pub is_male: Option<bool>,
    pub year_of_birth: Option<i32>,
}
