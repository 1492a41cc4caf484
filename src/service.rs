use std::sync::Arc;

use async_graphql::{PathSegment, Request, Variables};
use serde::{Deserialize, Serialize};

use crate::config::GraphConfig;
use crate::registry::LoaderRegistry;
use crate::schema::{build_schema, GraphSchema};
use crate::store::StoreHandle;

/// A query as received from the transport.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<serde_json::Value>,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), variables: None }
    }

    pub fn with_variables(mut self, variables: serde_json::Value) -> Self {
        self.variables = Some(variables);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct QueryResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<QueryError>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct QueryError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<serde_json::Value>,
}

/// Entry point for executing queries against a store.
///
/// The schema is built once; every call to [`GraphService::execute`] gets its own
/// [`LoaderRegistry`], which is dropped with the request.
#[derive(Clone)]
pub struct GraphService {
    schema: GraphSchema,
    store: StoreHandle,
    config: Arc<GraphConfig>,
}

impl GraphService {
    pub fn new(store: StoreHandle, config: GraphConfig) -> Self {
        Self { schema: build_schema(store.clone(), &config), store, config: Arc::new(config) }
    }

    #[tracing::instrument(skip_all, fields(query_len = request.query.len()))]
    pub async fn execute(&self, request: QueryRequest) -> QueryResponse {
        let registry = LoaderRegistry::new(self.store.clone(), self.config.loader);
        let mut gql_request = Request::new(request.query).data(registry);
        if let Some(variables) = request.variables {
            gql_request = gql_request.variables(Variables::from_json(variables));
        }

        let response = self.schema.execute(gql_request).await;

        let errors = response
            .errors
            .into_iter()
            .map(|error| QueryError {
                message: error.message,
                path: error.path.into_iter().map(path_segment).collect(),
            })
            .collect::<Vec<_>>();
        let data = match response.data.into_json() {
            Ok(serde_json::Value::Null) => None,
            Ok(data) => Some(data),
            Err(e) => {
                tracing::error!(error = %e, "response data is not representable as JSON");
                None
            }
        };
        tracing::info!(errors = errors.len(), has_data = data.is_some(), "query executed");
        QueryResponse { data, errors }
    }
}

fn path_segment(segment: PathSegment) -> serde_json::Value {
    match segment {
        PathSegment::Field(name) => serde_json::Value::String(name),
        PathSegment::Index(index) => serde_json::Value::from(index),
    }
}
