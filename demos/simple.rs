use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use graphload::{
    Batch, BatchFunction, GraphConfig, GraphService, LoadError, Loader, MemoryStore, Post,
    QueryRequest, User,
};
use uuid::Uuid;

// Empty functor that implements the BatchFunction trait. For this example, it
// trivially loads values from some HashMap.
struct MyBatchFn;

#[async_trait]
impl BatchFunction<i64, String> for MyBatchFn {
    type Context = HashMap<i64, String>;

    async fn load(keys: &[i64], context: &Self::Context) -> Result<Batch<i64, String>, LoadError> {
        let found = keys.iter().filter_map(|k| context.get(k).cloned().map(|v| (*k, v)));
        Ok(found.collect::<Vec<_>>().into())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("graphload=debug").init();

    let mut context = HashMap::new();
    context.insert(2001, "a space odyssey".to_owned());
    context.insert(7, "samurai".to_owned());
    context.insert(12, "angry men".to_owned());

    let loader = Loader::new(MyBatchFn, context);
    assert_eq!(loader.load(7).await?.as_deref(), Some("samurai"));
    assert_eq!(loader.load(15).await?, None);
    let films = loader.load_many(vec![12, 2010, 2001]).await;
    println!("{:?}", films);
    println!("{:?}", loader.stats().await?);

    let store = Arc::new(MemoryStore::new());
    for name in ["ada", "grace", "edsger"] {
        let author = User { id: Uuid::new_v4(), name: name.to_owned(), balance: 0.0 };
        store.insert_post(Post {
            id: Uuid::new_v4(),
            title: format!("notes by {}", name),
            content: String::new(),
            author_id: author.id,
        });
        store.insert_user(author);
    }

    let service = GraphService::new(store.clone(), GraphConfig::from_env()?);
    let response = service.execute(QueryRequest::new("{ users { name posts { title } } }")).await;
    println!("{}", serde_json::to_string_pretty(&response)?);
    println!("posts fetched in {} store call(s)", store.calls("posts_by_author_ids"));
    Ok(())
}
