use std::sync::Arc;
use std::time::Duration;

use super::cache::{QueryCache, QueryKey};
use super::gateway::{BlogClient, GatewayError};
use super::types::{NewPost, Post, PostPatch};

/// Cached data access for posts.
///
/// Reads go through two typed caches keyed by [`QueryKey`]; mutations go
/// straight to the gateway and invalidate the keys they affect on success.
#[derive(Clone)]
pub struct BlogQueries {
    client: BlogClient,
    lists: QueryCache<Arc<Vec<Post>>>,
    details: QueryCache<Arc<Post>>,
}

impl BlogQueries {
    pub fn new(client: BlogClient, stale_after: Duration, capacity: usize) -> Self {
        Self {
            client,
            lists: QueryCache::new(stale_after, 1),
            details: QueryCache::new(stale_after, capacity),
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Full collection, cached under [`QueryKey::AllPosts`].
    pub async fn list_posts(&self) -> Result<Arc<Vec<Post>>, GatewayError> {
        let client = self.client.clone();
        self.lists
            .fetch(QueryKey::AllPosts, move || {
                let client = client.clone();
                async move { client.list_posts().await.map(Arc::new) }
            })
            .await
    }

    /// One post, cached under [`QueryKey::Post`].
    pub async fn get_post(&self, id: &str) -> Result<Arc<Post>, GatewayError> {
        let client = self.client.clone();
        let owned_id = id.to_string();
        self.details
            .fetch(QueryKey::Post(id.to_string()), move || {
                let client = client.clone();
                let id = owned_id.clone();
                async move { client.get_post(&id).await.map(Arc::new) }
            })
            .await
    }

    pub fn cached_posts(&self) -> Option<Arc<Vec<Post>>> {
        self.lists.get(&QueryKey::AllPosts)
    }

    pub fn cached_post(&self, id: &str) -> Option<Arc<Post>> {
        self.details.get(&QueryKey::Post(id.to_string()))
    }

    pub fn posts_revision(&self) -> u64 {
        self.lists.revision(&QueryKey::AllPosts)
    }

    /// Mark the list stale so the next read refetches.
    pub fn invalidate_posts(&self) {
        self.lists.invalidate(&QueryKey::AllPosts);
    }

    // ========================================================================
    // Mutations (never retried)
    // ========================================================================

    pub async fn create_post(&self, input: &NewPost) -> Result<Post, GatewayError> {
        let created = self.client.create_post(input).await?;
        tracing::info!(post_id = %created.id, "Created post");
        self.lists.invalidate(&QueryKey::AllPosts);
        Ok(created)
    }

    pub async fn update_post(&self, id: &str, patch: &PostPatch) -> Result<Post, GatewayError> {
        let updated = self.client.update_post(id, patch).await?;
        tracing::info!(post_id = %id, "Updated post");
        self.lists.invalidate(&QueryKey::AllPosts);
        self.details.invalidate(&QueryKey::Post(id.to_string()));
        Ok(updated)
    }

    pub async fn delete_post(&self, id: &str) -> Result<(), GatewayError> {
        self.client.delete_post(id).await?;
        tracing::info!(post_id = %id, "Deleted post");
        self.lists.invalidate(&QueryKey::AllPosts);
        self.details.remove(&QueryKey::Post(id.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn post_json(id: &str, title: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "title": title,
            "description": "Twenty characters at least here",
            "content": "Body",
            "coverImage": "https://images.example.com/a.jpg",
            "category": ["CAREER"],
            "date": "2024-03-01"
        })
    }

    fn queries_for(server: &MockServer) -> BlogQueries {
        let client = BlogClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
        BlogQueries::new(client, Duration::from_secs(300), 16)
    }

    #[tokio::test]
    async fn test_repeated_list_reads_hit_network_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blogs"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!([post_json("1", "A")])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let queries = queries_for(&server);
        let (a, b) = tokio::join!(queries.list_posts(), queries.list_posts());
        assert_eq!(a.unwrap().len(), 1);
        assert_eq!(b.unwrap().len(), 1);
        assert_eq!(queries.list_posts().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_post_is_retried_once_then_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blogs/404"))
            .respond_with(ResponseTemplate::new(404))
            .expect(2)
            .mount(&server)
            .await;

        let err = queries_for(&server).get_post("404").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_failed_mutation_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/blogs/1"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let queries = queries_for(&server);
        let err = queries.delete_post("1").await.unwrap_err();
        assert_eq!(err, GatewayError::Status { status: 500 });
    }

    #[tokio::test]
    async fn test_update_invalidates_list_and_detail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blogs/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(post_json("1", "Old")))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/blogs/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(post_json("1", "New")))
            .expect(1)
            .mount(&server)
            .await;

        let queries = queries_for(&server);
        assert_eq!(queries.get_post("1").await.unwrap().title, "Old");

        let patch = PostPatch {
            title: Some("New".into()),
            ..PostPatch::default()
        };
        queries.update_post("1", &patch).await.unwrap();
        assert!(!queries.details.is_fresh(&QueryKey::Post("1".into())));
        assert!(!queries.lists.is_fresh(&QueryKey::AllPosts));
    }
}
