use std::sync::Arc;
use std::time::Duration;

use blog_client::{
    BlogClient, ClientConfig, LoadStatus, NewPost, PostStore, StaticSession, UserProfile,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn post_json(id: &str, author_id: &str) -> serde_json::Value {
    json!({
        "_id": id,
        "authorId": author_id,
        "author": format!("{author_id} name"),
        "content": format!("content of {id}"),
        "createdAt": "2024-05-01T10:00:00Z"
    })
}

fn collection(count: usize) -> serde_json::Value {
    json!((0..count)
        .map(|i| post_json(&format!("p{i}"), if i % 2 == 0 { "u1" } else { "u2" }))
        .collect::<Vec<_>>())
}

fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig::new()
        .base_url(server.uri())
        .retry_base_delay(Duration::from_millis(5))
        .page_size(10)
}

#[tokio::test]
async fn feed_pages_through_a_single_fetch() {
    init_logging();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(collection(25)))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let client = Arc::new(BlogClient::anonymous(&config).expect("client build"));
    let feed = PostStore::all_posts(client, &config);

    let mut pages = Vec::new();
    for _ in 0..3 {
        feed.load_more().await.expect("load more");
        pages.push((feed.posts().len(), feed.has_more()));
    }

    assert_eq!(pages, vec![(10, true), (20, true), (25, false)]);
    let snapshot = feed.snapshot();
    assert_eq!(snapshot.status, LoadStatus::Ready);
    assert_eq!(snapshot.buffered, 25);
    assert_eq!(snapshot.posts[24].id, "p24");
}

#[tokio::test]
async fn refresh_refetches_from_the_first_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(collection(15)))
        .expect(2)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let client = Arc::new(BlogClient::anonymous(&config).expect("client build"));
    let feed = PostStore::all_posts(client, &config);

    feed.fetch_posts().await.expect("fetch");
    feed.load_more().await.expect("load more");
    assert_eq!(feed.posts().len(), 15);
    assert_eq!(feed.page(), 2);

    feed.refresh().await.expect("refresh");
    assert_eq!(feed.posts().len(), 10);
    assert_eq!(feed.page(), 1);
    assert!(feed.has_more());
}

#[tokio::test]
async fn user_feed_shows_only_own_posts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(collection(6)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/posts"))
        .respond_with(ResponseTemplate::new(201).set_body_json(post_json("mine", "u1")))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let session = Arc::new(StaticSession::new("id-token", UserProfile::new("u1")));
    let client = Arc::new(BlogClient::new(&config, session.clone()).expect("client build"));
    let feed = PostStore::user_posts(client, session, &config);

    feed.fetch_posts().await.expect("fetch");
    let ids: Vec<_> = feed.posts().into_iter().map(|post| post.id).collect();
    assert_eq!(ids, vec!["p0", "p2", "p4"]);

    feed.create_post(&NewPost::new("fresh", ["news"]))
        .await
        .expect("create");
    assert_eq!(feed.posts()[0].id, "mine");
    assert_eq!(feed.posts().len(), 4);
}

#[tokio::test]
async fn failed_fetch_surfaces_the_server_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/posts"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "message": "Database unavailable" })),
        )
        .expect(3)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let client = Arc::new(BlogClient::anonymous(&config).expect("client build"));
    let feed = PostStore::all_posts(client, &config);

    let err = feed.fetch_posts().await.expect_err("server down");

    assert_eq!(err.status(), Some(500));
    assert_eq!(feed.status(), LoadStatus::Error);
    assert_eq!(feed.error().as_deref(), Some("Database unavailable"));
    assert!(feed.posts().is_empty());
}

#[tokio::test]
async fn delete_syncs_local_state_after_server_confirms() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(collection(12)))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/posts/p3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "Post deleted" })))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let session = Arc::new(StaticSession::new("id-token", UserProfile::new("u2")));
    let client = Arc::new(BlogClient::new(&config, session).expect("client build"));
    let feed = PostStore::all_posts(client, &config);

    feed.fetch_posts().await.expect("fetch");
    feed.delete_post("p3").await.expect("delete");

    assert_eq!(feed.posts().len(), 9);
    assert_eq!(feed.buffered_len(), 11);
    assert!(feed.posts().iter().all(|post| post.id != "p3"));
    assert!(feed.has_more());
}
