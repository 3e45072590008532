mod support;

use axum::http::StatusCode;
use quire::application::repos::PostsWriteRepo;
use support::TestApp;

#[tokio::test]
async fn home_page_is_served_stale_until_the_cache_is_cleared() {
    let app = TestApp::with_home_cache();
    let author = app.user("leo").await;
    app.post(&author, "before the snapshot", None).await;

    let first = app.get("/", None).await;
    assert_eq!(first.status, StatusCode::OK);
    assert!(first.body.contains("before the snapshot"));

    app.post(&author, "written after the snapshot", None).await;

    let cached = app.get("/", None).await;
    assert_eq!(cached.body, first.body);
    assert!(!cached.body.contains("written after the snapshot"));

    app.cache.as_ref().expect("cache").store.clear();

    let refreshed = app.get("/", None).await;
    assert!(refreshed.body.contains("written after the snapshot"));
}

#[tokio::test]
async fn deleted_posts_stay_visible_until_the_cache_is_cleared() {
    let app = TestApp::with_home_cache();
    let author = app.user("leo").await;
    let posts = [
        app.post(&author, "first to go", None).await,
        app.post(&author, "second to go", None).await,
    ];

    let first = app.get("/", None).await;
    assert_eq!(first.card_count(), 2);

    for post in &posts {
        app.repos.delete_post(post.id).await.expect("delete");
    }

    let cached = app.get("/", None).await;
    assert_eq!(cached.body, first.body);

    app.cache.as_ref().expect("cache").store.clear();

    let refreshed = app.get("/", None).await;
    assert_eq!(refreshed.card_count(), 0);
    assert!(refreshed.body.contains("No posts yet."));
}

#[tokio::test]
async fn cached_home_page_ignores_query_and_viewer() {
    let app = TestApp::with_home_cache();
    let author = app.user("leo").await;
    for n in 1..=13 {
        app.post(&author, &format!("post number {n}"), None).await;
    }
    let cookie = app.sign_in(&author).await;

    let first = app.get("/", None).await;
    let second_page = app.get("/?page=2", None).await;
    let signed_in = app.get("/", Some(&cookie)).await;

    assert_eq!(second_page.body, first.body);
    assert_eq!(signed_in.body, first.body);
    assert_eq!(first.card_count(), 10);
}

#[tokio::test]
async fn other_pages_are_never_cached() {
    let app = TestApp::with_home_cache();
    let author = app.user("leo").await;
    app.post(&author, "first", None).await;

    let before = app.get("/profile/leo/", None).await;
    assert!(before.body.contains("Posts: 1"));

    app.post(&author, "second", None).await;
    let after = app.get("/profile/leo/", None).await;
    assert!(after.body.contains("Posts: 2"));
    assert_eq!(app.cache.as_ref().expect("cache").store.len(), 0);
}

#[tokio::test]
async fn without_a_cache_every_request_is_fresh() {
    let app = TestApp::new();
    let author = app.user("leo").await;

    assert!(app.get("/", None).await.body.contains("No posts yet."));
    app.post(&author, "fresh post", None).await;
    assert!(app.get("/", None).await.body.contains("fresh post"));
}
