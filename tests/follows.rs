mod support;

use axum::http::StatusCode;
use quire::application::repos::FollowsRepo;
use support::TestApp;

#[tokio::test]
async fn following_is_idempotent_and_redirects_to_the_profile() {
    let app = TestApp::new();
    let leo = app.user("leo").await;
    let mia = app.user("mia").await;
    let cookie = app.sign_in(&mia).await;

    for _ in 0..2 {
        let response = app.get("/profile/leo/follow/", Some(&cookie)).await;
        assert_eq!(response.status, StatusCode::SEE_OTHER);
        assert_eq!(response.location(), "/profile/leo/");
    }

    assert!(app.repos.is_following(mia.id, leo.id).await.expect("edge"));

    let profile = app.get("/profile/leo/", Some(&cookie)).await;
    assert!(profile.body.contains(">Unfollow<"));
}

#[tokio::test]
async fn following_yourself_creates_no_edge() {
    let app = TestApp::new();
    let leo = app.user("leo").await;
    let cookie = app.sign_in(&leo).await;

    let response = app.get("/profile/leo/follow/", Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), "/profile/leo/");
    assert!(!app.repos.is_following(leo.id, leo.id).await.expect("edge"));

    let profile = app.get("/profile/leo/", Some(&cookie)).await;
    assert!(!profile.body.contains(">Follow<"));
}

#[tokio::test]
async fn unfollow_removes_the_edge_and_tolerates_repeats() {
    let app = TestApp::new();
    let leo = app.user("leo").await;
    let mia = app.user("mia").await;
    let cookie = app.sign_in(&mia).await;
    app.get("/profile/leo/follow/", Some(&cookie)).await;

    for _ in 0..2 {
        let response = app.get("/profile/leo/unfollow/", Some(&cookie)).await;
        assert_eq!(response.status, StatusCode::SEE_OTHER);
        assert_eq!(response.location(), "/profile/leo/");
    }
    assert!(!app.repos.is_following(mia.id, leo.id).await.expect("edge"));
}

#[tokio::test]
async fn follow_routes_require_a_known_author_and_a_session() {
    let app = TestApp::new();
    let mia = app.user("mia").await;
    let cookie = app.sign_in(&mia).await;

    let unknown = app.get("/profile/nobody/follow/", Some(&cookie)).await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    let unknown = app.get("/profile/nobody/unfollow/", Some(&cookie)).await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let anonymous = app.get("/profile/mia/follow/", None).await;
    assert_eq!(anonymous.status, StatusCode::SEE_OTHER);
    assert_eq!(anonymous.location(), "/auth/login/?next=/profile/mia/follow/");
}

#[tokio::test]
async fn follow_feed_lists_only_followed_authors() {
    let app = TestApp::new();
    let leo = app.user("leo").await;
    let ann = app.user("ann").await;
    let mia = app.user("mia").await;
    app.post(&leo, "leo was here", None).await;
    app.post(&ann, "ann was here", None).await;
    let mia_cookie = app.sign_in(&mia).await;
    let ann_cookie = app.sign_in(&ann).await;

    app.get("/profile/leo/follow/", Some(&mia_cookie)).await;

    let feed = app.get("/follow/", Some(&mia_cookie)).await;
    assert_eq!(feed.status, StatusCode::OK);
    assert_eq!(feed.card_count(), 1);
    assert!(feed.body.contains("leo was here"));
    assert!(!feed.body.contains("ann was here"));

    let empty = app.get("/follow/", Some(&ann_cookie)).await;
    assert_eq!(empty.card_count(), 0);
    assert!(empty.body.contains("No posts yet."));

    let anonymous = app.get("/follow/", None).await;
    assert_eq!(anonymous.location(), "/auth/login/?next=/follow/");
}
