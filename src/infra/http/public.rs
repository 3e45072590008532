use std::io::ErrorKind;

use axum::{
    body::Body,
    extract::{Path, RawQuery, State},
    http::{
        HeaderValue, StatusCode, Uri,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use tracing::error;
use url::form_urlencoded;

use crate::{
    application::{error::HttpError, feed::FeedError},
    infra::uploads::UploadStorageError,
    presentation::views::{
        AboutAuthorTemplate, AboutTechTemplate, ErrorPageView, GroupTemplate, GroupView,
        IndexTemplate, LayoutChrome, LayoutContext, ListingView, NotFoundTemplate,
        PostDetailTemplate, PostDetailView, ProfileTemplate, ProfileView,
        render_not_found_response, render_template_response,
    },
};

use super::{HttpState, auth::Viewer, db_health_response, parse_id, repo_error_response};

/// First `page` value of the raw query string, if any.
pub(super) fn page_param(query: Option<&str>) -> Option<String> {
    form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == "page")
        .map(|(_, value)| value.into_owned())
}

pub(super) fn feed_error_to_response(err: FeedError, chrome: LayoutChrome) -> Response {
    match err {
        FeedError::UnknownGroup(_) | FeedError::UnknownAuthor(_) | FeedError::UnknownPost(_) => {
            render_not_found_response(chrome)
        }
        FeedError::Repo(err) => repo_error_response("infra::http::public::feed", err, chrome),
    }
}

pub(super) async fn index(
    State(state): State<HttpState>,
    viewer: Viewer,
    RawQuery(query): RawQuery,
) -> Response {
    let chrome = LayoutChrome::new(viewer.user(), "/");
    let page = page_param(query.as_deref());

    match state.feed.home(page.as_deref()).await {
        Ok(page) => {
            let view = LayoutContext::new(chrome, ListingView::new("Latest updates", &page, "/"));
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, chrome),
    }
}

pub(super) async fn group_posts(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(slug): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    let path = format!("/group/{slug}/");
    let chrome = LayoutChrome::new(viewer.user(), &path);
    let page = page_param(query.as_deref());

    match state.feed.group(&slug, page.as_deref()).await {
        Ok(feed) => {
            let chrome = chrome.with_title(feed.group.title.clone());
            let view = LayoutContext::new(chrome, GroupView::from(&feed));
            render_template_response(GroupTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, chrome),
    }
}

pub(super) async fn profile(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(username): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    let path = format!("/profile/{username}/");
    let chrome = LayoutChrome::new(viewer.user(), &path);
    let page = page_param(query.as_deref());

    match state
        .feed
        .profile(&username, viewer.id(), page.as_deref())
        .await
    {
        Ok(feed) => {
            let chrome = chrome.with_title(feed.author.display_name());
            let view = LayoutContext::new(chrome, ProfileView::new(&feed, viewer.user()));
            render_template_response(ProfileTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, chrome),
    }
}

pub(super) async fn post_detail(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(raw_id): Path<String>,
) -> Response {
    let chrome = LayoutChrome::new(viewer.user(), "");
    let Some(post_id) = parse_id(&raw_id) else {
        return render_not_found_response(chrome);
    };

    match state.feed.post_detail(post_id).await {
        Ok(detail) => {
            let chrome = chrome.with_title(detail.entry.post.to_string());
            let view = LayoutContext::new(chrome, PostDetailView::new(&detail, viewer.user()));
            render_template_response(PostDetailTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, chrome),
    }
}

pub(super) async fn about_author(viewer: Viewer) -> Response {
    let chrome = LayoutChrome::new(viewer.user(), "/about/author/").with_title("About the author");
    let view = LayoutContext::new(chrome, ());
    render_template_response(AboutAuthorTemplate { view }, StatusCode::OK)
}

pub(super) async fn about_tech(viewer: Viewer) -> Response {
    let chrome = LayoutChrome::new(viewer.user(), "/about/tech/").with_title("Technologies");
    let view = LayoutContext::new(chrome, ());
    render_template_response(AboutTechTemplate { view }, StatusCode::OK)
}

pub(super) async fn serve_media(
    State(state): State<HttpState>,
    Path(path): Path<String>,
) -> Response {
    const SOURCE: &str = "infra::http::public::serve_media";

    match state.upload_storage.read(&path).await {
        Ok(bytes) => build_upload_response(&path, bytes),
        Err(UploadStorageError::InvalidPath) => media_not_found(SOURCE),
        Err(UploadStorageError::Io(err)) if err.kind() == ErrorKind::NotFound => {
            media_not_found(SOURCE)
        }
        Err(err) => {
            error!(
                target = SOURCE,
                path = %path,
                error = %err,
                "failed to read stored upload"
            );
            HttpError::new(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read uploaded file",
                err.to_string(),
            )
            .into_response()
        }
    }
}

fn media_not_found(source: &'static str) -> Response {
    HttpError::new(
        source,
        StatusCode::NOT_FOUND,
        "File not found",
        "The requested file is not available",
    )
    .into_response()
}

fn build_upload_response(path: &str, bytes: Bytes) -> Response {
    let length = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&length.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}

/// Without a database the process has nothing to probe and reports healthy.
pub(super) async fn db_health(State(state): State<HttpState>) -> Response {
    match state.db.as_ref() {
        Some(db) => db_health_response(db.health_check().await),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

pub(super) async fn not_found(viewer: Viewer, uri: Uri) -> Response {
    let chrome = LayoutChrome::new(viewer.user(), uri.path()).with_title("Page not found");
    let view = LayoutContext::new(chrome, ErrorPageView::not_found().with_path(uri.path()));
    render_template_response(NotFoundTemplate { view }, StatusCode::NOT_FOUND)
}
