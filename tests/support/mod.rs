#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use quire::{
    application::{
        accounts::hash_token,
        repos::{
            CreateGroupParams, CreatePostParams, CreateSessionParams, CreateUserParams,
            GroupsRepo, PostsWriteRepo, SessionsRepo, UsersRepo,
        },
    },
    cache::{CacheConfig, CacheState},
    domain::entities::{GroupRecord, PostRecord, UserRecord},
    infra::{
        http::{HttpOptions, HttpState, auth::SESSION_COOKIE, build_router},
        memory::MemoryRepositories,
        uploads::UploadStorage,
    },
};
use tempfile::TempDir;
use time::{Duration, OffsetDateTime};
use tower::ServiceExt;

pub const BOUNDARY: &str = "quire-test-boundary";

pub const SMALL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0c, 0x0a, 0x00, 0x3b,
];

pub struct TestApp {
    pub router: Router,
    pub repos: Arc<MemoryRepositories>,
    pub cache: Option<CacheState>,
    pub media: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn location(&self) -> &str {
        self.headers
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
    }

    pub fn set_cookie(&self) -> Option<&str> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
    }

    /// Number of post cards on a listing page.
    pub fn card_count(&self) -> usize {
        self.body.matches("Read more").count()
    }
}

/// A multipart file part.
pub struct FilePart<'a> {
    pub name: &'a str,
    pub filename: &'a str,
    pub bytes: &'a [u8],
}

pub fn multipart_body(fields: &[(&str, &str)], file: Option<FilePart<'_>>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(file) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                file.name, file.filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(file.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(None)
    }

    pub fn with_home_cache() -> Self {
        Self::build(Some(CacheState::new(CacheConfig::default())))
    }

    fn build(cache: Option<CacheState>) -> Self {
        let media = tempfile::tempdir().expect("tempdir");
        let uploads = Arc::new(UploadStorage::new(media.path().to_path_buf()).expect("storage"));
        let repos = Arc::new(MemoryRepositories::new());
        let options = HttpOptions {
            cache: cache.clone(),
            ..HttpOptions::default()
        };
        let state = HttpState::new(repos.clone(), uploads, options);

        Self {
            router: build_router(state),
            repos,
            cache,
            media,
        }
    }

    /// A user without a usable password; sign in with [`TestApp::sign_in`].
    pub async fn user(&self, username: &str) -> UserRecord {
        self.repos
            .create_user(CreateUserParams {
                username: username.to_string(),
                first_name: String::new(),
                last_name: String::new(),
                email: String::new(),
                password_hash: "unusable".to_string(),
            })
            .await
            .expect("user")
    }

    /// Open a session for `user` and return the matching `Cookie` header.
    pub async fn sign_in(&self, user: &UserRecord) -> String {
        self.session_cookie(user, OffsetDateTime::now_utc() + Duration::days(1))
            .await
    }

    pub async fn session_cookie(&self, user: &UserRecord, expires_at: OffsetDateTime) -> String {
        let token = format!("token-for-{}", user.username);
        self.repos
            .create_session(CreateSessionParams {
                token_hash: hash_token(&token),
                user_id: user.id,
                expires_at,
            })
            .await
            .expect("session");
        format!("{SESSION_COOKIE}={token}")
    }

    pub async fn group(&self, title: &str, slug: &str) -> GroupRecord {
        self.repos
            .create_group(CreateGroupParams {
                title: title.to_string(),
                slug: slug.to_string(),
                description: format!("All about {title}"),
            })
            .await
            .expect("group")
    }

    pub async fn post(&self, author: &UserRecord, text: &str, group_id: Option<i64>) -> PostRecord {
        self.repos
            .create_post(CreatePostParams {
                author_id: author.id,
                text: text.to_string(),
                group_id,
                image: None,
            })
            .await
            .expect("post")
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        let mut request = Request::get(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.send(request.body(Body::empty()).expect("request")).await
    }

    pub async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> TestResponse {
        let mut request = Request::post(uri).header(
            header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        );
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.send(request.body(Body::from(body.to_string())).expect("request"))
            .await
    }

    pub async fn post_multipart(&self, uri: &str, body: Vec<u8>, cookie: Option<&str>) -> TestResponse {
        let mut request = Request::post(uri).header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.send(request.body(Body::from(body)).expect("request"))
            .await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();

        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}
