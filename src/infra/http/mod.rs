pub mod auth;
mod authoring;
mod follows;
mod forms;
mod middleware;
mod public;

pub use middleware::REQUEST_ID_HEADER;

use std::{num::NonZeroU32, sync::Arc, time::Duration};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use sqlx::Error as SqlxError;

use crate::{
    application::{
        accounts::AccountService,
        authoring::AuthoringService,
        error::{ErrorReport, HttpError},
        feed::FeedService,
        follows::FollowService,
        pagination::DEFAULT_PAGE_SIZE,
        repos::{
            CommentsRepo, FollowsRepo, GroupsRepo, PostsRepo, PostsWriteRepo, RepoError,
            SessionsRepo, UsersRepo,
        },
    },
    cache::{CacheState, page_cache_layer},
    config::Settings,
    infra::{db::PostgresRepositories, uploads::UploadStorage},
    presentation::views::{LayoutChrome, render_not_found_response},
};

use self::middleware::{log_responses, set_request_context};

const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(14 * 24 * 60 * 60);
const DEFAULT_UPLOAD_LIMIT: usize = 10 * 1024 * 1024;

/// Storage adapters able to back every service.
pub trait Repositories:
    UsersRepo
    + GroupsRepo
    + PostsRepo
    + PostsWriteRepo
    + CommentsRepo
    + FollowsRepo
    + SessionsRepo
    + 'static
{
}

impl<T> Repositories for T where
    T: UsersRepo
        + GroupsRepo
        + PostsRepo
        + PostsWriteRepo
        + CommentsRepo
        + FollowsRepo
        + SessionsRepo
        + 'static
{
}

/// Knobs for assembling [`HttpState`].
#[derive(Clone)]
pub struct HttpOptions {
    pub page_size: NonZeroU32,
    pub session_ttl: Duration,
    pub secure_cookies: bool,
    pub upload_limit_bytes: usize,
    pub cache: Option<CacheState>,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            page_size: NonZeroU32::new(DEFAULT_PAGE_SIZE).unwrap_or(NonZeroU32::MIN),
            session_ttl: DEFAULT_SESSION_TTL,
            secure_cookies: false,
            upload_limit_bytes: DEFAULT_UPLOAD_LIMIT,
            cache: None,
        }
    }
}

impl HttpOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        let cache = settings
            .cache
            .enabled
            .then(|| CacheState::new((&settings.cache).into()));

        Self {
            page_size: settings.feed.page_size,
            session_ttl: settings.auth.session_ttl,
            secure_cookies: settings.auth.secure_cookies,
            upload_limit_bytes: usize::try_from(settings.uploads.max_request_bytes.get())
                .unwrap_or(usize::MAX),
            cache,
        }
    }
}

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub authoring: Arc<AuthoringService>,
    pub follows: Arc<FollowService>,
    pub accounts: Arc<AccountService>,
    pub upload_storage: Arc<UploadStorage>,
    pub db: Option<Arc<PostgresRepositories>>,
    pub cache: Option<CacheState>,
    pub secure_cookies: bool,
    pub upload_limit_bytes: usize,
}

impl HttpState {
    pub fn new<R: Repositories>(
        repos: Arc<R>,
        upload_storage: Arc<UploadStorage>,
        options: HttpOptions,
    ) -> Self {
        let feed = FeedService::new(
            repos.clone(),
            repos.clone(),
            repos.clone(),
            repos.clone(),
            repos.clone(),
            options.page_size,
        );
        let authoring = AuthoringService::new(
            repos.clone(),
            repos.clone(),
            repos.clone(),
            repos.clone(),
            upload_storage.clone(),
        );
        let follows = FollowService::new(
            repos.clone(),
            repos.clone(),
            repos.clone(),
            options.page_size,
        );
        let accounts = AccountService::new(repos.clone(), repos, options.session_ttl);

        Self {
            feed: Arc::new(feed),
            authoring: Arc::new(authoring),
            follows: Arc::new(follows),
            accounts: Arc::new(accounts),
            upload_storage,
            db: None,
            cache: options.cache,
            secure_cookies: options.secure_cookies,
            upload_limit_bytes: options.upload_limit_bytes,
        }
    }

    /// Report database health through `/_health/db`.
    pub fn with_database(self, db: Arc<PostgresRepositories>) -> Self {
        Self {
            db: Some(db),
            ..self
        }
    }
}

pub fn build_router(state: HttpState) -> Router {
    let index = get(public::index);
    let index = match state.cache.clone() {
        Some(cache) => {
            index.layer(axum_middleware::from_fn_with_state(cache, page_cache_layer))
        }
        None => index,
    };

    Router::new()
        .route("/", index)
        .route("/group/{slug}/", get(public::group_posts))
        .route("/profile/{username}/", get(public::profile))
        .route("/profile/{username}/follow/", get(follows::profile_follow))
        .route("/profile/{username}/unfollow/", get(follows::profile_unfollow))
        .route("/follow/", get(follows::follow_index))
        .route("/create/", get(authoring::create_form).post(authoring::create_submit))
        .route("/posts/{post_id}/", get(public::post_detail))
        .route(
            "/posts/{post_id}/edit/",
            get(authoring::edit_form).post(authoring::edit_submit),
        )
        .route("/posts/{post_id}/comment/", post(authoring::add_comment))
        .route("/auth/signup/", get(auth::signup_form).post(auth::signup_submit))
        .route("/auth/login/", get(auth::login_form).post(auth::login_submit))
        .route("/auth/logout/", get(auth::logout).post(auth::logout))
        .route("/about/author/", get(public::about_author))
        .route("/about/tech/", get(public::about_tech))
        .route("/media/{*path}", get(public::serve_media))
        .route("/_health/db", get(public::db_health))
        .fallback(public::not_found)
        .layer(DefaultBodyLimit::max(state.upload_limit_bytes))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

fn db_health_response(result: Result<(), SqlxError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

/// Render a repository failure. A row that vanished mid-request gets the
/// regular not-found page.
fn repo_error_response(source: &'static str, err: RepoError, chrome: LayoutChrome) -> Response {
    match err {
        RepoError::NotFound => render_not_found_response(chrome),
        other => repo_error_to_http(source, other).into_response(),
    }
}

/// Failures other than a missing row, reported with a fixed public message.
fn repo_error_to_http(source: &'static str, err: RepoError) -> HttpError {
    match err {
        RepoError::Timeout => HttpError::new(
            source,
            StatusCode::SERVICE_UNAVAILABLE,
            "Service temporarily unavailable",
            "database timeout",
        ),
        other => HttpError::internal(source, &other),
    }
}

/// Parse a numeric path id. Anything else is treated as a missing page.
fn parse_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|id| *id > 0)
}
