//! Session cookies, the viewer extractors and the account handlers.

use axum::{
    Form,
    extract::{FromRequestParts, Query, State},
    http::{StatusCode, Uri, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use tracing::info;
use url::form_urlencoded;

use crate::{
    application::{
        accounts::{
            AccountError, IssuedSession, LoginForm, LoginOutcome, SignupForm, SignupOutcome,
            SignupSubmission,
        },
        error::HttpError,
    },
    domain::entities::UserRecord,
    presentation::views::{
        LayoutChrome, LayoutContext, LoggedOutTemplate, LoginTemplate, LoginView, SignupTemplate,
        SignupView, render_template_response,
    },
};

use super::{HttpState, repo_error_response};

pub const SESSION_COOKIE: &str = "quire_session";

const LOGIN_PATH: &str = "/auth/login/";

/// The signed-in user, if any. Unknown or expired sessions are anonymous.
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<UserRecord>);

impl Viewer {
    pub fn user(&self) -> Option<&UserRecord> {
        self.0.as_ref()
    }

    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|user| user.id)
    }
}

impl FromRequestParts<HttpState> for Viewer {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &HttpState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(viewer) = parts.extensions.get::<Viewer>() {
            return Ok(viewer.clone());
        }

        let jar = CookieJar::from_headers(&parts.headers);
        let user = match jar.get(SESSION_COOKIE) {
            Some(cookie) => state
                .accounts
                .authenticate(cookie.value())
                .await
                .map_err(|err| account_error_response("infra::http::auth::viewer", err))?,
            None => None,
        };

        let viewer = Viewer(user);
        parts.extensions.insert(viewer.clone());
        Ok(viewer)
    }
}

/// A signed-in user. Anonymous requests are redirected to the login page
/// with the current path and query as `next`.
#[derive(Debug, Clone)]
pub struct RequireUser(pub UserRecord);

impl FromRequestParts<HttpState> for RequireUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &HttpState,
    ) -> Result<Self, Self::Rejection> {
        match Viewer::from_request_parts(parts, state).await? {
            Viewer(Some(user)) => Ok(RequireUser(user)),
            Viewer(None) => Err(Redirect::to(&login_redirect(&parts.uri)).into_response()),
        }
    }
}

/// `/auth/login/?next=<path and query>`, keeping slashes readable.
pub fn login_redirect(uri: &Uri) -> String {
    let target = uri
        .path_and_query()
        .map(|value| value.as_str())
        .unwrap_or("/");
    let encoded: String = form_urlencoded::byte_serialize(target.as_bytes()).collect();
    format!("{LOGIN_PATH}?next={}", encoded.replace("%2F", "/"))
}

/// Only same-site paths are honoured as post-login targets.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path)
            if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') =>
        {
            path
        }
        _ => "/",
    }
}

fn session_cookie(session: IssuedSession, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session.token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .expires(session.expires_at)
        .build()
}

fn account_error_response(source: &'static str, err: AccountError) -> Response {
    match err {
        AccountError::Repo(err) => repo_error_response(source, err, LayoutChrome::new(None, "")),
        other => HttpError::internal(source, &other).into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct SignupFields {
    first_name: String,
    last_name: String,
    username: String,
    email: String,
    password1: String,
    password2: String,
}

impl From<SignupFields> for SignupSubmission {
    fn from(fields: SignupFields) -> Self {
        Self {
            first_name: fields.first_name,
            last_name: fields.last_name,
            username: fields.username,
            email: fields.email,
            password1: fields.password1,
            password2: fields.password2,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct LoginFields {
    username: String,
    password: String,
    next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct NextQuery {
    next: Option<String>,
}

fn render_signup(viewer: &Viewer, form: &SignupForm) -> Response {
    let chrome = LayoutChrome::new(viewer.user(), "/auth/signup/").with_title("Sign up");
    let view = LayoutContext::new(chrome, SignupView::from(form));
    render_template_response(SignupTemplate { view }, StatusCode::OK)
}

fn render_login(viewer: &Viewer, form: &LoginForm, next: &str) -> Response {
    let chrome = LayoutChrome::new(viewer.user(), LOGIN_PATH).with_title("Log in");
    let view = LayoutContext::new(chrome, LoginView::new(form, next));
    render_template_response(LoginTemplate { view }, StatusCode::OK)
}

pub(super) async fn signup_form(viewer: Viewer) -> Response {
    render_signup(&viewer, &SignupForm::default())
}

pub(super) async fn signup_submit(
    State(state): State<HttpState>,
    viewer: Viewer,
    Form(fields): Form<SignupFields>,
) -> Response {
    match state.accounts.signup(fields.into()).await {
        Ok(SignupOutcome::Created(user)) => {
            info!(
                target = "quire::http::auth",
                user_id = user.id,
                username = %user.username,
                "account created"
            );
            Redirect::to("/").into_response()
        }
        Ok(SignupOutcome::Invalid(form)) => render_signup(&viewer, &form),
        Err(err) => account_error_response("infra::http::auth::signup", err),
    }
}

pub(super) async fn login_form(viewer: Viewer, Query(query): Query<NextQuery>) -> Response {
    let next = safe_next(query.next.as_deref()).to_string();
    render_login(&viewer, &LoginForm::default(), &next)
}

pub(super) async fn login_submit(
    State(state): State<HttpState>,
    viewer: Viewer,
    jar: CookieJar,
    Form(fields): Form<LoginFields>,
) -> Response {
    let next = safe_next(fields.next.as_deref()).to_string();

    match state.accounts.login(&fields.username, &fields.password).await {
        Ok(LoginOutcome::Authenticated { user, session }) => {
            info!(
                target = "quire::http::auth",
                user_id = user.id,
                "session started"
            );
            let jar = jar.add(session_cookie(session, state.secure_cookies));
            (jar, Redirect::to(&next)).into_response()
        }
        Ok(LoginOutcome::Rejected(form)) => render_login(&viewer, &form, &next),
        Err(err) => account_error_response("infra::http::auth::login", err),
    }
}

pub(super) async fn logout(State(state): State<HttpState>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE)
        && let Err(err) = state.accounts.logout(cookie.value()).await
    {
        return account_error_response("infra::http::auth::logout", err);
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    let chrome = LayoutChrome::new(None, "/auth/logout/").with_title("Logged out");
    let view = LayoutContext::new(chrome, ());
    (
        jar,
        render_template_response(LoggedOutTemplate { view }, StatusCode::OK),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_redirect_keeps_path_and_query() {
        let uri: Uri = "/create/".parse().expect("uri");
        assert_eq!(login_redirect(&uri), "/auth/login/?next=/create/");

        let uri: Uri = "/follow/?page=2".parse().expect("uri");
        assert_eq!(login_redirect(&uri), "/auth/login/?next=/follow/%3Fpage%3D2");
    }

    #[test]
    fn next_must_stay_on_site() {
        assert_eq!(safe_next(Some("/posts/3/")), "/posts/3/");
        assert_eq!(safe_next(Some("//evil.example/")), "/");
        assert_eq!(safe_next(Some("https://evil.example/")), "/");
        assert_eq!(safe_next(Some("/\\evil.example")), "/");
        assert_eq!(safe_next(None), "/");
    }
}
