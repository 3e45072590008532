use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    application::follows::{FollowError, FollowOutcome},
    domain::entities::UserRecord,
    presentation::views::{
        FollowTemplate, LayoutChrome, LayoutContext, ListingView, render_not_found_response,
        render_template_response,
    },
};

use super::{HttpState, auth::RequireUser, public::page_param, repo_error_response};

const SOURCE: &str = "infra::http::follows";

fn follow_error_response(err: FollowError, user: &UserRecord) -> Response {
    match err {
        FollowError::UnknownAuthor(_) => render_not_found_response(LayoutChrome::new(Some(user), "")),
        FollowError::Repo(err) => {
            repo_error_response(SOURCE, err, LayoutChrome::new(Some(user), ""))
        }
    }
}

fn profile_redirect(username: &str) -> Response {
    Redirect::to(&format!("/profile/{username}/")).into_response()
}

pub(super) async fn follow_index(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    RawQuery(query): RawQuery,
) -> Response {
    let page = page_param(query.as_deref());

    match state.follows.feed_for(user.id, page.as_deref()).await {
        Ok(page) => {
            let chrome = LayoutChrome::new(Some(&user), "/follow/").with_title("Following");
            let view = LayoutContext::new(
                chrome,
                ListingView::new("Posts from authors you follow", &page, "/follow/"),
            );
            render_template_response(FollowTemplate { view }, StatusCode::OK)
        }
        Err(err) => follow_error_response(err, &user),
    }
}

pub(super) async fn profile_follow(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Path(username): Path<String>,
) -> Response {
    match state.follows.follow(user.id, &username).await {
        Ok(FollowOutcome::Following(_) | FollowOutcome::SelfFollow) => profile_redirect(&username),
        Err(err) => follow_error_response(err, &user),
    }
}

pub(super) async fn profile_unfollow(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Path(username): Path<String>,
) -> Response {
    match state.follows.unfollow(user.id, &username).await {
        Ok(_) => profile_redirect(&username),
        Err(err) => follow_error_response(err, &user),
    }
}
