use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::Multipart;
use serde::Deserialize;
use tracing::info;

use crate::{
    application::{
        authoring::{AuthoringError, CommentOutcome, EditAccess, EditOutcome, PostForm, PostOutcome},
        error::HttpError,
    },
    domain::entities::UserRecord,
    presentation::views::{
        LayoutChrome, LayoutContext, PostFormTemplate, PostFormView, render_not_found_response,
        render_template_response,
    },
};

use super::{HttpState, auth::RequireUser, forms::read_post_submission, parse_id, repo_error_response};

const SOURCE: &str = "infra::http::authoring";

fn authoring_error_response(err: AuthoringError, user: &UserRecord) -> Response {
    match err {
        AuthoringError::UnknownPost(_) => render_not_found_response(LayoutChrome::new(Some(user), "")),
        AuthoringError::Repo(err) => {
            repo_error_response(SOURCE, err, LayoutChrome::new(Some(user), ""))
        }
        other => HttpError::internal(SOURCE, &other).into_response(),
    }
}

/// Render the post form; `post_id` switches it to edit mode.
async fn render_post_form(
    state: &HttpState,
    user: &UserRecord,
    post_id: Option<i64>,
    form: &PostForm,
) -> Response {
    let groups = match state.authoring.group_choices().await {
        Ok(groups) => groups,
        Err(err) => return authoring_error_response(err, user),
    };

    let (chrome, content) = match post_id {
        Some(id) => (
            LayoutChrome::new(Some(user), "").with_title("Edit post"),
            PostFormView::edit(id, form, &groups),
        ),
        None => (
            LayoutChrome::new(Some(user), "/create/").with_title("New post"),
            PostFormView::create(form, &groups),
        ),
    };
    let view = LayoutContext::new(chrome, content);
    render_template_response(PostFormTemplate { view }, StatusCode::OK)
}

pub(super) async fn create_form(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
) -> Response {
    render_post_form(&state, &user, None, &PostForm::default()).await
}

pub(super) async fn create_submit(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    mut multipart: Multipart,
) -> Response {
    let submission = match read_post_submission(&mut multipart).await {
        Ok(submission) => submission,
        Err(err) => return err.into_response(),
    };

    match state.authoring.create_post(user.id, submission).await {
        Ok(PostOutcome::Saved(post)) => {
            info!(
                target = "quire::http::authoring",
                post_id = post.id,
                author_id = user.id,
                "post created"
            );
            Redirect::to(&format!("/profile/{}/", user.username)).into_response()
        }
        Ok(PostOutcome::Invalid(form)) => render_post_form(&state, &user, None, &form).await,
        Err(err) => authoring_error_response(err, &user),
    }
}

pub(super) async fn edit_form(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Path(raw_id): Path<String>,
) -> Response {
    let Some(post_id) = parse_id(&raw_id) else {
        return render_not_found_response(LayoutChrome::new(Some(&user), ""));
    };

    match state.authoring.edit_form(post_id, user.id).await {
        Ok(EditAccess::Allowed(form)) => render_post_form(&state, &user, Some(post_id), &form).await,
        Ok(EditAccess::NotAuthor) => Redirect::to(&format!("/posts/{post_id}/")).into_response(),
        Err(err) => authoring_error_response(err, &user),
    }
}

pub(super) async fn edit_submit(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Path(raw_id): Path<String>,
    mut multipart: Multipart,
) -> Response {
    let Some(post_id) = parse_id(&raw_id) else {
        return render_not_found_response(LayoutChrome::new(Some(&user), ""));
    };
    let submission = match read_post_submission(&mut multipart).await {
        Ok(submission) => submission,
        Err(err) => return err.into_response(),
    };

    match state.authoring.update_post(post_id, user.id, submission).await {
        Ok(EditOutcome::Saved(_)) | Ok(EditOutcome::NotAuthor) => {
            Redirect::to(&format!("/posts/{post_id}/")).into_response()
        }
        Ok(EditOutcome::Invalid(form)) => {
            render_post_form(&state, &user, Some(post_id), &form).await
        }
        Err(err) => authoring_error_response(err, &user),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct CommentFields {
    text: String,
}

pub(super) async fn add_comment(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Path(raw_id): Path<String>,
    Form(fields): Form<CommentFields>,
) -> Response {
    let Some(post_id) = parse_id(&raw_id) else {
        return render_not_found_response(LayoutChrome::new(Some(&user), ""));
    };

    match state.authoring.add_comment(post_id, user.id, &fields.text).await {
        Ok(CommentOutcome::Created(_) | CommentOutcome::Rejected) => {
            Redirect::to(&format!("/posts/{post_id}/")).into_response()
        }
        Err(err) => authoring_error_response(err, &user),
    }
}
