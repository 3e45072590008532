use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{OffsetDateTime, macros::format_description};

use crate::application::accounts::{LoginForm, SignupForm};
use crate::application::authoring::PostForm;
use crate::application::error::{ErrorReport, HttpError};
use crate::application::feed::{GroupFeed, PostDetail, ProfileFeed};
use crate::application::forms::FormErrors;
use crate::application::pagination::{FeedPage, PageWindow};
use crate::domain::entities::{CommentEntry, GroupRecord, PostEntry, UserRecord};

pub const SITE_NAME: &str = "Quire";

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let view = LayoutContext::new(chrome.with_title("Page not found"), ErrorPageView::not_found());
    let mut response = render_template_response(NotFoundTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// `14 March 2024`; falls back to RFC 3339 if formatting fails.
pub fn format_date(timestamp: OffsetDateTime) -> String {
    let format = format_description!("[day padding:none] [month repr:long] [year]");
    timestamp
        .format(&format)
        .unwrap_or_else(|_| timestamp.to_string())
}

pub fn media_url(path: &str) -> String {
    format!("/media/{path}")
}

#[derive(Clone)]
pub struct NavigationLinkView {
    pub label: String,
    pub href: String,
    pub is_active: bool,
}

/// Site-wide header data. The navigation depends on who is signed in.
#[derive(Clone)]
pub struct LayoutChrome {
    pub site_name: String,
    pub title: String,
    pub is_authenticated: bool,
    pub viewer_username: String,
    pub viewer_name: String,
    pub navigation: Vec<NavigationLinkView>,
}

impl LayoutChrome {
    pub fn new(viewer: Option<&UserRecord>, current_path: &str) -> Self {
        let mut links = vec![
            ("About the author", "/about/author/"),
            ("Technologies", "/about/tech/"),
        ];
        if viewer.is_some() {
            links.extend([
                ("New post", "/create/"),
                ("Following", "/follow/"),
                ("Log out", "/auth/logout/"),
            ]);
        } else {
            links.extend([("Log in", "/auth/login/"), ("Sign up", "/auth/signup/")]);
        }

        Self {
            site_name: SITE_NAME.to_string(),
            title: SITE_NAME.to_string(),
            is_authenticated: viewer.is_some(),
            viewer_username: viewer.map(|user| user.username.clone()).unwrap_or_default(),
            viewer_name: viewer.map(UserRecord::display_name).unwrap_or_default(),
            navigation: links
                .into_iter()
                .map(|(label, href)| NavigationLinkView {
                    label: label.to_string(),
                    href: href.to_string(),
                    is_active: href == current_path,
                })
                .collect(),
        }
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..self
        }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub site_name: String,
    pub title: String,
    pub is_authenticated: bool,
    pub viewer_username: String,
    pub viewer_name: String,
    pub navigation: Vec<NavigationLinkView>,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            site_name: chrome.site_name,
            title: chrome.title,
            is_authenticated: chrome.is_authenticated,
            viewer_username: chrome.viewer_username,
            viewer_name: chrome.viewer_name,
            navigation: chrome.navigation,
            content,
        }
    }
}

#[derive(Clone)]
pub struct PostCard {
    pub id: i64,
    pub text: String,
    pub created: String,
    pub iso_date: String,
    pub author_username: String,
    pub author_name: String,
    pub has_group: bool,
    pub group_slug: String,
    pub group_title: String,
    pub has_image: bool,
    pub image_url: String,
}

impl From<&PostEntry> for PostCard {
    fn from(entry: &PostEntry) -> Self {
        let (group_slug, group_title) = entry
            .group
            .as_ref()
            .map(|group| (group.slug.clone(), group.title.clone()))
            .unwrap_or_default();
        let image_url = entry.post.image.as_deref().map(media_url).unwrap_or_default();

        Self {
            id: entry.post.id,
            text: entry.post.text.clone(),
            created: format_date(entry.post.created_at),
            iso_date: entry.post.created_at.date().to_string(),
            author_username: entry.author.username.clone(),
            author_name: entry.author.display_name.clone(),
            has_group: entry.group.is_some(),
            group_slug,
            group_title,
            has_image: !image_url.is_empty(),
            image_url,
        }
    }
}

#[derive(Clone)]
pub struct PageLinkView {
    pub number: u64,
    pub href: String,
    pub is_current: bool,
}

/// Numbered pager. Shows at most two pages either side of the current one.
#[derive(Clone)]
pub struct PaginatorView {
    pub is_paginated: bool,
    pub number: u64,
    pub num_pages: u64,
    pub has_previous: bool,
    pub has_next: bool,
    pub first_href: String,
    pub previous_href: String,
    pub next_href: String,
    pub last_href: String,
    pub pages: Vec<PageLinkView>,
}

const PAGER_RADIUS: u64 = 2;

impl PaginatorView {
    pub fn new(window: &PageWindow, base_path: &str) -> Self {
        let href = |number: u64| format!("{base_path}?page={number}");
        let number = window.number();
        let num_pages = window.num_pages();
        let first = number.saturating_sub(PAGER_RADIUS).max(1);
        let last = number.saturating_add(PAGER_RADIUS).min(num_pages);

        Self {
            is_paginated: num_pages > 1,
            number,
            num_pages,
            has_previous: window.has_previous(),
            has_next: window.has_next(),
            first_href: href(1),
            previous_href: window.previous_page_number().map(href).unwrap_or_default(),
            next_href: window.next_page_number().map(href).unwrap_or_default(),
            last_href: href(num_pages),
            pages: (first..=last)
                .map(|page| PageLinkView {
                    number: page,
                    href: href(page),
                    is_current: page == number,
                })
                .collect(),
        }
    }
}

pub struct FeedView {
    pub posts: Vec<PostCard>,
    pub paginator: PaginatorView,
}

impl FeedView {
    pub fn new(page: &FeedPage<PostEntry>, base_path: &str) -> Self {
        Self {
            posts: page.items.iter().map(PostCard::from).collect(),
            paginator: PaginatorView::new(&page.window, base_path),
        }
    }
}

/// A bare listing with a heading: the home page and the followed-authors feed.
pub struct ListingView {
    pub heading: String,
    pub feed: FeedView,
}

impl ListingView {
    pub fn new(heading: impl Into<String>, page: &FeedPage<PostEntry>, base_path: &str) -> Self {
        Self {
            heading: heading.into(),
            feed: FeedView::new(page, base_path),
        }
    }
}

#[derive(Template)]
#[template(path = "posts/index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<ListingView>,
}

#[derive(Template)]
#[template(path = "posts/follow.html")]
pub struct FollowTemplate {
    pub view: LayoutContext<ListingView>,
}

pub struct GroupView {
    pub title: String,
    pub description: String,
    pub feed: FeedView,
}

impl From<&GroupFeed> for GroupView {
    fn from(group: &GroupFeed) -> Self {
        let GroupRecord {
            title,
            slug,
            description,
            ..
        } = &group.group;
        Self {
            title: title.clone(),
            description: description.clone(),
            feed: FeedView::new(&group.page, &format!("/group/{slug}/")),
        }
    }
}

#[derive(Template)]
#[template(path = "posts/group_list.html")]
pub struct GroupTemplate {
    pub view: LayoutContext<GroupView>,
}

pub struct ProfileView {
    pub username: String,
    pub name: String,
    pub post_count: u64,
    pub following: bool,
    /// Signed in and looking at someone else's profile.
    pub show_follow_controls: bool,
    pub follow_href: String,
    pub unfollow_href: String,
    pub feed: FeedView,
}

impl ProfileView {
    pub fn new(profile: &ProfileFeed, viewer: Option<&UserRecord>) -> Self {
        let username = profile.author.username.clone();
        let base = format!("/profile/{username}/");
        Self {
            name: profile.author.display_name(),
            post_count: profile.post_count,
            following: profile.following,
            show_follow_controls: viewer.is_some_and(|viewer| viewer.id != profile.author.id),
            follow_href: format!("{base}follow/"),
            unfollow_href: format!("{base}unfollow/"),
            feed: FeedView::new(&profile.page, &base),
            username,
        }
    }
}

#[derive(Template)]
#[template(path = "posts/profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileView>,
}

pub struct CommentView {
    pub author_username: String,
    pub author_name: String,
    pub text: String,
    pub created: String,
}

impl From<&CommentEntry> for CommentView {
    fn from(entry: &CommentEntry) -> Self {
        Self {
            author_username: entry.author.username.clone(),
            author_name: entry.author.display_name.clone(),
            text: entry.comment.text.clone(),
            created: format_date(entry.comment.created_at),
        }
    }
}

pub struct PostDetailView {
    pub post: PostCard,
    pub author_post_count: u64,
    pub comments: Vec<CommentView>,
    pub gallery: Vec<String>,
    pub can_edit: bool,
    pub can_comment: bool,
}

impl PostDetailView {
    pub fn new(detail: &PostDetail, viewer: Option<&UserRecord>) -> Self {
        let post = PostCard::from(&detail.entry);
        let gallery = detail
            .images
            .iter()
            .filter_map(|image| image.image.as_deref())
            .map(media_url)
            .filter(|url| *url != post.image_url)
            .collect();

        Self {
            author_post_count: detail.author_post_count,
            comments: detail.comments.iter().map(CommentView::from).collect(),
            gallery,
            can_edit: viewer.is_some_and(|viewer| viewer.id == detail.entry.post.author_id),
            can_comment: viewer.is_some(),
            post,
        }
    }
}

#[derive(Template)]
#[template(path = "posts/post_detail.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailView>,
}

pub struct GroupOptionView {
    pub id: i64,
    pub title: String,
    pub selected: bool,
}

pub struct PostFormView {
    pub is_edit: bool,
    pub action: String,
    pub text: String,
    pub groups: Vec<GroupOptionView>,
    pub no_group_selected: bool,
    pub text_errors: Vec<String>,
    pub group_errors: Vec<String>,
    pub image_errors: Vec<String>,
}

impl PostFormView {
    pub fn create(form: &PostForm, groups: &[GroupRecord]) -> Self {
        Self::build(false, "/create/".to_string(), form, groups)
    }

    pub fn edit(post_id: i64, form: &PostForm, groups: &[GroupRecord]) -> Self {
        Self::build(true, format!("/posts/{post_id}/edit/"), form, groups)
    }

    fn build(is_edit: bool, action: String, form: &PostForm, groups: &[GroupRecord]) -> Self {
        Self {
            is_edit,
            action,
            text: form.text.clone(),
            groups: groups
                .iter()
                .map(|group| GroupOptionView {
                    id: group.id,
                    title: group.title.clone(),
                    selected: form.group_id == Some(group.id),
                })
                .collect(),
            no_group_selected: form.group_id.is_none(),
            text_errors: form.errors.field("text").to_vec(),
            group_errors: form.errors.field("group").to_vec(),
            image_errors: form.errors.field("image").to_vec(),
        }
    }
}

#[derive(Template)]
#[template(path = "posts/create_post.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormView>,
}

pub struct SignupView {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub non_field_errors: Vec<String>,
    pub first_name_errors: Vec<String>,
    pub last_name_errors: Vec<String>,
    pub username_errors: Vec<String>,
    pub email_errors: Vec<String>,
    pub password1_errors: Vec<String>,
    pub password2_errors: Vec<String>,
}

impl From<&SignupForm> for SignupView {
    fn from(form: &SignupForm) -> Self {
        let errors: &FormErrors = &form.errors;
        Self {
            first_name: form.first_name.clone(),
            last_name: form.last_name.clone(),
            username: form.username.clone(),
            email: form.email.clone(),
            non_field_errors: errors.non_field().to_vec(),
            first_name_errors: errors.field("first_name").to_vec(),
            last_name_errors: errors.field("last_name").to_vec(),
            username_errors: errors.field("username").to_vec(),
            email_errors: errors.field("email").to_vec(),
            password1_errors: errors.field("password1").to_vec(),
            password2_errors: errors.field("password2").to_vec(),
        }
    }
}

#[derive(Template)]
#[template(path = "users/signup.html")]
pub struct SignupTemplate {
    pub view: LayoutContext<SignupView>,
}

pub struct LoginView {
    pub username: String,
    pub next: String,
    pub non_field_errors: Vec<String>,
}

impl LoginView {
    pub fn new(form: &LoginForm, next: &str) -> Self {
        Self {
            username: form.username.clone(),
            next: next.to_string(),
            non_field_errors: form.errors.non_field().to_vec(),
        }
    }
}

#[derive(Template)]
#[template(path = "users/login.html")]
pub struct LoginTemplate {
    pub view: LayoutContext<LoginView>,
}

#[derive(Template)]
#[template(path = "users/logged_out.html")]
pub struct LoggedOutTemplate {
    pub view: LayoutContext<()>,
}

#[derive(Template)]
#[template(path = "about/author.html")]
pub struct AboutAuthorTemplate {
    pub view: LayoutContext<()>,
}

#[derive(Template)]
#[template(path = "about/tech.html")]
pub struct AboutTechTemplate {
    pub view: LayoutContext<()>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
    pub requested_path: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page not found".to_string(),
            message: "The page you requested does not exist.".to_string(),
            requested_path: String::new(),
        }
    }

    pub fn with_path(self, path: &str) -> Self {
        Self {
            requested_path: path.to_string(),
            ..self
        }
    }
}

#[derive(Template)]
#[template(path = "core/404.html")]
pub struct NotFoundTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use time::macros::datetime;

    use super::*;

    #[test]
    fn dates_use_long_month_names() {
        assert_eq!(format_date(datetime!(2024-03-04 10:00 UTC)), "4 March 2024");
    }

    #[test]
    fn pager_links_keep_base_path() {
        let window = PageWindow::resolve(45, Some("3"), NonZeroU32::new(10).expect("size"));
        let pager = PaginatorView::new(&window, "/group/cats/");

        assert!(pager.is_paginated);
        assert_eq!(pager.previous_href, "/group/cats/?page=2");
        assert_eq!(pager.next_href, "/group/cats/?page=4");
        assert_eq!(pager.last_href, "/group/cats/?page=5");
        let numbers: Vec<u64> = pager.pages.iter().map(|page| page.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn anonymous_navigation_offers_login() {
        let chrome = LayoutChrome::new(None, "/auth/login/");
        assert!(!chrome.is_authenticated);
        assert!(
            chrome
                .navigation
                .iter()
                .any(|link| link.href == "/auth/login/" && link.is_active)
        );
        assert!(!chrome.navigation.iter().any(|link| link.href == "/create/"));
    }
}
