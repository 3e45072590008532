//! Read-side composition of the paginated listings and the post page.

use std::num::NonZeroU32;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::application::pagination::{FeedPage, PageWindow};
use crate::application::repos::{
    CommentsRepo, FollowsRepo, GroupsRepo, PostScope, PostsRepo, RepoError, UsersRepo,
};
use crate::domain::entities::{CommentEntry, GroupRecord, PostEntry, PostImageRecord, UserRecord};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unknown group `{0}`")]
    UnknownGroup(String),
    #[error("unknown author `{0}`")]
    UnknownAuthor(String),
    #[error("unknown post {0}")]
    UnknownPost(i64),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub struct GroupFeed {
    pub group: GroupRecord,
    pub page: FeedPage<PostEntry>,
}

pub struct ProfileFeed {
    pub author: UserRecord,
    /// Every post by the author, not only the current page.
    pub post_count: u64,
    pub following: bool,
    pub page: FeedPage<PostEntry>,
}

pub struct PostDetail {
    pub entry: PostEntry,
    pub author_post_count: u64,
    pub comments: Vec<CommentEntry>,
    pub images: Vec<PostImageRecord>,
}

/// Count the scope, clamp the requested page and fetch its slice.
pub(crate) async fn compose(
    posts: &dyn PostsRepo,
    scope: PostScope,
    raw_page: Option<&str>,
    page_size: NonZeroU32,
) -> Result<FeedPage<PostEntry>, RepoError> {
    let total = posts.count_posts(scope).await?;
    let window = PageWindow::resolve(total, raw_page, page_size);
    let items = if window.is_empty() {
        Vec::new()
    } else {
        posts
            .list_posts(scope, window.offset(), window.limit())
            .await?
    };

    debug!(
        target = "quire::application::feed",
        ?scope,
        page = window.number(),
        num_pages = window.num_pages(),
        items = items.len(),
        "composed feed page"
    );
    Ok(FeedPage::new(window, items))
}

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
    comments: Arc<dyn CommentsRepo>,
    page_size: NonZeroU32,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
        follows: Arc<dyn FollowsRepo>,
        comments: Arc<dyn CommentsRepo>,
        page_size: NonZeroU32,
    ) -> Self {
        Self {
            posts,
            groups,
            users,
            follows,
            comments,
            page_size,
        }
    }

    pub fn page_size(&self) -> NonZeroU32 {
        self.page_size
    }

    pub async fn home(&self, raw_page: Option<&str>) -> Result<FeedPage<PostEntry>, FeedError> {
        Ok(compose(self.posts.as_ref(), PostScope::All, raw_page, self.page_size).await?)
    }

    pub async fn group(&self, slug: &str, raw_page: Option<&str>) -> Result<GroupFeed, FeedError> {
        let group = self
            .groups
            .find_group_by_slug(slug)
            .await?
            .ok_or_else(|| FeedError::UnknownGroup(slug.to_string()))?;
        let page = compose(
            self.posts.as_ref(),
            PostScope::Group(group.id),
            raw_page,
            self.page_size,
        )
        .await?;
        Ok(GroupFeed { group, page })
    }

    /// `viewer` is the signed-in user, if any.
    pub async fn profile(
        &self,
        username: &str,
        viewer: Option<i64>,
        raw_page: Option<&str>,
    ) -> Result<ProfileFeed, FeedError> {
        let author = self
            .users
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| FeedError::UnknownAuthor(username.to_string()))?;

        let page = compose(
            self.posts.as_ref(),
            PostScope::Author(author.id),
            raw_page,
            self.page_size,
        )
        .await?;
        let following = match viewer {
            Some(viewer_id) => self.follows.is_following(viewer_id, author.id).await?,
            None => false,
        };

        Ok(ProfileFeed {
            post_count: page.window.total(),
            author,
            following,
            page,
        })
    }

    pub async fn post_detail(&self, id: i64) -> Result<PostDetail, FeedError> {
        let entry = self
            .posts
            .find_post(id)
            .await?
            .ok_or(FeedError::UnknownPost(id))?;
        let author_post_count = self
            .posts
            .count_posts(PostScope::Author(entry.post.author_id))
            .await?;
        let comments = self.comments.list_comments(id).await?;
        let images = self.posts.list_post_images(id).await?;

        Ok(PostDetail {
            entry,
            author_post_count,
            comments,
            images,
        })
    }
}
