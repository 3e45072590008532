//! Follow graph between users and authors.

use std::num::NonZeroU32;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::feed::compose;
use crate::application::pagination::FeedPage;
use crate::application::repos::{FollowsRepo, PostScope, PostsRepo, RepoError, UsersRepo};
use crate::domain::entities::{FollowRecord, PostEntry, UserRecord};

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("unknown author `{0}`")]
    UnknownAuthor(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug)]
pub enum FollowOutcome {
    Following(FollowRecord),
    /// Following yourself is a no-op.
    SelfFollow,
}

#[derive(Clone)]
pub struct FollowService {
    follows: Arc<dyn FollowsRepo>,
    users: Arc<dyn UsersRepo>,
    posts: Arc<dyn PostsRepo>,
    page_size: NonZeroU32,
}

impl FollowService {
    pub fn new(
        follows: Arc<dyn FollowsRepo>,
        users: Arc<dyn UsersRepo>,
        posts: Arc<dyn PostsRepo>,
        page_size: NonZeroU32,
    ) -> Self {
        Self {
            follows,
            users,
            posts,
            page_size,
        }
    }

    pub async fn follow(&self, actor_id: i64, username: &str) -> Result<FollowOutcome, FollowError> {
        let author = self.author(username).await?;
        if author.id == actor_id {
            return Ok(FollowOutcome::SelfFollow);
        }

        let edge = self.follows.follow(actor_id, author.id).await?;
        info!(
            target = "quire::application::follows",
            user_id = actor_id,
            author_id = author.id,
            "following author"
        );
        Ok(FollowOutcome::Following(edge))
    }

    /// Returns whether an edge existed.
    pub async fn unfollow(&self, actor_id: i64, username: &str) -> Result<bool, FollowError> {
        let author = self.author(username).await?;
        let removed = self.follows.unfollow(actor_id, author.id).await?;
        if removed {
            info!(
                target = "quire::application::follows",
                user_id = actor_id,
                author_id = author.id,
                "unfollowed author"
            );
        }
        Ok(removed)
    }

    pub async fn is_following(&self, actor_id: i64, author_id: i64) -> Result<bool, FollowError> {
        Ok(self.follows.is_following(actor_id, author_id).await?)
    }

    /// Posts by every author `actor_id` follows, newest first.
    pub async fn feed_for(
        &self,
        actor_id: i64,
        raw_page: Option<&str>,
    ) -> Result<FeedPage<PostEntry>, FollowError> {
        Ok(compose(
            self.posts.as_ref(),
            PostScope::FollowedBy(actor_id),
            raw_page,
            self.page_size,
        )
        .await?)
    }

    async fn author(&self, username: &str) -> Result<UserRecord, FollowError> {
        self.users
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| FollowError::UnknownAuthor(username.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::repos::{CreatePostParams, CreateUserParams, PostsWriteRepo};
    use crate::infra::memory::MemoryRepositories;

    async fn user(repos: &MemoryRepositories, username: &str) -> i64 {
        repos
            .create_user(CreateUserParams {
                username: username.to_string(),
                first_name: String::new(),
                last_name: String::new(),
                email: String::new(),
                password_hash: "hash".to_string(),
            })
            .await
            .expect("user")
            .id
    }

    fn service(repos: &MemoryRepositories) -> FollowService {
        let shared = Arc::new(repos.clone());
        FollowService::new(
            shared.clone(),
            shared.clone(),
            shared,
            NonZeroU32::new(10).expect("page size"),
        )
    }

    #[tokio::test]
    async fn following_twice_keeps_one_edge() {
        let repos = MemoryRepositories::new();
        let leo = user(&repos, "leo").await;
        let mia = user(&repos, "mia").await;
        let follows = service(&repos);

        let FollowOutcome::Following(first) = follows.follow(mia, "leo").await.expect("follow")
        else {
            panic!("expected an edge");
        };
        let FollowOutcome::Following(second) = follows.follow(mia, "leo").await.expect("follow")
        else {
            panic!("expected an edge");
        };

        assert_eq!(first.id, second.id);
        assert!(repos.is_following(mia, leo).await.expect("following"));
    }

    #[tokio::test]
    async fn self_follow_creates_nothing() {
        let repos = MemoryRepositories::new();
        let leo = user(&repos, "leo").await;
        let follows = service(&repos);

        assert!(matches!(
            follows.follow(leo, "leo").await.expect("follow"),
            FollowOutcome::SelfFollow
        ));
        assert!(!repos.is_following(leo, leo).await.expect("following"));
    }

    #[tokio::test]
    async fn unfollow_without_edge_is_a_no_op() {
        let repos = MemoryRepositories::new();
        user(&repos, "leo").await;
        let mia = user(&repos, "mia").await;
        let follows = service(&repos);

        assert!(!follows.unfollow(mia, "leo").await.expect("unfollow"));
        assert!(matches!(
            follows.unfollow(mia, "ghost").await,
            Err(FollowError::UnknownAuthor(_))
        ));
    }

    #[tokio::test]
    async fn feed_contains_only_followed_authors() {
        let repos = MemoryRepositories::new();
        let leo = user(&repos, "leo").await;
        let mia = user(&repos, "mia").await;
        let max = user(&repos, "max").await;
        for (author_id, text) in [(leo, "from leo"), (max, "from max")] {
            repos
                .create_post(CreatePostParams {
                    author_id,
                    text: text.to_string(),
                    group_id: None,
                    image: None,
                })
                .await
                .expect("post");
        }
        let follows = service(&repos);
        follows.follow(mia, "leo").await.expect("follow");

        let feed = follows.feed_for(mia, None).await.expect("feed");
        assert_eq!(feed.items.len(), 1);
        assert_eq!(feed.items[0].post.text, "from leo");

        let lonely = follows.feed_for(leo, None).await.expect("feed");
        assert!(lonely.items.is_empty());
        assert_eq!(lonely.window.num_pages(), 1);
    }
}
