//! In-process repositories.
//!
//! Used when no database URL is configured and by the test suite. Foreign
//! keys and unique constraints mirror the Postgres schema so both adapters
//! behave the same way from the services' point of view.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreateGroupParams, CreatePostParams, CreateSessionParams,
    CreateUserParams, FollowsRepo, GroupsRepo, PostScope, PostsRepo, PostsWriteRepo, RepoError,
    SessionsRepo, UpdatePostParams, UsersRepo,
};
use crate::domain::entities::{
    CommentEntry, CommentRecord, FollowRecord, GroupRecord, GroupRef, PostEntry, PostImageRecord,
    PostRecord, SessionRecord, UserRecord,
};

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    users: BTreeMap<i64, UserRecord>,
    groups: BTreeMap<i64, GroupRecord>,
    posts: BTreeMap<i64, PostRecord>,
    post_images: BTreeMap<i64, PostImageRecord>,
    comments: BTreeMap<i64, CommentRecord>,
    follows: BTreeMap<i64, FollowRecord>,
    sessions: BTreeMap<String, SessionRecord>,
}

impl MemoryState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn require_user(&self, id: i64) -> Result<(), RepoError> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(RepoError::Integrity {
                message: format!("user {id} does not exist"),
            })
        }
    }

    fn require_group(&self, id: Option<i64>) -> Result<(), RepoError> {
        match id {
            Some(id) if !self.groups.contains_key(&id) => Err(RepoError::Integrity {
                message: format!("group {id} does not exist"),
            }),
            _ => Ok(()),
        }
    }

    fn require_post(&self, id: i64) -> Result<(), RepoError> {
        if self.posts.contains_key(&id) {
            Ok(())
        } else {
            Err(RepoError::Integrity {
                message: format!("post {id} does not exist"),
            })
        }
    }

    fn in_scope(&self, post: &PostRecord, scope: PostScope) -> bool {
        match scope {
            PostScope::All => true,
            PostScope::Group(group_id) => post.group_id == Some(group_id),
            PostScope::Author(author_id) => post.author_id == author_id,
            PostScope::FollowedBy(user_id) => self
                .follows
                .values()
                .any(|follow| follow.user_id == user_id && follow.author_id == post.author_id),
        }
    }

    fn entry(&self, post: &PostRecord) -> Result<PostEntry, RepoError> {
        let author = self
            .users
            .get(&post.author_id)
            .ok_or_else(|| RepoError::Integrity {
                message: format!("post {} has no author", post.id),
            })?
            .author_ref();
        let group = post
            .group_id
            .and_then(|id| self.groups.get(&id))
            .map(|group| GroupRef {
                id: group.id,
                slug: group.slug.clone(),
                title: group.title.clone(),
            });

        Ok(PostEntry {
            post: post.clone(),
            author,
            group,
        })
    }

    fn remove_post(&mut self, id: i64) {
        self.posts.remove(&id);
        self.post_images.retain(|_, image| image.post_id != id);
        self.comments.retain(|_, comment| comment.post_id != id);
    }
}

/// Repositories keeping every table in memory behind a single lock.
#[derive(Clone, Default)]
pub struct MemoryRepositories {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UsersRepo for MemoryRepositories {
    async fn find_user(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut state = self.state.write().await;
        if state
            .users
            .values()
            .any(|user| user.username == params.username)
        {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".to_string(),
            });
        }

        let id = state.allocate_id();
        let record = UserRecord {
            id,
            username: params.username,
            first_name: params.first_name,
            last_name: params.last_name,
            email: params.email,
            password_hash: params.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        state.users.insert(id, record.clone());
        Ok(record)
    }

    async fn delete_user(&self, id: i64) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        if state.users.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }

        let authored: Vec<i64> = state
            .posts
            .values()
            .filter(|post| post.author_id == id)
            .map(|post| post.id)
            .collect();
        for post_id in authored {
            state.remove_post(post_id);
        }
        state.comments.retain(|_, comment| comment.author_id != id);
        state
            .follows
            .retain(|_, follow| follow.user_id != id && follow.author_id != id);
        state.sessions.retain(|_, session| session.user_id != id);
        Ok(())
    }
}

#[async_trait]
impl GroupsRepo for MemoryRepositories {
    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let state = self.state.read().await;
        let mut groups: Vec<GroupRecord> = state.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(groups)
    }

    async fn find_group(&self, id: i64) -> Result<Option<GroupRecord>, RepoError> {
        Ok(self.state.read().await.groups.get(&id).cloned())
    }

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state.groups.values().find(|group| group.slug == slug).cloned())
    }

    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError> {
        let mut state = self.state.write().await;
        if state.groups.values().any(|group| group.slug == params.slug) {
            return Err(RepoError::Duplicate {
                constraint: "groups_slug_key".to_string(),
            });
        }

        let id = state.allocate_id();
        let record = GroupRecord {
            id,
            title: params.title,
            slug: params.slug,
            description: params.description,
        };
        state.groups.insert(id, record.clone());
        Ok(record)
    }

    async fn delete_group(&self, id: i64) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        if state.groups.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        for post in state.posts.values_mut() {
            if post.group_id == Some(id) {
                post.group_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PostsRepo for MemoryRepositories {
    async fn count_posts(&self, scope: PostScope) -> Result<u64, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .posts
            .values()
            .filter(|post| state.in_scope(post, scope))
            .count() as u64)
    }

    async fn list_posts(
        &self,
        scope: PostScope,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PostEntry>, RepoError> {
        let state = self.state.read().await;
        let mut posts: Vec<&PostRecord> = state
            .posts
            .values()
            .filter(|post| state.in_scope(post, scope))
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let offset = usize::try_from(offset).map_err(|_| RepoError::InvalidInput {
            message: "offset out of range".to_string(),
        })?;
        let limit = usize::try_from(limit).map_err(|_| RepoError::InvalidInput {
            message: "limit out of range".to_string(),
        })?;

        posts
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|post| state.entry(post))
            .collect()
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostEntry>, RepoError> {
        let state = self.state.read().await;
        state.posts.get(&id).map(|post| state.entry(post)).transpose()
    }

    async fn list_post_images(&self, post_id: i64) -> Result<Vec<PostImageRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .post_images
            .values()
            .filter(|image| image.post_id == post_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.write().await;
        state.require_user(params.author_id)?;
        state.require_group(params.group_id)?;

        let id = state.allocate_id();
        let record = PostRecord {
            id,
            text: params.text,
            created_at: OffsetDateTime::now_utc(),
            author_id: params.author_id,
            group_id: params.group_id,
            image: params.image,
        };
        state.posts.insert(id, record.clone());
        Ok(record)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.write().await;
        state.require_group(params.group_id)?;

        let post = state.posts.get_mut(&params.id).ok_or(RepoError::NotFound)?;
        post.text = params.text;
        post.group_id = params.group_id;
        if params.image.is_some() {
            post.image = params.image;
        }
        Ok(post.clone())
    }

    async fn add_post_image(
        &self,
        post_id: i64,
        image: Option<String>,
    ) -> Result<PostImageRecord, RepoError> {
        let mut state = self.state.write().await;
        state.require_post(post_id)?;

        let id = state.allocate_id();
        let record = PostImageRecord { id, post_id, image };
        state.post_images.insert(id, record.clone());
        Ok(record)
    }

    async fn delete_post(&self, id: i64) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        if !state.posts.contains_key(&id) {
            return Err(RepoError::NotFound);
        }
        state.remove_post(id);
        Ok(())
    }
}

#[async_trait]
impl CommentsRepo for MemoryRepositories {
    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentEntry>, RepoError> {
        let state = self.state.read().await;
        let mut comments: Vec<&CommentRecord> = state
            .comments
            .values()
            .filter(|comment| comment.post_id == post_id)
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        comments
            .into_iter()
            .map(|comment| {
                let author = state
                    .users
                    .get(&comment.author_id)
                    .ok_or_else(|| RepoError::Integrity {
                        message: format!("comment {} has no author", comment.id),
                    })?
                    .author_ref();
                Ok(CommentEntry {
                    comment: comment.clone(),
                    author,
                })
            })
            .collect()
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut state = self.state.write().await;
        state.require_post(params.post_id)?;
        state.require_user(params.author_id)?;

        let id = state.allocate_id();
        let record = CommentRecord {
            id,
            post_id: params.post_id,
            author_id: params.author_id,
            text: params.text,
            created_at: OffsetDateTime::now_utc(),
        };
        state.comments.insert(id, record.clone());
        Ok(record)
    }
}

#[async_trait]
impl FollowsRepo for MemoryRepositories {
    async fn follow(&self, user_id: i64, author_id: i64) -> Result<FollowRecord, RepoError> {
        let mut state = self.state.write().await;
        if user_id == author_id {
            return Err(RepoError::Integrity {
                message: "users cannot follow themselves".to_string(),
            });
        }
        state.require_user(user_id)?;
        state.require_user(author_id)?;

        if let Some(existing) = state
            .follows
            .values()
            .find(|follow| follow.user_id == user_id && follow.author_id == author_id)
        {
            return Ok(existing.clone());
        }

        let id = state.allocate_id();
        let record = FollowRecord {
            id,
            user_id,
            author_id,
        };
        state.follows.insert(id, record.clone());
        Ok(record)
    }

    async fn unfollow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let mut state = self.state.write().await;
        let before = state.follows.len();
        state
            .follows
            .retain(|_, follow| !(follow.user_id == user_id && follow.author_id == author_id));
        Ok(state.follows.len() < before)
    }

    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .follows
            .values()
            .any(|follow| follow.user_id == user_id && follow.author_id == author_id))
    }
}

#[async_trait]
impl SessionsRepo for MemoryRepositories {
    async fn create_session(
        &self,
        params: CreateSessionParams,
    ) -> Result<SessionRecord, RepoError> {
        let mut state = self.state.write().await;
        state.require_user(params.user_id)?;
        if state.sessions.contains_key(&params.token_hash) {
            return Err(RepoError::Duplicate {
                constraint: "sessions_pkey".to_string(),
            });
        }

        let record = SessionRecord {
            token_hash: params.token_hash,
            user_id: params.user_id,
            created_at: OffsetDateTime::now_utc(),
            expires_at: params.expires_at,
        };
        state
            .sessions
            .insert(record.token_hash.clone(), record.clone());
        Ok(record)
    }

    async fn find_session(&self, token_hash: &str) -> Result<Option<SessionRecord>, RepoError> {
        Ok(self.state.read().await.sessions.get(token_hash).cloned())
    }

    async fn delete_session(&self, token_hash: &str) -> Result<(), RepoError> {
        self.state.write().await.sessions.remove(token_hash);
        Ok(())
    }

    async fn purge_expired_sessions(&self, now: OffsetDateTime) -> Result<u64, RepoError> {
        let mut state = self.state.write().await;
        let before = state.sessions.len();
        state.sessions.retain(|_, session| !session.is_expired(now));
        Ok((before - state.sessions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[tokio::test]
    async fn duplicate_usernames_are_rejected() {
        let repos = MemoryRepositories::new();
        user(&repos, "leo").await;

        let err = repos
            .create_user(CreateUserParams {
                username: "leo".to_string(),
                first_name: String::new(),
                last_name: String::new(),
                email: String::new(),
                password_hash: "hash".to_string(),
            })
            .await
            .expect_err("duplicate");
        assert!(matches!(err, RepoError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn posts_list_newest_first_even_within_one_instant() {
        let repos = MemoryRepositories::new();
        let leo = user(&repos, "leo").await;
        for n in 0..3 {
            repos
                .create_post(CreatePostParams {
                    author_id: leo,
                    text: format!("post {n}"),
                    group_id: None,
                    image: None,
                })
                .await
                .expect("post");
        }

        let texts: Vec<String> = repos
            .list_posts(PostScope::All, 0, 10)
            .await
            .expect("list")
            .into_iter()
            .map(|entry| entry.post.text)
            .collect();
        assert_eq!(texts, vec!["post 2", "post 1", "post 0"]);
    }

    #[tokio::test]
    async fn deleting_a_group_detaches_posts() {
        let repos = MemoryRepositories::new();
        let leo = user(&repos, "leo").await;
        let group = repos
            .create_group(CreateGroupParams {
                title: "Cats".to_string(),
                slug: "cats".to_string(),
                description: String::new(),
            })
            .await
            .expect("group");
        let post = repos
            .create_post(CreatePostParams {
                author_id: leo,
                text: "meow".to_string(),
                group_id: Some(group.id),
                image: None,
            })
            .await
            .expect("post");

        repos.delete_group(group.id).await.expect("delete");

        let entry = repos.find_post(post.id).await.expect("find").expect("kept");
        assert!(entry.group.is_none());
        assert_eq!(repos.count_posts(PostScope::Group(group.id)).await.expect("count"), 0);
    }

    #[tokio::test]
    async fn deleting_a_user_cascades_to_posts_and_follows() {
        let repos = MemoryRepositories::new();
        let leo = user(&repos, "leo").await;
        let mia = user(&repos, "mia").await;
        let post = repos
            .create_post(CreatePostParams {
                author_id: leo,
                text: "bye".to_string(),
                group_id: None,
                image: None,
            })
            .await
            .expect("post");
        repos
            .create_comment(CreateCommentParams {
                post_id: post.id,
                author_id: mia,
                text: "see you".to_string(),
            })
            .await
            .expect("comment");
        repos.follow(mia, leo).await.expect("follow");

        repos.delete_user(leo).await.expect("delete");

        assert!(repos.find_post(post.id).await.expect("find").is_none());
        assert!(repos.list_comments(post.id).await.expect("comments").is_empty());
        assert!(!repos.is_following(mia, leo).await.expect("following"));
    }

    #[tokio::test]
    async fn deleting_a_post_removes_its_images_and_comments() {
        let repos = MemoryRepositories::new();
        let leo = user(&repos, "leo").await;
        let post = repos
            .create_post(CreatePostParams {
                author_id: leo,
                text: "with a picture".to_string(),
                group_id: None,
                image: Some("posts/cat.gif".to_string()),
            })
            .await
            .expect("post");
        repos
            .add_post_image(post.id, Some("posts/cat.gif".to_string()))
            .await
            .expect("image");
        repos
            .create_comment(CreateCommentParams {
                post_id: post.id,
                author_id: leo,
                text: "nice".to_string(),
            })
            .await
            .expect("comment");

        repos.delete_post(post.id).await.expect("delete");

        assert!(repos.find_post(post.id).await.expect("find").is_none());
        assert!(repos.list_post_images(post.id).await.expect("images").is_empty());
        assert!(repos.list_comments(post.id).await.expect("comments").is_empty());
        assert!(matches!(
            repos.delete_post(post.id).await,
            Err(RepoError::NotFound)
        ));
    }

    #[tokio::test]
    async fn follow_returns_the_existing_edge() {
        let repos = MemoryRepositories::new();
        let leo = user(&repos, "leo").await;
        let mia = user(&repos, "mia").await;

        let first = repos.follow(mia, leo).await.expect("follow");
        let second = repos.follow(mia, leo).await.expect("follow again");
        assert_eq!(first, second);
        assert!(repos.unfollow(mia, leo).await.expect("unfollow"));
        assert!(!repos.is_following(mia, leo).await.expect("following"));
        assert!(repos.follow(leo, leo).await.is_err());
    }
}
