//! Post and comment write paths.

use std::sync::Arc;

use bytes::Bytes;
use imagesize::ImageError;
use thiserror::Error;
use tracing::{info, warn};

use crate::application::forms::FormErrors;
use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePostParams, GroupsRepo, PostsRepo, PostsWriteRepo,
    RepoError, UpdatePostParams,
};
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord};
use crate::domain::posts::validate_text;
use crate::infra::uploads::{UploadStorage, UploadStorageError};

/// Directory under the upload root that receives post images.
pub const IMAGE_DIRECTORY: &str = "posts";

const INVALID_GROUP: &str = "Select a valid choice. That choice is not one of the available choices.";
const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

#[derive(Debug, Error)]
pub enum AuthoringError {
    #[error("unknown post {0}")]
    UnknownPost(i64),
    #[error("failed to store image")]
    Storage(#[from] UploadStorageError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub bytes: Bytes,
}

/// Raw post form input as submitted by the browser.
#[derive(Debug, Clone, Default)]
pub struct PostSubmission {
    pub text: String,
    /// Group id as sent by the `<select>`; blank means no group.
    pub group: String,
    pub image: Option<ImageUpload>,
}

/// Post form state for rendering.
#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub text: String,
    pub group_id: Option<i64>,
    pub errors: FormErrors,
}

#[derive(Debug)]
pub enum PostOutcome {
    Saved(PostRecord),
    Invalid(PostForm),
}

#[derive(Debug)]
pub enum EditAccess {
    Allowed(PostForm),
    NotAuthor,
}

#[derive(Debug)]
pub enum EditOutcome {
    Saved(PostRecord),
    Invalid(PostForm),
    NotAuthor,
}

#[derive(Debug)]
pub enum CommentOutcome {
    Created(CommentRecord),
    Rejected,
}

struct ValidPost {
    text: String,
    group_id: Option<i64>,
    image: Option<ImageUpload>,
}

#[derive(Clone)]
pub struct AuthoringService {
    posts: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    groups: Arc<dyn GroupsRepo>,
    comments: Arc<dyn CommentsRepo>,
    uploads: Arc<UploadStorage>,
}

impl AuthoringService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        groups: Arc<dyn GroupsRepo>,
        comments: Arc<dyn CommentsRepo>,
        uploads: Arc<UploadStorage>,
    ) -> Self {
        Self {
            posts,
            writer,
            groups,
            comments,
            uploads,
        }
    }

    /// Groups offered by the post form.
    pub async fn group_choices(&self) -> Result<Vec<GroupRecord>, AuthoringError> {
        Ok(self.groups.list_groups().await?)
    }

    pub async fn create_post(
        &self,
        author_id: i64,
        submission: PostSubmission,
    ) -> Result<PostOutcome, AuthoringError> {
        let valid = match self.validate(submission).await? {
            Ok(valid) => valid,
            Err(form) => return Ok(PostOutcome::Invalid(form)),
        };

        let image = self.store_image(valid.image).await?;
        let created = self
            .writer
            .create_post(CreatePostParams {
                author_id,
                text: valid.text,
                group_id: valid.group_id,
                image: image.clone(),
            })
            .await;
        let post = match created {
            Ok(post) => post,
            Err(err) => {
                self.discard_image(image.as_deref()).await;
                return Err(err.into());
            }
        };

        if image.is_some() {
            self.writer.add_post_image(post.id, image).await?;
        }

        info!(
            target = "quire::application::authoring",
            post_id = post.id,
            author_id,
            "post created"
        );
        Ok(PostOutcome::Saved(post))
    }

    /// Pre-filled form for the author; other users are turned away.
    pub async fn edit_form(&self, post_id: i64, actor_id: i64) -> Result<EditAccess, AuthoringError> {
        let entry = self
            .posts
            .find_post(post_id)
            .await?
            .ok_or(AuthoringError::UnknownPost(post_id))?;
        if entry.post.author_id != actor_id {
            return Ok(EditAccess::NotAuthor);
        }

        Ok(EditAccess::Allowed(PostForm {
            text: entry.post.text,
            group_id: entry.post.group_id,
            errors: FormErrors::new(),
        }))
    }

    pub async fn update_post(
        &self,
        post_id: i64,
        actor_id: i64,
        submission: PostSubmission,
    ) -> Result<EditOutcome, AuthoringError> {
        let entry = self
            .posts
            .find_post(post_id)
            .await?
            .ok_or(AuthoringError::UnknownPost(post_id))?;
        if entry.post.author_id != actor_id {
            warn!(
                target = "quire::application::authoring",
                post_id,
                actor_id,
                "edit attempted by someone other than the author"
            );
            return Ok(EditOutcome::NotAuthor);
        }

        let valid = match self.validate(submission).await? {
            Ok(valid) => valid,
            Err(form) => return Ok(EditOutcome::Invalid(form)),
        };

        let image = self.store_image(valid.image).await?;
        let updated = self
            .writer
            .update_post(UpdatePostParams {
                id: post_id,
                text: valid.text,
                group_id: valid.group_id,
                image: image.clone(),
            })
            .await;
        let post = match updated {
            Ok(post) => post,
            Err(err) => {
                self.discard_image(image.as_deref()).await;
                return Err(err.into());
            }
        };
        if image.is_some() {
            self.writer.add_post_image(post.id, image).await?;
        }

        info!(
            target = "quire::application::authoring",
            post_id,
            "post updated"
        );
        Ok(EditOutcome::Saved(post))
    }

    pub async fn add_comment(
        &self,
        post_id: i64,
        author_id: i64,
        text: &str,
    ) -> Result<CommentOutcome, AuthoringError> {
        if self.posts.find_post(post_id).await?.is_none() {
            return Err(AuthoringError::UnknownPost(post_id));
        }

        let Ok(text) = validate_text(text) else {
            return Ok(CommentOutcome::Rejected);
        };

        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id,
                author_id,
                text,
            })
            .await?;
        Ok(CommentOutcome::Created(comment))
    }

    /// Field-level validation. The outer error is reserved for repository
    /// failures; the inner one carries the form back to the author.
    async fn validate(
        &self,
        submission: PostSubmission,
    ) -> Result<Result<ValidPost, PostForm>, AuthoringError> {
        let PostSubmission { text, group, image } = submission;
        let mut errors = FormErrors::new();

        let valid_text = errors.check("text", validate_text(&text));
        let group_id = self.resolve_group(&group, &mut errors).await?;
        if let Some(upload) = &image
            && !is_image(&upload.bytes)
        {
            errors.add("image", INVALID_IMAGE);
        }

        match valid_text {
            Some(text) if errors.is_empty() => Ok(Ok(ValidPost {
                text,
                group_id,
                image,
            })),
            _ => Ok(Err(PostForm {
                text,
                group_id,
                errors,
            })),
        }
    }

    async fn resolve_group(
        &self,
        raw: &str,
        errors: &mut FormErrors,
    ) -> Result<Option<i64>, AuthoringError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }

        let Ok(id) = raw.parse::<i64>() else {
            errors.add("group", INVALID_GROUP);
            return Ok(None);
        };
        match self.groups.find_group(id).await? {
            Some(group) => Ok(Some(group.id)),
            None => {
                errors.add("group", INVALID_GROUP);
                Ok(None)
            }
        }
    }

    async fn store_image(&self, image: Option<ImageUpload>) -> Result<Option<String>, AuthoringError> {
        let Some(upload) = image else {
            return Ok(None);
        };
        let stored = self
            .uploads
            .store(IMAGE_DIRECTORY, &upload.filename, upload.bytes)
            .await?;
        info!(
            target = "quire::application::authoring",
            path = %stored.stored_path,
            size_bytes = stored.size_bytes,
            checksum = %stored.checksum,
            "stored post image"
        );
        Ok(Some(stored.stored_path))
    }

    async fn discard_image(&self, stored_path: Option<&str>) {
        if let Some(path) = stored_path
            && let Err(err) = self.uploads.delete(path).await
        {
            warn!(
                target = "quire::application::authoring",
                path,
                error = %err,
                "failed to remove orphaned image"
            );
        }
    }
}

/// Whether the payload decodes as a known image format with real dimensions.
fn is_image(bytes: &[u8]) -> bool {
    match imagesize::blob_size(bytes) {
        Ok(size) => size.width > 0 && size.height > 0,
        Err(ImageError::NotSupported | ImageError::CorruptedImage | ImageError::IoError(_)) => {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::repos::{CreateGroupParams, CreateUserParams, UsersRepo};
    use crate::domain::entities::PostImageRecord;
    use crate::infra::memory::MemoryRepositories;

    const SMALL_GIF: &[u8] = &[
        0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
        0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
        0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0c, 0x0a, 0x00, 0x3b,
    ];

    struct Fixture {
        repos: MemoryRepositories,
        service: AuthoringService,
        dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().expect("tempdir");
        let uploads = Arc::new(UploadStorage::new(dir.path().to_path_buf()).expect("storage"));
        let repos = MemoryRepositories::new();
        let shared = Arc::new(repos.clone());
        let service = AuthoringService::new(
            shared.clone(),
            shared.clone(),
            shared.clone(),
            shared,
            uploads,
        );
        Fixture {
            repos,
            service,
            dir,
        }
    }

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

    /// Writer whose updates fail as if the post vanished mid-request.
    struct VanishingPosts(MemoryRepositories);

    #[async_trait::async_trait]
    impl PostsWriteRepo for VanishingPosts {
        async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
            self.0.create_post(params).await
        }

        async fn update_post(&self, _params: UpdatePostParams) -> Result<PostRecord, RepoError> {
            Err(RepoError::NotFound)
        }

        async fn add_post_image(
            &self,
            post_id: i64,
            image: Option<String>,
        ) -> Result<PostImageRecord, RepoError> {
            self.0.add_post_image(post_id, image).await
        }

        async fn delete_post(&self, id: i64) -> Result<(), RepoError> {
            self.0.delete_post(id).await
        }
    }

    fn submission(text: &str) -> PostSubmission {
        PostSubmission {
            text: text.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn gif_header_is_recognised() {
        assert!(is_image(SMALL_GIF));
        assert!(!is_image(b"definitely not an image"));
    }

    #[tokio::test]
    async fn create_stores_image_and_records_post_image() {
        let fx = fixture();
        let leo = user(&fx.repos, "leo").await;

        let outcome = fx
            .service
            .create_post(
                leo,
                PostSubmission {
                    text: "with picture".to_string(),
                    group: String::new(),
                    image: Some(ImageUpload {
                        filename: "small.gif".to_string(),
                        bytes: Bytes::from_static(SMALL_GIF),
                    }),
                },
            )
            .await
            .expect("create");

        let PostOutcome::Saved(post) = outcome else {
            panic!("expected a saved post");
        };
        assert_eq!(post.author_id, leo);
        assert_eq!(post.image.as_deref(), Some("posts/small.gif"));
        let images = fx.repos.list_post_images(post.id).await.expect("images");
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].image.as_deref(), Some("posts/small.gif"));
    }

    #[tokio::test]
    async fn invalid_fields_persist_nothing() {
        let fx = fixture();
        let leo = user(&fx.repos, "leo").await;

        let outcome = fx
            .service
            .create_post(
                leo,
                PostSubmission {
                    text: "   ".to_string(),
                    group: "404".to_string(),
                    image: Some(ImageUpload {
                        filename: "fake.gif".to_string(),
                        bytes: Bytes::from_static(b"plain text"),
                    }),
                },
            )
            .await
            .expect("validation result");

        let PostOutcome::Invalid(form) = outcome else {
            panic!("expected validation errors");
        };
        assert!(!form.errors.field("text").is_empty());
        assert!(!form.errors.field("group").is_empty());
        assert!(!form.errors.field("image").is_empty());
        assert_eq!(
            fx.repos
                .count_posts(crate::application::repos::PostScope::All)
                .await
                .expect("count"),
            0
        );
    }

    #[tokio::test]
    async fn only_the_author_may_edit() {
        let fx = fixture();
        let leo = user(&fx.repos, "leo").await;
        let mia = user(&fx.repos, "mia").await;
        let cats = fx
            .repos
            .create_group(CreateGroupParams {
                title: "Cats".to_string(),
                slug: "cats".to_string(),
                description: String::new(),
            })
            .await
            .expect("group");
        let PostOutcome::Saved(post) = fx
            .service
            .create_post(leo, submission("original"))
            .await
            .expect("create")
        else {
            panic!("expected a saved post");
        };

        assert!(matches!(
            fx.service.edit_form(post.id, mia).await.expect("access"),
            EditAccess::NotAuthor
        ));
        assert!(matches!(
            fx.service
                .update_post(post.id, mia, submission("hijacked"))
                .await
                .expect("update"),
            EditOutcome::NotAuthor
        ));

        let outcome = fx
            .service
            .update_post(
                post.id,
                leo,
                PostSubmission {
                    text: "edited".to_string(),
                    group: cats.id.to_string(),
                    image: None,
                },
            )
            .await
            .expect("update");
        let EditOutcome::Saved(updated) = outcome else {
            panic!("expected a saved edit");
        };
        assert_eq!(updated.text, "edited");
        assert_eq!(updated.group_id, Some(cats.id));
        assert_eq!(updated.author_id, leo);
    }

    #[tokio::test]
    async fn blank_comments_are_rejected() {
        let fx = fixture();
        let leo = user(&fx.repos, "leo").await;
        let PostOutcome::Saved(post) = fx
            .service
            .create_post(leo, submission("commentable"))
            .await
            .expect("create")
        else {
            panic!("expected a saved post");
        };

        assert!(matches!(
            fx.service.add_comment(post.id, leo, "  ").await.expect("comment"),
            CommentOutcome::Rejected
        ));
        assert!(matches!(
            fx.service.add_comment(post.id, leo, "hello").await.expect("comment"),
            CommentOutcome::Created(_)
        ));
        assert!(matches!(
            fx.service.add_comment(post.id + 100, leo, "hello").await,
            Err(AuthoringError::UnknownPost(_))
        ));
    }

    #[tokio::test]
    async fn failed_update_removes_the_new_image() {
        let fx = fixture();
        let leo = user(&fx.repos, "leo").await;
        let PostOutcome::Saved(post) = fx
            .service
            .create_post(leo, submission("original"))
            .await
            .expect("create")
        else {
            panic!("expected a saved post");
        };

        let shared = Arc::new(fx.repos.clone());
        let uploads =
            Arc::new(UploadStorage::new(fx.dir.path().to_path_buf()).expect("storage"));
        let service = AuthoringService::new(
            shared.clone(),
            Arc::new(VanishingPosts(fx.repos.clone())),
            shared.clone(),
            shared,
            uploads,
        );

        let result = service
            .update_post(
                post.id,
                leo,
                PostSubmission {
                    text: "edited".to_string(),
                    group: String::new(),
                    image: Some(ImageUpload {
                        filename: "small.gif".to_string(),
                        bytes: Bytes::from_static(SMALL_GIF),
                    }),
                },
            )
            .await;

        assert!(matches!(result, Err(AuthoringError::Repo(RepoError::NotFound))));
        assert!(!fx.dir.path().join("posts/small.gif").exists());
        assert!(fx.repos.list_post_images(post.id).await.expect("images").is_empty());
    }
}
