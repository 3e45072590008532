use time::OffsetDateTime;

use crate::domain::entities::{
    AuthorRef, CommentEntry, CommentRecord, FollowRecord, GroupRecord, GroupRef, PostEntry,
    PostImageRecord, PostRecord, SessionRecord, UserRecord, display_name,
};

pub(crate) const POST_ENTRY_SELECT: &str = "SELECT p.id, p.text, p.created_at, p.author_id, \
     p.group_id, p.image, u.username AS author_username, u.first_name AS author_first_name, \
     u.last_name AS author_last_name, g.slug AS group_slug, g.title AS group_title \
     FROM posts p \
     INNER JOIN users u ON u.id = p.author_id \
     LEFT JOIN groups g ON g.id = p.group_id ";

pub(crate) const POST_ORDER: &str = " ORDER BY p.created_at DESC, p.id DESC ";

#[derive(sqlx::FromRow)]
pub(crate) struct UserRow {
    pub(crate) id: i64,
    pub(crate) username: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) email: String,
    pub(crate) password_hash: String,
    pub(crate) created_at: OffsetDateTime,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            password_hash: row.password_hash,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct GroupRow {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) slug: String,
    pub(crate) description: String,
}

impl From<GroupRow> for GroupRecord {
    fn from(row: GroupRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            description: row.description,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct PostRow {
    pub(crate) id: i64,
    pub(crate) text: String,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) author_id: i64,
    pub(crate) group_id: Option<i64>,
    pub(crate) image: Option<String>,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            text: row.text,
            created_at: row.created_at,
            author_id: row.author_id,
            group_id: row.group_id,
            image: row.image,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct PostEntryRow {
    pub(crate) id: i64,
    pub(crate) text: String,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) author_id: i64,
    pub(crate) group_id: Option<i64>,
    pub(crate) image: Option<String>,
    pub(crate) author_username: String,
    pub(crate) author_first_name: String,
    pub(crate) author_last_name: String,
    pub(crate) group_slug: Option<String>,
    pub(crate) group_title: Option<String>,
}

impl From<PostEntryRow> for PostEntry {
    fn from(row: PostEntryRow) -> Self {
        let group = match (row.group_id, row.group_slug, row.group_title) {
            (Some(id), Some(slug), Some(title)) => Some(GroupRef { id, slug, title }),
            _ => None,
        };
        let author = AuthorRef {
            id: row.author_id,
            display_name: display_name(
                &row.author_username,
                &row.author_first_name,
                &row.author_last_name,
            ),
            username: row.author_username,
        };

        Self {
            post: PostRecord {
                id: row.id,
                text: row.text,
                created_at: row.created_at,
                author_id: row.author_id,
                group_id: row.group_id,
                image: row.image,
            },
            author,
            group,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct PostImageRow {
    pub(crate) id: i64,
    pub(crate) post_id: i64,
    pub(crate) image: Option<String>,
}

impl From<PostImageRow> for PostImageRecord {
    fn from(row: PostImageRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            image: row.image,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct CommentRow {
    pub(crate) id: i64,
    pub(crate) post_id: i64,
    pub(crate) author_id: i64,
    pub(crate) text: String,
    pub(crate) created_at: OffsetDateTime,
}

impl From<CommentRow> for CommentRecord {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            author_id: row.author_id,
            text: row.text,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct CommentEntryRow {
    pub(crate) id: i64,
    pub(crate) post_id: i64,
    pub(crate) author_id: i64,
    pub(crate) text: String,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) author_username: String,
    pub(crate) author_first_name: String,
    pub(crate) author_last_name: String,
}

impl From<CommentEntryRow> for CommentEntry {
    fn from(row: CommentEntryRow) -> Self {
        Self {
            author: AuthorRef {
                id: row.author_id,
                display_name: display_name(
                    &row.author_username,
                    &row.author_first_name,
                    &row.author_last_name,
                ),
                username: row.author_username,
            },
            comment: CommentRecord {
                id: row.id,
                post_id: row.post_id,
                author_id: row.author_id,
                text: row.text,
                created_at: row.created_at,
            },
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct FollowRow {
    pub(crate) id: i64,
    pub(crate) user_id: i64,
    pub(crate) author_id: i64,
}

impl From<FollowRow> for FollowRecord {
    fn from(row: FollowRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            author_id: row.author_id,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct SessionRow {
    pub(crate) token_hash: String,
    pub(crate) user_id: i64,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) expires_at: OffsetDateTime,
}

impl From<SessionRow> for SessionRecord {
    fn from(row: SessionRow) -> Self {
        Self {
            token_hash: row.token_hash,
            user_id: row.user_id,
            created_at: row.created_at,
            expires_at: row.expires_at,
        }
    }
}
