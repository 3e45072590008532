use async_trait::async_trait;
use sqlx::QueryBuilder;

use crate::application::repos::{
    CreatePostParams, PostScope, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::{PostEntry, PostImageRecord, PostRecord};

use super::PostgresRepositories;
use super::types::{POST_ENTRY_SELECT, POST_ORDER, PostEntryRow, PostImageRow, PostRow};
use super::util::{convert_count, convert_window, map_sqlx_error};

const POST_COLUMNS: &str = "id, text, created_at, author_id, group_id, image";

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn count_posts(&self, scope: PostScope) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM posts p WHERE 1=1 ");
        Self::apply_scope_conditions(&mut qb, scope);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        convert_count(count)
    }

    async fn list_posts(
        &self,
        scope: PostScope,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PostEntry>, RepoError> {
        let (offset, limit) = convert_window(offset, limit)?;

        let mut qb = QueryBuilder::new(POST_ENTRY_SELECT);
        qb.push(" WHERE 1=1 ");
        Self::apply_scope_conditions(&mut qb, scope);
        qb.push(POST_ORDER);
        qb.push(" LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows = qb
            .build_query_as::<PostEntryRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(PostEntry::from).collect())
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostEntry>, RepoError> {
        let sql = format!("{POST_ENTRY_SELECT} WHERE p.id = $1");
        let row = sqlx::query_as::<_, PostEntryRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(PostEntry::from))
    }

    async fn list_post_images(&self, post_id: i64) -> Result<Vec<PostImageRecord>, RepoError> {
        let rows = sqlx::query_as::<_, PostImageRow>(
            "SELECT id, post_id, image FROM post_images WHERE post_id = $1 ORDER BY id",
        )
        .bind(post_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(PostImageRecord::from).collect())
    }
}

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let CreatePostParams {
            author_id,
            text,
            group_id,
            image,
        } = params;

        let sql = format!(
            "INSERT INTO posts (author_id, text, group_id, image) VALUES ($1, $2, $3, $4) \
             RETURNING {POST_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(author_id)
            .bind(text)
            .bind(group_id)
            .bind(image)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(PostRecord::from(row))
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let UpdatePostParams {
            id,
            text,
            group_id,
            image,
        } = params;

        let sql = format!(
            "UPDATE posts SET text = $2, group_id = $3, image = COALESCE($4, image) \
             WHERE id = $1 RETURNING {POST_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .bind(text)
            .bind(group_id)
            .bind(image)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)?;
        Ok(PostRecord::from(row))
    }

    async fn add_post_image(
        &self,
        post_id: i64,
        image: Option<String>,
    ) -> Result<PostImageRecord, RepoError> {
        let row = sqlx::query_as::<_, PostImageRow>(
            "INSERT INTO post_images (post_id, image) VALUES ($1, $2) \
             RETURNING id, post_id, image",
        )
        .bind(post_id)
        .bind(image)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(PostImageRecord::from(row))
    }

    async fn delete_post(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
