use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use tracing::info;

use crate::db::StoreResult;
use crate::entities::comments;
use crate::entities::prelude::*;

#[derive(Debug, Clone)]
pub struct NewComment {
    pub review_id: i32,
    pub author_id: i32,
    pub text: String,
}

pub struct CommentRepository {
    conn: DatabaseConnection,
}

impl CommentRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list_for_review(
        &self,
        review_id: i32,
        limit: u64,
        offset: u64,
    ) -> StoreResult<Vec<comments::Model>> {
        let rows = Comments::find()
            .filter(comments::Column::ReviewId.eq(review_id))
            .order_by_asc(comments::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(&self.conn)
            .await?;

        Ok(rows)
    }

    pub async fn count_for_review(&self, review_id: i32) -> StoreResult<u64> {
        let count = Comments::find()
            .filter(comments::Column::ReviewId.eq(review_id))
            .count(&self.conn)
            .await?;

        Ok(count)
    }

    pub async fn get(
        &self,
        review_id: i32,
        comment_id: i32,
    ) -> StoreResult<Option<comments::Model>> {
        let comment = Comments::find_by_id(comment_id)
            .filter(comments::Column::ReviewId.eq(review_id))
            .one(&self.conn)
            .await?;

        Ok(comment)
    }

    pub async fn create(&self, new_comment: NewComment) -> StoreResult<comments::Model> {
        let comment = comments::ActiveModel {
            review_id: Set(new_comment.review_id),
            author_id: Set(new_comment.author_id),
            text: Set(new_comment.text),
            created_at: Set(Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await?;

        info!(
            "User {} commented on review {}",
            comment.author_id, comment.review_id
        );
        Ok(comment)
    }

    pub async fn update_text(
        &self,
        comment: comments::Model,
        text: String,
    ) -> StoreResult<comments::Model> {
        let mut active: comments::ActiveModel = comment.into();
        active.text = Set(text);

        let comment = active.update(&self.conn).await?;
        Ok(comment)
    }

    pub async fn delete(&self, id: i32) -> StoreResult<bool> {
        let result = Comments::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }
}
