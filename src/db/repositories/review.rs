use chrono::Utc;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::{debug, info};

use crate::db::{StoreError, StoreResult, is_unique_violation};
use crate::entities::prelude::*;
use crate::entities::{reviews, titles};

#[derive(Debug, Clone)]
pub struct NewReview {
    pub title_id: i32,
    pub author_id: i32,
    pub text: String,
    pub score: i32,
}

#[derive(Debug, Clone, Default)]
pub struct ReviewUpdate {
    pub text: Option<String>,
    pub score: Option<i32>,
}

#[derive(FromQueryResult)]
struct ScoreAvg {
    avg: Option<f64>,
}

/// Reviews are the only writer of `titles.rating`. Every mutation runs in a
/// transaction that also recomputes the aggregate, so a committed review is
/// never observable alongside a stale rating.
pub struct ReviewRepository {
    conn: DatabaseConnection,
}

impl ReviewRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list_for_title(
        &self,
        title_id: i32,
        limit: u64,
        offset: u64,
    ) -> StoreResult<Vec<reviews::Model>> {
        let rows = Reviews::find()
            .filter(reviews::Column::TitleId.eq(title_id))
            .order_by_asc(reviews::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(&self.conn)
            .await?;

        Ok(rows)
    }

    pub async fn count_for_title(&self, title_id: i32) -> StoreResult<u64> {
        let count = Reviews::find()
            .filter(reviews::Column::TitleId.eq(title_id))
            .count(&self.conn)
            .await?;

        Ok(count)
    }

    pub async fn get(&self, title_id: i32, review_id: i32) -> StoreResult<Option<reviews::Model>> {
        let review = Reviews::find_by_id(review_id)
            .filter(reviews::Column::TitleId.eq(title_id))
            .one(&self.conn)
            .await?;

        Ok(review)
    }

    /// One review per (title, author). The pre-check gives a clean error for
    /// the common case; the unique index catches the race.
    pub async fn create(&self, new_review: NewReview) -> StoreResult<reviews::Model> {
        let review = self
            .conn
            .transaction::<_, reviews::Model, StoreError>(|txn| {
                Box::pin(async move {
                    let existing = Reviews::find()
                        .filter(reviews::Column::TitleId.eq(new_review.title_id))
                        .filter(reviews::Column::AuthorId.eq(new_review.author_id))
                        .one(txn)
                        .await?;

                    if existing.is_some() {
                        return Err(StoreError::validation(
                            "You have already reviewed this title",
                        ));
                    }

                    let review = reviews::ActiveModel {
                        title_id: Set(new_review.title_id),
                        author_id: Set(new_review.author_id),
                        text: Set(new_review.text),
                        score: Set(new_review.score),
                        created_at: Set(Utc::now().to_rfc3339()),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await
                    .map_err(|e| {
                        if is_unique_violation(&e) {
                            StoreError::validation("You have already reviewed this title")
                        } else {
                            e.into()
                        }
                    })?;

                    recompute_title_rating(txn, review.title_id).await?;

                    Ok(review)
                })
            })
            .await
            .map_err(StoreError::from)?;

        info!(
            "User {} reviewed title {} with score {}",
            review.author_id, review.title_id, review.score
        );
        Ok(review)
    }

    pub async fn update(
        &self,
        review: reviews::Model,
        update: ReviewUpdate,
    ) -> StoreResult<reviews::Model> {
        let review = self
            .conn
            .transaction::<_, reviews::Model, StoreError>(|txn| {
                Box::pin(async move {
                    let title_id = review.title_id;
                    let mut active: reviews::ActiveModel = review.into();

                    if let Some(text) = update.text {
                        active.text = Set(text);
                    }
                    if let Some(score) = update.score {
                        active.score = Set(score);
                    }

                    let review = active.update(txn).await?;
                    recompute_title_rating(txn, title_id).await?;

                    Ok(review)
                })
            })
            .await
            .map_err(StoreError::from)?;

        Ok(review)
    }

    pub async fn delete(&self, review: reviews::Model) -> StoreResult<()> {
        self.conn
            .transaction::<_, (), StoreError>(|txn| {
                Box::pin(async move {
                    let title_id = review.title_id;
                    Reviews::delete_by_id(review.id).exec(txn).await?;
                    recompute_title_rating(txn, title_id).await?;
                    Ok(())
                })
            })
            .await
            .map_err(StoreError::from)?;

        Ok(())
    }
}

/// Recompute the cached rating from whatever reviews remain: the rounded
/// mean of scores, or NULL when the title has none.
async fn recompute_title_rating<C: ConnectionTrait>(conn: &C, title_id: i32) -> StoreResult<()> {
    let row = Reviews::find()
        .select_only()
        .expr_as(Func::avg(Expr::col(reviews::Column::Score)), "avg")
        .filter(reviews::Column::TitleId.eq(title_id))
        .into_model::<ScoreAvg>()
        .one(conn)
        .await?;

    // Banker's rounding, so {8, 9} averages to 8, not 9.
    #[allow(clippy::cast_possible_truncation)]
    let rating = row
        .and_then(|r| r.avg)
        .map(|avg| avg.round_ties_even() as i32);

    debug!("Title {} rating -> {:?}", title_id, rating);

    Titles::update_many()
        .col_expr(titles::Column::Rating, Expr::value(rating))
        .filter(titles::Column::Id.eq(title_id))
        .exec(conn)
        .await?;

    Ok(())
}
