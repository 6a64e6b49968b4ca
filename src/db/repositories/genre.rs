use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use tracing::info;

use crate::db::{StoreError, StoreResult, is_unique_violation};
use crate::entities::genres;
use crate::entities::prelude::*;

pub struct GenreRepository {
    conn: DatabaseConnection,
}

impl GenreRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(
        &self,
        search: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> StoreResult<Vec<genres::Model>> {
        let mut query = Genres::find().order_by_asc(genres::Column::Slug);

        if let Some(term) = search {
            query = query.filter(genres::Column::Name.contains(term));
        }

        let rows = query.limit(limit).offset(offset).all(&self.conn).await?;
        Ok(rows)
    }

    pub async fn count(&self, search: Option<&str>) -> StoreResult<u64> {
        let mut query = Genres::find();

        if let Some(term) = search {
            query = query.filter(genres::Column::Name.contains(term));
        }

        let count = query.count(&self.conn).await?;
        Ok(count)
    }

    pub async fn create(&self, name: &str, slug: &str) -> StoreResult<genres::Model> {
        let active = genres::ActiveModel {
            name: Set(name.to_string()),
            slug: Set(slug.to_string()),
            ..Default::default()
        };

        let genre = active.insert(&self.conn).await.map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::validation(format!("Genre slug '{slug}' already exists"))
            } else {
                e.into()
            }
        })?;

        info!("Created genre '{}'", genre.slug);
        Ok(genre)
    }

    pub async fn delete_by_slug(&self, slug: &str) -> StoreResult<bool> {
        let result = Genres::delete_many()
            .filter(genres::Column::Slug.eq(slug))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }
}
