use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use tracing::info;

use crate::db::{StoreError, StoreResult, is_unique_violation};
use crate::entities::categories;
use crate::entities::prelude::*;

pub struct CategoryRepository {
    conn: DatabaseConnection,
}

impl CategoryRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(
        &self,
        search: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> StoreResult<Vec<categories::Model>> {
        let mut query = Categories::find().order_by_asc(categories::Column::Slug);

        if let Some(term) = search {
            query = query.filter(categories::Column::Name.contains(term));
        }

        let rows = query.limit(limit).offset(offset).all(&self.conn).await?;
        Ok(rows)
    }

    pub async fn count(&self, search: Option<&str>) -> StoreResult<u64> {
        let mut query = Categories::find();

        if let Some(term) = search {
            query = query.filter(categories::Column::Name.contains(term));
        }

        let count = query.count(&self.conn).await?;
        Ok(count)
    }

    pub async fn create(&self, name: &str, slug: &str) -> StoreResult<categories::Model> {
        let active = categories::ActiveModel {
            name: Set(name.to_string()),
            slug: Set(slug.to_string()),
            ..Default::default()
        };

        let category = active.insert(&self.conn).await.map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::validation(format!("Category slug '{slug}' already exists"))
            } else {
                e.into()
            }
        })?;

        info!("Created category '{}'", category.slug);
        Ok(category)
    }

    /// Titles referencing the category keep existing; their category link is
    /// cleared by the schema's SET NULL action.
    pub async fn delete_by_slug(&self, slug: &str) -> StoreResult<bool> {
        let result = Categories::delete_many()
            .filter(categories::Column::Slug.eq(slug))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }
}
