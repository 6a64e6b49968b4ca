use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, JoinType,
    LoaderTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
    Set, TransactionTrait,
};
use tracing::info;

use crate::db::{StoreError, StoreResult};
use crate::entities::prelude::*;
use crate::entities::{categories, genres, title_genres, titles};

/// A title together with its resolved category and genres, the read shape
/// returned by the API.
#[derive(Debug, Clone)]
pub struct TitleWithRefs {
    pub title: titles::Model,
    pub category: Option<categories::Model>,
    pub genres: Vec<genres::Model>,
}

#[derive(Debug, Clone)]
pub struct NewTitle {
    pub name: String,
    pub year: i32,
    pub description: Option<String>,
    pub category_slug: Option<String>,
    pub genre_slugs: Vec<String>,
}

/// Partial update. The outer `Option` distinguishes "leave unchanged" from
/// an explicit value; the inner one allows clearing nullable fields.
#[derive(Debug, Clone, Default)]
pub struct TitleUpdate {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub description: Option<Option<String>>,
    pub category_slug: Option<Option<String>>,
    pub genre_slugs: Option<Vec<String>>,
}

/// Query-side filters for listing titles.
#[derive(Debug, Clone, Default)]
pub struct TitleFilter {
    pub category: Option<String>,
    pub genre: Option<String>,
    pub name: Option<String>,
    pub year: Option<i32>,
}

pub struct TitleRepository {
    conn: DatabaseConnection,
}

impl TitleRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn filtered(filter: &TitleFilter) -> sea_orm::Select<Titles> {
        let mut query = Titles::find();

        if let Some(year) = filter.year {
            query = query.filter(titles::Column::Year.eq(year));
        }
        if let Some(name) = &filter.name {
            query = query.filter(titles::Column::Name.contains(name));
        }
        if let Some(category) = &filter.category {
            query = query
                .join(JoinType::InnerJoin, titles::Relation::Categories.def())
                .filter(categories::Column::Slug.eq(category));
        }
        if let Some(genre) = &filter.genre {
            query = query
                .join(
                    JoinType::InnerJoin,
                    title_genres::Relation::Titles.def().rev(),
                )
                .join(JoinType::InnerJoin, title_genres::Relation::Genres.def())
                .filter(genres::Column::Slug.eq(genre));
        }

        query
    }

    pub async fn count(&self, filter: &TitleFilter) -> StoreResult<u64> {
        let count = Self::filtered(filter).count(&self.conn).await?;
        Ok(count)
    }

    pub async fn list(
        &self,
        filter: &TitleFilter,
        limit: u64,
        offset: u64,
    ) -> StoreResult<Vec<TitleWithRefs>> {
        let rows = Self::filtered(filter)
            .order_by_asc(titles::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(&self.conn)
            .await?;

        let categories = rows.load_one(Categories, &self.conn).await?;
        let genres = rows
            .load_many_to_many(Genres, TitleGenres, &self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .zip(categories)
            .zip(genres)
            .map(|((title, category), genres)| TitleWithRefs {
                title,
                category,
                genres,
            })
            .collect())
    }

    pub async fn get(&self, id: i32) -> StoreResult<Option<TitleWithRefs>> {
        let Some(title) = Titles::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let category = match title.category_id {
            Some(category_id) => Categories::find_by_id(category_id).one(&self.conn).await?,
            None => None,
        };
        let genres = title.find_related(Genres).all(&self.conn).await?;

        Ok(Some(TitleWithRefs {
            title,
            category,
            genres,
        }))
    }

    pub async fn get_model(&self, id: i32) -> StoreResult<Option<titles::Model>> {
        let title = Titles::find_by_id(id).one(&self.conn).await?;
        Ok(title)
    }

    pub async fn create(&self, new_title: NewTitle) -> StoreResult<TitleWithRefs> {
        let id = self
            .conn
            .transaction::<_, i32, StoreError>(|txn| {
                Box::pin(async move {
                    let category_id = match &new_title.category_slug {
                        Some(slug) => Some(resolve_category(txn, slug).await?),
                        None => None,
                    };
                    let genre_ids = resolve_genres(txn, &new_title.genre_slugs).await?;

                    let title = titles::ActiveModel {
                        name: Set(new_title.name),
                        year: Set(new_title.year),
                        description: Set(new_title.description),
                        category_id: Set(category_id),
                        rating: Set(None),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;

                    link_genres(txn, title.id, &genre_ids).await?;

                    Ok(title.id)
                })
            })
            .await
            .map_err(StoreError::from)?;

        info!("Created title {}", id);

        // The read-back happens outside the transaction; the row was just
        // committed so it cannot be missing.
        self.get(id)
            .await?
            .ok_or_else(|| StoreError::not_found("Title"))
    }

    pub async fn update(&self, id: i32, update: TitleUpdate) -> StoreResult<Option<TitleWithRefs>> {
        let Some(title) = Titles::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        self.conn
            .transaction::<_, (), StoreError>(|txn| {
                Box::pin(async move {
                    let mut active: titles::ActiveModel = title.into();

                    if let Some(name) = update.name {
                        active.name = Set(name);
                    }
                    if let Some(year) = update.year {
                        active.year = Set(year);
                    }
                    if let Some(description) = update.description {
                        active.description = Set(description);
                    }
                    if let Some(category_slug) = update.category_slug {
                        let category_id = match &category_slug {
                            Some(slug) => Some(resolve_category(txn, slug).await?),
                            None => None,
                        };
                        active.category_id = Set(category_id);
                    }

                    let title = active.update(txn).await?;

                    if let Some(genre_slugs) = update.genre_slugs {
                        let genre_ids = resolve_genres(txn, &genre_slugs).await?;
                        TitleGenres::delete_many()
                            .filter(title_genres::Column::TitleId.eq(title.id))
                            .exec(txn)
                            .await?;
                        link_genres(txn, title.id, &genre_ids).await?;
                    }

                    Ok(())
                })
            })
            .await
            .map_err(StoreError::from)?;

        self.get(id).await
    }

    /// Reviews (and their comments) go with the title via FK cascade.
    pub async fn delete(&self, id: i32) -> StoreResult<bool> {
        let result = Titles::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }
}

async fn resolve_category<C: ConnectionTrait>(conn: &C, slug: &str) -> StoreResult<i32> {
    let category = Categories::find()
        .filter(categories::Column::Slug.eq(slug))
        .one(conn)
        .await?
        .ok_or_else(|| StoreError::validation(format!("Unknown category slug '{slug}'")))?;

    Ok(category.id)
}

async fn resolve_genres<C: ConnectionTrait>(conn: &C, slugs: &[String]) -> StoreResult<Vec<i32>> {
    let rows = Genres::find()
        .filter(genres::Column::Slug.is_in(slugs.to_vec()))
        .all(conn)
        .await?;

    let mut ids = Vec::with_capacity(slugs.len());
    for slug in slugs {
        let genre = rows
            .iter()
            .find(|g| &g.slug == slug)
            .ok_or_else(|| StoreError::validation(format!("Unknown genre slug '{slug}'")))?;
        ids.push(genre.id);
    }

    Ok(ids)
}

async fn link_genres<C: ConnectionTrait>(
    conn: &C,
    title_id: i32,
    genre_ids: &[i32],
) -> StoreResult<()> {
    if genre_ids.is_empty() {
        return Ok(());
    }

    let links = genre_ids.iter().map(|&genre_id| title_genres::ActiveModel {
        title_id: Set(title_id),
        genre_id: Set(genre_id),
    });

    TitleGenres::insert_many(links).exec(conn).await?;
    Ok(())
}
