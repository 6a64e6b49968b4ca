//! Bulk CSV loader for seeding a fresh database.
//!
//! Expects the yamdb-style fixture layout: `users.csv`, `category.csv`,
//! `genre.csv`, `titles.csv`, `review.csv`, `comments.csv`, and optionally
//! `genre_title.csv`. Rows carry explicit ids which are preserved so
//! cross-file references stay valid. The loader refuses to run against a
//! database that already holds catalog data.

use std::path::Path;

use anyhow::{Context, bail};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::Deserialize;
use tracing::info;

use crate::db::Store;
use crate::entities::users::Role;
use crate::entities::{categories, comments, genres, reviews, title_genres, titles, users};

#[derive(Debug, Default)]
pub struct ImportReport {
    pub users: usize,
    pub categories: usize,
    pub genres: usize,
    pub titles: usize,
    pub genre_links: usize,
    pub reviews: usize,
    pub comments: usize,
}

#[derive(Debug, Deserialize)]
struct UserRow {
    id: i32,
    username: String,
    email: String,
    role: String,
    bio: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SlugRow {
    id: i32,
    name: String,
    slug: String,
}

#[derive(Debug, Deserialize)]
struct TitleRow {
    id: i32,
    name: String,
    year: i32,
    category: i32,
}

#[derive(Debug, Deserialize)]
struct GenreLinkRow {
    title_id: i32,
    genre_id: i32,
}

#[derive(Debug, Deserialize)]
struct ReviewRow {
    id: i32,
    title_id: i32,
    text: String,
    author: i32,
    score: i32,
    pub_date: String,
}

#[derive(Debug, Deserialize)]
struct CommentRow {
    id: i32,
    review_id: i32,
    text: String,
    author: i32,
    pub_date: String,
}

pub async fn run(store: &Store, data_dir: &Path) -> anyhow::Result<ImportReport> {
    if !store.catalog_is_empty().await? {
        bail!(
            "Data already loaded. Delete the database file and re-run migrations \
             for a fresh import."
        );
    }

    let mut report = ImportReport::default();

    for row in read_rows::<UserRow>(&data_dir.join("users.csv"))? {
        let role = parse_role(&row.role)?;
        users::ActiveModel {
            id: Set(row.id),
            username: Set(row.username),
            email: Set(row.email),
            first_name: Set(row.first_name.filter(|s| !s.is_empty())),
            last_name: Set(row.last_name.filter(|s| !s.is_empty())),
            bio: Set(row.bio.filter(|s| !s.is_empty())),
            role: Set(role),
            confirmation_code: Set(crate::db::repositories::user::generate_confirmation_code()),
        }
        .insert(&store.conn)
        .await?;
        report.users += 1;
    }
    info!("Imported {} users", report.users);

    for row in read_rows::<SlugRow>(&data_dir.join("category.csv"))? {
        categories::ActiveModel {
            id: Set(row.id),
            name: Set(row.name),
            slug: Set(row.slug),
        }
        .insert(&store.conn)
        .await?;
        report.categories += 1;
    }
    info!("Imported {} categories", report.categories);

    for row in read_rows::<SlugRow>(&data_dir.join("genre.csv"))? {
        genres::ActiveModel {
            id: Set(row.id),
            name: Set(row.name),
            slug: Set(row.slug),
        }
        .insert(&store.conn)
        .await?;
        report.genres += 1;
    }
    info!("Imported {} genres", report.genres);

    for row in read_rows::<TitleRow>(&data_dir.join("titles.csv"))? {
        titles::ActiveModel {
            id: Set(row.id),
            name: Set(row.name),
            year: Set(row.year),
            description: Set(None),
            category_id: Set(Some(row.category)),
            rating: Set(None),
        }
        .insert(&store.conn)
        .await?;
        report.titles += 1;
    }
    info!("Imported {} titles", report.titles);

    // The genre link file is part of the fixture set but optional.
    let genre_links = data_dir.join("genre_title.csv");
    if genre_links.exists() {
        for row in read_rows::<GenreLinkRow>(&genre_links)? {
            title_genres::ActiveModel {
                title_id: Set(row.title_id),
                genre_id: Set(row.genre_id),
            }
            .insert(&store.conn)
            .await?;
            report.genre_links += 1;
        }
        info!("Imported {} genre links", report.genre_links);
    }

    let mut reviewed_titles = Vec::new();
    for row in read_rows::<ReviewRow>(&data_dir.join("review.csv"))? {
        reviews::ActiveModel {
            id: Set(row.id),
            title_id: Set(row.title_id),
            author_id: Set(row.author),
            text: Set(row.text),
            score: Set(row.score),
            created_at: Set(row.pub_date),
        }
        .insert(&store.conn)
        .await?;
        if !reviewed_titles.contains(&row.title_id) {
            reviewed_titles.push(row.title_id);
        }
        report.reviews += 1;
    }
    info!("Imported {} reviews", report.reviews);

    for row in read_rows::<CommentRow>(&data_dir.join("comments.csv"))? {
        comments::ActiveModel {
            id: Set(row.id),
            review_id: Set(row.review_id),
            author_id: Set(row.author),
            text: Set(row.text),
            created_at: Set(row.pub_date),
        }
        .insert(&store.conn)
        .await?;
        report.comments += 1;
    }
    info!("Imported {} comments", report.comments);

    // Reviews were inserted directly, so bring the cached ratings in line.
    for title_id in reviewed_titles {
        refresh_rating(store, title_id).await?;
    }

    info!("Data loading completed");
    Ok(report)
}

fn read_rows<T: for<'de> Deserialize<'de>>(path: &Path) -> anyhow::Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let row: T =
            record.with_context(|| format!("malformed row in {}", path.display()))?;
        rows.push(row);
    }

    Ok(rows)
}

fn parse_role(raw: &str) -> anyhow::Result<Role> {
    match raw {
        "user" => Ok(Role::User),
        "moderator" => Ok(Role::Moderator),
        "admin" => Ok(Role::Admin),
        other => bail!("unknown role '{other}'"),
    }
}

async fn refresh_rating(store: &Store, title_id: i32) -> anyhow::Result<()> {
    use sea_orm::sea_query::{Expr, Func};
    use sea_orm::{ColumnTrait, FromQueryResult, QueryFilter, QuerySelect};

    #[derive(FromQueryResult)]
    struct ScoreAvg {
        avg: Option<f64>,
    }

    let row = crate::entities::prelude::Reviews::find()
        .select_only()
        .expr_as(Func::avg(Expr::col(reviews::Column::Score)), "avg")
        .filter(reviews::Column::TitleId.eq(title_id))
        .into_model::<ScoreAvg>()
        .one(&store.conn)
        .await?;

    #[allow(clippy::cast_possible_truncation)]
    let rating = row.and_then(|r| r.avg).map(|avg| avg.round_ties_even() as i32);

    crate::entities::prelude::Titles::update_many()
        .col_expr(titles::Column::Rating, Expr::value(rating))
        .filter(titles::Column::Id.eq(title_id))
        .exec(&store.conn)
        .await?;

    Ok(())
}
