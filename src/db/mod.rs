use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr, SqlErr, TransactionError};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::review::{NewReview, ReviewUpdate};
pub use repositories::title::{NewTitle, TitleFilter, TitleUpdate, TitleWithRefs};
pub use repositories::user::{NewUser, UserUpdate};

use crate::entities::users::Role;
use crate::entities::{categories, comments, genres, reviews, users};

/// Storage-layer error taxonomy. Constraint conflicts surface as
/// `Validation` so the API maps them to a 400 like any other bad input.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<TransactionError<StoreError>> for StoreError {
    fn from(err: TransactionError<StoreError>) -> Self {
        match err {
            TransactionError::Connection(e) => Self::Database(e),
            TransactionError::Transaction(e) => e,
        }
    }
}

/// True when the error is a unique-constraint violation, so callers can
/// turn it into a validation error with a message that names the field.
#[must_use]
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> anyhow::Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> anyhow::Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn category_repo(&self) -> repositories::category::CategoryRepository {
        repositories::category::CategoryRepository::new(self.conn.clone())
    }

    fn genre_repo(&self) -> repositories::genre::GenreRepository {
        repositories::genre::GenreRepository::new(self.conn.clone())
    }

    fn title_repo(&self) -> repositories::title::TitleRepository {
        repositories::title::TitleRepository::new(self.conn.clone())
    }

    fn review_repo(&self) -> repositories::review::ReviewRepository {
        repositories::review::ReviewRepository::new(self.conn.clone())
    }

    fn comment_repo(&self) -> repositories::comment::CommentRepository {
        repositories::comment::CommentRepository::new(self.conn.clone())
    }

    // ========== Users ==========

    pub async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<users::Model>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_user_by_id(&self, id: i32) -> StoreResult<Option<users::Model>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn list_users(
        &self,
        search: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> StoreResult<Vec<users::Model>> {
        self.user_repo().list(search, limit, offset).await
    }

    pub async fn count_users(&self, search: Option<&str>) -> StoreResult<u64> {
        self.user_repo().count(search).await
    }

    pub async fn create_user(&self, new_user: NewUser) -> StoreResult<users::Model> {
        self.user_repo().create(new_user).await
    }

    pub async fn signup_user(&self, username: &str, email: &str) -> StoreResult<users::Model> {
        self.user_repo().signup(username, email).await
    }

    pub async fn update_user(
        &self,
        user: users::Model,
        update: UserUpdate,
    ) -> StoreResult<users::Model> {
        self.user_repo().update(user, update).await
    }

    pub async fn delete_user_by_username(&self, username: &str) -> StoreResult<bool> {
        self.user_repo().delete_by_username(username).await
    }

    pub async fn get_usernames_by_ids(
        &self,
        ids: &[i32],
    ) -> StoreResult<std::collections::HashMap<i32, String>> {
        self.user_repo().get_usernames(ids).await
    }

    // ========== Categories ==========

    pub async fn list_categories(
        &self,
        search: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> StoreResult<Vec<categories::Model>> {
        self.category_repo().list(search, limit, offset).await
    }

    pub async fn count_categories(&self, search: Option<&str>) -> StoreResult<u64> {
        self.category_repo().count(search).await
    }

    pub async fn create_category(&self, name: &str, slug: &str) -> StoreResult<categories::Model> {
        self.category_repo().create(name, slug).await
    }

    pub async fn delete_category_by_slug(&self, slug: &str) -> StoreResult<bool> {
        self.category_repo().delete_by_slug(slug).await
    }

    // ========== Genres ==========

    pub async fn list_genres(
        &self,
        search: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> StoreResult<Vec<genres::Model>> {
        self.genre_repo().list(search, limit, offset).await
    }

    pub async fn count_genres(&self, search: Option<&str>) -> StoreResult<u64> {
        self.genre_repo().count(search).await
    }

    pub async fn create_genre(&self, name: &str, slug: &str) -> StoreResult<genres::Model> {
        self.genre_repo().create(name, slug).await
    }

    pub async fn delete_genre_by_slug(&self, slug: &str) -> StoreResult<bool> {
        self.genre_repo().delete_by_slug(slug).await
    }

    // ========== Titles ==========

    pub async fn list_titles(
        &self,
        filter: &TitleFilter,
        limit: u64,
        offset: u64,
    ) -> StoreResult<Vec<TitleWithRefs>> {
        self.title_repo().list(filter, limit, offset).await
    }

    pub async fn count_titles(&self, filter: &TitleFilter) -> StoreResult<u64> {
        self.title_repo().count(filter).await
    }

    pub async fn get_title(&self, id: i32) -> StoreResult<Option<TitleWithRefs>> {
        self.title_repo().get(id).await
    }

    pub async fn title_exists(&self, id: i32) -> StoreResult<bool> {
        Ok(self.title_repo().get_model(id).await?.is_some())
    }

    pub async fn create_title(&self, new_title: NewTitle) -> StoreResult<TitleWithRefs> {
        self.title_repo().create(new_title).await
    }

    pub async fn update_title(
        &self,
        id: i32,
        update: TitleUpdate,
    ) -> StoreResult<Option<TitleWithRefs>> {
        self.title_repo().update(id, update).await
    }

    pub async fn delete_title(&self, id: i32) -> StoreResult<bool> {
        self.title_repo().delete(id).await
    }

    // ========== Reviews ==========

    pub async fn list_reviews(
        &self,
        title_id: i32,
        limit: u64,
        offset: u64,
    ) -> StoreResult<Vec<reviews::Model>> {
        self.review_repo()
            .list_for_title(title_id, limit, offset)
            .await
    }

    pub async fn count_reviews(&self, title_id: i32) -> StoreResult<u64> {
        self.review_repo().count_for_title(title_id).await
    }

    pub async fn get_review(
        &self,
        title_id: i32,
        review_id: i32,
    ) -> StoreResult<Option<reviews::Model>> {
        self.review_repo().get(title_id, review_id).await
    }

    pub async fn create_review(&self, new_review: NewReview) -> StoreResult<reviews::Model> {
        self.review_repo().create(new_review).await
    }

    pub async fn update_review(
        &self,
        review: reviews::Model,
        update: ReviewUpdate,
    ) -> StoreResult<reviews::Model> {
        self.review_repo().update(review, update).await
    }

    pub async fn delete_review(&self, review: reviews::Model) -> StoreResult<()> {
        self.review_repo().delete(review).await
    }

    // ========== Comments ==========

    pub async fn list_comments(
        &self,
        review_id: i32,
        limit: u64,
        offset: u64,
    ) -> StoreResult<Vec<comments::Model>> {
        self.comment_repo()
            .list_for_review(review_id, limit, offset)
            .await
    }

    pub async fn count_comments(&self, review_id: i32) -> StoreResult<u64> {
        self.comment_repo().count_for_review(review_id).await
    }

    pub async fn get_comment(
        &self,
        review_id: i32,
        comment_id: i32,
    ) -> StoreResult<Option<comments::Model>> {
        self.comment_repo().get(review_id, comment_id).await
    }

    pub async fn create_comment(
        &self,
        new_comment: repositories::comment::NewComment,
    ) -> StoreResult<comments::Model> {
        self.comment_repo().create(new_comment).await
    }

    pub async fn update_comment_text(
        &self,
        comment: comments::Model,
        text: String,
    ) -> StoreResult<comments::Model> {
        self.comment_repo().update_text(comment, text).await
    }

    pub async fn delete_comment(&self, id: i32) -> StoreResult<bool> {
        self.comment_repo().delete(id).await
    }

    /// True when the catalog already holds data; the CSV importer refuses
    /// to run against a non-empty database.
    pub async fn catalog_is_empty(&self) -> StoreResult<bool> {
        use sea_orm::{EntityTrait, PaginatorTrait};

        let genres = crate::entities::prelude::Genres::find()
            .count(&self.conn)
            .await?;
        Ok(genres == 0)
    }

    /// Seed an admin account, used by the `create-admin` CLI command.
    pub async fn create_admin_user(&self, username: &str, email: &str) -> StoreResult<users::Model> {
        self.user_repo()
            .create(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                first_name: None,
                last_name: None,
                bio: None,
                role: Role::Admin,
            })
            .await
    }
}
