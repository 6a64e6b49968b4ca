use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use tracing::info;

use crate::db::{StoreError, StoreResult, is_unique_violation};
use crate::entities::users::{self, Role};
use crate::entities::prelude::*;

/// Field set accepted when creating an account, either through signup or
/// through the admin user-management endpoints.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: Role,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: Option<Role>,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_username(&self, username: &str) -> StoreResult<Option<users::Model>> {
        let user = Users::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await?;

        Ok(user)
    }

    pub async fn get_by_id(&self, id: i32) -> StoreResult<Option<users::Model>> {
        let user = Users::find_by_id(id).one(&self.conn).await?;
        Ok(user)
    }

    pub async fn list(
        &self,
        search: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> StoreResult<Vec<users::Model>> {
        let mut query = Users::find().order_by_asc(users::Column::Id);

        if let Some(term) = search {
            query = query.filter(users::Column::Username.contains(term));
        }

        let rows = query.limit(limit).offset(offset).all(&self.conn).await?;
        Ok(rows)
    }

    pub async fn count(&self, search: Option<&str>) -> StoreResult<u64> {
        let mut query = Users::find();

        if let Some(term) = search {
            query = query.filter(users::Column::Username.contains(term));
        }

        let count = query.count(&self.conn).await?;
        Ok(count)
    }

    pub async fn create(&self, new_user: NewUser) -> StoreResult<users::Model> {
        let active = users::ActiveModel {
            username: Set(new_user.username),
            email: Set(new_user.email),
            first_name: Set(new_user.first_name),
            last_name: Set(new_user.last_name),
            bio: Set(new_user.bio),
            role: Set(new_user.role),
            confirmation_code: Set(generate_confirmation_code()),
            ..Default::default()
        };

        let user = active.insert(&self.conn).await.map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::validation("A user with this username or email already exists")
            } else {
                e.into()
            }
        })?;

        info!("Created user '{}' with role {}", user.username, user.role);
        Ok(user)
    }

    /// Signup is idempotent for an exact (username, email) re-request: the
    /// stored confirmation code is returned again so it can be resent. A
    /// collision with a *different* pairing is a validation error.
    pub async fn signup(&self, username: &str, email: &str) -> StoreResult<users::Model> {
        let existing = Users::find()
            .filter(
                Condition::any()
                    .add(users::Column::Username.eq(username))
                    .add(users::Column::Email.eq(email)),
            )
            .all(&self.conn)
            .await?;

        if let Some(user) = existing
            .iter()
            .find(|u| u.username == username && u.email == email)
        {
            info!("Signup re-request for '{}', resending code", username);
            return Ok(user.clone());
        }

        if !existing.is_empty() {
            return Err(StoreError::validation(
                "A user with this username or email already exists",
            ));
        }

        self.create(NewUser {
            username: username.to_string(),
            email: email.to_string(),
            first_name: None,
            last_name: None,
            bio: None,
            role: Role::User,
        })
        .await
    }

    pub async fn update(&self, user: users::Model, update: UserUpdate) -> StoreResult<users::Model> {
        let mut active: users::ActiveModel = user.into();

        if let Some(email) = update.email {
            active.email = Set(email);
        }
        if let Some(first_name) = update.first_name {
            active.first_name = Set(Some(first_name));
        }
        if let Some(last_name) = update.last_name {
            active.last_name = Set(Some(last_name));
        }
        if let Some(bio) = update.bio {
            active.bio = Set(Some(bio));
        }
        if let Some(role) = update.role {
            active.role = Set(role);
        }

        let user = active.update(&self.conn).await.map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::validation("A user with this email already exists")
            } else {
                e.into()
            }
        })?;

        Ok(user)
    }

    /// Batch lookup used when rendering review and comment authors.
    pub async fn get_usernames(
        &self,
        ids: &[i32],
    ) -> StoreResult<std::collections::HashMap<i32, String>> {
        let rows = Users::find()
            .filter(users::Column::Id.is_in(ids.to_vec()))
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(|u| (u.id, u.username)).collect())
    }

    pub async fn delete_by_username(&self, username: &str) -> StoreResult<bool> {
        let result = Users::delete_many()
            .filter(users::Column::Username.eq(username))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }
}

/// Generate a random 32-character alphanumeric confirmation code.
#[must_use]
pub fn generate_confirmation_code() -> String {
    use rand::Rng;
    use rand::distr::Alphanumeric;

    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}
