use serde::{Deserialize, Serialize};

use crate::db::TitleWithRefs;
use crate::entities::users::Role;
use crate::entities::{categories, comments, genres, reviews, users};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// List envelope for paginated collections.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub count: u64,
    pub results: Vec<T>,
}

/// Common `?limit=&offset=&search=` query parameters.
#[derive(Debug, Deserialize, Default)]
pub struct PageQuery {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: Role,
}

impl From<users::Model> for UserDto {
    fn from(user: users::Model) -> Self {
        Self {
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: user.bio,
            role: user.role,
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct CategoryDto {
    pub name: String,
    pub slug: String,
}

impl From<categories::Model> for CategoryDto {
    fn from(category: categories::Model) -> Self {
        Self {
            name: category.name,
            slug: category.slug,
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct GenreDto {
    pub name: String,
    pub slug: String,
}

impl From<genres::Model> for GenreDto {
    fn from(genre: genres::Model) -> Self {
        Self {
            name: genre.name,
            slug: genre.slug,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TitleDto {
    pub id: i32,
    pub name: String,
    pub year: i32,
    /// Rounded mean of review scores, absent until the first review lands.
    pub rating: Option<i32>,
    pub description: Option<String>,
    pub genre: Vec<GenreDto>,
    pub category: Option<CategoryDto>,
}

impl From<TitleWithRefs> for TitleDto {
    fn from(title: TitleWithRefs) -> Self {
        Self {
            id: title.title.id,
            name: title.title.name,
            year: title.title.year,
            rating: title.title.rating,
            description: title.title.description,
            genre: title.genres.into_iter().map(GenreDto::from).collect(),
            category: title.category.map(CategoryDto::from),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReviewDto {
    pub id: i32,
    pub text: String,
    pub author: String,
    pub score: i32,
    pub pub_date: String,
}

impl ReviewDto {
    #[must_use]
    pub fn from_model(review: reviews::Model, author: String) -> Self {
        Self {
            id: review.id,
            text: review.text,
            author,
            score: review.score,
            pub_date: review.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentDto {
    pub id: i32,
    pub text: String,
    pub author: String,
    pub pub_date: String,
}

impl CommentDto {
    #[must_use]
    pub fn from_model(comment: comments::Model, author: String) -> Self {
        Self {
            id: comment.id,
            text: comment.text,
            author,
            pub_date: comment.created_at,
        }
    }
}
