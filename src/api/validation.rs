use chrono::{Datelike, Utc};

use super::ApiError;

const MAX_NAME_LEN: usize = 256;
const MAX_SLUG_LEN: usize = 50;
const MAX_USERNAME_LEN: usize = 150;
const MAX_EMAIL_LEN: usize = 254;
const MAX_TEXT_LEN: usize = 240;
const MAX_PERSON_NAME_LEN: usize = 150;

pub fn validate_username(username: &str) -> Result<&str, ApiError> {
    if username.is_empty() {
        return Err(ApiError::validation("Username cannot be empty"));
    }

    if username.len() > MAX_USERNAME_LEN {
        return Err(ApiError::validation(format!(
            "Username must be {} characters or less",
            MAX_USERNAME_LEN
        )));
    }

    // "me" is routed to the profile endpoint and can never be an account name
    if username == "me" {
        return Err(ApiError::validation("Username 'me' is reserved"));
    }

    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(ApiError::validation(
            "Username can only contain letters, digits and @/./+/-/_ characters",
        ));
    }

    Ok(username)
}

pub fn validate_email(email: &str) -> Result<&str, ApiError> {
    if email.is_empty() {
        return Err(ApiError::validation("Email cannot be empty"));
    }

    if email.len() > MAX_EMAIL_LEN {
        return Err(ApiError::validation(format!(
            "Email must be {} characters or less",
            MAX_EMAIL_LEN
        )));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ApiError::validation(format!("Invalid email: {}", email)));
    };

    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(ApiError::validation(format!("Invalid email: {}", email)));
    }

    Ok(email)
}

pub fn validate_name(name: &str) -> Result<&str, ApiError> {
    if name.is_empty() {
        return Err(ApiError::validation("Name cannot be empty"));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(ApiError::validation(format!(
            "Name must be {} characters or less",
            MAX_NAME_LEN
        )));
    }

    Ok(name)
}

pub fn validate_slug(slug: &str) -> Result<&str, ApiError> {
    if slug.is_empty() {
        return Err(ApiError::validation("Slug cannot be empty"));
    }

    if slug.len() > MAX_SLUG_LEN {
        return Err(ApiError::validation(format!(
            "Slug must be {} characters or less",
            MAX_SLUG_LEN
        )));
    }

    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(ApiError::validation(
            "Slug can only contain lowercase letters, digits, hyphens, and underscores",
        ));
    }

    Ok(slug)
}

pub fn validate_score(score: i32) -> Result<i32, ApiError> {
    if !(1..=10).contains(&score) {
        return Err(ApiError::validation(format!(
            "Invalid score: {}. Score must be between 1 and 10",
            score
        )));
    }
    Ok(score)
}

pub fn validate_year(year: i32) -> Result<i32, ApiError> {
    let current_year = Utc::now().year();
    if year > current_year {
        return Err(ApiError::validation(format!(
            "Invalid year: {}. Titles cannot be from the future",
            year
        )));
    }
    Ok(year)
}

pub fn validate_text(text: &str) -> Result<&str, ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::validation("Text cannot be empty"));
    }

    if text.len() > MAX_TEXT_LEN {
        return Err(ApiError::validation(format!(
            "Text must be {} characters or less",
            MAX_TEXT_LEN
        )));
    }

    Ok(text)
}

/// First and last names on a profile.
pub fn validate_person_name(name: &str) -> Result<&str, ApiError> {
    if name.len() > MAX_PERSON_NAME_LEN {
        return Err(ApiError::validation(format!(
            "Name must be {} characters or less",
            MAX_PERSON_NAME_LEN
        )));
    }
    Ok(name)
}

pub fn validate_page(limit: Option<u64>, offset: Option<u64>) -> Result<(u64, u64), ApiError> {
    const DEFAULT_LIMIT: u64 = 10;
    const MAX_LIMIT: u64 = 100;

    let limit = limit.unwrap_or(DEFAULT_LIMIT);
    if limit == 0 || limit > MAX_LIMIT {
        return Err(ApiError::validation(format!(
            "Invalid limit: {}. Limit must be between 1 and {}",
            limit, MAX_LIMIT
        )));
    }

    Ok((limit, offset.unwrap_or(0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_normal_username() {
        assert!(validate_username("some.user-42").is_ok());
    }

    #[test]
    fn rejects_reserved_username() {
        assert!(validate_username("me").is_err());
    }

    #[test]
    fn rejects_username_with_spaces() {
        assert!(validate_username("some user").is_err());
    }

    #[test]
    fn rejects_overlong_username() {
        let long = "a".repeat(151);
        assert!(validate_username(&long).is_err());
    }

    #[test]
    fn validates_email_shape() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("userexample.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@nodot").is_err());
    }

    #[test]
    fn score_bounds_are_inclusive() {
        assert!(validate_score(1).is_ok());
        assert!(validate_score(10).is_ok());
        assert!(validate_score(0).is_err());
        assert!(validate_score(11).is_err());
    }

    #[test]
    fn rejects_future_year() {
        let next_year = Utc::now().year() + 1;
        assert!(validate_year(next_year).is_err());
        assert!(validate_year(1925).is_ok());
    }

    #[test]
    fn slug_charset_is_enforced() {
        assert!(validate_slug("sci-fi").is_ok());
        assert!(validate_slug("Sci-Fi").is_err());
        assert!(validate_slug("sci fi").is_err());
    }

    #[test]
    fn rejects_overlong_text() {
        assert!(validate_text("fine").is_ok());
        let long = "a".repeat(241);
        assert!(validate_text(&long).is_err());
    }

    #[test]
    fn person_name_length_is_bounded() {
        assert!(validate_person_name("Ada").is_ok());
        let long = "a".repeat(151);
        assert!(validate_person_name(&long).is_err());
    }

    #[test]
    fn page_defaults_and_bounds() {
        assert_eq!(validate_page(None, None).unwrap(), (10, 0));
        assert_eq!(validate_page(Some(50), Some(20)).unwrap(), (50, 20));
        assert!(validate_page(Some(0), None).is_err());
        assert!(validate_page(Some(1000), None).is_err());
    }
}
