/// Request validation rules shared across operations
use crate::error::{ApiError, ApiResult};
use chrono::{Datelike, NaiveDate, Utc};

/// Minimum age (inclusive) allowed to register
pub const MIN_AGE: i32 = 13;
/// Maximum age (inclusive) allowed to register
pub const MAX_AGE: i32 = 35;

/// Completed years between `birthday` and `today`
pub fn age_on(birthday: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birthday.year();
    if (today.month(), today.day()) < (birthday.month(), birthday.day()) {
        age -= 1;
    }
    age
}

/// Enforce the platform age rule: 13 to 35 inclusive
pub fn validate_age_range(birthday: NaiveDate) -> ApiResult<()> {
    let age = age_on(birthday, Utc::now().date_naive());

    if age < MIN_AGE {
        return Err(ApiError::Validation(format!(
            "You must be at least {} years old to register",
            MIN_AGE
        )));
    }
    if age > MAX_AGE {
        return Err(ApiError::Validation(format!(
            "This platform is restricted to people up to {} years old",
            MAX_AGE
        )));
    }

    Ok(())
}

/// Parse a YYYY-MM-DD birthday string
pub fn parse_birthday(value: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::Validation("Birthday must be a valid date".to_string()))
}

/// Basic email shape check
pub fn validate_email(email: &str) -> ApiResult<()> {
    if email.is_empty() || email.len() > 255 || !email.contains('@') || email.contains(' ') {
        return Err(ApiError::Validation("Invalid email address".to_string()));
    }
    Ok(())
}

/// Password length and confirmation rules
pub fn validate_password(password: &str, confirmation: &str) -> ApiResult<()> {
    if password.len() < 8 {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    if password != confirmation {
        return Err(ApiError::Validation(
            "Password confirmation does not match".to_string(),
        ));
    }
    Ok(())
}
