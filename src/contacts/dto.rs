use serde::Deserialize;
use time::Date;

use super::repo_types::birthday_format;
use crate::{auth::services::is_valid_email, error::AppError};

#[derive(Debug, Deserialize)]
pub struct NewContact {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    #[serde(default, with = "birthday_format::option")]
    pub birthday: Option<Date>,
    #[serde(default)]
    pub additional_data: Option<String>,
}

impl NewContact {
    pub fn validate(&self) -> Result<(), AppError> {
        require_name("first_name", &self.first_name)?;
        require_name("last_name", &self.last_name)?;
        require_email(&self.email)?;
        require_phone(&self.phone_number)?;
        Ok(())
    }
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct ContactUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    #[serde(default, with = "birthday_format::option")]
    pub birthday: Option<Date>,
    pub additional_data: Option<String>,
}

impl ContactUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.first_name {
            require_name("first_name", name)?;
        }
        if let Some(name) = &self.last_name {
            require_name("last_name", name)?;
        }
        if let Some(email) = &self.email {
            require_email(email)?;
        }
        if let Some(phone) = &self.phone_number {
            require_phone(phone)?;
        }
        Ok(())
    }
}

fn require_name(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{field} must not be empty")));
    }
    Ok(())
}

fn require_phone(phone: &str) -> Result<(), AppError> {
    if phone.trim().is_empty() {
        return Err(AppError::BadRequest("phone_number must not be empty".into()));
    }
    Ok(())
}

fn require_email(email: &str) -> Result<(), AppError> {
    if !is_valid_email(email.trim()) {
        return Err(AppError::BadRequest("Invalid email".into()));
    }
    Ok(())
}

pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}
fn default_limit() -> i64 { 10 }

impl Pagination {
    /// (offset, limit) safe to hand to the database.
    pub fn clamped(&self) -> (i64, i64) {
        (self.skip.max(0), self.limit.clamp(1, MAX_PAGE_SIZE))
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
}
