use crate::{Error, Result};
use chrono::{DateTime, Utc};
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, FromQueryResult)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub username: String,
    pub password_hash: String,
}

impl CreateUser {
    pub fn validate(&self) -> Result<()> {
        check_email(&self.email)?;
        check_username(&self.username)?;
        if self.password_hash.is_empty() {
            return Err(Error::Validation("password_hash must be provided".into()));
        }
        Ok(())
    }

    /// Registration additionally requires a full name
    pub fn validate_registration(&self) -> Result<()> {
        self.validate()?;
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(Error::Validation(
                "first_name and last_name must be provided".into(),
            ));
        }
        Ok(())
    }
}

/// Partial update; absent fields keep their current value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub password_hash: Option<String>,
}

impl UpdateUser {
    pub fn validate(&self) -> Result<()> {
        if let Some(email) = &self.email {
            check_email(email)?;
        }
        if let Some(username) = &self.username {
            check_username(username)?;
        }
        if matches!(&self.password_hash, Some(hash) if hash.is_empty()) {
            return Err(Error::Validation("password_hash must not be empty".into()));
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.username.is_none()
            && self.password_hash.is_none()
    }
}

fn check_email(email: &str) -> Result<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(Error::Validation("email must be a valid email address".into())),
    }
}

fn check_username(username: &str) -> Result<()> {
    let length = username.chars().count();
    if !(3..=32).contains(&length) {
        return Err(Error::Validation(
            "username must be between 3 and 32 characters".into(),
        ));
    }
    Ok(())
}
