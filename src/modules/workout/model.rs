use crate::{Error, Result};
use chrono::{DateTime, Utc};
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

/// Upper bound on sets for a single plan entry
pub const MAX_SETS: i32 = 50;

/// Plans created from the dashboard belong to this user until sign-in exists.
pub const DEFAULT_USER_ID: i32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromQueryResult)]
pub struct Muscle {
    pub id: i32,
    pub name: String,
    pub muscle_group: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MuscleInput {
    pub name: String,
    pub muscle_group: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl MuscleInput {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("name must be provided".into()));
        }
        if self.muscle_group.trim().is_empty() {
            return Err(Error::Validation("muscle_group must be provided".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromQueryResult)]
pub struct MuscleRank {
    pub id: i32,
    pub user_id: i32,
    pub muscle_id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<i32>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankInput {
    pub user_id: i32,
    pub muscle_id: i32,
    #[serde(default)]
    pub rank: Option<i32>,
}

impl RankInput {
    pub fn validate(&self) -> Result<()> {
        if self.user_id <= 0 || self.muscle_id <= 0 {
            return Err(Error::Validation("user_id and muscle_id must be positive".into()));
        }
        if matches!(self.rank, Some(rank) if rank < 0) {
            return Err(Error::Validation("rank must not be negative".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromQueryResult)]
pub struct Plan {
    pub id: i32,
    pub user_id: i32,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanInput {
    #[serde(default = "default_user_id")]
    pub user_id: i32,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub muscle_ids: Vec<i32>,
}

fn default_user_id() -> i32 {
    DEFAULT_USER_ID
}

impl PlanInput {
    pub fn validate(&self) -> Result<()> {
        if self.user_id <= 0 {
            return Err(Error::Validation("user_id must be positive".into()));
        }
        if self.muscle_ids.iter().any(|id| *id <= 0) {
            return Err(Error::Validation("muscle ids must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromQueryResult)]
pub struct PlanEntry {
    pub id: i32,
    pub plan_id: i32,
    pub muscle_id: i32,
    pub sets: i32,
    pub created_at: DateTime<Utc>,
}

/// A plan entry with the muscle it trains, when known
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanEntryDetail {
    #[serde(flatten)]
    pub entry: PlanEntry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub muscle: Option<Muscle>,
}

/// A plan together with its entries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanDetail {
    #[serde(flatten)]
    pub plan: Plan,
    pub entries: Vec<PlanEntryDetail>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PlanEntryPatch {
    pub sets: i32,
}

/// Validate a set count for a plan entry
pub fn check_sets(sets: i32) -> Result<()> {
    if !(0..=MAX_SETS).contains(&sets) {
        return Err(Error::Validation(format!(
            "sets must be between 0 and {MAX_SETS}"
        )));
    }
    Ok(())
}

/// Query-string filters shared by list endpoints
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Filters {
    #[serde(default)]
    pub user_id: Option<i32>,
    #[serde(default)]
    pub plan_id: Option<i32>,
    #[serde(default)]
    pub muscle_id: Option<i32>,
}
