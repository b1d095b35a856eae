use serde::{Deserialize, Serialize};

use crate::{auth::repo_types::Role, reminders::adherence::PatientAdherence};

use super::repo::Counts;

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

pub const MAX_PAGE: i64 = 100;

impl UserListQuery {
    /// Clamp to `1..=MAX_PAGE` and a non-negative offset.
    pub fn page(&self) -> (i64, i64) {
        (self.limit.clamp(1, MAX_PAGE), self.offset.max(0))
    }
}

#[derive(Debug, Deserialize)]
pub struct UserStatusRequest {
    pub active: bool,
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    #[serde(flatten)]
    pub counts: Counts,
    pub average_adherence: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct AdherenceReport {
    pub average_adherence: Option<f64>,
    pub patients: Vec<PatientAdherence>,
}
