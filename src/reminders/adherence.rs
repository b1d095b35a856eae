//! Adherence: completed doses over doses that were due.

use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::repo_types::ReminderTally;
use crate::care::CareError;

impl ReminderTally {
    /// Completed, missed, and still-upcoming reminders whose time has passed.
    pub fn due(&self) -> i64 {
        self.completed + self.missed + self.overdue
    }
}

/// Percentage of due reminders that were completed, to one decimal.
/// `None` while nothing is due yet.
pub fn percentage(tally: &ReminderTally) -> Option<f64> {
    let due = tally.due();
    if due <= 0 {
        return None;
    }
    let pct = tally.completed as f64 * 100.0 / due as f64;
    Some((pct * 10.0).round() / 10.0)
}

/// Mean of the patients that have a value, to one decimal.
pub fn mean(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0u32), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| (sum / n as f64 * 10.0).round() / 10.0)
}

#[derive(Debug, Clone, FromRow)]
struct AdherenceRow {
    patient_id: Uuid,
    name: String,
    #[sqlx(flatten)]
    tally: ReminderTally,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientAdherence {
    pub patient_id: Uuid,
    pub name: String,
    pub completed: i64,
    pub missed: i64,
    pub overdue: i64,
    pub pending: i64,
    pub adherence: Option<f64>,
}

impl From<AdherenceRow> for PatientAdherence {
    fn from(row: AdherenceRow) -> Self {
        Self {
            patient_id: row.patient_id,
            name: row.name,
            completed: row.tally.completed,
            missed: row.tally.missed,
            overdue: row.tally.overdue,
            pending: row.tally.pending,
            adherence: percentage(&row.tally),
        }
    }
}

const TALLY_COLUMNS: &str = r#"
    count(r.id) FILTER (WHERE r.status = 'completed') AS completed,
    count(r.id) FILTER (WHERE r.status = 'missed') AS missed,
    count(r.id) FILTER (WHERE r.status = 'upcoming' AND r.scheduled_at <= now()) AS overdue,
    count(r.id) FILTER (WHERE r.status = 'upcoming' AND r.scheduled_at > now()) AS pending
"#;

pub async fn tally_for_patient(db: &PgPool, patient_id: Uuid) -> Result<ReminderTally, CareError> {
    let tally = sqlx::query_as::<_, ReminderTally>(&format!(
        "SELECT {TALLY_COLUMNS} FROM reminders r WHERE r.patient_id = $1"
    ))
    .bind(patient_id)
    .fetch_one(db)
    .await?;
    Ok(tally)
}

/// One entry per patient, lowest adherence first; patients with nothing due last.
pub async fn report(db: &PgPool) -> Result<Vec<PatientAdherence>, CareError> {
    let rows = sqlx::query_as::<_, AdherenceRow>(&format!(
        r#"
        SELECT p.id AS patient_id, u.name, {TALLY_COLUMNS}
          FROM patients p
          JOIN users u ON u.id = p.user_id
          LEFT JOIN reminders r ON r.patient_id = p.id
         GROUP BY p.id, u.name
        "#
    ))
    .fetch_all(db)
    .await?;

    let mut report: Vec<PatientAdherence> = rows.into_iter().map(Into::into).collect();
    report.sort_by(|a, b| match (a.adherence, b.adherence) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.name.cmp(&b.name),
    });
    Ok(report)
}
