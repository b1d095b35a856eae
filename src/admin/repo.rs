use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::care::CareError;

/// Row counts shown on the admin dashboard.
#[derive(Debug, Clone, Default, Serialize, FromRow)]
pub struct Counts {
    pub users: i64,
    pub active_users: i64,
    pub patients: i64,
    pub caregivers: i64,
    pub admins: i64,
    pub medications: i64,
    pub prescriptions: i64,
    pub notes: i64,
    pub upcoming_reminders: i64,
    pub completed_reminders: i64,
    pub missed_reminders: i64,
}

pub async fn counts(db: &PgPool) -> Result<Counts, CareError> {
    let counts = sqlx::query_as::<_, Counts>(
        r#"
        SELECT
            (SELECT count(*) FROM users)                                  AS users,
            (SELECT count(*) FROM users WHERE active)                     AS active_users,
            (SELECT count(*) FROM patients)                               AS patients,
            (SELECT count(*) FROM caregivers)                             AS caregivers,
            (SELECT count(*) FROM users WHERE role = 'admin')             AS admins,
            (SELECT count(*) FROM medications)                            AS medications,
            (SELECT count(*) FROM prescriptions)                          AS prescriptions,
            (SELECT count(*) FROM notes)                                  AS notes,
            (SELECT count(*) FROM reminders WHERE status = 'upcoming')    AS upcoming_reminders,
            (SELECT count(*) FROM reminders WHERE status = 'completed')   AS completed_reminders,
            (SELECT count(*) FROM reminders WHERE status = 'missed')      AS missed_reminders
        "#,
    )
    .fetch_one(db)
    .await?;
    Ok(counts)
}
