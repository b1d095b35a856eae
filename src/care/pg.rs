use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::debug;
use uuid::Uuid;

use super::{
    audit::{LinkRow, LinkSnapshot, RepairPlan},
    error::{CareError, Entity},
    model::{
        order_by_ids, Caregiver, CaregiverRemoval, CaregiverSummary, MedicationRemoval, Patient,
        PatientRemoval, PatientSummary,
    },
    store::CareStore,
};

const PATIENT_COLUMNS: &str =
    "id, user_id, date_of_birth, conditions, caregiver_ids, created_at";
const CAREGIVER_COLUMNS: &str =
    "id, user_id, specialization, organization, patient_ids, created_at";

/// Postgres-backed [`CareStore`].
///
/// Lock order inside every transaction is caregiver rows first, then patient
/// rows, so concurrent link changes on the same pair serialize.
#[derive(Clone)]
pub struct PgCareStore {
    db: PgPool,
}

impl PgCareStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Lock a caregiver row and return its owning user id.
async fn lock_caregiver(conn: &mut PgConnection, id: Uuid) -> Result<Uuid, CareError> {
    sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM caregivers WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(CareError::not_found(Entity::Caregiver, id))
}

/// Lock a patient row and return its owning user id, if the patient exists.
async fn lock_patient(conn: &mut PgConnection, id: Uuid) -> Result<Option<Uuid>, CareError> {
    let user_id =
        sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM patients WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(user_id)
}

async fn add_to_sets(
    conn: &mut PgConnection,
    caregiver_id: Uuid,
    patient_id: Uuid,
) -> Result<u64, CareError> {
    let on_caregiver = sqlx::query(
        r#"
        UPDATE caregivers
           SET patient_ids = array_append(patient_ids, $2)
         WHERE id = $1 AND NOT ($2 = ANY(patient_ids))
        "#,
    )
    .bind(caregiver_id)
    .bind(patient_id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    let on_patient = sqlx::query(
        r#"
        UPDATE patients
           SET caregiver_ids = array_append(caregiver_ids, $1)
         WHERE id = $2 AND NOT ($1 = ANY(caregiver_ids))
        "#,
    )
    .bind(caregiver_id)
    .bind(patient_id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    Ok(on_caregiver + on_patient)
}

/// True when exactly one side of the pair references the other.
fn still_one_sided(
    caregiver_refs: &[Uuid],
    patient_refs: &[Uuid],
    caregiver_id: Uuid,
    patient_id: Uuid,
) -> bool {
    caregiver_refs.contains(&patient_id) != patient_refs.contains(&caregiver_id)
}

#[async_trait]
impl CareStore for PgCareStore {
    async fn find_patient(&self, id: Uuid) -> Result<Option<Patient>, CareError> {
        let row = sqlx::query_as::<_, Patient>(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn find_caregiver(&self, id: Uuid) -> Result<Option<Caregiver>, CareError> {
        let row = sqlx::query_as::<_, Caregiver>(&format!(
            "SELECT {CAREGIVER_COLUMNS} FROM caregivers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn find_patient_by_user(&self, user_id: Uuid) -> Result<Option<Patient>, CareError> {
        let row = sqlx::query_as::<_, Patient>(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn find_caregiver_by_user(&self, user_id: Uuid) -> Result<Option<Caregiver>, CareError> {
        let row = sqlx::query_as::<_, Caregiver>(&format!(
            "SELECT {CAREGIVER_COLUMNS} FROM caregivers WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn patient_summaries(&self, ids: &[Uuid]) -> Result<Vec<PatientSummary>, CareError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, PatientSummary>(
            r#"
            SELECT p.id, p.user_id, u.name, u.email, p.date_of_birth, p.conditions
              FROM patients p
              JOIN users u ON u.id = p.user_id
             WHERE p.id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.db)
        .await?;
        Ok(order_by_ids(ids, rows, |r| r.id))
    }

    async fn caregiver_summaries(&self, ids: &[Uuid]) -> Result<Vec<CaregiverSummary>, CareError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, CaregiverSummary>(
            r#"
            SELECT c.id, c.user_id, u.name, u.email, c.specialization, c.organization
              FROM caregivers c
              JOIN users u ON u.id = c.user_id
             WHERE c.id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.db)
        .await?;
        Ok(order_by_ids(ids, rows, |r| r.id))
    }

    async fn link(&self, caregiver_id: Uuid, patient_id: Uuid) -> Result<(), CareError> {
        let mut tx = self.db.begin().await?;
        lock_caregiver(&mut tx, caregiver_id).await?;
        if lock_patient(&mut tx, patient_id).await?.is_none() {
            return Err(CareError::not_found(Entity::Patient, patient_id));
        }
        let changed = add_to_sets(&mut tx, caregiver_id, patient_id).await?;
        tx.commit().await?;
        debug!(%caregiver_id, %patient_id, changed, "link applied");
        Ok(())
    }

    async fn unlink(&self, caregiver_id: Uuid, patient_id: Uuid) -> Result<(), CareError> {
        let mut tx = self.db.begin().await?;
        lock_caregiver(&mut tx, caregiver_id).await?;
        lock_patient(&mut tx, patient_id).await?;

        let on_caregiver = sqlx::query(
            r#"
            UPDATE caregivers
               SET patient_ids = array_remove(patient_ids, $2)
             WHERE id = $1 AND $2 = ANY(patient_ids)
            "#,
        )
        .bind(caregiver_id)
        .bind(patient_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let on_patient = sqlx::query(
            r#"
            UPDATE patients
               SET caregiver_ids = array_remove(caregiver_ids, $1)
             WHERE id = $2 AND $1 = ANY(caregiver_ids)
            "#,
        )
        .bind(caregiver_id)
        .bind(patient_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        debug!(%caregiver_id, %patient_id, changed = on_caregiver + on_patient, "unlink applied");
        Ok(())
    }

    async fn remove_caregiver(&self, caregiver_id: Uuid) -> Result<CaregiverRemoval, CareError> {
        let mut tx = self.db.begin().await?;
        let user_id = lock_caregiver(&mut tx, caregiver_id).await?;

        // Every patient, not just the ones in the caregiver's own list.
        let patients_unlinked = sqlx::query(
            r#"
            UPDATE patients
               SET caregiver_ids = array_remove(caregiver_ids, $1)
             WHERE $1 = ANY(caregiver_ids)
            "#,
        )
        .bind(caregiver_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query("DELETE FROM caregivers WHERE id = $1")
            .bind(caregiver_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(CaregiverRemoval {
            caregiver_id,
            user_id,
            patients_unlinked,
        })
    }

    async fn remove_patient(&self, patient_id: Uuid) -> Result<PatientRemoval, CareError> {
        let mut tx = self.db.begin().await?;

        sqlx::query(
            "SELECT id FROM caregivers WHERE $1 = ANY(patient_ids) ORDER BY id FOR UPDATE",
        )
        .bind(patient_id)
        .execute(&mut *tx)
        .await?;
        let user_id = lock_patient(&mut tx, patient_id)
            .await?
            .ok_or(CareError::not_found(Entity::Patient, patient_id))?;

        let caregivers_unlinked = sqlx::query(
            r#"
            UPDATE caregivers
               SET patient_ids = array_remove(patient_ids, $1)
             WHERE $1 = ANY(patient_ids)
            "#,
        )
        .bind(patient_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let reminders_deleted = sqlx::query(
            r#"
            DELETE FROM reminders
             WHERE patient_id = $1
                OR medication_id IN (SELECT id FROM medications WHERE patient_id = $1)
            "#,
        )
        .bind(patient_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let medications_deleted = sqlx::query("DELETE FROM medications WHERE patient_id = $1")
            .bind(patient_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let attachments = sqlx::query_scalar::<_, Option<String>>(
            "DELETE FROM prescriptions WHERE patient_id = $1 RETURNING attachment_key",
        )
        .bind(patient_id)
        .fetch_all(&mut *tx)
        .await?;

        let notes_deleted = sqlx::query("DELETE FROM notes WHERE patient_id = $1")
            .bind(patient_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM patients WHERE id = $1")
            .bind(patient_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(PatientRemoval {
            patient_id,
            user_id,
            caregivers_unlinked,
            medications_deleted,
            reminders_deleted,
            prescriptions_deleted: attachments.len() as u64,
            notes_deleted,
            attachment_keys: attachments.into_iter().flatten().collect(),
        })
    }

    async fn remove_medication(
        &self,
        medication_id: Uuid,
        patient_id: Uuid,
    ) -> Result<MedicationRemoval, CareError> {
        let mut tx = self.db.begin().await?;

        let owned = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM medications WHERE id = $1 AND patient_id = $2 FOR UPDATE",
        )
        .bind(medication_id)
        .bind(patient_id)
        .fetch_optional(&mut *tx)
        .await?;
        if owned.is_none() {
            return Err(CareError::not_found(Entity::Medication, medication_id));
        }

        let reminders_deleted = sqlx::query("DELETE FROM reminders WHERE medication_id = $1")
            .bind(medication_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM medications WHERE id = $1")
            .bind(medication_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(MedicationRemoval {
            medication_id,
            patient_id,
            reminders_deleted,
        })
    }

    async fn link_snapshot(&self) -> Result<LinkSnapshot, CareError> {
        // Both sides are read from one snapshot.
        let mut tx = self.db.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;
        let patients = sqlx::query_as::<_, (Uuid, Vec<Uuid>)>(
            "SELECT id, caregiver_ids FROM patients ORDER BY id",
        )
        .fetch_all(&mut *tx)
        .await?;
        let caregivers = sqlx::query_as::<_, (Uuid, Vec<Uuid>)>(
            "SELECT id, patient_ids FROM caregivers ORDER BY id",
        )
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(LinkSnapshot {
            patients: patients
                .into_iter()
                .map(|(id, refs)| LinkRow { id, refs })
                .collect(),
            caregivers: caregivers
                .into_iter()
                .map(|(id, refs)| LinkRow { id, refs })
                .collect(),
        })
    }

    async fn apply_repair(&self, plan: &RepairPlan) -> Result<(u64, u64), CareError> {
        let mut tx = self.db.begin().await?;

        let mut completed = 0;
        if !plan.links.is_empty() {
            let mut caregiver_ids: Vec<Uuid> = plan.links.iter().map(|&(c, _)| c).collect();
            let mut patient_ids: Vec<Uuid> = plan.links.iter().map(|&(_, p)| p).collect();
            caregiver_ids.sort_unstable();
            caregiver_ids.dedup();
            patient_ids.sort_unstable();
            patient_ids.dedup();

            let caregivers: HashMap<Uuid, Vec<Uuid>> = sqlx::query_as::<_, (Uuid, Vec<Uuid>)>(
                "SELECT id, patient_ids FROM caregivers WHERE id = ANY($1) ORDER BY id FOR UPDATE",
            )
            .bind(&caregiver_ids)
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .collect();
            let patients: HashMap<Uuid, Vec<Uuid>> = sqlx::query_as::<_, (Uuid, Vec<Uuid>)>(
                "SELECT id, caregiver_ids FROM patients WHERE id = ANY($1) ORDER BY id FOR UPDATE",
            )
            .bind(&patient_ids)
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .collect();

            for &(caregiver_id, patient_id) in &plan.links {
                let (Some(listed), Some(back)) =
                    (caregivers.get(&caregiver_id), patients.get(&patient_id))
                else {
                    continue;
                };
                if !still_one_sided(listed, back, caregiver_id, patient_id) {
                    debug!(%caregiver_id, %patient_id, "pair changed since audit, skipped");
                    continue;
                }
                completed += add_to_sets(&mut tx, caregiver_id, patient_id).await?;
            }
        }

        let mut pruned = 0;
        if plan.prune {
            pruned += sqlx::query(
                r#"
                UPDATE caregivers AS c
                   SET patient_ids = kept.ids
                  FROM (
                        SELECT cg.id,
                               ARRAY(
                                   SELECT t.ref
                                     FROM unnest(cg.patient_ids) WITH ORDINALITY AS t(ref, n)
                                    WHERE EXISTS (SELECT 1 FROM patients p WHERE p.id = t.ref)
                                    GROUP BY t.ref
                                    ORDER BY min(t.n)
                               ) AS ids
                          FROM caregivers cg
                       ) AS kept
                 WHERE c.id = kept.id AND c.patient_ids <> kept.ids
                "#,
            )
            .execute(&mut *tx)
            .await?
            .rows_affected();

            pruned += sqlx::query(
                r#"
                UPDATE patients AS p
                   SET caregiver_ids = kept.ids
                  FROM (
                        SELECT pt.id,
                               ARRAY(
                                   SELECT t.ref
                                     FROM unnest(pt.caregiver_ids) WITH ORDINALITY AS t(ref, n)
                                    WHERE EXISTS (SELECT 1 FROM caregivers c WHERE c.id = t.ref)
                                    GROUP BY t.ref
                                    ORDER BY min(t.n)
                               ) AS ids
                          FROM patients pt
                       ) AS kept
                 WHERE p.id = kept.id AND p.caregiver_ids <> kept.ids
                "#,
            )
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;
        Ok((completed, pruned))
    }
}
