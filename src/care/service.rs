//! Relationship and cascade operations exposed to the HTTP handlers.

use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    audit::{self, LinkIssue, RepairReport},
    error::{CareError, Entity},
    model::{CaregiverDetails, CaregiverRemoval, MedicationRemoval, PatientDetails, PatientRemoval},
    store::CareStore,
};
use crate::storage::StorageClient;

fn log_failure(op: &'static str, e: &CareError) {
    match e {
        CareError::Persistence(inner) => error!(op, error = %format!("{inner:#}"), "store failure"),
        CareError::Conflict(reason) => warn!(op, %reason, "concurrent update"),
        other => warn!(op, error = %other, "rejected"),
    }
}

pub async fn caregiver_details(
    store: &dyn CareStore,
    caregiver_id: Uuid,
) -> Result<CaregiverDetails, CareError> {
    let caregiver = store
        .find_caregiver(caregiver_id)
        .await?
        .ok_or(CareError::not_found(Entity::Caregiver, caregiver_id))?;
    let patients = store.patient_summaries(&caregiver.patient_ids).await?;
    Ok(CaregiverDetails {
        caregiver,
        patients,
    })
}

pub async fn patient_details(
    store: &dyn CareStore,
    patient_id: Uuid,
) -> Result<PatientDetails, CareError> {
    let patient = store
        .find_patient(patient_id)
        .await?
        .ok_or(CareError::not_found(Entity::Patient, patient_id))?;
    let caregivers = store.caregiver_summaries(&patient.caregiver_ids).await?;
    Ok(PatientDetails {
        patient,
        caregivers,
    })
}

/// Link a caregiver and a patient. Idempotent; both must exist.
pub async fn assign(
    store: &dyn CareStore,
    caregiver_id: Uuid,
    patient_id: Uuid,
) -> Result<CaregiverDetails, CareError> {
    store
        .link(caregiver_id, patient_id)
        .await
        .inspect_err(|e| log_failure("assign", e))?;
    info!(%caregiver_id, %patient_id, "patient assigned to caregiver");
    caregiver_details(store, caregiver_id).await
}

/// Remove a caregiver/patient link. Idempotent; only the caregiver must exist.
pub async fn unassign(
    store: &dyn CareStore,
    caregiver_id: Uuid,
    patient_id: Uuid,
) -> Result<CaregiverDetails, CareError> {
    store
        .unlink(caregiver_id, patient_id)
        .await
        .inspect_err(|e| log_failure("unassign", e))?;
    info!(%caregiver_id, %patient_id, "patient unassigned from caregiver");
    caregiver_details(store, caregiver_id).await
}

pub async fn delete_caregiver(
    store: &dyn CareStore,
    caregiver_id: Uuid,
) -> Result<CaregiverRemoval, CareError> {
    let removal = store
        .remove_caregiver(caregiver_id)
        .await
        .inspect_err(|e| log_failure("delete_caregiver", e))?;
    info!(
        %caregiver_id,
        user_id = %removal.user_id,
        patients_unlinked = removal.patients_unlinked,
        "caregiver deleted"
    );
    Ok(removal)
}

/// Delete a patient with everything that references it. Attachments are
/// removed from object storage after the database commit; failures there are
/// logged and leave an orphaned object, never a dangling row.
pub async fn delete_patient(
    store: &dyn CareStore,
    storage: &dyn StorageClient,
    patient_id: Uuid,
) -> Result<PatientRemoval, CareError> {
    let removal = store
        .remove_patient(patient_id)
        .await
        .inspect_err(|e| log_failure("delete_patient", e))?;

    for key in &removal.attachment_keys {
        if let Err(e) = storage.delete_object(key).await {
            error!(%patient_id, key = %key, error = %format!("{e:#}"), "orphaned attachment left in storage");
        }
    }

    info!(
        %patient_id,
        user_id = %removal.user_id,
        caregivers_unlinked = removal.caregivers_unlinked,
        medications = removal.medications_deleted,
        reminders = removal.reminders_deleted,
        prescriptions = removal.prescriptions_deleted,
        notes = removal.notes_deleted,
        "patient deleted"
    );
    Ok(removal)
}

/// Delete a medication owned by `patient_id`, with all of its reminders.
pub async fn delete_medication(
    store: &dyn CareStore,
    medication_id: Uuid,
    patient_id: Uuid,
) -> Result<MedicationRemoval, CareError> {
    let removal = store
        .remove_medication(medication_id, patient_id)
        .await
        .inspect_err(|e| log_failure("delete_medication", e))?;
    info!(
        %medication_id,
        %patient_id,
        reminders_deleted = removal.reminders_deleted,
        "medication deleted"
    );
    Ok(removal)
}

pub async fn audit_links(store: &dyn CareStore) -> Result<Vec<LinkIssue>, CareError> {
    let snapshot = store.link_snapshot().await?;
    let issues = audit::audit(&snapshot);
    if !issues.is_empty() {
        warn!(count = issues.len(), "caregiver link inconsistencies found");
    }
    Ok(issues)
}

pub async fn repair_links(store: &dyn CareStore) -> Result<RepairReport, CareError> {
    let issues = audit_links(store).await?;
    let plan = audit::plan_repair(&issues);
    if plan.is_empty() {
        return Ok(RepairReport::default());
    }
    let (links_completed, rows_pruned) = store
        .apply_repair(&plan)
        .await
        .inspect_err(|e| log_failure("repair_links", e))?;
    info!(issues = issues.len(), links_completed, rows_pruned, "caregiver links repaired");
    Ok(RepairReport {
        issues_found: issues.len(),
        links_completed,
        rows_pruned,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{care::memory::MemoryCareStore, storage::MemoryStorage};

    async fn assert_consistent(store: &MemoryCareStore) {
        let issues = audit_links(store).await.unwrap();
        assert!(issues.is_empty(), "link invariant broken: {issues:?}");
    }

    #[tokio::test]
    async fn assign_is_idempotent_and_unassign_clears_both_sides() {
        let store = MemoryCareStore::new();
        let c1 = store.add_caregiver("Carol").await;
        let p1 = store.add_patient("Pat").await;

        let details = assign(&store, c1.id, p1.id).await.unwrap();
        assert_eq!(details.caregiver.patient_ids, vec![p1.id]);
        assert_eq!(details.patients.len(), 1);
        assert_eq!(details.patients[0].name, "Pat");
        let patient = store.find_patient(p1.id).await.unwrap().unwrap();
        assert_eq!(patient.caregiver_ids, vec![c1.id]);

        for _ in 0..3 {
            assign(&store, c1.id, p1.id).await.unwrap();
        }
        let caregiver = store.find_caregiver(c1.id).await.unwrap().unwrap();
        let patient = store.find_patient(p1.id).await.unwrap().unwrap();
        assert_eq!(caregiver.patient_ids, vec![p1.id]);
        assert_eq!(patient.caregiver_ids, vec![c1.id]);

        let details = unassign(&store, c1.id, p1.id).await.unwrap();
        assert!(details.caregiver.patient_ids.is_empty());
        assert!(details.patients.is_empty());
        let patient = store.find_patient(p1.id).await.unwrap().unwrap();
        assert!(patient.caregiver_ids.is_empty());
        assert_consistent(&store).await;
    }

    #[tokio::test]
    async fn assign_with_missing_side_writes_nothing() {
        let store = MemoryCareStore::new();
        let c = store.add_caregiver("Carol").await;
        let p = store.add_patient("Pat").await;
        let ghost = Uuid::new_v4();

        let err = assign(&store, c.id, ghost).await.unwrap_err();
        assert!(matches!(err, CareError::NotFound { entity: Entity::Patient, id } if id == ghost));
        let err = assign(&store, ghost, p.id).await.unwrap_err();
        assert!(matches!(err, CareError::NotFound { entity: Entity::Caregiver, .. }));

        assert!(store.find_caregiver(c.id).await.unwrap().unwrap().patient_ids.is_empty());
        assert!(store.find_patient(p.id).await.unwrap().unwrap().caregiver_ids.is_empty());
    }

    #[tokio::test]
    async fn unassign_never_assigned_pair_is_a_no_op() {
        let store = MemoryCareStore::new();
        let c = store.add_caregiver("Carol").await;
        let p = store.add_patient("Pat").await;
        let other = store.add_patient("Other").await;
        assign(&store, c.id, other.id).await.unwrap();

        unassign(&store, c.id, p.id).await.unwrap();

        let caregiver = store.find_caregiver(c.id).await.unwrap().unwrap();
        assert_eq!(caregiver.patient_ids, vec![other.id]);
        assert_consistent(&store).await;
    }

    #[tokio::test]
    async fn unassign_does_not_require_the_patient() {
        let store = MemoryCareStore::new();
        let c = store.add_caregiver("Carol").await;
        let ghost = Uuid::new_v4();
        store.force_caregiver_ref(c.id, ghost).await;

        unassign(&store, c.id, ghost).await.unwrap();
        assert!(store.find_caregiver(c.id).await.unwrap().unwrap().patient_ids.is_empty());

        let err = unassign(&store, Uuid::new_v4(), ghost).await.unwrap_err();
        assert!(matches!(err, CareError::NotFound { entity: Entity::Caregiver, .. }));
    }

    #[tokio::test]
    async fn symmetry_holds_across_mixed_sequences() {
        let store = MemoryCareStore::new();
        let mut caregivers = Vec::new();
        let mut patients = Vec::new();
        for i in 0..3 {
            caregivers.push(store.add_caregiver(&format!("c{i}")).await.id);
            patients.push(store.add_patient(&format!("p{i}")).await.id);
        }

        // Deterministic pseudo-random walk over assign/unassign.
        let mut seed: u32 = 7;
        for _ in 0..60 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let c = caregivers[(seed >> 8) as usize % 3];
            let p = patients[(seed >> 16) as usize % 3];
            if seed % 3 == 0 {
                unassign(&store, c, p).await.unwrap();
            } else {
                assign(&store, c, p).await.unwrap();
            }
            assert_consistent(&store).await;
        }
    }

    #[tokio::test]
    async fn assign_then_unassign_restores_previous_sets() {
        let store = MemoryCareStore::new();
        let c = store.add_caregiver("Carol").await;
        let p1 = store.add_patient("One").await;
        let p2 = store.add_patient("Two").await;
        assign(&store, c.id, p1.id).await.unwrap();

        let before_c = store.find_caregiver(c.id).await.unwrap().unwrap().patient_ids;
        let before_p = store.find_patient(p2.id).await.unwrap().unwrap().caregiver_ids;
        assign(&store, c.id, p2.id).await.unwrap();
        unassign(&store, c.id, p2.id).await.unwrap();

        assert_eq!(store.find_caregiver(c.id).await.unwrap().unwrap().patient_ids, before_c);
        assert_eq!(store.find_patient(p2.id).await.unwrap().unwrap().caregiver_ids, before_p);
    }

    #[tokio::test]
    async fn deleting_a_caregiver_unlinks_every_patient() {
        let store = MemoryCareStore::new();
        let c1 = store.add_caregiver("One").await;
        let c2 = store.add_caregiver("Two").await;
        let p1 = store.add_patient("Pat").await;
        let stray = store.add_patient("Stray").await;
        assign(&store, c1.id, p1.id).await.unwrap();
        assign(&store, c2.id, p1.id).await.unwrap();
        // Desynchronized: patient points at c1 but c1 does not list it.
        store.force_patient_ref(stray.id, c1.id).await;

        let removal = delete_caregiver(&store, c1.id).await.unwrap();
        assert_eq!(removal.patients_unlinked, 2);

        let p1_now = store.find_patient(p1.id).await.unwrap().unwrap();
        assert_eq!(p1_now.caregiver_ids, vec![c2.id]);
        let stray_now = store.find_patient(stray.id).await.unwrap().unwrap();
        assert!(stray_now.caregiver_ids.is_empty());
        assert!(store.find_caregiver(c1.id).await.unwrap().is_none());
        assert!(!store.has_user(c1.user_id).await);
        assert!(store.has_user(c2.user_id).await);
        assert_consistent(&store).await;
    }

    #[tokio::test]
    async fn deleting_missing_caregiver_is_not_found() {
        let store = MemoryCareStore::new();
        let err = delete_caregiver(&store, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, CareError::NotFound { entity: Entity::Caregiver, .. }));
    }

    #[tokio::test]
    async fn deleting_a_patient_cascades_to_records_and_attachments() {
        let store = MemoryCareStore::new();
        let storage = MemoryStorage::default();
        let c = store.add_caregiver("Carol").await;
        let p = store.add_patient("Pat").await;
        let keep = store.add_patient("Keep").await;
        assign(&store, c.id, p.id).await.unwrap();
        assign(&store, c.id, keep.id).await.unwrap();

        let med = store.add_medication(p.id, "metformin").await;
        store.add_reminder(med, p.id).await;
        store.add_reminder(med, p.id).await;
        store.add_note(p.id, "dizzy after dose").await;
        store.add_prescription(p.id, Some("prescriptions/x/y.pdf")).await;
        store.add_prescription(p.id, None).await;
        let kept_med = store.add_medication(keep.id, "aspirin").await;

        let removal = delete_patient(&store, &storage, p.id).await.unwrap();
        assert_eq!(removal.caregivers_unlinked, 1);
        assert_eq!(removal.medications_deleted, 1);
        assert_eq!(removal.reminders_deleted, 2);
        assert_eq!(removal.prescriptions_deleted, 2);
        assert_eq!(removal.notes_deleted, 1);

        assert_eq!(store.records_for_patient(p.id).await, 0);
        assert!(store.find_patient(p.id).await.unwrap().is_none());
        assert!(!store.has_user(p.user_id).await);
        assert!(store.has_medication(kept_med).await);
        let caregiver = store.find_caregiver(c.id).await.unwrap().unwrap();
        assert_eq!(caregiver.patient_ids, vec![keep.id]);
        assert_eq!(storage.deleted().await, vec!["prescriptions/x/y.pdf".to_string()]);
        assert_consistent(&store).await;
    }

    #[tokio::test]
    async fn deleting_a_medication_removes_its_reminders() {
        let store = MemoryCareStore::new();
        let p = store.add_patient("Pat").await;
        let med = store.add_medication(p.id, "warfarin").await;
        let other = store.add_medication(p.id, "statin").await;
        for _ in 0..3 {
            store.add_reminder(med, p.id).await;
        }
        store.add_reminder(other, p.id).await;

        let removal = delete_medication(&store, med, p.id).await.unwrap();
        assert_eq!(removal.reminders_deleted, 3);
        assert_eq!(store.reminders_for_medication(med).await, 0);
        assert_eq!(store.reminders_for_medication(other).await, 1);
        assert!(!store.has_medication(med).await);
    }

    #[tokio::test]
    async fn deleting_another_patients_medication_is_not_found() {
        let store = MemoryCareStore::new();
        let p1 = store.add_patient("One").await;
        let p2 = store.add_patient("Two").await;
        let med = store.add_medication(p1.id, "insulin").await;
        store.add_reminder(med, p1.id).await;

        let err = delete_medication(&store, med, p2.id).await.unwrap_err();
        assert!(matches!(err, CareError::NotFound { entity: Entity::Medication, id } if id == med));
        assert!(store.has_medication(med).await);
        assert_eq!(store.reminders_for_medication(med).await, 1);
    }

    #[tokio::test]
    async fn repair_completes_one_sided_links_and_prunes_dangling() {
        let store = MemoryCareStore::new();
        let c = store.add_caregiver("Carol").await;
        let p = store.add_patient("Pat").await;
        store.force_caregiver_ref(c.id, p.id).await;
        store.force_patient_ref(p.id, Uuid::new_v4()).await;

        let report = repair_links(&store).await.unwrap();
        assert_eq!(report.issues_found, 2);
        assert_eq!(report.links_completed, 1);
        assert_eq!(report.rows_pruned, 1);

        let patient = store.find_patient(p.id).await.unwrap().unwrap();
        assert_eq!(patient.caregiver_ids, vec![c.id]);
        assert_consistent(&store).await;
        assert_eq!(repair_links(&store).await.unwrap(), RepairReport::default());
    }

    #[tokio::test]
    async fn stale_repair_plan_does_not_undo_a_later_unassign() {
        let store = MemoryCareStore::new();
        let c = store.add_caregiver("Carol").await;
        let p = store.add_patient("Pat").await;
        store.force_patient_ref(p.id, c.id).await;

        let snapshot = store.link_snapshot().await.unwrap();
        let plan = audit::plan_repair(&audit::audit(&snapshot));
        assert_eq!(plan.links, vec![(c.id, p.id)]);

        unassign(&store, c.id, p.id).await.unwrap();
        let (completed, _) = store.apply_repair(&plan).await.unwrap();

        assert_eq!(completed, 0);
        assert!(store.find_caregiver(c.id).await.unwrap().unwrap().patient_ids.is_empty());
        assert!(store.find_patient(p.id).await.unwrap().unwrap().caregiver_ids.is_empty());
        assert_consistent(&store).await;
    }
}
