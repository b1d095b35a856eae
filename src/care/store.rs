use async_trait::async_trait;
use uuid::Uuid;

use super::{
    audit::{LinkSnapshot, RepairPlan},
    error::CareError,
    model::{
        Caregiver, CaregiverRemoval, CaregiverSummary, MedicationRemoval, Patient, PatientRemoval,
        PatientSummary,
    },
};

/// Persistence seam for the caregiver link and the cascading deletes.
///
/// Every mutating method is all-or-nothing: an implementation either applies
/// all of its writes or none of them, and returns [`CareError::NotFound`]
/// before writing anything when a required record is missing.
#[async_trait]
pub trait CareStore: Send + Sync {
    async fn find_patient(&self, id: Uuid) -> Result<Option<Patient>, CareError>;
    async fn find_caregiver(&self, id: Uuid) -> Result<Option<Caregiver>, CareError>;
    async fn find_patient_by_user(&self, user_id: Uuid) -> Result<Option<Patient>, CareError>;
    async fn find_caregiver_by_user(&self, user_id: Uuid) -> Result<Option<Caregiver>, CareError>;

    /// Summaries for the given patients, in the order of `ids`. Missing ids are skipped.
    async fn patient_summaries(&self, ids: &[Uuid]) -> Result<Vec<PatientSummary>, CareError>;
    /// Summaries for the given caregivers, in the order of `ids`. Missing ids are skipped.
    async fn caregiver_summaries(&self, ids: &[Uuid]) -> Result<Vec<CaregiverSummary>, CareError>;

    /// Set-add on both sides. Both profiles must exist.
    async fn link(&self, caregiver_id: Uuid, patient_id: Uuid) -> Result<(), CareError>;
    /// Set-remove on both sides. Only the caregiver must exist.
    async fn unlink(&self, caregiver_id: Uuid, patient_id: Uuid) -> Result<(), CareError>;

    /// Pull the caregiver from every patient, then delete the caregiver and its user.
    async fn remove_caregiver(&self, caregiver_id: Uuid) -> Result<CaregiverRemoval, CareError>;
    /// Pull the patient from every caregiver, delete its dependent records, the
    /// patient and its user.
    async fn remove_patient(&self, patient_id: Uuid) -> Result<PatientRemoval, CareError>;
    /// Delete a medication owned by `patient_id` together with its reminders.
    async fn remove_medication(
        &self,
        medication_id: Uuid,
        patient_id: Uuid,
    ) -> Result<MedicationRemoval, CareError>;

    async fn link_snapshot(&self) -> Result<LinkSnapshot, CareError>;
    /// Apply a repair plan; returns `(links_completed, rows_pruned)`.
    async fn apply_repair(&self, plan: &RepairPlan) -> Result<(u64, u64), CareError>;
}
