//! In-memory [`CareStore`] used by tests. One mutex guards all collections,
//! which makes every trait method trivially all-or-nothing.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    audit::{dedup_preserving_order, LinkRow, LinkSnapshot, RepairPlan},
    error::{CareError, Entity},
    model::{
        Caregiver, CaregiverRemoval, CaregiverSummary, MedicationRemoval, Patient, PatientRemoval,
        PatientSummary,
    },
    store::CareStore,
};
use crate::{
    auth::repo_types::{Role, User},
    medications::repo_types::Medication,
    notes::repo_types::Note,
    prescriptions::repo_types::Prescription,
    reminders::repo_types::{Reminder, ReminderStatus},
};

#[derive(Default)]
struct Collections {
    users: HashMap<Uuid, User>,
    patients: HashMap<Uuid, Patient>,
    caregivers: HashMap<Uuid, Caregiver>,
    medications: HashMap<Uuid, Medication>,
    reminders: HashMap<Uuid, Reminder>,
    prescriptions: HashMap<Uuid, Prescription>,
    notes: HashMap<Uuid, Note>,
}

#[derive(Default)]
pub struct MemoryCareStore {
    inner: Mutex<Collections>,
}

fn new_user(role: Role, name: &str) -> User {
    let id = Uuid::new_v4();
    User {
        id,
        email: format!("{}-{}@example.com", name.to_lowercase(), &id.simple().to_string()[..8]),
        password_hash: String::new(),
        name: name.to_string(),
        role,
        active: true,
        created_at: OffsetDateTime::now_utc(),
    }
}

impl MemoryCareStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_patient(&self, name: &str) -> Patient {
        let user = new_user(Role::Patient, name);
        let patient = Patient {
            id: Uuid::new_v4(),
            user_id: user.id,
            date_of_birth: None,
            conditions: vec!["hypertension".into()],
            caregiver_ids: Vec::new(),
            created_at: OffsetDateTime::now_utc(),
        };
        let mut c = self.inner.lock().await;
        c.users.insert(user.id, user);
        c.patients.insert(patient.id, patient.clone());
        patient
    }

    pub async fn add_caregiver(&self, name: &str) -> Caregiver {
        let user = new_user(Role::Caregiver, name);
        let caregiver = Caregiver {
            id: Uuid::new_v4(),
            user_id: user.id,
            specialization: Some("nursing".into()),
            organization: None,
            patient_ids: Vec::new(),
            created_at: OffsetDateTime::now_utc(),
        };
        let mut c = self.inner.lock().await;
        c.users.insert(user.id, user);
        c.caregivers.insert(caregiver.id, caregiver.clone());
        caregiver
    }

    pub async fn add_admin(&self) -> Uuid {
        let user = new_user(Role::Admin, "admin");
        let id = user.id;
        self.inner.lock().await.users.insert(id, user);
        id
    }

    pub async fn add_medication(&self, patient_id: Uuid, name: &str) -> Uuid {
        let med = Medication {
            id: Uuid::new_v4(),
            patient_id,
            added_by: None,
            name: name.to_string(),
            dosage: "10mg".into(),
            frequency: "daily".into(),
            instructions: None,
            start_date: None,
            end_date: None,
            created_at: OffsetDateTime::now_utc(),
        };
        let id = med.id;
        self.inner.lock().await.medications.insert(id, med);
        id
    }

    pub async fn add_reminder(&self, medication_id: Uuid, patient_id: Uuid) -> Uuid {
        let reminder = Reminder {
            id: Uuid::new_v4(),
            medication_id,
            patient_id,
            scheduled_at: OffsetDateTime::now_utc(),
            status: ReminderStatus::Upcoming,
            created_at: OffsetDateTime::now_utc(),
        };
        let id = reminder.id;
        self.inner.lock().await.reminders.insert(id, reminder);
        id
    }

    pub async fn add_prescription(&self, patient_id: Uuid, attachment_key: Option<&str>) -> Uuid {
        let rx = Prescription {
            id: Uuid::new_v4(),
            patient_id,
            author_id: None,
            medication_name: "lisinopril".into(),
            dosage: "10mg".into(),
            instructions: None,
            prescribed_by: None,
            issued_on: None,
            attachment_key: attachment_key.map(str::to_string),
            created_at: OffsetDateTime::now_utc(),
        };
        let id = rx.id;
        self.inner.lock().await.prescriptions.insert(id, rx);
        id
    }

    pub async fn add_note(&self, patient_id: Uuid, body: &str) -> Uuid {
        let note = Note {
            id: Uuid::new_v4(),
            patient_id,
            author_id: None,
            body: body.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        let id = note.id;
        self.inner.lock().await.notes.insert(id, note);
        id
    }

    pub async fn has_user(&self, id: Uuid) -> bool {
        self.inner.lock().await.users.contains_key(&id)
    }

    pub async fn has_medication(&self, id: Uuid) -> bool {
        self.inner.lock().await.medications.contains_key(&id)
    }

    pub async fn reminders_for_medication(&self, medication_id: Uuid) -> usize {
        self.inner
            .lock()
            .await
            .reminders
            .values()
            .filter(|r| r.medication_id == medication_id)
            .count()
    }

    /// Records of any kind still pointing at `patient_id`.
    pub async fn records_for_patient(&self, patient_id: Uuid) -> usize {
        let c = self.inner.lock().await;
        c.medications.values().filter(|m| m.patient_id == patient_id).count()
            + c.reminders.values().filter(|r| r.patient_id == patient_id).count()
            + c.prescriptions.values().filter(|p| p.patient_id == patient_id).count()
            + c.notes.values().filter(|n| n.patient_id == patient_id).count()
    }

    /// Write one side of a link directly, bypassing `link`, to simulate desynchronized state.
    pub async fn force_patient_ref(&self, patient_id: Uuid, caregiver_id: Uuid) {
        if let Some(p) = self.inner.lock().await.patients.get_mut(&patient_id) {
            p.caregiver_ids.push(caregiver_id);
        }
    }

    pub async fn force_caregiver_ref(&self, caregiver_id: Uuid, patient_id: Uuid) {
        if let Some(c) = self.inner.lock().await.caregivers.get_mut(&caregiver_id) {
            c.patient_ids.push(patient_id);
        }
    }
}

fn add_to_set(set: &mut Vec<Uuid>, id: Uuid) -> bool {
    if set.contains(&id) {
        false
    } else {
        set.push(id);
        true
    }
}

fn pull(set: &mut Vec<Uuid>, id: Uuid) -> bool {
    let before = set.len();
    set.retain(|x| *x != id);
    before != set.len()
}

#[async_trait]
impl CareStore for MemoryCareStore {
    async fn find_patient(&self, id: Uuid) -> Result<Option<Patient>, CareError> {
        Ok(self.inner.lock().await.patients.get(&id).cloned())
    }

    async fn find_caregiver(&self, id: Uuid) -> Result<Option<Caregiver>, CareError> {
        Ok(self.inner.lock().await.caregivers.get(&id).cloned())
    }

    async fn find_patient_by_user(&self, user_id: Uuid) -> Result<Option<Patient>, CareError> {
        let c = self.inner.lock().await;
        Ok(c.patients.values().find(|p| p.user_id == user_id).cloned())
    }

    async fn find_caregiver_by_user(&self, user_id: Uuid) -> Result<Option<Caregiver>, CareError> {
        let c = self.inner.lock().await;
        Ok(c.caregivers.values().find(|cg| cg.user_id == user_id).cloned())
    }

    async fn patient_summaries(&self, ids: &[Uuid]) -> Result<Vec<PatientSummary>, CareError> {
        let c = self.inner.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| {
                let p = c.patients.get(id)?;
                let u = c.users.get(&p.user_id)?;
                Some(PatientSummary {
                    id: p.id,
                    user_id: p.user_id,
                    name: u.name.clone(),
                    email: u.email.clone(),
                    date_of_birth: p.date_of_birth,
                    conditions: p.conditions.clone(),
                })
            })
            .collect())
    }

    async fn caregiver_summaries(&self, ids: &[Uuid]) -> Result<Vec<CaregiverSummary>, CareError> {
        let c = self.inner.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| {
                let cg = c.caregivers.get(id)?;
                let u = c.users.get(&cg.user_id)?;
                Some(CaregiverSummary {
                    id: cg.id,
                    user_id: cg.user_id,
                    name: u.name.clone(),
                    email: u.email.clone(),
                    specialization: cg.specialization.clone(),
                    organization: cg.organization.clone(),
                })
            })
            .collect())
    }

    async fn link(&self, caregiver_id: Uuid, patient_id: Uuid) -> Result<(), CareError> {
        let mut c = self.inner.lock().await;
        if !c.caregivers.contains_key(&caregiver_id) {
            return Err(CareError::not_found(Entity::Caregiver, caregiver_id));
        }
        if !c.patients.contains_key(&patient_id) {
            return Err(CareError::not_found(Entity::Patient, patient_id));
        }
        if let Some(cg) = c.caregivers.get_mut(&caregiver_id) {
            add_to_set(&mut cg.patient_ids, patient_id);
        }
        if let Some(p) = c.patients.get_mut(&patient_id) {
            add_to_set(&mut p.caregiver_ids, caregiver_id);
        }
        Ok(())
    }

    async fn unlink(&self, caregiver_id: Uuid, patient_id: Uuid) -> Result<(), CareError> {
        let mut c = self.inner.lock().await;
        let cg = c
            .caregivers
            .get_mut(&caregiver_id)
            .ok_or(CareError::not_found(Entity::Caregiver, caregiver_id))?;
        pull(&mut cg.patient_ids, patient_id);
        if let Some(p) = c.patients.get_mut(&patient_id) {
            pull(&mut p.caregiver_ids, caregiver_id);
        }
        Ok(())
    }

    async fn remove_caregiver(&self, caregiver_id: Uuid) -> Result<CaregiverRemoval, CareError> {
        let mut c = self.inner.lock().await;
        let user_id = c
            .caregivers
            .get(&caregiver_id)
            .map(|cg| cg.user_id)
            .ok_or(CareError::not_found(Entity::Caregiver, caregiver_id))?;

        let mut patients_unlinked = 0;
        for p in c.patients.values_mut() {
            if pull(&mut p.caregiver_ids, caregiver_id) {
                patients_unlinked += 1;
            }
        }
        c.caregivers.remove(&caregiver_id);
        c.users.remove(&user_id);

        Ok(CaregiverRemoval {
            caregiver_id,
            user_id,
            patients_unlinked,
        })
    }

    async fn remove_patient(&self, patient_id: Uuid) -> Result<PatientRemoval, CareError> {
        let mut c = self.inner.lock().await;
        let user_id = c
            .patients
            .get(&patient_id)
            .map(|p| p.user_id)
            .ok_or(CareError::not_found(Entity::Patient, patient_id))?;

        let mut caregivers_unlinked = 0;
        for cg in c.caregivers.values_mut() {
            if pull(&mut cg.patient_ids, patient_id) {
                caregivers_unlinked += 1;
            }
        }

        let med_ids: Vec<Uuid> = c
            .medications
            .values()
            .filter(|m| m.patient_id == patient_id)
            .map(|m| m.id)
            .collect();
        let reminders_before = c.reminders.len();
        c.reminders
            .retain(|_, r| r.patient_id != patient_id && !med_ids.contains(&r.medication_id));
        let reminders_deleted = (reminders_before - c.reminders.len()) as u64;
        for id in &med_ids {
            c.medications.remove(id);
        }

        let rx_ids: Vec<Uuid> = c
            .prescriptions
            .values()
            .filter(|p| p.patient_id == patient_id)
            .map(|p| p.id)
            .collect();
        let mut attachment_keys = Vec::new();
        for id in &rx_ids {
            if let Some(key) = c.prescriptions.remove(id).and_then(|p| p.attachment_key) {
                attachment_keys.push(key);
            }
        }

        let notes_before = c.notes.len();
        c.notes.retain(|_, n| n.patient_id != patient_id);
        let notes_deleted = (notes_before - c.notes.len()) as u64;

        c.patients.remove(&patient_id);
        c.users.remove(&user_id);

        Ok(PatientRemoval {
            patient_id,
            user_id,
            caregivers_unlinked,
            medications_deleted: med_ids.len() as u64,
            reminders_deleted,
            prescriptions_deleted: rx_ids.len() as u64,
            notes_deleted,
            attachment_keys,
        })
    }

    async fn remove_medication(
        &self,
        medication_id: Uuid,
        patient_id: Uuid,
    ) -> Result<MedicationRemoval, CareError> {
        let mut c = self.inner.lock().await;
        match c.medications.get(&medication_id) {
            Some(m) if m.patient_id == patient_id => {}
            _ => return Err(CareError::not_found(Entity::Medication, medication_id)),
        }
        let before = c.reminders.len();
        c.reminders.retain(|_, r| r.medication_id != medication_id);
        let reminders_deleted = (before - c.reminders.len()) as u64;
        c.medications.remove(&medication_id);
        Ok(MedicationRemoval {
            medication_id,
            patient_id,
            reminders_deleted,
        })
    }

    async fn link_snapshot(&self) -> Result<LinkSnapshot, CareError> {
        let c = self.inner.lock().await;
        Ok(LinkSnapshot {
            patients: c
                .patients
                .values()
                .map(|p| LinkRow {
                    id: p.id,
                    refs: p.caregiver_ids.clone(),
                })
                .collect(),
            caregivers: c
                .caregivers
                .values()
                .map(|cg| LinkRow {
                    id: cg.id,
                    refs: cg.patient_ids.clone(),
                })
                .collect(),
        })
    }

    async fn apply_repair(&self, plan: &RepairPlan) -> Result<(u64, u64), CareError> {
        let mut c = self.inner.lock().await;
        let mut completed = 0;
        for &(caregiver_id, patient_id) in &plan.links {
            let (Some(on_caregiver), Some(on_patient)) = (
                c.caregivers.get(&caregiver_id).map(|cg| cg.patient_ids.contains(&patient_id)),
                c.patients.get(&patient_id).map(|p| p.caregiver_ids.contains(&caregiver_id)),
            ) else {
                continue;
            };
            // A pair that is now linked on both sides or on neither was settled
            // after the snapshot was taken.
            if on_caregiver == on_patient {
                continue;
            }
            if let Some(cg) = c.caregivers.get_mut(&caregiver_id) {
                completed += add_to_set(&mut cg.patient_ids, patient_id) as u64;
            }
            if let Some(p) = c.patients.get_mut(&patient_id) {
                completed += add_to_set(&mut p.caregiver_ids, caregiver_id) as u64;
            }
        }

        let mut pruned = 0;
        if plan.prune {
            let Collections {
                patients,
                caregivers,
                ..
            } = &mut *c;
            for cg in caregivers.values_mut() {
                let kept: Vec<Uuid> = dedup_preserving_order(&cg.patient_ids)
                    .into_iter()
                    .filter(|id| patients.contains_key(id))
                    .collect();
                if kept != cg.patient_ids {
                    cg.patient_ids = kept;
                    pruned += 1;
                }
            }
            for p in patients.values_mut() {
                let kept: Vec<Uuid> = dedup_preserving_order(&p.caregiver_ids)
                    .into_iter()
                    .filter(|id| caregivers.contains_key(id))
                    .collect();
                if kept != p.caregiver_ids {
                    p.caregiver_ids = kept;
                    pruned += 1;
                }
            }
        }
        Ok((completed, pruned))
    }
}
