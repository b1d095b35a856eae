//! Consistency checks for the caregiver/patient link.
//!
//! A link is healthy when `P ∈ C.patient_ids ⇔ C ∈ P.caregiver_ids`, each id
//! appears at most once per set, and every referenced profile exists. The
//! audit works on a [`LinkSnapshot`] so the same logic checks the Postgres
//! store in production and the in-memory store in tests.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

/// One side of the link: a profile id and the ids it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRow {
    pub id: Uuid,
    pub refs: Vec<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct LinkSnapshot {
    pub patients: Vec<LinkRow>,
    pub caregivers: Vec<LinkRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinkIssue {
    /// Caregiver lists the patient, patient does not list the caregiver.
    MissingOnPatient { caregiver_id: Uuid, patient_id: Uuid },
    /// Patient lists the caregiver, caregiver does not list the patient.
    MissingOnCaregiver { caregiver_id: Uuid, patient_id: Uuid },
    /// Caregiver references a patient that no longer exists.
    DanglingPatient { caregiver_id: Uuid, patient_id: Uuid },
    /// Patient references a caregiver that no longer exists.
    DanglingCaregiver { patient_id: Uuid, caregiver_id: Uuid },
    /// Same reference stored more than once in one set.
    Duplicate { owner_id: Uuid, reference: Uuid },
}

/// What a repair pass will do: complete one-sided pairs and prune the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairPlan {
    /// `(caregiver_id, patient_id)` pairs to set-add on both sides.
    pub links: Vec<(Uuid, Uuid)>,
    /// Drop references to missing profiles and collapse duplicates.
    pub prune: bool,
}

impl RepairPlan {
    pub fn is_empty(&self) -> bool {
        self.links.is_empty() && !self.prune
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub issues_found: usize,
    pub links_completed: u64,
    pub rows_pruned: u64,
}

pub fn audit(snapshot: &LinkSnapshot) -> Vec<LinkIssue> {
    let patients: HashMap<Uuid, HashSet<Uuid>> = snapshot
        .patients
        .iter()
        .map(|row| (row.id, row.refs.iter().copied().collect()))
        .collect();
    let caregivers: HashMap<Uuid, HashSet<Uuid>> = snapshot
        .caregivers
        .iter()
        .map(|row| (row.id, row.refs.iter().copied().collect()))
        .collect();

    let mut issues = Vec::new();

    for row in &snapshot.caregivers {
        push_duplicates(row, &mut issues);
        for patient_id in unique(&row.refs) {
            match patients.get(&patient_id) {
                None => issues.push(LinkIssue::DanglingPatient {
                    caregiver_id: row.id,
                    patient_id,
                }),
                Some(back) if !back.contains(&row.id) => issues.push(LinkIssue::MissingOnPatient {
                    caregiver_id: row.id,
                    patient_id,
                }),
                Some(_) => {}
            }
        }
    }

    for row in &snapshot.patients {
        push_duplicates(row, &mut issues);
        for caregiver_id in unique(&row.refs) {
            match caregivers.get(&caregiver_id) {
                None => issues.push(LinkIssue::DanglingCaregiver {
                    patient_id: row.id,
                    caregiver_id,
                }),
                Some(back) if !back.contains(&row.id) => {
                    issues.push(LinkIssue::MissingOnCaregiver {
                        caregiver_id,
                        patient_id: row.id,
                    })
                }
                Some(_) => {}
            }
        }
    }

    issues
}

pub fn plan_repair(issues: &[LinkIssue]) -> RepairPlan {
    let mut plan = RepairPlan::default();
    for issue in issues {
        match *issue {
            LinkIssue::MissingOnPatient {
                caregiver_id,
                patient_id,
            }
            | LinkIssue::MissingOnCaregiver {
                caregiver_id,
                patient_id,
            } => {
                if !plan.links.contains(&(caregiver_id, patient_id)) {
                    plan.links.push((caregiver_id, patient_id));
                }
            }
            LinkIssue::DanglingPatient { .. }
            | LinkIssue::DanglingCaregiver { .. }
            | LinkIssue::Duplicate { .. } => plan.prune = true,
        }
    }
    plan
}

/// Keep the first occurrence of each id, preserving order.
pub fn dedup_preserving_order(ids: &[Uuid]) -> Vec<Uuid> {
    unique(ids)
}

fn unique(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

fn push_duplicates(row: &LinkRow, issues: &mut Vec<LinkIssue>) {
    let mut seen = HashSet::with_capacity(row.refs.len());
    let mut reported = HashSet::new();
    for id in &row.refs {
        if !seen.insert(*id) && reported.insert(*id) {
            issues.push(LinkIssue::Duplicate {
                owner_id: row.id,
                reference: *id,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: Uuid, refs: &[Uuid]) -> LinkRow {
        LinkRow {
            id,
            refs: refs.to_vec(),
        }
    }

    #[test]
    fn symmetric_links_have_no_issues() {
        let (c, p) = (Uuid::new_v4(), Uuid::new_v4());
        let snap = LinkSnapshot {
            patients: vec![row(p, &[c])],
            caregivers: vec![row(c, &[p])],
        };
        assert!(audit(&snap).is_empty());
    }

    #[test]
    fn one_sided_links_are_reported_and_planned() {
        let (c, p1, p2) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let snap = LinkSnapshot {
            patients: vec![row(p1, &[]), row(p2, &[c])],
            caregivers: vec![row(c, &[p1])],
        };
        let issues = audit(&snap);
        assert!(issues.contains(&LinkIssue::MissingOnPatient {
            caregiver_id: c,
            patient_id: p1
        }));
        assert!(issues.contains(&LinkIssue::MissingOnCaregiver {
            caregiver_id: c,
            patient_id: p2
        }));

        let plan = plan_repair(&issues);
        assert_eq!(plan.links, vec![(c, p1), (c, p2)]);
        assert!(!plan.prune);
    }

    #[test]
    fn dangling_and_duplicate_refs_request_prune() {
        let (c, p, ghost) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let snap = LinkSnapshot {
            patients: vec![row(p, &[c, c, ghost])],
            caregivers: vec![row(c, &[p])],
        };
        let issues = audit(&snap);
        assert_eq!(
            issues,
            vec![
                LinkIssue::Duplicate {
                    owner_id: p,
                    reference: c
                },
                LinkIssue::DanglingCaregiver {
                    patient_id: p,
                    caregiver_id: ghost
                },
            ]
        );
        let plan = plan_repair(&issues);
        assert!(plan.links.is_empty());
        assert!(plan.prune);
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(dedup_preserving_order(&[b, a, b, a]), vec![b, a]);
    }
}
