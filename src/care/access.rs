use uuid::Uuid;

use super::{
    error::{CareError, Entity},
    model::{Caregiver, Patient},
    store::CareStore,
};
use crate::auth::{jwt::AuthUser, repo_types::Role};

pub fn require_role(user: &AuthUser, role: Role) -> Result<(), CareError> {
    if user.role == role {
        Ok(())
    } else {
        Err(CareError::forbidden(format!("{role} role required")))
    }
}

/// The caller's own patient profile.
pub async fn own_patient(store: &dyn CareStore, user: &AuthUser) -> Result<Patient, CareError> {
    require_role(user, Role::Patient)?;
    store
        .find_patient_by_user(user.id)
        .await?
        .ok_or(CareError::NoProfile(Role::Patient))
}

/// The caller's own caregiver profile.
pub async fn own_caregiver(store: &dyn CareStore, user: &AuthUser) -> Result<Caregiver, CareError> {
    require_role(user, Role::Caregiver)?;
    store
        .find_caregiver_by_user(user.id)
        .await?
        .ok_or(CareError::NoProfile(Role::Caregiver))
}

/// Load a patient the caller may act on: admins, the patient themself, or a
/// caregiver linked to the patient.
pub async fn patient_for(
    store: &dyn CareStore,
    user: &AuthUser,
    patient_id: Uuid,
) -> Result<Patient, CareError> {
    let patient = store
        .find_patient(patient_id)
        .await?
        .ok_or(CareError::not_found(Entity::Patient, patient_id))?;

    let allowed = match user.role {
        Role::Admin => true,
        Role::Patient => patient.user_id == user.id,
        Role::Caregiver => match store.find_caregiver_by_user(user.id).await? {
            Some(caregiver) => patient.caregiver_ids.contains(&caregiver.id),
            None => false,
        },
    };

    if allowed {
        Ok(patient)
    } else {
        Err(CareError::forbidden("not linked to this patient"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::care::{memory::MemoryCareStore, service};

    fn caller(id: Uuid, role: Role) -> AuthUser {
        AuthUser { id, role }
    }

    #[tokio::test]
    async fn owner_admin_and_linked_caregiver_are_allowed() {
        let store = MemoryCareStore::new();
        let p = store.add_patient("Pat").await;
        let c = store.add_caregiver("Carol").await;
        let admin = store.add_admin().await;
        service::assign(&store, c.id, p.id).await.unwrap();

        for user in [
            caller(p.user_id, Role::Patient),
            caller(c.user_id, Role::Caregiver),
            caller(admin, Role::Admin),
        ] {
            let got = patient_for(&store, &user, p.id).await.unwrap();
            assert_eq!(got.id, p.id);
        }
    }

    #[tokio::test]
    async fn strangers_are_forbidden() {
        let store = MemoryCareStore::new();
        let p = store.add_patient("Pat").await;
        let other = store.add_patient("Other").await;
        let c = store.add_caregiver("Carol").await;

        let err = patient_for(&store, &caller(other.user_id, Role::Patient), p.id)
            .await
            .unwrap_err();
        assert!(matches!(err, CareError::Forbidden(_)));
        let err = patient_for(&store, &caller(c.user_id, Role::Caregiver), p.id)
            .await
            .unwrap_err();
        assert!(matches!(err, CareError::Forbidden(_)));
    }

    #[tokio::test]
    async fn unassigned_caregiver_loses_access() {
        let store = MemoryCareStore::new();
        let p = store.add_patient("Pat").await;
        let c = store.add_caregiver("Carol").await;
        service::assign(&store, c.id, p.id).await.unwrap();
        service::unassign(&store, c.id, p.id).await.unwrap();

        let err = patient_for(&store, &caller(c.user_id, Role::Caregiver), p.id)
            .await
            .unwrap_err();
        assert!(matches!(err, CareError::Forbidden(_)));
    }

    #[tokio::test]
    async fn own_profile_requires_matching_role() {
        let store = MemoryCareStore::new();
        let p = store.add_patient("Pat").await;

        let got = own_patient(&store, &caller(p.user_id, Role::Patient)).await.unwrap();
        assert_eq!(got.id, p.id);
        let err = own_caregiver(&store, &caller(p.user_id, Role::Patient)).await.unwrap_err();
        assert!(matches!(err, CareError::Forbidden(_)));
        let err = own_patient(&store, &caller(Uuid::new_v4(), Role::Patient)).await.unwrap_err();
        assert!(matches!(err, CareError::NoProfile(Role::Patient)));
    }
}
