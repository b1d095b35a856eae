use anyhow::Context;
use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    dto::RegisterRequest,
    password::hash_password,
    repo::{insert_caregiver_profile_tx, insert_patient_profile_tx},
    repo_types::{Role, User},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub const MIN_PASSWORD_LEN: usize = 8;

/// Normalize and check a registration request. Returns the role to create.
pub(crate) fn validate_registration(req: &mut RegisterRequest) -> Result<Role, &'static str> {
    req.email = req.email.trim().to_lowercase();
    req.name = req.name.trim().to_string();
    req.conditions = req
        .conditions
        .iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    if !is_valid_email(&req.email) {
        return Err("Invalid email");
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err("Password too short");
    }
    if req.name.is_empty() {
        return Err("Name is required");
    }
    match req.role.unwrap_or(Role::Patient) {
        Role::Admin => Err("Admin accounts cannot be self-registered"),
        role => Ok(role),
    }
}

/// True when `err` comes from a 23505 unique_violation, e.g. two registrations
/// racing for the same email.
pub(crate) fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<sqlx::Error>(),
            Some(sqlx::Error::Database(db)) if db.code().as_deref() == Some("23505")
        )
    })
}

/// Create the user and its role profile in one transaction.
pub async fn register_account(
    db: &PgPool,
    req: &RegisterRequest,
    role: Role,
) -> anyhow::Result<(User, Option<Uuid>)> {
    let hash = hash_password(&req.password)?;

    let mut tx = db.begin().await.context("begin tx")?;
    let user = User::create_tx(&mut tx, &req.email, &hash, &req.name, role).await?;
    let profile_id = match role {
        Role::Patient => Some(
            insert_patient_profile_tx(&mut tx, user.id, req.date_of_birth, &req.conditions).await?,
        ),
        Role::Caregiver => Some(
            insert_caregiver_profile_tx(
                &mut tx,
                user.id,
                req.specialization.as_deref(),
                req.organization.as_deref(),
            )
            .await?,
        ),
        Role::Admin => None,
    };
    tx.commit().await.context("commit tx")?;

    Ok((user, profile_id))
}
