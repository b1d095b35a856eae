use sqlx::{PgConnection, PgPool};
use time::Date;
use uuid::Uuid;

use crate::auth::repo_types::{Role, User};

const USER_COLUMNS: &str = "id, email, password_hash, name, role, active, created_at";

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Insert a user inside an open transaction.
    pub async fn create_tx(
        conn: &mut PgConnection,
        email: &str,
        password_hash: &str,
        name: &str,
        role: Role,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, email, password_hash, name, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .bind(role)
        .fetch_one(&mut *conn)
        .await?;
        Ok(user)
    }

    pub async fn list(
        db: &PgPool,
        role: Option<Role>,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
              FROM users
             WHERE ($1::text IS NULL OR role = $1)
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3
            "#
        ))
        .bind(role)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn set_active(db: &PgPool, id: Uuid, active: bool) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET active = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(active)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }
}

pub async fn insert_patient_profile_tx(
    conn: &mut PgConnection,
    user_id: Uuid,
    date_of_birth: Option<Date>,
    conditions: &[String],
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO patients (id, user_id, date_of_birth, conditions)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(date_of_birth)
    .bind(conditions)
    .execute(&mut *conn)
    .await?;
    Ok(id)
}

pub async fn insert_caregiver_profile_tx(
    conn: &mut PgConnection,
    user_id: Uuid,
    specialization: Option<&str>,
    organization: Option<&str>,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO caregivers (id, user_id, specialization, organization)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(specialization)
    .bind(organization)
    .execute(&mut *conn)
    .await?;
    Ok(id)
}
