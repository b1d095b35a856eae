use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{AuthResponse, JwtKeys, LoginRequest, MeResponse, PublicUser, RefreshRequest, RegisterRequest},
        jwt::AuthUser,
        password::verify_password,
        repo_types::{Role, User},
        services::{is_unique_violation, is_valid_email, register_account, validate_registration},
    },
    state::AppState,
};

type Rejection = (StatusCode, String);

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn internal(context: &'static str) -> impl Fn(anyhow::Error) -> Rejection {
    move |e| {
        error!(error = %format!("{e:#}"), "{context} failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into())
    }
}

fn issue_tokens(state: &AppState, user: User) -> Result<AuthResponse, Rejection> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys
        .sign_access(user.id, user.role)
        .map_err(internal("jwt sign access"))?;
    let refresh_token = keys
        .sign_refresh(user.id, user.role)
        .map_err(internal("jwt sign refresh"))?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: user.into(),
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), Rejection> {
    let role = validate_registration(&mut payload).map_err(|reason| {
        warn!(email = %payload.email, reason, "registration rejected");
        (StatusCode::BAD_REQUEST, reason.to_string())
    })?;

    // Ensure email is not taken
    if let Ok(Some(_)) = User::find_by_email(&state.db, &payload.email).await {
        warn!(email = %payload.email, "email already registered");
        return Err((StatusCode::CONFLICT, "Email already registered".into()));
    }

    let (user, profile_id) = register_account(&state.db, &payload, role)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                warn!(email = %payload.email, "email registered concurrently");
                (StatusCode::CONFLICT, "Email already registered".to_string())
            } else {
                internal("register account")(e)
            }
        })?;

    info!(user_id = %user.id, email = %user.email, %role, ?profile_id, "user registered");
    Ok((StatusCode::CREATED, Json(issue_tokens(&state, user)?)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, Rejection> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    let user = match User::find_by_email(&state.db, &payload.email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(email = %payload.email, "login unknown email");
            return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
        }
        Err(e) => return Err(internal("find_by_email")(e)),
    };

    let ok = verify_password(&payload.password, &user.password_hash)
        .map_err(internal("verify_password"))?;
    if !ok {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    if !user.active {
        warn!(user_id = %user.id, "login for deactivated account");
        return Err((StatusCode::FORBIDDEN, "Account is deactivated".into()));
    }

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, Rejection> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| (StatusCode::UNAUTHORIZED, e.to_string()))?;

    // Role and active flag are re-read so a demotion or deactivation takes effect.
    let user = User::find_by_id(&state.db, claims.sub)
        .await
        .map_err(internal("find_by_id"))?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;
    if !user.active {
        return Err((StatusCode::FORBIDDEN, "Account is deactivated".into()));
    }

    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<MeResponse>, Rejection> {
    let user = User::find_by_id(&state.db, auth.id)
        .await
        .map_err(internal("find_by_id"))?
        .ok_or_else(|| {
            error!(user_id = %auth.id, "user not found");
            (StatusCode::UNAUTHORIZED, "User not found".to_string())
        })?;

    let profile_id = profile_id(&state, &user)
        .await
        .map_err(|e| internal("profile lookup")(anyhow::anyhow!(e)))?;

    Ok(Json(MeResponse {
        user: PublicUser::from(user),
        profile_id,
    }))
}

async fn profile_id(state: &AppState, user: &User) -> Result<Option<Uuid>, crate::care::CareError> {
    Ok(match user.role {
        Role::Patient => state.care.find_patient_by_user(user.id).await?.map(|p| p.id),
        Role::Caregiver => state.care.find_caregiver_by_user(user.id).await?.map(|c| c.id),
        Role::Admin => None,
    })
}
