use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, header},
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use super::{ApiResponse, ApiResult};
use crate::{
    AppState,
    auth::Principal,
    config::Env,
    error::AppError,
    models::{
        ImageUploadResponse, ProfileEntry, ProfileEntryData, ProfileSection, PublicProfile, Role,
        RegisterUserRequest, UpdateProfileRequest, User, UserProfile,
    },
    validation::{self, validate},
};

/// IdentitySignupResponse
///
/// The part of the identity provider's signup response we rely on: the id of the
/// account it created, which becomes the id of the local profile.
#[derive(Deserialize)]
struct IdentitySignupResponse {
    id: Uuid,
}

/// Creates the account at the identity provider and returns its id.
///
/// Locally, with no provider configured, a fresh id is minted instead.
async fn signup_at_identity_provider(
    state: &AppState,
    payload: &RegisterUserRequest,
) -> Result<Uuid, AppError> {
    let Some(identity_url) = state.config.identity_url.as_deref() else {
        return match state.config.env {
            Env::Local => Ok(Uuid::new_v4()),
            Env::Production => Err(AppError::internal("IDENTITY_URL is not configured")),
        };
    };

    let mut request = reqwest::Client::new()
        .post(format!("{identity_url}/auth/v1/signup"))
        .json(&serde_json::json!({ "email": payload.email.trim(), "password": payload.password }));
    if let Some(api_key) = &state.config.identity_api_key {
        request = request.header("apikey", api_key);
    }

    let response = request
        .send()
        .await
        .map_err(|e| AppError::internal(format!("identity provider unreachable: {e}")))?;

    if !response.status().is_success() {
        tracing::info!(status = %response.status(), "identity provider refused signup");
        return Err(AppError::invalid_field(
            "email",
            "registration was refused by the identity provider",
        ));
    }

    let account = response
        .json::<IdentitySignupResponse>()
        .await
        .map_err(|e| AppError::internal(format!("unexpected identity response: {e}")))?;
    Ok(account.id)
}

/// register_user
///
/// [Public Route] Signs the user up with the identity provider, then mirrors a local
/// profile under the same id with role REGULAR.
#[utoipa::path(
    post,
    path = "/user/register",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "Registered", body = User),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUserRequest>,
) -> ApiResult<User> {
    validate(&payload)?;
    let id = signup_at_identity_provider(&state, &payload).await?;

    let user = User {
        id,
        email: payload.email.trim().to_string(),
        name: payload.name.trim().to_string(),
        surname: payload.surname.trim().to_string(),
        role: Role::Regular,
        bio: None,
        avatar_key: None,
        created_at: Utc::now(),
    };
    let user = state.repo.create_user(user).await?;

    tracing::info!(user = %user.id, "user registered");
    Ok(ApiResponse::created(user))
}

#[utoipa::path(
    get,
    path = "/user/me",
    responses((status = 200, description = "Profile", body = UserProfile))
)]
pub async fn get_me(principal: Principal, State(state): State<AppState>) -> ApiResult<UserProfile> {
    let user = state
        .repo
        .get_user(principal.id)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    let entries = state.repo.list_profile_entries(principal.id).await?;
    Ok(ApiResponse::ok(UserProfile { user, entries }))
}

#[utoipa::path(
    put,
    path = "/user/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated", body = User),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn update_me(
    principal: Principal,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfileRequest>,
) -> ApiResult<User> {
    validate(&payload)?;
    let trimmed = UpdateProfileRequest {
        name: payload.name.map(|s| s.trim().to_string()),
        surname: payload.surname.map(|s| s.trim().to_string()),
        bio: payload.bio.map(|s| s.trim().to_string()),
    };
    let user = state
        .repo
        .update_user_profile(principal.id, &trimmed)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    Ok(ApiResponse::ok(user))
}

/// get_public_profile
///
/// Any authenticated user may read another user's public profile. Email and role
/// are never part of it.
#[utoipa::path(
    get,
    path = "/user/{id}/public",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Public profile", body = PublicProfile),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_public_profile(
    _principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<PublicProfile> {
    let profile = state
        .repo
        .get_public_profiles(&[id])
        .await?
        .into_iter()
        .next()
        .ok_or(AppError::NotFound("user"))?;
    Ok(ApiResponse::ok(profile))
}

// --- CV sections ---

fn decode_entry(
    section: ProfileSection,
    body: serde_json::Value,
) -> Result<ProfileEntryData, AppError> {
    let entry = ProfileEntryData::from_section(section, body)
        .map_err(|e| AppError::invalid_field(section.as_str(), e.to_string()))?;
    validate(&entry)?;
    Ok(entry)
}

/// Fails with NotFound unless the caller owns an entry with this id in this section.
async fn ensure_entry(
    state: &AppState,
    user_id: Uuid,
    section: ProfileSection,
    entry_id: Uuid,
) -> Result<(), AppError> {
    let owned = state
        .repo
        .list_profile_entries(user_id)
        .await?
        .iter()
        .any(|e| e.id == entry_id && e.entry.section() == section);
    if owned {
        Ok(())
    } else {
        Err(AppError::NotFound("profile entry"))
    }
}

#[utoipa::path(
    post,
    path = "/user/me/{section}",
    params(("section" = String, Path, description = "education | experience | project | award")),
    responses(
        (status = 201, description = "Added", body = ProfileEntry),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn add_profile_entry(
    principal: Principal,
    State(state): State<AppState>,
    Path(section): Path<ProfileSection>,
    Json(body): Json<serde_json::Value>,
) -> ApiResult<ProfileEntry> {
    let entry = ProfileEntry {
        id: Uuid::new_v4(),
        entry: decode_entry(section, body)?,
        updated_at: Utc::now(),
    };
    state.repo.add_profile_entry(principal.id, &entry).await?;
    Ok(ApiResponse::created(entry))
}

#[utoipa::path(
    put,
    path = "/user/me/{section}/{entry_id}",
    params(
        ("section" = String, Path, description = "education | experience | project | award"),
        ("entry_id" = Uuid, Path, description = "Entry ID")
    ),
    responses(
        (status = 200, description = "Updated", body = ProfileEntry),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_profile_entry(
    principal: Principal,
    State(state): State<AppState>,
    Path((section, entry_id)): Path<(ProfileSection, Uuid)>,
    Json(body): Json<serde_json::Value>,
) -> ApiResult<ProfileEntry> {
    ensure_entry(&state, principal.id, section, entry_id).await?;
    let entry = ProfileEntry {
        id: entry_id,
        entry: decode_entry(section, body)?,
        updated_at: Utc::now(),
    };
    if !state.repo.update_profile_entry(principal.id, &entry).await? {
        return Err(AppError::NotFound("profile entry"));
    }
    Ok(ApiResponse::ok(entry))
}

#[utoipa::path(
    delete,
    path = "/user/me/{section}/{entry_id}",
    params(
        ("section" = String, Path, description = "education | experience | project | award"),
        ("entry_id" = Uuid, Path, description = "Entry ID")
    ),
    responses(
        (status = 200, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_profile_entry(
    principal: Principal,
    State(state): State<AppState>,
    Path((section, entry_id)): Path<(ProfileSection, Uuid)>,
) -> ApiResult<Uuid> {
    ensure_entry(&state, principal.id, section, entry_id).await?;
    if !state.repo.delete_profile_entry(principal.id, entry_id).await? {
        return Err(AppError::NotFound("profile entry"));
    }
    Ok(ApiResponse::ok(entry_id))
}

/// upload_avatar
///
/// Raw image body, stored under `avatars/{user}/`. The new key replaces the old one
/// on the profile; the previous object is left in the bucket.
#[utoipa::path(
    post,
    path = "/user/upload-avatar",
    request_body(content = Vec<u8>, content_type = "image/*"),
    responses(
        (status = 200, description = "Stored", body = ImageUploadResponse),
        (status = 400, description = "Unsupported image")
    )
)]
pub async fn upload_avatar(
    principal: Principal,
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<ImageUploadResponse> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    let extension = validation::validate_image(content_type, body.len())?;

    let key = format!("avatars/{}/{}.{extension}", principal.id, Uuid::new_v4());
    let key = state
        .storage
        .put_object(
            &key,
            body.to_vec(),
            content_type.unwrap_or("application/octet-stream"),
        )
        .await
        .map_err(|e| AppError::internal(e.to_string()))?;

    if !state.repo.set_user_avatar(principal.id, &key).await? {
        return Err(AppError::NotFound("user"));
    }
    Ok(ApiResponse::ok(ImageUploadResponse { key }))
}
