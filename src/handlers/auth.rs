use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tower_cookies::cookie::time::Duration;
use tower_cookies::{Cookie, Cookies};

use crate::{
    config::Config,
    error::{AppError, Result},
    middleware_layer::auth::CurrentUser,
    models::user::UserPublic,
    repositories::user as user_repo,
    services::{assets, auth as auth_service, tokens},
    state::AppState,
    storage::AssetRef,
    validation::auth::*,
};

/// The request payload for user login.
#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// The request payload for a session-token refresh, for clients that do
/// not use the cookie.
#[derive(Deserialize, Debug)]
pub struct RefreshRequest {
    pub session_token: Option<String>,
}

/// The request payload for changing a user's password.
#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// The request payload for updating account details.
#[derive(Deserialize, Debug)]
pub struct UpdateAccountRequest {
    pub full_name: String,
    pub email: String,
}

/// The response payload for message-only authentication endpoints.
#[derive(Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
}

/// The response payload for login, register, and refresh.
#[derive(Serialize)]
pub struct SessionResponse {
    pub user: UserPublic,
    pub access_token: String,
    pub session_token: String,
}

/// Creates a secure cookie with the given name, value, and max age.
fn create_secure_cookie(name: String, value: String, max_age_secs: i64) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);

    let is_production =
        std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()) == "production";

    cookie.set_http_only(true);

    if is_production {
        cookie.set_secure(true);
    }

    cookie.set_same_site(tower_cookies::cookie::SameSite::Lax);
    cookie.set_max_age(Duration::seconds(max_age_secs));
    cookie.set_path("/");

    cookie
}

/// Sets both token cookies from a freshly minted pair.
fn apply_token_cookies(cookies: &Cookies, config: &Config, pair: &tokens::TokenPair) {
    cookies.add(create_secure_cookie(
        "access_token".to_string(),
        pair.access_token.clone(),
        config.access_token_ttl_minutes * 60,
    ));
    cookies.add(create_secure_cookie(
        "session_token".to_string(),
        pair.session_token.clone(),
        config.session_token_ttl_days * 86400,
    ));
}

fn clear_token_cookies(cookies: &Cookies) {
    for name in ["access_token", "session_token"] {
        let mut cookie = Cookie::new(name, "");
        cookie.set_max_age(Duration::seconds(0));
        cookie.set_path("/");
        cookies.remove(cookie);
    }
}

/// Handles user registration.
///
/// Multipart: `full_name`, `username`, `email`, `password` text fields plus
/// a required `avatar` file and an optional `cover_image` file. Files reach
/// the storage provider only after validation passes; if the row insert
/// then fails, the uploaded assets are reclaimed.
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    cookies: Cookies,
    mut multipart: Multipart,
) -> Result<Response> {
    tracing::info!("📝 Register attempt");

    let mut full_name = None;
    let mut username = None;
    let mut email = None;
    let mut password = None;
    let mut staged_avatar = None;
    let mut staged_cover = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Multipart(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "full_name" => full_name = Some(read_text(field).await?),
            "username" => username = Some(read_text(field).await?),
            "email" => email = Some(read_text(field).await?),
            "password" => password = Some(read_text(field).await?),
            "avatar" => {
                staged_avatar = Some(assets::stage_field(&state.config.temp_dir, field).await?)
            }
            "cover_image" => {
                staged_cover = Some(assets::stage_field(&state.config.temp_dir, field).await?)
            }
            _ => {}
        }
    }

    let full_name = full_name
        .ok_or_else(|| AppError::Validation("full_name is required".to_string()))?;
    let username =
        username.ok_or_else(|| AppError::Validation("username is required".to_string()))?;
    let email = email.ok_or_else(|| AppError::Validation("email is required".to_string()))?;
    let password =
        password.ok_or_else(|| AppError::Validation("password is required".to_string()))?;
    let staged_avatar = staged_avatar
        .ok_or_else(|| AppError::Validation("Avatar file is required".to_string()))?;

    validate_username(&username)?;
    validate_email(&email)?;
    validate_password(&password)?;
    validate_text("full_name", &full_name, 255)?;

    tracing::info!("✅ Validations passed for: {}", username);

    let storage = state.storage.as_ref();

    let avatar = assets::replace(storage, None, staged_avatar).await?.new_ref;

    let cover_image = match staged_cover {
        Some(staged) => match assets::replace(storage, None, staged).await {
            Ok(swap) => Some(swap.new_ref),
            Err(e) => {
                assets::reclaim(storage, &avatar).await;
                return Err(e);
            }
        },
        None => None,
    };

    let user = match auth_service::create_user(
        &state.db,
        username,
        email,
        full_name,
        password,
        avatar.url(),
        cover_image.as_ref().map(|c| c.url()),
    )
    .await
    {
        Ok(user) => user,
        Err(e) => {
            assets::reclaim(storage, &avatar).await;
            if let Some(cover) = &cover_image {
                assets::reclaim(storage, cover).await;
            }
            return Err(e);
        }
    };

    let pair = tokens::issue(&state.token_keys, &state.db, user.id).await?;
    apply_token_cookies(&cookies, &state.config, &pair);

    tracing::info!("✅ User registered: {}", user.id);

    let response = SessionResponse {
        user: user.public(),
        access_token: pair.access_token,
        session_token: pair.session_token,
    };

    Ok((StatusCode::CREATED, Json(response)).into_response())
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::Multipart(format!("Failed to read text field: {}", e)))
}

/// Handles user login. The username field also accepts an email.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<LoginRequest>,
) -> Result<Response> {
    tracing::info!("🔐 Login attempt for: {}", payload.username);

    let user =
        auth_service::authenticate_user(&state.db, &payload.username, &payload.password).await?;

    let pair = tokens::issue(&state.token_keys, &state.db, user.id).await?;
    apply_token_cookies(&cookies, &state.config, &pair);

    tracing::info!("✅ User logged in: {}", user.id);

    let response = SessionResponse {
        user: user.public(),
        access_token: pair.access_token,
        session_token: pair.session_token,
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Rotates the session token and returns a fresh pair.
///
/// The presented token comes from the cookie or the JSON body. A token
/// that no longer matches the persisted value is reuse; the cookies are
/// cleared so the client falls back to login.
#[axum::debug_handler]
pub async fn refresh(
    State(state): State<AppState>,
    cookies: Cookies,
    payload: Option<Json<RefreshRequest>>,
) -> Result<Response> {
    let presented = cookies
        .get("session_token")
        .map(|c| c.value().to_string())
        .or_else(|| payload.and_then(|Json(p)| p.session_token))
        .ok_or_else(|| AppError::Authentication("Missing session token".to_string()))?;

    let (pair, user_id) = match tokens::refresh(&state.token_keys, &state.db, &presented).await {
        Ok(rotated) => rotated,
        Err(e) => {
            clear_token_cookies(&cookies);
            return Err(e);
        }
    };

    apply_token_cookies(&cookies, &state.config, &pair);

    let user = user_repo::find_by_id(&state.db, &user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    tracing::info!("🔁 Session refreshed for user: {}", user_id);

    let response = SessionResponse {
        user: user.public(),
        access_token: pair.access_token,
        session_token: pair.session_token,
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Handles user logout.
#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    cookies: Cookies,
) -> Result<Response> {
    tracing::info!("👋 Logout for user: {}", user.id);

    tokens::revoke(&state.db, user.id).await?;
    clear_token_cookies(&cookies);

    tracing::info!("✅ User logged out: {}", user.id);

    let response = AuthResponse {
        success: true,
        message: "Logout successful".to_string(),
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Handles changing a user's password.
#[axum::debug_handler]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Response> {
    validate_password(&payload.new_password)?;

    auth_service::change_password(
        &state.db,
        user.id,
        &payload.old_password,
        &payload.new_password,
    )
    .await?;

    let response = AuthResponse {
        success: true,
        message: "Password changed successfully".to_string(),
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Returns the authenticated user's profile.
#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<UserPublic>> {
    let user = user_repo::find_by_id(&state.db, &user.id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(user.public()))
}

/// Updates full name and email.
#[axum::debug_handler]
pub async fn update_account(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<UpdateAccountRequest>,
) -> Result<Json<UserPublic>> {
    validate_text("full_name", &payload.full_name, 255)?;
    validate_email(&payload.email)?;

    let updated =
        user_repo::update_details(&state.db, &user.id, &payload.full_name, &payload.email).await?;

    tracing::info!("✅ Account updated for user: {}", user.id);
    Ok(Json(updated.public()))
}

/// Pulls one named file field out of a multipart body and stages it.
async fn stage_single_file(
    state: &AppState,
    mut multipart: Multipart,
    field_name: &str,
) -> Result<assets::StagedFile> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Multipart(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() == Some(field_name) {
            return assets::stage_field(&state.config.temp_dir, field).await;
        }
    }

    Err(AppError::Validation(format!(
        "Missing {} file field",
        field_name
    )))
}

/// Replaces the user's avatar.
///
/// Upload first, then commit the new reference, then reclaim the old
/// asset. A failed commit reclaims the fresh upload instead so the record
/// keeps pointing at an asset that exists.
#[axum::debug_handler]
pub async fn update_avatar(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    multipart: Multipart,
) -> Result<Json<UserPublic>> {
    let user = user_repo::find_by_id(&state.db, &current.id)
        .await?
        .ok_or(AppError::NotFound)?;

    let staged = stage_single_file(&state, multipart, "avatar").await?;

    let storage = state.storage.as_ref();
    let swap = assets::replace(storage, Some(AssetRef(user.avatar.clone())), staged).await?;

    let updated = match user_repo::set_avatar(&state.db, &user.id, swap.new_ref.url()).await {
        Ok(updated) => updated,
        Err(e) => {
            assets::reclaim(storage, &swap.new_ref).await;
            return Err(e);
        }
    };

    if let Some(old) = swap.old_ref {
        assets::reclaim(storage, &old).await;
    }

    tracing::info!("✅ Avatar updated for user: {}", user.id);
    Ok(Json(updated.public()))
}

/// Replaces the user's cover image. Same commit ordering as the avatar.
#[axum::debug_handler]
pub async fn update_cover_image(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    multipart: Multipart,
) -> Result<Json<UserPublic>> {
    let user = user_repo::find_by_id(&state.db, &current.id)
        .await?
        .ok_or(AppError::NotFound)?;

    let staged = stage_single_file(&state, multipart, "cover_image").await?;

    let storage = state.storage.as_ref();
    let old = user.cover_image.clone().map(AssetRef);
    let swap = assets::replace(storage, old, staged).await?;

    let updated = match user_repo::set_cover_image(&state.db, &user.id, swap.new_ref.url()).await {
        Ok(updated) => updated,
        Err(e) => {
            assets::reclaim(storage, &swap.new_ref).await;
            return Err(e);
        }
    };

    if let Some(old) = swap.old_ref {
        assets::reclaim(storage, &old).await;
    }

    tracing::info!("✅ Cover image updated for user: {}", user.id);
    Ok(Json(updated.public()))
}
