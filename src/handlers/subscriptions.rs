use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    middleware_layer::auth::CurrentUser,
    models::subscription::SubscriptionStatus,
    repositories::{subscription as subscription_repo, user as user_repo},
    state::AppState,
};

/// Toggles a subscription to a channel.
#[axum::debug_handler]
pub async fn toggle(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(channel_id): Path<Uuid>,
) -> Result<Json<SubscriptionStatus>> {
    if channel_id == user.id {
        return Err(AppError::Validation(
            "Cannot subscribe to your own channel".to_string(),
        ));
    }

    user_repo::find_by_id(&state.db, &channel_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let subscribed = subscription_repo::toggle(&state.db, &user.id, &channel_id).await?;

    tracing::debug!(
        "🔔 Subscription toggled: {} -> {} ({})",
        user.id,
        channel_id,
        subscribed
    );
    Ok(Json(SubscriptionStatus { subscribed }))
}
