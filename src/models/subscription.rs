use serde::Serialize;

/// Result of a subscription toggle.
#[derive(Debug, Serialize)]
pub struct SubscriptionStatus {
    pub subscribed: bool,
}
