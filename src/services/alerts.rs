//! Price-drop alert evaluation and channel fan-out
//!
//! An alert fires only when a threshold is set, the new price is at or
//! below it, at least two price snapshots exist, and the new price is
//! strictly lower than its predecessor. Channel sends are independent;
//! one failure never blocks the others.

use crate::db::TravelStore;
use crate::metrics::Metrics;
use crate::models::alert::{AlertFrequency, AlertPreference};
use crate::models::user::User;
use crate::services::notification::NotificationGateway;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Notification channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Email,
    Sms,
    Push,
}

/// Per-channel delivery outcome; channels that were skipped (disabled or
/// failed precondition) do not appear at all.
#[derive(Debug, Clone)]
pub struct ChannelOutcome {
    pub channel: Channel,
    pub delivered: bool,
}

/// Result of evaluating one alert preference against a new price
#[derive(Debug, Clone)]
pub struct AlertDispatch {
    pub user_id: i64,
    pub destination_id: i64,
    pub old_price: f64,
    pub new_price: f64,
    pub channels: Vec<ChannelOutcome>,
}

/// The fire decision, given the threshold and the last two price points.
///
/// `previous_price` is the snapshot immediately before the new one; with
/// fewer than two snapshots there is no baseline and nothing fires.
pub fn price_drop_fires(threshold: Option<f64>, new_price: f64, previous_price: Option<f64>) -> bool {
    let Some(threshold) = threshold else {
        return false;
    };
    if new_price > threshold {
        return false;
    }
    match previous_price {
        Some(previous) => new_price < previous,
        None => false,
    }
}

/// Fan a fired alert out to each enabled channel.
///
/// SMS requires a stored phone number and is silently skipped without one;
/// that is a precondition, not an error.
pub async fn dispatch_alert(
    gateway: &dyn NotificationGateway,
    user: &User,
    preference: &AlertPreference,
    destination_name: &str,
    old_price: f64,
    new_price: f64,
) -> AlertDispatch {
    let mut channels = Vec::new();

    if preference.alert_email {
        let delivered = match gateway
            .send_email(&user.email, destination_name, old_price, new_price)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    user_id = user.id,
                    destination = %destination_name,
                    error = %e,
                    "Email alert send failed"
                );
                false
            }
        };
        channels.push(ChannelOutcome {
            channel: Channel::Email,
            delivered,
        });
    }

    if preference.alert_sms {
        match user.phone.as_deref() {
            Some(phone) => {
                let delivered = match gateway
                    .send_sms(phone, destination_name, old_price, new_price)
                    .await
                {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(
                            user_id = user.id,
                            destination = %destination_name,
                            error = %e,
                            "SMS alert send failed"
                        );
                        false
                    }
                };
                channels.push(ChannelOutcome {
                    channel: Channel::Sms,
                    delivered,
                });
            }
            None => {
                debug!(
                    user_id = user.id,
                    "SMS alert enabled but user has no phone number, skipping"
                );
            }
        }
    }

    if preference.alert_push {
        let delivered = match gateway
            .send_push(destination_name, old_price, new_price)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    user_id = user.id,
                    destination = %destination_name,
                    error = %e,
                    "Push alert send failed"
                );
                false
            }
        };
        channels.push(ChannelOutcome {
            channel: Channel::Push,
            delivered,
        });
    }

    AlertDispatch {
        user_id: user.id,
        destination_id: preference.destination_id,
        old_price,
        new_price,
        channels,
    }
}

pub struct AlertEvaluator {
    store: Arc<TravelStore>,
    gateway: Arc<dyn NotificationGateway>,
    metrics: Option<Arc<Metrics>>,
}

impl AlertEvaluator {
    pub fn new(store: Arc<TravelStore>, gateway: Arc<dyn NotificationGateway>) -> Self {
        Self {
            store,
            gateway,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Evaluate every alert preference for a destination against a newly
    /// observed price; returns one dispatch report per fired alert.
    pub async fn evaluate_alerts(
        &self,
        destination_id: i64,
        new_price: f64,
    ) -> Result<Vec<AlertDispatch>, Box<dyn std::error::Error + Send + Sync>> {
        let preferences = self
            .store
            .alert_preferences_for_destination(destination_id)
            .await?;
        if preferences.is_empty() {
            return Ok(Vec::new());
        }

        // Last two price points: the new snapshot and its predecessor. The
        // read is not snapshot-isolated against concurrent appends; at
        // worst an alert is missed or suppressed, never a hard error.
        let recent = self.store.latest_prices(destination_id, 2).await?;
        let previous_price = if recent.len() >= 2 {
            Some(recent[1].flight_price)
        } else {
            None
        };

        let destination = match self.store.get_destination(destination_id).await? {
            Some(d) => d,
            None => {
                warn!(destination_id, "Alert evaluation for unknown destination");
                return Ok(Vec::new());
            }
        };

        let mut dispatches = Vec::new();
        for preference in &preferences {
            if preference.frequency != AlertFrequency::Immediate {
                continue;
            }
            if !price_drop_fires(preference.price_threshold, new_price, previous_price) {
                debug!(
                    user_id = preference.user_id,
                    destination = %destination.name,
                    new_price,
                    "Alert conditions not met"
                );
                continue;
            }

            let user = match self.store.get_user(preference.user_id).await? {
                Some(u) => u,
                None => {
                    warn!(
                        user_id = preference.user_id,
                        "Alert preference references missing user, skipping"
                    );
                    continue;
                }
            };

            // price_drop_fires returned true, so the predecessor exists
            let old_price = previous_price.unwrap_or(new_price);

            info!(
                user_id = user.id,
                destination = %destination.name,
                old_price,
                new_price,
                "Price drop alert firing for {}: {} -> {}",
                destination.name,
                old_price,
                new_price
            );

            let dispatch = dispatch_alert(
                self.gateway.as_ref(),
                &user,
                preference,
                &destination.name,
                old_price,
                new_price,
            )
            .await;

            if let Some(ref metrics) = self.metrics {
                metrics.alerts_fired_total.inc();
                for outcome in &dispatch.channels {
                    if !outcome.delivered {
                        metrics.notification_failures_total.inc();
                    }
                }
            }

            dispatches.push(dispatch);
        }

        Ok(dispatches)
    }
}
