//! Notification channel abstraction
//!
//! The core depends only on a send-with-result capability per channel; the
//! actual transports (SMTP, SMS gateway, push fan-out) are external
//! collaborators behind this trait.

use async_trait::async_trait;
use tracing::info;

/// Price-drop send primitives, one per channel.
///
/// Each send reports success or failure; callers record the outcome and
/// never let one channel's failure block the others.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send_email(
        &self,
        recipient: &str,
        destination: &str,
        old_price: f64,
        new_price: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn send_sms(
        &self,
        phone: &str,
        destination: &str,
        old_price: f64,
        new_price: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn send_push(
        &self,
        destination: &str,
        old_price: f64,
        new_price: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Gateway that only logs; stands in where no transport is wired up
pub struct LogOnlyGateway;

#[async_trait]
impl NotificationGateway for LogOnlyGateway {
    async fn send_email(
        &self,
        recipient: &str,
        destination: &str,
        old_price: f64,
        new_price: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!(
            recipient = %recipient,
            destination = %destination,
            old_price,
            new_price,
            "Email alert: price for {} dropped from {} to {}",
            destination,
            old_price,
            new_price
        );
        Ok(())
    }

    async fn send_sms(
        &self,
        phone: &str,
        destination: &str,
        old_price: f64,
        new_price: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!(
            phone = %phone,
            destination = %destination,
            old_price,
            new_price,
            "SMS alert: price for {} dropped from {} to {}",
            destination,
            old_price,
            new_price
        );
        Ok(())
    }

    async fn send_push(
        &self,
        destination: &str,
        old_price: f64,
        new_price: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!(
            destination = %destination,
            old_price,
            new_price,
            "Push alert: price for {} dropped from {} to {}",
            destination,
            old_price,
            new_price
        );
        Ok(())
    }
}
