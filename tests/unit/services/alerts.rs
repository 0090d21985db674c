//! Unit tests for alert firing and channel fan-out

use async_trait::async_trait;
use std::sync::Mutex;
use tripwatch::models::alert::{AlertFrequency, AlertPreference};
use tripwatch::models::user::User;
use tripwatch::services::alerts::{dispatch_alert, price_drop_fires, Channel};
use tripwatch::services::notification::NotificationGateway;

#[test]
fn test_no_threshold_never_fires() {
    assert!(!price_drop_fires(None, 100.0, Some(200.0)));
}

#[test]
fn test_price_above_threshold_does_not_fire() {
    assert!(!price_drop_fires(Some(300.0), 350.0, Some(400.0)));
}

#[test]
fn test_price_at_threshold_fires_on_drop() {
    assert!(price_drop_fires(Some(300.0), 300.0, Some(320.0)));
}

#[test]
fn test_no_previous_price_does_not_fire() {
    assert!(!price_drop_fires(Some(300.0), 250.0, None));
}

#[test]
fn test_price_must_strictly_drop() {
    assert!(!price_drop_fires(Some(300.0), 250.0, Some(250.0)));
    assert!(!price_drop_fires(Some(300.0), 250.0, Some(240.0)));
    assert!(price_drop_fires(Some(300.0), 250.0, Some(260.0)));
}

#[derive(Debug, Clone, PartialEq)]
enum Sent {
    Email(String),
    Sms(String),
    Push,
}

/// Records every send; optionally fails the email channel.
struct RecordingGateway {
    sent: Mutex<Vec<Sent>>,
    fail_email: bool,
}

impl RecordingGateway {
    fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_email: false,
        }
    }

    fn failing_email() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_email: true,
        }
    }

    fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationGateway for RecordingGateway {
    async fn send_email(
        &self,
        recipient: &str,
        _destination: &str,
        _old_price: f64,
        _new_price: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.fail_email {
            return Err(Box::new(std::io::Error::other("smtp unavailable")));
        }
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Email(recipient.to_string()));
        Ok(())
    }

    async fn send_sms(
        &self,
        phone: &str,
        _destination: &str,
        _old_price: f64,
        _new_price: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.sent.lock().unwrap().push(Sent::Sms(phone.to_string()));
        Ok(())
    }

    async fn send_push(
        &self,
        _destination: &str,
        _old_price: f64,
        _new_price: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.sent.lock().unwrap().push(Sent::Push);
        Ok(())
    }
}

fn user_with_phone() -> User {
    User {
        id: 7,
        email: "ana@example.com".to_string(),
        phone: Some("+351900000000".to_string()),
        full_name: Some("Ana Silva".to_string()),
    }
}

fn preference(email: bool, sms: bool, push: bool) -> AlertPreference {
    AlertPreference {
        id: 1,
        user_id: 7,
        destination_id: 3,
        price_threshold: Some(300.0),
        alert_email: email,
        alert_sms: sms,
        alert_push: push,
        frequency: AlertFrequency::Immediate,
    }
}

#[tokio::test]
async fn test_dispatch_fans_out_to_all_enabled_channels() {
    let gateway = RecordingGateway::new();
    let user = user_with_phone();
    let pref = preference(true, true, true);

    let dispatch = dispatch_alert(&gateway, &user, &pref, "Lisbon", 320.0, 280.0).await;

    assert_eq!(dispatch.user_id, 7);
    assert_eq!(dispatch.destination_id, 3);
    assert_eq!(dispatch.old_price, 320.0);
    assert_eq!(dispatch.new_price, 280.0);
    assert_eq!(dispatch.channels.len(), 3);
    assert!(dispatch.channels.iter().all(|c| c.delivered));

    let sent = gateway.sent();
    assert!(sent.contains(&Sent::Email("ana@example.com".to_string())));
    assert!(sent.contains(&Sent::Sms("+351900000000".to_string())));
    assert!(sent.contains(&Sent::Push));
}

#[tokio::test]
async fn test_dispatch_skips_sms_without_phone_number() {
    let gateway = RecordingGateway::new();
    let mut user = user_with_phone();
    user.phone = None;
    let pref = preference(false, true, false);

    let dispatch = dispatch_alert(&gateway, &user, &pref, "Lisbon", 320.0, 280.0).await;

    // skipped channel is absent from the report, not marked failed
    assert!(dispatch.channels.is_empty());
    assert!(gateway.sent().is_empty());
}

#[tokio::test]
async fn test_dispatch_channel_failure_does_not_block_others() {
    let gateway = RecordingGateway::failing_email();
    let user = user_with_phone();
    let pref = preference(true, true, true);

    let dispatch = dispatch_alert(&gateway, &user, &pref, "Lisbon", 320.0, 280.0).await;

    let email = dispatch
        .channels
        .iter()
        .find(|c| c.channel == Channel::Email)
        .unwrap();
    assert!(!email.delivered);

    let sms = dispatch
        .channels
        .iter()
        .find(|c| c.channel == Channel::Sms)
        .unwrap();
    assert!(sms.delivered);

    let push = dispatch
        .channels
        .iter()
        .find(|c| c.channel == Channel::Push)
        .unwrap();
    assert!(push.delivered);
}

#[tokio::test]
async fn test_dispatch_with_no_channels_enabled_sends_nothing() {
    let gateway = RecordingGateway::new();
    let user = user_with_phone();
    let pref = preference(false, false, false);

    let dispatch = dispatch_alert(&gateway, &user, &pref, "Lisbon", 320.0, 280.0).await;

    assert!(dispatch.channels.is_empty());
    assert!(gateway.sent().is_empty());
}
