//! Unit tests for snapshot and alert model types

use tripwatch::models::alert::AlertFrequency;
use tripwatch::models::snapshot::{
    CrimeSnapshot, PriceSnapshot, SignalType, Snapshot, WeatherSnapshot,
};

#[test]
fn test_signal_type_display() {
    assert_eq!(SignalType::Price.to_string(), "price");
    assert_eq!(SignalType::Weather.to_string(), "weather");
    assert_eq!(SignalType::Crime.to_string(), "crime");
}

#[test]
fn test_snapshot_signal_type_dispatch() {
    let price = Snapshot::Price(PriceSnapshot::new(1, 450.0, 360.0));
    let weather = Snapshot::Weather(WeatherSnapshot::new(1, 24.0, "Clear".to_string(), 9.5));
    let crime = Snapshot::Crime(CrimeSnapshot::new(1, 40.0, 60.0));

    assert_eq!(price.signal_type(), SignalType::Price);
    assert_eq!(weather.signal_type(), SignalType::Weather);
    assert_eq!(crime.signal_type(), SignalType::Crime);
}

#[test]
fn test_snapshot_constructors_stamp_current_time() {
    let before = chrono::Utc::now();
    let snapshot = PriceSnapshot::new(7, 500.0, 400.0);
    let after = chrono::Utc::now();
    assert!(snapshot.timestamp >= before);
    assert!(snapshot.timestamp <= after);
}

#[test]
fn test_alert_frequency_round_trip() {
    for freq in [
        AlertFrequency::Immediate,
        AlertFrequency::Daily,
        AlertFrequency::Weekly,
    ] {
        assert_eq!(AlertFrequency::parse(freq.as_str()), freq);
    }
}

#[test]
fn test_alert_frequency_parse_defaults_to_immediate() {
    assert_eq!(AlertFrequency::parse("hourly"), AlertFrequency::Immediate);
    assert_eq!(AlertFrequency::parse(""), AlertFrequency::Immediate);
}
