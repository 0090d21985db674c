//! Unit tests for scheduler chunking and cron derivation

use cron::Schedule;
use std::str::FromStr;
use tripwatch::config;
use tripwatch::core::scheduler::{chunk_ids, interval_cron};

#[test]
fn test_chunk_ids_splits_with_short_tail() {
    let ids: Vec<i64> = (1..=12).collect();
    let chunks = chunk_ids(&ids, 5);
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0], vec![1, 2, 3, 4, 5]);
    assert_eq!(chunks[1], vec![6, 7, 8, 9, 10]);
    assert_eq!(chunks[2], vec![11, 12]);
}

#[test]
fn test_chunk_ids_exact_multiple() {
    let ids: Vec<i64> = (1..=10).collect();
    let chunks = chunk_ids(&ids, 5);
    assert_eq!(chunks.len(), 2);
    assert!(chunks.iter().all(|c| c.len() == 5));
}

#[test]
fn test_chunk_ids_fewer_than_chunk_size() {
    let chunks = chunk_ids(&[1, 2, 3], 5);
    assert_eq!(chunks, vec![vec![1, 2, 3]]);
}

#[test]
fn test_chunk_ids_empty_input() {
    assert!(chunk_ids(&[], 5).is_empty());
}

#[test]
fn test_chunk_ids_zero_size_is_clamped() {
    let chunks = chunk_ids(&[1, 2], 0);
    assert_eq!(chunks, vec![vec![1], vec![2]]);
}

#[test]
fn test_interval_cron_hourly() {
    assert_eq!(interval_cron(3600), "0 0 */1 * * *");
}

#[test]
fn test_interval_cron_six_hours() {
    assert_eq!(interval_cron(21600), "0 0 */6 * * *");
}

#[test]
fn test_interval_cron_daily() {
    assert_eq!(interval_cron(86400), "0 0 0 * * *");
}

#[test]
fn test_interval_cron_minutes_and_seconds() {
    assert_eq!(interval_cron(300), "0 */5 * * * *");
    assert_eq!(interval_cron(45), "*/45 * * * * *");
}

#[test]
fn test_configured_cadences_parse_as_schedules() {
    for interval in [
        config::WEATHER_UPDATE_INTERVAL_SECS,
        config::PRICE_UPDATE_INTERVAL_SECS,
        config::CRIME_UPDATE_INTERVAL_SECS,
    ] {
        let expr = interval_cron(interval);
        assert!(
            Schedule::from_str(&expr).is_ok(),
            "expression {:?} failed to parse",
            expr
        );
    }
}
