//! Core pipeline services: providers, fetcher, similarity, alerts

pub mod alerts;
pub mod fetcher;
pub mod notification;
pub mod providers;
pub mod recommendations;
pub mod similarity;
