use super::punch::LocationSample;
use super::record::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Proof that a user accepted one version of the terms of use
/// (`user_term_acceptances` row), with where it happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermAcceptance {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub user_id: String,
    pub term_version: String,
    pub accepted_at: DateTime<Utc>,
    #[serde(default)]
    pub ip_address: String,
    pub lat: f64,
    pub lng: f64,
    pub accuracy: Option<f64>,
}

impl Record for TermAcceptance {
    const TABLE: &'static str = "user_term_acceptances";
}

impl TermAcceptance {
    pub fn new(
        user_id: &str,
        version: &str,
        origin: &str,
        sample: LocationSample,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: String::new(),
            user_id: user_id.to_string(),
            term_version: version.to_string(),
            accepted_at: at,
            ip_address: origin.to_string(),
            lat: sample.lat,
            lng: sample.lng,
            accuracy: sample.accuracy,
        }
    }
}
