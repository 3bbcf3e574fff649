use crate::models::punch::Punch;
use serde::Serialize;

/// Flat punch row for CSV / JSON output.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct PunchExport {
    pub id: String,
    pub date: String,
    pub time: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub lat: f64,
    pub lng: f64,
    pub accuracy: Option<f64>,
    pub is_mocked: bool,
    pub device_info: String,
    pub clock_in_utc: String,
}

impl From<&Punch> for PunchExport {
    fn from(p: &Punch) -> Self {
        Self {
            id: p.id.clone(),
            date: p.local_date().format("%Y-%m-%d").to_string(),
            time: p.local_time().format("%H:%M:%S").to_string(),
            kind: p.kind.to_db_str().to_string(),
            status: p.status.to_db_str().to_string(),
            lat: p.lat,
            lng: p.lng,
            accuracy: p.accuracy,
            is_mocked: p.is_mocked,
            device_info: p.device_info.clone(),
            clock_in_utc: p.clock_in.to_rfc3339(),
        }
    }
}
