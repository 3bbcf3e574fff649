use super::record::Record;
use crate::errors::{AppError, AppResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaveType {
    #[serde(rename = "FERIAS")]
    Vacation,
    #[serde(rename = "FOLGA")]
    DayOff,
    #[serde(rename = "LICENCA")]
    License,
    #[serde(rename = "FALTA")]
    Absence,
    /// Medical certificate: always needs a proof attachment.
    #[serde(rename = "ATESTADO")]
    MedicalCertificate,
}

impl LeaveType {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            LeaveType::Vacation => "FERIAS",
            LeaveType::DayOff => "FOLGA",
            LeaveType::License => "LICENCA",
            LeaveType::Absence => "FALTA",
            LeaveType::MedicalCertificate => "ATESTADO",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "FERIAS" | "FÉRIAS" => Some(LeaveType::Vacation),
            "FOLGA" => Some(LeaveType::DayOff),
            "LICENCA" | "LICENÇA" => Some(LeaveType::License),
            "FALTA" => Some(LeaveType::Absence),
            "ATESTADO" => Some(LeaveType::MedicalCertificate),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> AppResult<Self> {
        Self::from_db_str(s).ok_or_else(|| AppError::InvalidLeaveType(s.to_string()))
    }

    pub fn label(&self) -> &'static str {
        match self {
            LeaveType::Vacation => "Férias",
            LeaveType::DayOff => "Folga",
            LeaveType::License => "Licença",
            LeaveType::Absence => "Falta",
            LeaveType::MedicalCertificate => "Atestado",
        }
    }

    pub fn requires_attachment(&self) -> bool {
        matches!(self, LeaveType::MedicalCertificate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl LeaveStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            LeaveStatus::Pending => "PENDING",
            LeaveStatus::Approved => "APPROVED",
            LeaveStatus::Rejected => "REJECTED",
            LeaveStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> AppResult<Self> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Ok(LeaveStatus::Pending),
            "APPROVED" => Ok(LeaveStatus::Approved),
            "REJECTED" => Ok(LeaveStatus::Rejected),
            "CANCELLED" | "CANCELED" => Ok(LeaveStatus::Cancelled),
            _ => Err(AppError::InvalidStatus(s.to_string())),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LeaveStatus::Pending => "Pendente",
            LeaveStatus::Approved => "Aprovado",
            LeaveStatus::Rejected => "Recusado",
            LeaveStatus::Cancelled => "Cancelado",
        }
    }
}

/// Leave / absence request (`leave_requests` row).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveRequest {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub collaborator_id: String,
    #[serde(rename = "type")]
    pub kind: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days_count: i64,
    #[serde(default)]
    pub reason: String,
    pub status: LeaveStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Record for LeaveRequest {
    const TABLE: &'static str = "leave_requests";
}

/// Vacation entitlement summary, in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacationBalance {
    pub total: i64,
    pub available: i64,
    pub taken: i64,
}

impl VacationBalance {
    /// Shown when the balance cannot be fetched.
    pub const FALLBACK: VacationBalance = VacationBalance {
        total: 30,
        available: 0,
        taken: 0,
    };
}
