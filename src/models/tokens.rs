use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use super::catalog::RecordId;

pub const DEFAULT_REASON: &str = "General Consultation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriorityLevel {
    Normal,
    Emergency,
}

impl Default for PriorityLevel {
    fn default() -> Self {
        PriorityLevel::Normal
    }
}

impl PriorityLevel {
    /// Wire form sent to the backend.
    pub fn as_upper(&self) -> &'static str {
        match self {
            PriorityLevel::Normal => "NORMAL",
            PriorityLevel::Emergency => "EMERGENCY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsultationType {
    Opd,
    Virtual,
}

impl Default for ConsultationType {
    fn default() -> Self {
        ConsultationType::Opd
    }
}

/// Display-only wait estimate in minutes; the backend computes the real one.
pub fn estimated_wait_minutes(consultation: ConsultationType, priority: PriorityLevel) -> u32 {
    match (consultation, priority) {
        (ConsultationType::Virtual, PriorityLevel::Emergency) => 5,
        (ConsultationType::Opd, PriorityLevel::Emergency) => 10,
        (ConsultationType::Virtual, PriorityLevel::Normal) => 15,
        (ConsultationType::Opd, PriorityLevel::Normal) => 30,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TokenStatus {
    Waiting,
    InProgress,
    Completed,
    Cancelled,
}

impl Default for TokenStatus {
    fn default() -> Self {
        TokenStatus::Waiting
    }
}

impl TokenStatus {
    pub fn parse(s: &str) -> Option<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "waiting" => Some(TokenStatus::Waiting),
            "inprogress" => Some(TokenStatus::InProgress),
            "completed" => Some(TokenStatus::Completed),
            "cancelled" | "canceled" => Some(TokenStatus::Cancelled),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for TokenStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        TokenStatus::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown token status: {}", s)))
    }
}

/// Body of `createQueueToken`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTokenRequest {
    pub patient_id: u64,
    pub department_id: RecordId,
    pub slot_id: RecordId,
    pub doctor_id: RecordId,
    pub priority: String,
    pub reason_for_visit: String,
    pub estimated_wait_time: u32,
}

/// What the backend hands back; any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenReceipt {
    #[serde(default)]
    pub token_number: Option<RecordId>,
    #[serde(default)]
    pub status: Option<TokenStatus>,
    #[serde(default)]
    pub estimated_wait_time: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueToken {
    pub token_number: String,
    pub patient_name: String,
    pub phone_number: String,
    pub doctor_name: String,
    pub specialization: String,
    pub priority_level: PriorityLevel,
    pub reason_for_visit: String,
    pub status: TokenStatus,
    pub slot_date: NaiveDate,
    pub slot_time: String,
    pub estimated_wait_minutes: u32,
}
