use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Opaque backend identifier; upstream sends either numbers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new<S: ToString>(id: S) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reads an id out of a loose JSON value. Empty strings and nulls are no id.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(Self(s.trim().to_string())),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        RecordId::from_value(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid record id: {}", value)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symptom {
    #[serde(alias = "symptomId")]
    pub id: RecordId,
    #[serde(alias = "symptomName")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specialization {
    #[serde(alias = "specializationId")]
    pub id: RecordId,
    #[serde(alias = "specializationName")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayAvailability {
    pub date: NaiveDate,
    /// Plain strings or objects carrying `time`/`slotTime`/`startTime` and `slotId`/`id`.
    #[serde(default)]
    pub times: Vec<Value>,
    #[serde(default)]
    pub booked_slots: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    #[serde(alias = "doctorId")]
    pub id: RecordId,
    #[serde(alias = "doctorName")]
    pub name: String,
    #[serde(default)]
    pub specialization: Option<String>,
    /// Department the token is filed under.
    #[serde(default, alias = "specializationId")]
    pub department_id: Option<RecordId>,
    #[serde(default, alias = "consultationFee")]
    pub fees: Option<f64>,
    #[serde(default, alias = "experienceYears")]
    pub experience: Option<u32>,
    #[serde(default)]
    pub availability: Vec<DayAvailability>,
    #[serde(default)]
    pub booked_slots: Vec<Value>,
}

impl Doctor {
    pub fn availability_on(&self, date: NaiveDate) -> Option<&DayAvailability> {
        self.availability.iter().find(|day| day.date == date)
    }
}
