use chrono::NaiveDate;
use serde::Deserialize;

use crate::models::{
    catalog::RecordId,
    tokens::{ConsultationType, PriorityLevel},
};

#[derive(Deserialize)]
pub struct SessionRequest {
    pub session_token: String,
}

#[derive(Deserialize)]
pub struct TypeSymptomsRequest {
    pub session_token: String,
    pub text: String,
}

#[derive(Deserialize)]
pub struct PickSuggestionRequest {
    pub session_token: String,
    pub index: usize,
}

#[derive(Deserialize)]
pub struct ChooseSpecializationRequest {
    pub session_token: String,
    pub specialization_id: RecordId,
}

#[derive(Deserialize)]
pub struct SelectDoctorRequest {
    pub session_token: String,
    pub doctor_id: RecordId,
}

#[derive(Deserialize)]
pub struct SelectDateRequest {
    pub session_token: String,
    pub date: NaiveDate,
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageDirection {
    Next,
    Prev,
}

#[derive(Deserialize)]
pub struct PageSlotsRequest {
    pub session_token: String,
    pub direction: PageDirection,
}

#[derive(Deserialize)]
pub struct SelectSlotRequest {
    pub session_token: String,
    pub index: usize,
}

#[derive(Deserialize)]
pub struct SetOptionsRequest {
    pub session_token: String,
    #[serde(default)]
    pub consultation: Option<ConsultationType>,
    #[serde(default)]
    pub priority: Option<PriorityLevel>,
}
