use serde::Deserialize;

use crate::models::identity::{BiometricModality, VerificationMethod};

#[derive(Deserialize)]
pub struct SessionRequest {
    pub session_token: String,
}

#[derive(Deserialize)]
pub struct SetGroupRequest {
    pub session_token: String,
    pub index: usize,
    pub text: String,
}

#[derive(Deserialize)]
pub struct SubmitIdRequest {
    pub session_token: String,
    /// The whole number at once; when absent the entered groups are submitted.
    #[serde(default)]
    pub id_number: Option<String>,
}

#[derive(Deserialize)]
pub struct ChooseMethodRequest {
    pub session_token: String,
    pub method: VerificationMethod,
}

#[derive(Deserialize)]
pub struct SelectModalityRequest {
    pub session_token: String,
    pub modality: BiometricModality,
}

#[derive(Deserialize)]
pub struct OtpDigitRequest {
    pub session_token: String,
    pub index: usize,
    pub digit: String,
}

#[derive(Deserialize)]
pub struct OtpBackspaceRequest {
    pub session_token: String,
    pub index: usize,
}

#[derive(Deserialize)]
pub struct OtpPasteRequest {
    pub session_token: String,
    pub text: String,
}
