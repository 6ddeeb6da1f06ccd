use serde::Serialize;

use crate::{flow::biometric::ScanStatus, models::identity::VerifiedIdentity};

#[derive(Default, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub err: String,
    pub step: u8,
    pub view: serde_json::Value,
    /// Set on the one response that completed verification.
    pub identity: Option<VerifiedIdentity>,
    pub otp_remaining_secs: Option<i64>,
    pub can_resend: bool,
}

#[derive(Default, Serialize)]
pub struct ScanResponse {
    pub success: bool,
    pub err: String,
    pub progress: u8,
    pub status: Option<ScanStatus>,
    pub identity: Option<VerifiedIdentity>,
}

crate::impl_err_response! {
    VerifyResponse,
    ScanResponse,
}
