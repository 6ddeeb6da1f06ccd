use serde::Serialize;

use crate::models::tokens::QueueToken;

#[derive(Default, Serialize)]
pub struct TokenResponse {
    pub success: bool,
    pub err: String,
    pub step: u8,
    pub token: Option<QueueToken>,
    pub view: serde_json::Value,
}

crate::impl_err_response! {
    TokenResponse,
}
