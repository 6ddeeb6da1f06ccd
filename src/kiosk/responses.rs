use serde::Serialize;

#[derive(Default, Serialize)]
pub struct StartResponse {
    pub success: bool,
    pub err: String,
    pub session_token: String,
    pub step: u8,
    pub view: serde_json::Value,
}

crate::impl_err_response! {
    StartResponse,
}
