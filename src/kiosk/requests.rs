use serde::Deserialize;

#[derive(Deserialize)]
pub struct StartRequest {}

#[derive(Deserialize)]
pub struct EndRequest {
    pub session_token: String,
}
