mod requests;
mod responses;

use actix_web::{post, web, HttpResponse, Responder};
use chrono::Utc;

use self::{requests::*, responses::*};
use crate::{
    protocol::{SimpleResponse, StepResponse},
    AppState,
};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(start).service(end);
}

crate::post_funcs! {
    (start, "/start", StartRequest, StartResponse),
    (end, "/end", EndRequest, SimpleResponse),
}

async fn start_impl(
    state: web::Data<AppState>,
    _info: web::Json<StartRequest>,
) -> anyhow::Result<StartResponse> {
    let now = Utc::now();
    let session_token = state.sessions.create(now)?;
    let snapshot = state
        .sessions
        .with_flow(&session_token, now, |flow| StepResponse::of(flow))?;

    Ok(StartResponse {
        success: true,
        err: "".to_string(),
        session_token,
        step: snapshot.step,
        view: snapshot.view,
    })
}

async fn end_impl(
    state: web::Data<AppState>,
    info: web::Json<EndRequest>,
) -> anyhow::Result<SimpleResponse> {
    state.sessions.end(&info.session_token)?;
    tracing::info!(active = state.sessions.len(), "kiosk session ended");
    Ok(SimpleResponse::ok())
}
