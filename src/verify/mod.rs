mod requests;
mod responses;
mod utils;

use actix_web::{post, web, HttpResponse, Responder};
use chrono::Utc;

use self::{
    requests::*,
    responses::*,
    utils::{admit_patient, verify_response},
};
use crate::{models::identity::VerifiedIdentity, AppState};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(set_group)
        .service(submit_id)
        .service(choose_method)
        .service(cancel)
        .service(select_modality)
        .service(start_scan)
        .service(poll_scan)
        .service(otp_digit)
        .service(otp_backspace)
        .service(otp_paste)
        .service(otp_resend);
}

crate::post_funcs! {
    (set_group, "/set_group", SetGroupRequest, VerifyResponse),
    (submit_id, "/submit_id", SubmitIdRequest, VerifyResponse),
    (choose_method, "/choose_method", ChooseMethodRequest, VerifyResponse),
    (cancel, "/cancel", SessionRequest, VerifyResponse),
    (select_modality, "/select_modality", SelectModalityRequest, VerifyResponse),
    (start_scan, "/start_scan", SessionRequest, VerifyResponse),
    (poll_scan, "/poll_scan", SessionRequest, ScanResponse),
    (otp_digit, "/otp_digit", OtpDigitRequest, VerifyResponse),
    (otp_backspace, "/otp_backspace", OtpBackspaceRequest, VerifyResponse),
    (otp_paste, "/otp_paste", OtpPasteRequest, VerifyResponse),
    (otp_resend, "/otp_resend", SessionRequest, VerifyResponse),
}

async fn set_group_impl(
    state: web::Data<AppState>,
    info: web::Json<SetGroupRequest>,
) -> anyhow::Result<VerifyResponse> {
    let info = info.into_inner();
    let now = Utc::now();
    state.sessions.with_flow(&info.session_token, now, |flow| {
        flow.verification_mut()?.set_group(info.index, &info.text)?;
        verify_response(flow, now, None)
    })
}

async fn submit_id_impl(
    state: web::Data<AppState>,
    info: web::Json<SubmitIdRequest>,
) -> anyhow::Result<VerifyResponse> {
    let info = info.into_inner();
    let now = Utc::now();
    state.sessions.with_flow(&info.session_token, now, |flow| {
        let verification = flow.verification_mut()?;
        match &info.id_number {
            Some(raw) => verification.submit_number(raw)?,
            None => verification.submit_id()?,
        }
        verify_response(flow, now, None)
    })
}

async fn choose_method_impl(
    state: web::Data<AppState>,
    info: web::Json<ChooseMethodRequest>,
) -> anyhow::Result<VerifyResponse> {
    let info = info.into_inner();
    let now = Utc::now();
    state.sessions.with_flow(&info.session_token, now, |flow| {
        flow.verification_mut()?.choose_method(info.method, now)?;
        verify_response(flow, now, None)
    })
}

async fn cancel_impl(
    state: web::Data<AppState>,
    info: web::Json<SessionRequest>,
) -> anyhow::Result<VerifyResponse> {
    let info = info.into_inner();
    let now = Utc::now();
    state.sessions.with_flow(&info.session_token, now, |flow| {
        flow.verification_mut()?.cancel()?;
        verify_response(flow, now, None)
    })
}

async fn select_modality_impl(
    state: web::Data<AppState>,
    info: web::Json<SelectModalityRequest>,
) -> anyhow::Result<VerifyResponse> {
    let info = info.into_inner();
    let now = Utc::now();
    state.sessions.with_flow(&info.session_token, now, |flow| {
        flow.verification_mut()?.select_modality(info.modality)?;
        verify_response(flow, now, None)
    })
}

async fn start_scan_impl(
    state: web::Data<AppState>,
    info: web::Json<SessionRequest>,
) -> anyhow::Result<VerifyResponse> {
    let info = info.into_inner();
    let now = Utc::now();
    state.sessions.with_flow(&info.session_token, now, |flow| {
        flow.verification_mut()?.start_scan(now)?;
        verify_response(flow, now, None)
    })
}

async fn poll_scan_impl(
    state: web::Data<AppState>,
    info: web::Json<SessionRequest>,
) -> anyhow::Result<ScanResponse> {
    let info = info.into_inner();
    let (tick, identity) = state
        .sessions
        .with_flow(&info.session_token, Utc::now(), |flow| {
            Ok(flow.verification_mut()?.poll_scan(Utc::now())?)
        })?;

    if let Some(identity) = &identity {
        admit_patient(&state, &info.session_token, identity.clone()).await?;
    }

    Ok(ScanResponse {
        success: true,
        err: "".to_string(),
        progress: tick.progress,
        status: Some(tick.status),
        identity,
    })
}

async fn otp_digit_impl(
    state: web::Data<AppState>,
    info: web::Json<OtpDigitRequest>,
) -> anyhow::Result<VerifyResponse> {
    let info = info.into_inner();
    let now = Utc::now();
    let identity = state.sessions.with_flow(&info.session_token, now, |flow| {
        Ok(flow.verification_mut()?.otp_digit(info.index, &info.digit, now)?)
    })?;
    finish_otp(&state, &info.session_token, identity).await
}

async fn otp_backspace_impl(
    state: web::Data<AppState>,
    info: web::Json<OtpBackspaceRequest>,
) -> anyhow::Result<VerifyResponse> {
    let info = info.into_inner();
    let now = Utc::now();
    state.sessions.with_flow(&info.session_token, now, |flow| {
        flow.verification_mut()?.otp_backspace(info.index)?;
        verify_response(flow, now, None)
    })
}

async fn otp_paste_impl(
    state: web::Data<AppState>,
    info: web::Json<OtpPasteRequest>,
) -> anyhow::Result<VerifyResponse> {
    let info = info.into_inner();
    let now = Utc::now();
    let identity = state.sessions.with_flow(&info.session_token, now, |flow| {
        Ok(flow.verification_mut()?.otp_paste(&info.text, now)?)
    })?;
    finish_otp(&state, &info.session_token, identity).await
}

async fn otp_resend_impl(
    state: web::Data<AppState>,
    info: web::Json<SessionRequest>,
) -> anyhow::Result<VerifyResponse> {
    let info = info.into_inner();
    let now = Utc::now();
    state.sessions.with_flow(&info.session_token, now, |flow| {
        flow.verification_mut()?.otp_resend(now)?;
        verify_response(flow, now, None)
    })
}

async fn finish_otp(
    state: &AppState,
    token: &str,
    identity: Option<VerifiedIdentity>,
) -> anyhow::Result<VerifyResponse> {
    if let Some(identity) = &identity {
        admit_patient(state, token, identity.clone()).await?;
    }
    let now = Utc::now();
    state
        .sessions
        .with_flow(token, now, |flow| verify_response(flow, now, identity))
}
