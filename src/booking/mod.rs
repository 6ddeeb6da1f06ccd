mod requests;
mod responses;
mod utils;

use actix_web::{post, web, HttpResponse, Responder};
use chrono::Utc;

use self::{
    requests::*,
    responses::*,
    utils::{fallback_token_number, record_token, today},
};
use crate::{protocol::StepResponse, AppState};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(view)
        .service(type_symptoms)
        .service(pick_suggestion)
        .service(submit_symptoms)
        .service(choose_specialization)
        .service(select_doctor)
        .service(select_date)
        .service(page_slots)
        .service(select_slot)
        .service(set_options)
        .service(generate_token)
        .service(back)
        .service(reset);
}

crate::post_funcs! {
    (view, "/view", SessionRequest, StepResponse),
    (type_symptoms, "/type_symptoms", TypeSymptomsRequest, StepResponse),
    (pick_suggestion, "/pick_suggestion", PickSuggestionRequest, StepResponse),
    (submit_symptoms, "/submit_symptoms", SessionRequest, StepResponse),
    (choose_specialization, "/choose_specialization", ChooseSpecializationRequest, StepResponse),
    (select_doctor, "/select_doctor", SelectDoctorRequest, StepResponse),
    (select_date, "/select_date", SelectDateRequest, StepResponse),
    (page_slots, "/page_slots", PageSlotsRequest, StepResponse),
    (select_slot, "/select_slot", SelectSlotRequest, StepResponse),
    (set_options, "/set_options", SetOptionsRequest, StepResponse),
    (generate_token, "/generate_token", SessionRequest, TokenResponse),
    (back, "/back", SessionRequest, StepResponse),
    (reset, "/reset", SessionRequest, StepResponse),
}

async fn view_impl(
    state: web::Data<AppState>,
    info: web::Json<SessionRequest>,
) -> anyhow::Result<StepResponse> {
    state
        .sessions
        .with_flow(&info.session_token, Utc::now(), |flow| StepResponse::of(flow))
}

async fn type_symptoms_impl(
    state: web::Data<AppState>,
    info: web::Json<TypeSymptomsRequest>,
) -> anyhow::Result<StepResponse> {
    let info = info.into_inner();
    state.sessions.with_flow(&info.session_token, Utc::now(), |flow| {
        flow.type_symptoms(&info.text)?;
        StepResponse::of(flow)
    })
}

async fn pick_suggestion_impl(
    state: web::Data<AppState>,
    info: web::Json<PickSuggestionRequest>,
) -> anyhow::Result<StepResponse> {
    let info = info.into_inner();
    state.sessions.with_flow(&info.session_token, Utc::now(), |flow| {
        flow.pick_suggestion(info.index)?;
        StepResponse::of(flow)
    })
}

async fn submit_symptoms_impl(
    state: web::Data<AppState>,
    info: web::Json<SessionRequest>,
) -> anyhow::Result<StepResponse> {
    let info = info.into_inner();
    let ticket = state
        .sessions
        .with_flow(&info.session_token, Utc::now(), |flow| Ok(flow.submit_symptoms()?))?;

    let result = state.api.get_specializations_by_symptoms(&ticket.query).await;

    state.sessions.with_flow(&info.session_token, Utc::now(), |flow| {
        flow.apply_specializations(&ticket, result);
        StepResponse::of(flow)
    })
}

async fn choose_specialization_impl(
    state: web::Data<AppState>,
    info: web::Json<ChooseSpecializationRequest>,
) -> anyhow::Result<StepResponse> {
    let info = info.into_inner();
    let ticket = state.sessions.with_flow(&info.session_token, Utc::now(), |flow| {
        Ok(flow.choose_specialization(&info.specialization_id)?)
    })?;

    let result = state.api.get_doctors_by_specialty(&ticket.query).await;

    state.sessions.with_flow(&info.session_token, Utc::now(), |flow| {
        flow.apply_doctors(&ticket, result);
        StepResponse::of(flow)
    })
}

async fn select_doctor_impl(
    state: web::Data<AppState>,
    info: web::Json<SelectDoctorRequest>,
) -> anyhow::Result<StepResponse> {
    let info = info.into_inner();
    state.sessions.with_flow(&info.session_token, Utc::now(), |flow| {
        flow.select_doctor(&info.doctor_id, today())?;
        StepResponse::of(flow)
    })
}

async fn select_date_impl(
    state: web::Data<AppState>,
    info: web::Json<SelectDateRequest>,
) -> anyhow::Result<StepResponse> {
    let info = info.into_inner();
    state.sessions.with_flow(&info.session_token, Utc::now(), |flow| {
        flow.select_date(info.date, today())?;
        StepResponse::of(flow)
    })
}

async fn page_slots_impl(
    state: web::Data<AppState>,
    info: web::Json<PageSlotsRequest>,
) -> anyhow::Result<StepResponse> {
    let info = info.into_inner();
    state.sessions.with_flow(&info.session_token, Utc::now(), |flow| {
        match info.direction {
            PageDirection::Next => flow.next_page()?,
            PageDirection::Prev => flow.prev_page()?,
        };
        StepResponse::of(flow)
    })
}

async fn select_slot_impl(
    state: web::Data<AppState>,
    info: web::Json<SelectSlotRequest>,
) -> anyhow::Result<StepResponse> {
    let info = info.into_inner();
    state.sessions.with_flow(&info.session_token, Utc::now(), |flow| {
        flow.select_slot(info.index)?;
        StepResponse::of(flow)
    })
}

async fn set_options_impl(
    state: web::Data<AppState>,
    info: web::Json<SetOptionsRequest>,
) -> anyhow::Result<StepResponse> {
    let info = info.into_inner();
    state.sessions.with_flow(&info.session_token, Utc::now(), |flow| {
        if let Some(consultation) = info.consultation {
            flow.set_consultation(consultation)?;
        }
        if let Some(priority) = info.priority {
            flow.set_priority(priority)?;
        }
        StepResponse::of(flow)
    })
}

async fn generate_token_impl(
    state: web::Data<AppState>,
    info: web::Json<SessionRequest>,
) -> anyhow::Result<TokenResponse> {
    let info = info.into_inner();
    let request = state
        .sessions
        .with_flow(&info.session_token, Utc::now(), |flow| Ok(flow.begin_token()?))?;

    let result = state.api.create_queue_token(&request).await;
    let fallback = match &result {
        Ok(receipt) if receipt.token_number.is_none() => {
            Some(fallback_token_number(state.clone()).await)
        }
        _ => None,
    };

    let (token, snapshot) = state.sessions.with_flow(&info.session_token, Utc::now(), |flow| {
        let token = flow.finish_token(result, || fallback.unwrap_or_else(|| "T001".to_string()))?;
        Ok((token, StepResponse::of(flow)?))
    })?;

    if let Err(err) = record_token(state.clone(), token.clone()).await {
        tracing::error!(token = %token.token_number, "failed to record token: {:#}", err);
    }

    Ok(TokenResponse {
        success: true,
        err: "".to_string(),
        step: snapshot.step,
        token: Some(token),
        view: snapshot.view,
    })
}

async fn back_impl(
    state: web::Data<AppState>,
    info: web::Json<SessionRequest>,
) -> anyhow::Result<StepResponse> {
    let info = info.into_inner();
    state.sessions.with_flow(&info.session_token, Utc::now(), |flow| {
        flow.back()?;
        StepResponse::of(flow)
    })
}

async fn reset_impl(
    state: web::Data<AppState>,
    info: web::Json<SessionRequest>,
) -> anyhow::Result<StepResponse> {
    let info = info.into_inner();
    state.sessions.with_flow(&info.session_token, Utc::now(), |flow| {
        flow.reset();
        StepResponse::of(flow)
    })
}
