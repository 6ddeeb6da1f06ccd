use anyhow::Context;
use chrono::{DateTime, Utc};

use super::responses::VerifyResponse;
use crate::{
    flow::{
        booking::{BookingFlow, BookingState},
        verification::VerificationState,
    },
    models::identity::VerifiedIdentity,
    AppState,
};

pub fn verify_response(
    flow: &BookingFlow,
    now: DateTime<Utc>,
    identity: Option<VerifiedIdentity>,
) -> anyhow::Result<VerifyResponse> {
    let challenge = match flow.state() {
        BookingState::Verify(verification) => match verification.state() {
            VerificationState::Otp { challenge, .. } => Some(challenge),
            _ => None,
        },
        _ => None,
    };

    Ok(VerifyResponse {
        success: true,
        err: "".to_string(),
        step: flow.step().number(),
        view: serde_json::to_value(flow.view()).context("Failed to encode the flow")?,
        identity,
        otp_remaining_secs: challenge.map(|c| c.remaining_secs(now)),
        can_resend: challenge.map_or(false, |c| c.can_resend(now)),
    })
}

/// Hands a freshly verified patient to the booking flow and loads the symptom
/// catalog for suggestions. A failed catalog fetch only leaves suggestions empty.
pub async fn admit_patient(
    state: &AppState,
    token: &str,
    identity: VerifiedIdentity,
) -> anyhow::Result<()> {
    let ticket = state.sessions.with_flow(token, Utc::now(), |flow| {
        flow.patient_verified(identity)?;
        Ok(flow.begin_symptom_catalog())
    })?;

    let symptoms = state.api.get_all_symptoms().await;

    state.sessions.with_flow(token, Utc::now(), |flow| {
        flow.apply_symptom_catalog(&ticket, symptoms);
        Ok(())
    })
}
