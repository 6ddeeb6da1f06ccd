use actix_web::web;
use anyhow::{anyhow, Context};
use chrono::{Local, NaiveDate};

use crate::{models::tokens::QueueToken, AppState};

/// Appointments are same-day, on the kiosk's local calendar.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Local token number for when the backend confirms without one.
pub async fn fallback_token_number(state: web::Data<AppState>) -> String {
    let next = web::block(move || {
        let ledger = state.ledger.lock().map_err(|_| anyhow!("Token ledger poisoned"))?;
        ledger.next_token_number()
    })
    .await
    .context("Token ledger worker failed");

    match next {
        Ok(Ok(number)) => number,
        Ok(Err(err)) | Err(err) => {
            tracing::warn!("token ledger unavailable: {:#}", err);
            "T001".to_string()
        }
    }
}

pub async fn record_token(state: web::Data<AppState>, token: QueueToken) -> anyhow::Result<()> {
    web::block(move || {
        let ledger = state.ledger.lock().map_err(|_| anyhow!("Token ledger poisoned"))?;
        ledger.record(&token)?;
        tracing::debug!(token = %token.token_number, path = %ledger.path().display(), "token recorded");
        Ok::<_, anyhow::Error>(())
    })
    .await
    .context("Token ledger worker failed")?
}
