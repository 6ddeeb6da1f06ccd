mod booking;
mod catalog;
mod config;
mod error;
mod flow;
mod kiosk;
mod ledger;
mod models;
mod protocol;
mod session;
mod utils;
mod verify;

use std::sync::{Arc, Mutex};

use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::{
    catalog::{HospitalApi, HttpHospitalApi, MemoryHospitalApi},
    config::Config,
    ledger::TokenLedger,
    session::SessionStore,
};

pub struct AppState {
    pub api: Arc<dyn HospitalApi>,
    pub sessions: SessionStore,
    pub ledger: Mutex<TokenLedger>,
}

impl AppState {
    pub fn new(config: &Config, api: Arc<dyn HospitalApi>) -> Self {
        Self {
            api,
            sessions: SessionStore::new(config.otp.clone(), config.session_ttl_secs),
            ledger: Mutex::new(TokenLedger::new(&config.ledger_path)),
        }
    }
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg
        // session lifecycle
        .service(web::scope("/kiosk").configure(kiosk::config))
        // identity verification
        .service(web::scope("/verify").configure(verify::config))
        // symptoms, doctor, slot and token
        .service(web::scope("/booking").configure(booking::config));
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    if config.otp.accept_any_complete {
        tracing::warn!("OTP_ACCEPT_ANY is set: any 6-digit code will verify");
    }

    let api: Arc<dyn HospitalApi> = match &config.hospital_api_url {
        Some(url) => {
            tracing::info!(url = %url, "using hospital backend");
            Arc::new(HttpHospitalApi::new(url, config.api_timeout)?)
        }
        None => {
            tracing::warn!("HOSPITAL_API_URL not set, serving the demo catalog");
            Arc::new(MemoryHospitalApi::demo(chrono::Local::now().date_naive()))
        }
    };

    let state = web::Data::new(AppState::new(&config, api));
    tracing::info!(
        bind = %config.bind,
        ledger = %config.ledger_path.display(),
        "token desk starting"
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(routes)
    })
    .bind(&config.bind)
    .with_context(|| format!("Failed to bind {}", config.bind))?
    .run()
    .await
    .context("Server error")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::RecordId;
    use actix_web::test;
    use serde_json::{json, Value};

    macro_rules! post {
        ($app:expr, $uri:expr, $body:expr) => {{
            let req = test::TestRequest::post()
                .uri($uri)
                .set_json($body)
                .to_request();
            let resp: Value = test::call_and_read_body_json(&$app, req).await;
            resp
        }};
    }

    macro_rules! verified_session {
        ($app:expr) => {{
            let start = post!($app, "/kiosk/start", json!({}));
            let token = start["session_token"].as_str().unwrap().to_string();
            post!(
                $app,
                "/verify/submit_id",
                json!({"session_token": token, "id_number": "123456789012"})
            );
            post!(
                $app,
                "/verify/choose_method",
                json!({"session_token": token, "method": "otp"})
            );
            let resp = post!(
                $app,
                "/verify/otp_paste",
                json!({"session_token": token, "text": "123456"})
            );
            assert_eq!(resp["step"], 2, "{}", resp);
            token
        }};
    }

    fn state_with(api: Arc<MemoryHospitalApi>, ledger: &std::path::Path) -> web::Data<AppState> {
        let ledger = ledger.display().to_string();
        let config = Config::from_lookup(|name| match name {
            "TOKEN_LEDGER_PATH" => Some(ledger.clone()),
            _ => None,
        })
        .unwrap();
        web::Data::new(AppState::new(&config, api))
    }

    fn demo_api() -> Arc<MemoryHospitalApi> {
        Arc::new(MemoryHospitalApi::demo(chrono::Local::now().date_naive()))
    }

    #[actix_web::test]
    async fn otp_verification_reaches_symptoms() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(demo_api(), &dir.path().join("tokens.json"));
        let app = test::init_service(App::new().app_data(state.clone()).configure(routes)).await;

        let start = post!(app, "/kiosk/start", json!({}));
        assert_eq!(start["success"], true);
        assert_eq!(start["step"], 1);
        let token = start["session_token"].as_str().unwrap().to_string();

        let resp = post!(
            app,
            "/verify/submit_id",
            json!({"session_token": token, "id_number": "1234 5678"})
        );
        assert_eq!(resp["success"], false);
        assert_eq!(resp["err"], "Identity number must be 12 digits (got 8)");

        let resp = post!(
            app,
            "/verify/submit_id",
            json!({"session_token": token, "id_number": "1234 5678 9012"})
        );
        assert_eq!(resp["success"], true, "{}", resp);
        assert_eq!(resp["view"]["verification"]["state"], "method_choice");

        let resp = post!(
            app,
            "/verify/choose_method",
            json!({"session_token": token, "method": "otp"})
        );
        assert_eq!(resp["otp_remaining_secs"], 120);
        assert_eq!(resp["can_resend"], false);

        let resp = post!(app, "/verify/otp_resend", json!({"session_token": token}));
        assert_eq!(resp["success"], false);

        for (index, digit) in "12345".chars().enumerate() {
            let resp = post!(
                app,
                "/verify/otp_digit",
                json!({"session_token": token, "index": index, "digit": digit.to_string()})
            );
            assert_eq!(resp["success"], true, "{}", resp);
            assert!(resp["identity"].is_null());
        }
        let resp = post!(
            app,
            "/verify/otp_digit",
            json!({"session_token": token, "index": 5, "digit": "6"})
        );
        assert_eq!(resp["success"], true, "{}", resp);
        assert_eq!(resp["step"], 2);
        assert_eq!(resp["identity"]["name"], "Rahul Sharma");
        assert_eq!(resp["identity"]["verificationMethod"], "OTP");
        assert_eq!(resp["view"]["step"], "symptoms");

        let resp = post!(
            app,
            "/booking/type_symptoms",
            json!({"session_token": token, "text": "pain"})
        );
        assert_eq!(resp["view"]["stage"]["suggestions"][0]["name"], "Chest pain");
    }

    #[actix_web::test]
    async fn biometric_scan_cannot_be_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(demo_api(), &dir.path().join("tokens.json"));
        let app = test::init_service(App::new().app_data(state.clone()).configure(routes)).await;

        let start = post!(app, "/kiosk/start", json!({}));
        let token = start["session_token"].as_str().unwrap().to_string();
        post!(
            app,
            "/verify/submit_id",
            json!({"session_token": token, "id_number": "123456789012"})
        );
        post!(
            app,
            "/verify/choose_method",
            json!({"session_token": token, "method": "biometric"})
        );

        let resp = post!(app, "/verify/start_scan", json!({"session_token": token}));
        assert_eq!(resp["err"], "Please select a biometric modality");

        let resp = post!(
            app,
            "/verify/otp_paste",
            json!({"session_token": token, "text": "123456"})
        );
        assert!(resp["err"].as_str().unwrap().starts_with("Cannot enter the OTP"));

        let resp = post!(
            app,
            "/verify/select_modality",
            json!({"session_token": token, "modality": "fingerprint"})
        );
        assert_eq!(resp["view"]["verification"]["scan"]["modality"], "fingerprint");
        let resp = post!(app, "/verify/start_scan", json!({"session_token": token}));
        assert_eq!(resp["success"], true, "{}", resp);

        let resp = post!(app, "/verify/cancel", json!({"session_token": token}));
        assert_eq!(resp["err"], "Scanning is in progress and cannot be cancelled");

        let resp = post!(app, "/verify/poll_scan", json!({"session_token": token}));
        assert_eq!(resp["success"], true);
        assert_eq!(resp["status"], "scanning");
        assert!(resp["identity"].is_null());
    }

    #[actix_web::test]
    async fn unmatched_symptoms_stay_on_symptom_step() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(demo_api(), &dir.path().join("tokens.json"));
        let app = test::init_service(App::new().app_data(state.clone()).configure(routes)).await;
        let token = verified_session!(app);

        let resp = post!(app, "/booking/submit_symptoms", json!({"session_token": token}));
        assert_eq!(resp["err"], "Please enter your symptoms");

        post!(
            app,
            "/booking/type_symptoms",
            json!({"session_token": token, "text": "itchy elbow"})
        );
        let resp = post!(app, "/booking/submit_symptoms", json!({"session_token": token}));
        assert_eq!(resp["success"], true, "{}", resp);
        assert_eq!(resp["step"], 2);
        assert_eq!(
            resp["view"]["stage"]["notice"],
            crate::flow::booking::NO_SPECIALIZATIONS
        );

        let resp = post!(app, "/booking/back", json!({"session_token": token}));
        assert_eq!(resp["step"], 1);
    }

    #[actix_web::test]
    async fn token_is_generated_and_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let ledger_path = dir.path().join("tokens.json");
        let api = demo_api();
        api.set_next_token(45);
        let state = state_with(api.clone(), &ledger_path);
        let app = test::init_service(App::new().app_data(state.clone()).configure(routes)).await;
        let token = verified_session!(app);

        post!(
            app,
            "/booking/type_symptoms",
            json!({"session_token": token, "text": "chest pain"})
        );
        let resp = post!(app, "/booking/submit_symptoms", json!({"session_token": token}));
        assert_eq!(resp["view"]["stage"]["specializations"][0]["name"], "Cardiology");

        let resp = post!(
            app,
            "/booking/choose_specialization",
            json!({"session_token": token, "specialization_id": 1})
        );
        assert_eq!(resp["step"], 3, "{}", resp);
        assert_eq!(resp["view"]["panel"]["doctors"][0]["name"], "Dr. Ananya Mehta");

        let resp = post!(
            app,
            "/booking/select_doctor",
            json!({"session_token": token, "doctor_id": "11"})
        );
        assert_eq!(resp["view"]["panel"]["slots"][1]["isBooked"], true);
        assert_eq!(resp["view"]["can_generate"], false);

        let resp = post!(
            app,
            "/booking/select_slot",
            json!({"session_token": token, "index": 1})
        );
        assert_eq!(resp["err"], "Selected slot is already booked");

        post!(
            app,
            "/booking/select_slot",
            json!({"session_token": token, "index": 0})
        );
        let resp = post!(
            app,
            "/booking/set_options",
            json!({"session_token": token, "priority": "Emergency"})
        );
        assert_eq!(resp["view"]["estimated_wait_minutes"], 10);
        assert_eq!(resp["view"]["can_generate"], true);

        let resp = post!(app, "/booking/generate_token", json!({"session_token": token}));
        assert_eq!(resp["success"], true, "{}", resp);
        assert_eq!(resp["step"], 4);
        assert_eq!(resp["token"]["tokenNumber"], "T045");
        assert_eq!(resp["token"]["slotTime"], "9:00 AM");
        assert_eq!(resp["token"]["patientName"], "Rahul Sharma");
        assert_eq!(resp["token"]["priorityLevel"], "Emergency");
        assert_eq!(resp["token"]["reasonForVisit"], "chest pain");

        let sent = api.created_tokens();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].slot_id, RecordId::new(1100));
        assert_eq!(sent[0].priority, "EMERGENCY");

        let recorded = TokenLedger::new(&ledger_path).load().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].token_number, "T045");

        let resp = post!(app, "/booking/back", json!({"session_token": token}));
        assert_eq!(resp["step"], 3);
        assert_ne!(resp["view"]["panel"]["slots"][0]["slotId"], "1100");

        let resp = post!(app, "/booking/reset", json!({"session_token": token}));
        assert_eq!(resp["step"], 1);
    }

    #[actix_web::test]
    async fn failed_submission_can_be_retried() {
        let dir = tempfile::tempdir().unwrap();
        let ledger_path = dir.path().join("tokens.json");
        let api = Arc::new(
            MemoryHospitalApi::demo(chrono::Local::now().date_naive()).without_token_numbers(),
        );
        api.set_fail_tokens(true);
        let state = state_with(api.clone(), &ledger_path);
        let app = test::init_service(App::new().app_data(state.clone()).configure(routes)).await;
        let token = verified_session!(app);

        post!(
            app,
            "/booking/type_symptoms",
            json!({"session_token": token, "text": "fever"})
        );
        post!(app, "/booking/submit_symptoms", json!({"session_token": token}));
        post!(
            app,
            "/booking/choose_specialization",
            json!({"session_token": token, "specialization_id": "3"})
        );
        post!(
            app,
            "/booking/select_doctor",
            json!({"session_token": token, "doctor_id": 31})
        );
        let resp = post!(
            app,
            "/booking/page_slots",
            json!({"session_token": token, "direction": "next"})
        );
        assert_eq!(resp["view"]["panel"]["pager"]["page"], 1);
        assert_eq!(resp["view"]["page_slots"].as_array().unwrap().len(), 12);

        let resp = post!(
            app,
            "/booking/select_slot",
            json!({"session_token": token, "index": 12})
        );
        assert_eq!(resp["success"], true, "{}", resp);

        let resp = post!(app, "/booking/generate_token", json!({"session_token": token}));
        assert_eq!(resp["success"], false);
        assert!(resp["err"].as_str().unwrap().starts_with("Failed to generate token"));

        let resp = post!(app, "/booking/view", json!({"session_token": token}));
        assert_eq!(resp["step"], 3);
        assert_eq!(resp["view"]["can_generate"], true);

        api.set_fail_tokens(false);
        let resp = post!(app, "/booking/generate_token", json!({"session_token": token}));
        assert_eq!(resp["success"], true, "{}", resp);
        assert_eq!(resp["token"]["tokenNumber"], "T001");
        assert_eq!(resp["token"]["estimatedWaitMinutes"], 30);
    }

    #[actix_web::test]
    async fn fallback_numbers_continue_the_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let ledger_path = dir.path().join("tokens.json");
        let api = Arc::new(
            MemoryHospitalApi::demo(chrono::Local::now().date_naive()).without_token_numbers(),
        );
        let state = state_with(api, &ledger_path);
        let app = test::init_service(App::new().app_data(state.clone()).configure(routes)).await;

        let mut numbers = Vec::new();
        for index in [1, 2] {
            let token = verified_session!(app);
            post!(
                app,
                "/booking/type_symptoms",
                json!({"session_token": token, "text": "fever"})
            );
            post!(app, "/booking/submit_symptoms", json!({"session_token": token}));
            post!(
                app,
                "/booking/choose_specialization",
                json!({"session_token": token, "specialization_id": "3"})
            );
            post!(
                app,
                "/booking/select_doctor",
                json!({"session_token": token, "doctor_id": 31})
            );
            let resp = post!(
                app,
                "/booking/select_slot",
                json!({"session_token": token, "index": index})
            );
            assert_eq!(resp["success"], true, "{}", resp);

            let resp = post!(app, "/booking/generate_token", json!({"session_token": token}));
            assert_eq!(resp["success"], true, "{}", resp);
            numbers.push(resp["token"]["tokenNumber"].as_str().unwrap().to_string());
        }
        assert_eq!(numbers, vec!["T001", "T002"]);

        let recorded = TokenLedger::new(&ledger_path).load().unwrap();
        assert_eq!(recorded.len(), 2);
        assert_eq!(state.ledger.lock().unwrap().next_token_number().unwrap(), "T003");
    }

    #[actix_web::test]
    async fn unknown_and_ended_sessions_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(demo_api(), &dir.path().join("tokens.json"));
        let app = test::init_service(App::new().app_data(state.clone()).configure(routes)).await;

        let resp = post!(app, "/booking/view", json!({"session_token": "nope"}));
        assert_eq!(resp["success"], false);
        assert_eq!(resp["err"], "No such session");

        let start = post!(app, "/kiosk/start", json!({}));
        let token = start["session_token"].as_str().unwrap().to_string();
        let resp = post!(app, "/kiosk/end", json!({"session_token": token}));
        assert_eq!(resp["success"], true);
        let resp = post!(app, "/booking/view", json!({"session_token": token}));
        assert_eq!(resp["success"], false);

        let resp = post!(app, "/booking/back", json!({"session_token": "nope"}));
        assert_eq!(resp["step"], 0);
    }
}
