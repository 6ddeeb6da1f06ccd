use std::sync::{
    atomic::{AtomicBool, AtomicU32, Ordering},
    Mutex,
};

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};

use super::HospitalApi;
use crate::models::{
    catalog::{DayAvailability, Doctor, RecordId, Specialization, Symptom},
    tokens::{CreateTokenRequest, TokenReceipt, TokenStatus},
};

struct SpecializationEntry {
    specialization: Specialization,
    keywords: Vec<&'static str>,
}

/// In-process stand-in for the hospital backend, used when no backend URL is
/// configured and by the tests.
pub struct MemoryHospitalApi {
    symptoms: Vec<Symptom>,
    specializations: Vec<SpecializationEntry>,
    doctors: Vec<Doctor>,
    created: Mutex<Vec<CreateTokenRequest>>,
    next_token: AtomicU32,
    issue_numbers: AtomicBool,
    fail_tokens: AtomicBool,
}

fn symptom(id: u32, name: &str) -> Symptom {
    Symptom {
        id: RecordId::new(id),
        name: name.to_string(),
    }
}

fn specialization(id: u32, name: &str, keywords: Vec<&'static str>) -> SpecializationEntry {
    SpecializationEntry {
        specialization: Specialization {
            id: RecordId::new(id),
            name: name.to_string(),
        },
        keywords,
    }
}

fn doctor(id: u32, name: &str, entry: &SpecializationEntry, days: Vec<DayAvailability>) -> Doctor {
    Doctor {
        id: RecordId::new(id),
        name: name.to_string(),
        specialization: Some(entry.specialization.name.clone()),
        department_id: Some(entry.specialization.id.clone()),
        fees: Some(500.0),
        experience: Some(8 + id % 10),
        availability: days,
        booked_slots: Vec::new(),
    }
}

fn quarter_hours(first_id: u32, count: u32) -> Vec<Value> {
    (0..count)
        .map(|i| {
            let minutes = 9 * 60 + i * 15;
            json!({
                "slotId": first_id + i,
                "time": format!("{:02}:{:02}", minutes / 60, minutes % 60),
            })
        })
        .collect()
}

impl MemoryHospitalApi {
    /// A small catalog with availability on `today` and the day after.
    pub fn demo(today: NaiveDate) -> Self {
        let cardiology = specialization(1, "Cardiology", vec!["chest", "heart", "palpitation"]);
        let neurology = specialization(2, "Neurology", vec!["headache", "dizziness", "numbness"]);
        let general = specialization(3, "General Medicine", vec!["fever", "cough", "cold", "fatigue"]);
        let tomorrow = today.succ_opt().unwrap_or(today);

        let doctors = vec![
            doctor(
                11,
                "Dr. Ananya Mehta",
                &cardiology,
                vec![
                    DayAvailability {
                        date: today,
                        times: quarter_hours(1100, 16),
                        booked_slots: vec![json!({"slotId": 1101, "time": "09:15"})],
                    },
                    DayAvailability {
                        date: tomorrow,
                        times: quarter_hours(1200, 8),
                        booked_slots: Vec::new(),
                    },
                ],
            ),
            doctor(
                21,
                "Dr. Vikram Rao",
                &neurology,
                vec![DayAvailability {
                    date: today,
                    times: vec![json!("10:00"), json!({"slotId": 2101, "time": "10:30"})],
                    booked_slots: Vec::new(),
                }],
            ),
            doctor(
                31,
                "Dr. Priya Nair",
                &general,
                vec![DayAvailability {
                    date: today,
                    times: quarter_hours(3100, 30),
                    booked_slots: vec![json!({"slotId": 3100})],
                }],
            ),
        ];

        Self {
            symptoms: vec![
                symptom(1, "Chest pain"),
                symptom(2, "Palpitations"),
                symptom(3, "Headache"),
                symptom(4, "Dizziness"),
                symptom(5, "Fever"),
                symptom(6, "Cough"),
                symptom(7, "Fatigue"),
            ],
            specializations: vec![cardiology, neurology, general],
            doctors,
            created: Mutex::new(Vec::new()),
            next_token: AtomicU32::new(1),
            issue_numbers: AtomicBool::new(true),
            fail_tokens: AtomicBool::new(false),
        }
    }

    /// Makes the backend stop handing out token numbers.
    pub fn without_token_numbers(self) -> Self {
        self.issue_numbers.store(false, Ordering::SeqCst);
        self
    }

    pub fn set_fail_tokens(&self, fail: bool) {
        self.fail_tokens.store(fail, Ordering::SeqCst);
    }

    pub fn set_next_token(&self, number: u32) {
        self.next_token.store(number, Ordering::SeqCst);
    }

    pub fn created_tokens(&self) -> Vec<CreateTokenRequest> {
        self.created
            .lock()
            .map(|created| created.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl HospitalApi for MemoryHospitalApi {
    async fn get_all_symptoms(&self) -> anyhow::Result<Vec<Symptom>> {
        Ok(self.symptoms.clone())
    }

    async fn get_specializations_by_symptoms(
        &self,
        query: &str,
    ) -> anyhow::Result<Vec<Specialization>> {
        let query = query.to_lowercase();
        Ok(self
            .specializations
            .iter()
            .filter(|entry| entry.keywords.iter().any(|k| query.contains(k)))
            .map(|entry| entry.specialization.clone())
            .collect())
    }

    async fn get_doctors_by_specialty(
        &self,
        specialization_id: &str,
    ) -> anyhow::Result<Vec<Doctor>> {
        Ok(self
            .doctors
            .iter()
            .filter(|d| {
                d.department_id
                    .as_ref()
                    .map_or(false, |id| id.as_str() == specialization_id)
            })
            .cloned()
            .collect())
    }

    async fn create_queue_token(
        &self,
        request: &CreateTokenRequest,
    ) -> anyhow::Result<TokenReceipt> {
        if self.fail_tokens.load(Ordering::SeqCst) {
            bail!("Hospital API error 503 Service Unavailable");
        }
        let known = self.doctors.iter().any(|d| d.id == request.doctor_id);
        if !known {
            return Err(anyhow!("No such doctor: {}", request.doctor_id));
        }
        self.created
            .lock()
            .map_err(|_| anyhow!("token log poisoned"))?
            .push(request.clone());

        let token_number = if self.issue_numbers.load(Ordering::SeqCst) {
            let n = self.next_token.fetch_add(1, Ordering::SeqCst);
            Some(RecordId::new(format!("T{:03}", n)))
        } else {
            None
        };
        Ok(TokenReceipt {
            token_number,
            status: Some(TokenStatus::Waiting),
            estimated_wait_time: Some(request.estimated_wait_time),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[actix_web::test]
    async fn specializations_match_keywords() {
        let api = MemoryHospitalApi::demo(today());
        let found = api.get_specializations_by_symptoms("Chest pain").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Cardiology");
        assert!(api
            .get_specializations_by_symptoms("itchy elbow")
            .await
            .unwrap()
            .is_empty());
    }

    #[actix_web::test]
    async fn doctors_filter_by_specialization() {
        let api = MemoryHospitalApi::demo(today());
        let doctors = api.get_doctors_by_specialty("2").await.unwrap();
        assert_eq!(doctors.len(), 1);
        assert_eq!(doctors[0].name, "Dr. Vikram Rao");
    }

    #[actix_web::test]
    async fn tokens_are_numbered_and_recorded() {
        let api = MemoryHospitalApi::demo(today());
        api.set_next_token(45);
        let request = CreateTokenRequest {
            patient_id: 1,
            department_id: RecordId::new(1),
            slot_id: RecordId::new(1100),
            doctor_id: RecordId::new(11),
            priority: "NORMAL".into(),
            reason_for_visit: "Chest pain".into(),
            estimated_wait_time: 30,
        };
        let receipt = api.create_queue_token(&request).await.unwrap();
        assert_eq!(receipt.token_number, Some(RecordId::new("T045")));
        assert_eq!(api.created_tokens(), vec![request.clone()]);

        api.set_fail_tokens(true);
        assert!(api.create_queue_token(&request).await.is_err());
    }
}
