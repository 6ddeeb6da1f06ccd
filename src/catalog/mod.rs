mod http;
mod memory;

pub use self::{http::HttpHospitalApi, memory::MemoryHospitalApi};

use async_trait::async_trait;

use crate::models::{
    catalog::{Doctor, Specialization, Symptom},
    tokens::{CreateTokenRequest, TokenReceipt},
};

/// The hospital backend the kiosk talks to.
#[async_trait]
pub trait HospitalApi: Send + Sync {
    async fn get_all_symptoms(&self) -> anyhow::Result<Vec<Symptom>>;

    async fn get_specializations_by_symptoms(
        &self,
        query: &str,
    ) -> anyhow::Result<Vec<Specialization>>;

    async fn get_doctors_by_specialty(&self, specialization_id: &str)
        -> anyhow::Result<Vec<Doctor>>;

    async fn create_queue_token(&self, request: &CreateTokenRequest)
        -> anyhow::Result<TokenReceipt>;
}
