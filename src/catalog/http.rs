use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use super::HospitalApi;
use crate::models::{
    catalog::{Doctor, Specialization, Symptom},
    tokens::{CreateTokenRequest, TokenReceipt},
};

/// REST client for the hospital backend.
pub struct HttpHospitalApi {
    http: Client,
    base_url: String,
}

impl HttpHospitalApi {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, path: &str, request: RequestBuilder) -> anyhow::Result<T> {
        let response = request
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", path))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Hospital API error {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            ));
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", path))
    }
}

#[async_trait]
impl HospitalApi for HttpHospitalApi {
    async fn get_all_symptoms(&self) -> anyhow::Result<Vec<Symptom>> {
        let path = "/symptoms";
        self.send(path, self.http.get(self.url(path))).await
    }

    async fn get_specializations_by_symptoms(
        &self,
        query: &str,
    ) -> anyhow::Result<Vec<Specialization>> {
        let path = "/specializations/by-symptoms";
        let request = self.http.get(self.url(path)).query(&[("symptoms", query)]);
        self.send(path, request).await
    }

    async fn get_doctors_by_specialty(
        &self,
        specialization_id: &str,
    ) -> anyhow::Result<Vec<Doctor>> {
        let path = format!("/doctors/specialization/{}", specialization_id);
        self.send(&path, self.http.get(self.url(&path))).await
    }

    async fn create_queue_token(
        &self,
        request: &CreateTokenRequest,
    ) -> anyhow::Result<TokenReceipt> {
        let path = "/queue-tokens";
        self.send(path, self.http.post(self.url(path)).json(request))
            .await
    }
}
