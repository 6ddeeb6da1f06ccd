use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FlowError;

pub const ID_NUMBER_LEN: usize = 12;

/// A clean 12-digit identity number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IdNumber(String);

impl IdNumber {
    /// Strips every non-digit character and checks that exactly 12 digits remain.
    pub fn parse<S: AsRef<str>>(raw: S) -> Result<Self, FlowError> {
        let digits = crate::utils::strip_non_digits(raw.as_ref());
        if digits.len() != ID_NUMBER_LEN {
            return Err(FlowError::InvalidIdLength {
                found: digits.len(),
            });
        }
        Ok(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `XXXX-XXXX-9012`, safe for logs and receipts.
    pub fn masked(&self) -> String {
        format!("XXXX-XXXX-{}", &self.0[8..])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationMethod {
    Biometric,
    Otp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiometricModality {
    Fingerprint,
    Iris,
}

/// Method recorded on a verified identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VerifiedVia {
    Fingerprint,
    #[serde(rename = "OTP")]
    Otp,
}

impl VerifiedVia {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerifiedVia::Fingerprint => "Fingerprint",
            VerifiedVia::Otp => "OTP",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedIdentity {
    /// Client-side placeholder; the backend assigns the real patient id.
    pub id: u64,
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub address: String,
    pub photo_url: String,
    pub phone_number: String,
    pub id_number: IdNumber,
    pub verification_method: VerifiedVia,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub biometric_modality: Option<BiometricModality>,
    pub verified_at: DateTime<Utc>,
}

/// Display attributes returned by the identity provider.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityProfile {
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub address: String,
    pub photo_url: String,
    pub phone_number: String,
}

impl IdentityProfile {
    /// Stand-in profile until a real identity provider is wired in.
    pub fn mock() -> Self {
        Self {
            name: "Rahul Sharma".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 5, 15).unwrap_or(NaiveDate::MIN),
            gender: "Male".to_string(),
            address: "123, MG Road, Bangalore, Karnataka - 560001".to_string(),
            photo_url: "/images/avatar-placeholder.png".to_string(),
            phone_number: "9876543210".to_string(),
        }
    }
}

impl VerifiedIdentity {
    pub fn assemble(
        id_number: IdNumber,
        via: VerifiedVia,
        modality: Option<BiometricModality>,
        profile: IdentityProfile,
        verified_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: verified_at.timestamp_millis().max(0) as u64,
            name: profile.name,
            date_of_birth: profile.date_of_birth,
            gender: profile.gender,
            address: profile.address,
            photo_url: profile.photo_url,
            phone_number: profile.phone_number,
            id_number,
            verification_method: via,
            biometric_modality: modality,
            verified_at,
        }
    }
}
