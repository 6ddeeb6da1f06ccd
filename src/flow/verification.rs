use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{
    biometric::{BiometricScan, ScanTick},
    identity::IdentityInput,
    otp::{OtpChallenge, OtpPolicy, OtpSubmission},
};
use crate::{
    error::FlowError,
    models::identity::{
        BiometricModality, IdNumber, IdentityProfile, VerificationMethod, VerifiedIdentity,
        VerifiedVia,
    },
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum VerificationState {
    Input(IdentityInput),
    MethodChoice {
        id_number: IdNumber,
    },
    Biometric {
        id_number: IdNumber,
        scan: BiometricScan,
    },
    Otp {
        id_number: IdNumber,
        challenge: OtpChallenge,
    },
    Verified(VerifiedIdentity),
}

impl VerificationState {
    pub fn name(&self) -> &'static str {
        match self {
            VerificationState::Input(_) => "entering the identity number",
            VerificationState::MethodChoice { .. } => "choosing a verification method",
            VerificationState::Biometric { .. } => "verifying biometrics",
            VerificationState::Otp { .. } => "verifying the OTP",
            VerificationState::Verified(_) => "verified",
        }
    }
}

/// `Input → MethodChoice → Biometric | Otp → Verified`.
///
/// Operations that complete verification return the [`VerifiedIdentity`] exactly
/// once, on the call that enters `Verified`.
#[derive(Debug, Clone)]
pub struct VerificationFlow {
    state: VerificationState,
    policy: OtpPolicy,
    profile: IdentityProfile,
}

impl VerificationFlow {
    pub fn new(policy: OtpPolicy) -> Self {
        Self {
            state: VerificationState::Input(IdentityInput::new()),
            policy,
            profile: IdentityProfile::mock(),
        }
    }

    pub fn state(&self) -> &VerificationState {
        &self.state
    }

    fn input_mut(&mut self, action: &'static str) -> Result<&mut IdentityInput, FlowError> {
        match &mut self.state {
            VerificationState::Input(input) => Ok(input),
            other => Err(FlowError::transition(action, other.name())),
        }
    }

    pub fn set_group(&mut self, index: usize, text: &str) -> Result<(), FlowError> {
        self.input_mut("edit the identity number")?.set_group(index, text)
    }

    pub fn submit_id(&mut self) -> Result<(), FlowError> {
        let id_number = self.input_mut("submit the identity number")?.submit()?;
        tracing::info!(id = %id_number.masked(), "identity number accepted");
        self.state = VerificationState::MethodChoice { id_number };
        Ok(())
    }

    /// Submits a whole number in one go, e.g. `1234 5678 9012`.
    pub fn submit_number(&mut self, raw: &str) -> Result<(), FlowError> {
        let input = self.input_mut("submit the identity number")?;
        input.fill(raw);
        if let Err(err) = IdNumber::parse(raw) {
            input.reject(&err);
            return Err(err);
        }
        self.submit_id()
    }

    pub fn choose_method(
        &mut self,
        method: VerificationMethod,
        now: DateTime<Utc>,
    ) -> Result<(), FlowError> {
        let id_number = match &self.state {
            VerificationState::MethodChoice { id_number } => id_number.clone(),
            other => return Err(FlowError::transition("choose a method", other.name())),
        };
        self.state = match method {
            VerificationMethod::Biometric => VerificationState::Biometric {
                id_number,
                scan: BiometricScan::new(),
            },
            VerificationMethod::Otp => {
                tracing::info!(id = %id_number.masked(), "OTP issued");
                VerificationState::Otp {
                    id_number,
                    challenge: OtpChallenge::issue(now),
                }
            }
        };
        Ok(())
    }

    /// Back to the identity input, keeping the entered digits.
    pub fn cancel(&mut self) -> Result<(), FlowError> {
        let id_number = match &self.state {
            VerificationState::Biometric { scan, .. } if !scan.can_cancel() => {
                return Err(FlowError::ScanInProgress)
            }
            VerificationState::MethodChoice { id_number }
            | VerificationState::Biometric { id_number, .. }
            | VerificationState::Otp { id_number, .. } => id_number.clone(),
            other => return Err(FlowError::transition("cancel", other.name())),
        };
        let mut input = IdentityInput::new();
        input.fill(id_number.as_str());
        self.state = VerificationState::Input(input);
        Ok(())
    }

    fn scan_mut(&mut self, action: &'static str) -> Result<&mut BiometricScan, FlowError> {
        match &mut self.state {
            VerificationState::Biometric { scan, .. } => Ok(scan),
            other => Err(FlowError::transition(action, other.name())),
        }
    }

    pub fn select_modality(&mut self, modality: BiometricModality) -> Result<(), FlowError> {
        self.scan_mut("select a modality")?.select_modality(modality)
    }

    pub fn start_scan(&mut self, now: DateTime<Utc>) -> Result<(), FlowError> {
        self.scan_mut("start a scan")?.start(now)
    }

    pub fn poll_scan(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<(ScanTick, Option<VerifiedIdentity>), FlowError> {
        let scan = self.scan_mut("poll the scan")?;
        let tick = scan.poll(now);
        if !tick.succeeded {
            return Ok((tick, None));
        }
        let modality = scan.modality();
        let identity = self.complete(VerifiedVia::Fingerprint, modality, now);
        Ok((tick, identity))
    }

    fn challenge_mut(&mut self, action: &'static str) -> Result<&mut OtpChallenge, FlowError> {
        match &mut self.state {
            VerificationState::Otp { challenge, .. } => Ok(challenge),
            other => Err(FlowError::transition(action, other.name())),
        }
    }

    fn verify_submission(
        &mut self,
        submission: Option<OtpSubmission>,
        now: DateTime<Utc>,
    ) -> Result<Option<VerifiedIdentity>, FlowError> {
        if submission.is_none() {
            return Ok(None);
        }
        let policy = self.policy.clone();
        self.challenge_mut("verify the OTP")?.check(&policy)?;
        Ok(self.complete(VerifiedVia::Otp, None, now))
    }

    pub fn otp_digit(
        &mut self,
        index: usize,
        input: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<VerifiedIdentity>, FlowError> {
        let submission = self.challenge_mut("enter the OTP")?.enter_digit(index, input)?;
        self.verify_submission(submission, now)
    }

    pub fn otp_paste(
        &mut self,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<VerifiedIdentity>, FlowError> {
        let submission = self.challenge_mut("enter the OTP")?.paste(text);
        self.verify_submission(submission, now)
    }

    pub fn otp_backspace(&mut self, index: usize) -> Result<(), FlowError> {
        self.challenge_mut("edit the OTP")?.backspace(index)
    }

    pub fn otp_resend(&mut self, now: DateTime<Utc>) -> Result<(), FlowError> {
        self.challenge_mut("resend the OTP")?.resend(now)?;
        tracing::info!("OTP resent");
        Ok(())
    }

    fn complete(
        &mut self,
        via: VerifiedVia,
        modality: Option<BiometricModality>,
        now: DateTime<Utc>,
    ) -> Option<VerifiedIdentity> {
        let id_number = match &self.state {
            VerificationState::Biometric { id_number, .. }
            | VerificationState::Otp { id_number, .. } => id_number.clone(),
            _ => return None,
        };
        tracing::info!(id = %id_number.masked(), method = via.as_str(), "identity verified");
        let identity =
            VerifiedIdentity::assemble(id_number, via, modality, self.profile.clone(), now);
        self.state = VerificationState::Verified(identity.clone());
        Some(identity)
    }
}
