use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::{error::FlowError, models::identity::BiometricModality};

pub const SCAN_STEP: u8 = 5;
pub const SCAN_INTERVAL_MS: i64 = 100;
/// How long the "verified" state is shown before the flow moves on.
pub const SUCCESS_DELAY_MS: i64 = 800;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Idle,
    Scanning,
    Verified,
}

/// Result of polling a scan at some instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanTick {
    pub progress: u8,
    pub status: ScanStatus,
    /// True on exactly one poll: the first one past the display delay.
    pub succeeded: bool,
}

/// Simulated biometric capture. Progress is derived from the wall clock so the
/// scan needs no timer of its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BiometricScan {
    modality: Option<BiometricModality>,
    started_at: Option<DateTime<Utc>>,
    progress: u8,
    success_delivered: bool,
}

impl BiometricScan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn modality(&self) -> Option<BiometricModality> {
        self.modality
    }

    pub fn status(&self) -> ScanStatus {
        match self.started_at {
            None => ScanStatus::Idle,
            Some(_) if self.progress >= 100 => ScanStatus::Verified,
            Some(_) => ScanStatus::Scanning,
        }
    }

    /// Cancelling is only offered before the scan starts.
    pub fn can_cancel(&self) -> bool {
        self.started_at.is_none()
    }

    pub fn select_modality(&mut self, modality: BiometricModality) -> Result<(), FlowError> {
        if self.started_at.is_some() {
            return Err(FlowError::ScanInProgress);
        }
        self.modality = Some(modality);
        Ok(())
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), FlowError> {
        if self.modality.is_none() {
            return Err(FlowError::MissingSelection("biometric modality"));
        }
        if self.started_at.is_some() {
            return Err(FlowError::ScanInProgress);
        }
        self.started_at = Some(now);
        self.progress = 0;
        Ok(())
    }

    fn completes_at(started_at: DateTime<Utc>) -> DateTime<Utc> {
        let steps = (100 + SCAN_STEP as i64 - 1) / SCAN_STEP as i64;
        started_at + Duration::milliseconds(steps * SCAN_INTERVAL_MS)
    }

    pub fn poll(&mut self, now: DateTime<Utc>) -> ScanTick {
        let started_at = match self.started_at {
            Some(started_at) => started_at,
            None => {
                return ScanTick {
                    progress: 0,
                    status: ScanStatus::Idle,
                    succeeded: false,
                }
            }
        };

        let elapsed_ms = (now - started_at).num_milliseconds().max(0);
        let steps = elapsed_ms / SCAN_INTERVAL_MS;
        let progress = (steps * SCAN_STEP as i64).min(100) as u8;
        // a clock that steps backwards never rewinds the bar
        self.progress = self.progress.max(progress);

        let mut succeeded = false;
        if self.progress >= 100 && !self.success_delivered {
            let ready_at = Self::completes_at(started_at) + Duration::milliseconds(SUCCESS_DELAY_MS);
            if now >= ready_at {
                self.success_delivered = true;
                succeeded = true;
            }
        }

        ScanTick {
            progress: self.progress,
            status: self.status(),
            succeeded,
        }
    }
}
