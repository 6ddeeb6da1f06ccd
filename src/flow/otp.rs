use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::FlowError;

pub const OTP_LEN: usize = 6;
pub const OTP_COUNTDOWN_SECS: i64 = 120;
/// Resend stays locked while this many seconds or more remain.
pub const RESEND_LOCK_SECS: i64 = 90;

/// How entered codes are checked.
///
/// `accept_any_complete` is a development stub: it lets any 6-digit code through
/// when no verification backend is available. Never enable it in production.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpPolicy {
    pub test_code: String,
    pub accept_any_complete: bool,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            test_code: "123456".to_string(),
            accept_any_complete: false,
        }
    }
}

impl OtpPolicy {
    pub fn accepts(&self, code: &str) -> bool {
        code == self.test_code
            || (self.accept_any_complete
                && code.len() == OTP_LEN
                && code.chars().all(|c| c.is_ascii_digit()))
    }
}

/// Returned by an edit that leaves all 6 boxes filled with a code not yet rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpSubmission {
    pub code: String,
}

/// The 6-box OTP entry with its resend countdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OtpChallenge {
    boxes: [Option<char>; OTP_LEN],
    focus: usize,
    issued_at: DateTime<Utc>,
    error: Option<String>,
    #[serde(skip)]
    rejected: Option<String>,
}

impl OtpChallenge {
    pub fn issue(now: DateTime<Utc>) -> Self {
        Self {
            boxes: [None; OTP_LEN],
            focus: 0,
            issued_at: now,
            error: None,
            rejected: None,
        }
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn code(&self) -> String {
        self.boxes.iter().flatten().collect()
    }

    pub fn is_complete(&self) -> bool {
        self.boxes.iter().all(Option::is_some)
    }

    /// Whole seconds left on the countdown, never below zero.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> i64 {
        let elapsed = (now - self.issued_at).num_seconds().max(0);
        (OTP_COUNTDOWN_SECS - elapsed).max(0)
    }

    pub fn can_resend(&self, now: DateTime<Utc>) -> bool {
        self.remaining_secs(now) < RESEND_LOCK_SECS
    }

    fn after_edit(&mut self) -> Option<OtpSubmission> {
        if !self.is_complete() {
            return None;
        }
        let code = self.code();
        if self.rejected.as_deref() == Some(code.as_str()) {
            self.error = Some(FlowError::OtpMismatch.to_string());
            return None;
        }
        Some(OtpSubmission { code })
    }

    /// Types into one box. Anything that is not a digit is ignored.
    pub fn enter_digit(&mut self, index: usize, input: &str) -> Result<Option<OtpSubmission>, FlowError> {
        if index >= OTP_LEN {
            return Err(FlowError::UnknownSelection("OTP box"));
        }
        let digit = match input.chars().rev().find(char::is_ascii_digit) {
            Some(digit) => digit,
            None => return Ok(None),
        };

        self.boxes[index] = Some(digit);
        self.error = None;
        self.focus = (index + 1).min(OTP_LEN - 1);
        Ok(self.after_edit())
    }

    /// Backspace clears the box, or moves back when the box is already empty.
    pub fn backspace(&mut self, index: usize) -> Result<(), FlowError> {
        if index >= OTP_LEN {
            return Err(FlowError::UnknownSelection("OTP box"));
        }
        if self.boxes[index].is_some() {
            self.boxes[index] = None;
            self.focus = index;
        } else if index > 0 {
            self.focus = index - 1;
        }
        Ok(())
    }

    /// A paste fills every box at once, but only when it holds exactly 6 digits.
    pub fn paste(&mut self, text: &str) -> Option<OtpSubmission> {
        let digits = crate::utils::strip_non_digits(text);
        if digits.len() != OTP_LEN {
            return None;
        }
        for (slot, digit) in self.boxes.iter_mut().zip(digits.chars()) {
            *slot = Some(digit);
        }
        self.error = None;
        self.focus = OTP_LEN - 1;
        self.after_edit()
    }

    pub fn check(&mut self, policy: &OtpPolicy) -> Result<(), FlowError> {
        if !self.is_complete() {
            self.error = Some(FlowError::IncompleteOtp.to_string());
            return Err(FlowError::IncompleteOtp);
        }
        let code = self.code();
        if !policy.accepts(&code) {
            self.error = Some(FlowError::OtpMismatch.to_string());
            self.rejected = Some(code);
            return Err(FlowError::OtpMismatch);
        }
        self.error = None;
        Ok(())
    }

    /// Restarts the countdown and clears the boxes.
    pub fn resend(&mut self, now: DateTime<Utc>) -> Result<(), FlowError> {
        if !self.can_resend(now) {
            return Err(FlowError::ResendLocked {
                wait_secs: self.remaining_secs(now) - RESEND_LOCK_SECS + 1,
            });
        }
        *self = Self::issue(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap()
    }

    #[test]
    fn typing_submits_only_on_the_sixth_digit() {
        let mut otp = OtpChallenge::issue(t0());
        for (i, d) in "12345".chars().enumerate() {
            assert_eq!(otp.enter_digit(i, &d.to_string()).unwrap(), None);
            assert_eq!(otp.focus(), i + 1);
        }
        let submission = otp.enter_digit(5, "6").unwrap();
        assert_eq!(submission.unwrap().code, "123456");
    }

    #[test]
    fn non_digits_are_ignored() {
        let mut otp = OtpChallenge::issue(t0());
        assert_eq!(otp.enter_digit(0, "x").unwrap(), None);
        assert_eq!(otp.code(), "");
        assert_eq!(otp.focus(), 0);
    }

    #[test]
    fn backspace_on_empty_box_moves_back() {
        let mut otp = OtpChallenge::issue(t0());
        otp.enter_digit(0, "1").unwrap();
        otp.backspace(1).unwrap();
        assert_eq!(otp.focus(), 0);
        otp.backspace(0).unwrap();
        assert_eq!(otp.code(), "");
        assert_eq!(otp.focus(), 0);
        otp.backspace(0).unwrap();
        assert_eq!(otp.focus(), 0);
    }

    #[test]
    fn paste_fills_all_boxes() {
        let mut otp = OtpChallenge::issue(t0());
        assert_eq!(otp.paste("12 34"), None);
        let submission = otp.paste("123-456").unwrap();
        assert_eq!(submission.code, "123456");
        // overtyping a full set of boxes submits the new code
        let submission = otp.enter_digit(2, "9").unwrap().unwrap();
        assert_eq!(submission.code, "129456");
    }

    #[test]
    fn corrections_after_mismatch_are_submitted() {
        let policy = OtpPolicy::default();
        let mut otp = OtpChallenge::issue(t0());
        for (i, d) in "123457".chars().enumerate() {
            otp.enter_digit(i, &d.to_string()).unwrap();
        }
        assert_eq!(otp.check(&policy), Err(FlowError::OtpMismatch));

        // overtype the last box without clearing it first
        let submission = otp.enter_digit(5, "6").unwrap().unwrap();
        assert_eq!(submission.code, "123456");
        assert_eq!(otp.check(&policy), Ok(()));
    }

    #[test]
    fn paste_after_mismatch_is_submitted() {
        let policy = OtpPolicy::default();
        let mut otp = OtpChallenge::issue(t0());
        assert!(otp.paste("000000").is_some());
        assert_eq!(otp.check(&policy), Err(FlowError::OtpMismatch));

        // the rejected code again is not resubmitted, and the error stays up
        assert_eq!(otp.paste("000000"), None);
        assert_eq!(otp.error(), Some(FlowError::OtpMismatch.to_string().as_str()));

        assert_eq!(otp.paste("123456").unwrap().code, "123456");
        assert_eq!(otp.error(), None);
    }

    #[test]
    fn resubmits_after_correction() {
        let mut otp = OtpChallenge::issue(t0());
        otp.paste("111111").unwrap();
        otp.backspace(5).unwrap();
        assert!(otp.enter_digit(5, "2").unwrap().is_some());
    }

    #[test]
    fn policy_checks() {
        let strict = OtpPolicy::default();
        let mut otp = OtpChallenge::issue(t0());
        assert_eq!(otp.check(&strict), Err(FlowError::IncompleteOtp));
        otp.paste("654321");
        assert_eq!(otp.check(&strict), Err(FlowError::OtpMismatch));
        assert!(otp.error().is_some());

        let permissive = OtpPolicy {
            accept_any_complete: true,
            ..OtpPolicy::default()
        };
        assert_eq!(otp.check(&permissive), Ok(()));
        assert_eq!(otp.error(), None);
    }

    #[test]
    fn resend_boundary() {
        let otp = OtpChallenge::issue(t0());
        assert_eq!(otp.remaining_secs(t0()), 120);
        assert!(!otp.can_resend(t0()));
        assert!(!otp.can_resend(t0() + Duration::seconds(29)));
        assert_eq!(otp.remaining_secs(t0() + Duration::seconds(30)), 90);
        assert!(!otp.can_resend(t0() + Duration::seconds(30)));
        assert_eq!(otp.remaining_secs(t0() + Duration::seconds(31)), 89);
        assert!(otp.can_resend(t0() + Duration::seconds(31)));
        assert_eq!(otp.remaining_secs(t0() + Duration::seconds(500)), 0);
    }

    #[test]
    fn resend_restarts_countdown() {
        let mut otp = OtpChallenge::issue(t0());
        otp.enter_digit(0, "4").unwrap();
        assert_eq!(
            otp.resend(t0() + Duration::seconds(10)),
            Err(FlowError::ResendLocked { wait_secs: 21 })
        );
        let later = t0() + Duration::seconds(60);
        otp.resend(later).unwrap();
        assert_eq!(otp.code(), "");
        assert_eq!(otp.remaining_secs(later), 120);
    }

    proptest! {
        #[test]
        fn auto_submit_fires_exactly_when_complete(code in "[0-9]{6}", order in Just((0..6).collect::<Vec<usize>>()).prop_shuffle()) {
            let mut otp = OtpChallenge::issue(t0());
            let digits: Vec<char> = code.chars().collect();
            let mut fired = 0;
            for (n, &i) in order.iter().enumerate() {
                let submission = otp.enter_digit(i, &digits[i].to_string()).unwrap();
                if n < 5 {
                    prop_assert!(submission.is_none());
                } else {
                    prop_assert_eq!(submission.map(|s| s.code), Some(code.clone()));
                    fired += 1;
                }
            }
            prop_assert_eq!(fired, 1);
        }

        #[test]
        fn resend_enabled_iff_below_lock(elapsed in 0i64..200) {
            let otp = OtpChallenge::issue(t0());
            let now = t0() + Duration::seconds(elapsed);
            prop_assert_eq!(otp.can_resend(now), otp.remaining_secs(now) < 90);
        }
    }
}
