use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Context;
use tempfile::NamedTempFile;

use crate::models::tokens::QueueToken;

/// The `hospital_tokens` store: every token this kiosk has confirmed, as a JSON
/// array. Its numbers are a display fallback only; the backend owns the real
/// sequence.
pub struct TokenLedger {
    path: PathBuf,
}

fn token_sequence(token_number: &str) -> Option<u64> {
    let digits = crate::utils::strip_non_digits(token_number);
    digits.parse().ok()
}

impl TokenLedger {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> anyhow::Result<Vec<QueueToken>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&text)
            .with_context(|| format!("Malformed token ledger {}", self.path.display()))
    }

    /// The number after the highest one on record, formatted `T###`.
    pub fn next_token_number(&self) -> anyhow::Result<String> {
        let last = self
            .load()?
            .iter()
            .filter_map(|token| token_sequence(&token.token_number))
            .max()
            .unwrap_or(0);
        Ok(format!("T{:03}", last.saturating_add(1)))
    }

    /// Appends `token`. The new array is written next to the ledger and renamed
    /// over it, so a crash mid-write leaves the previous contents intact.
    pub fn record(&self, token: &QueueToken) -> anyhow::Result<()> {
        let mut tokens = self.load()?;
        tokens.push(token.clone());
        let text = serde_json::to_string_pretty(&tokens).context("Failed to encode tokens")?;

        let dir = match self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            Some(dir) => {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
                dir
            }
            None => Path::new("."),
        };
        let mut staged = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to stage a write in {}", dir.display()))?;
        staged
            .write_all(text.as_bytes())
            .and_then(|_| staged.as_file().sync_all())
            .with_context(|| format!("Failed to write {}", staged.path().display()))?;
        staged
            .persist(&self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tokens::{PriorityLevel, TokenStatus};
    use chrono::NaiveDate;

    fn token(number: &str) -> QueueToken {
        QueueToken {
            token_number: number.to_string(),
            patient_name: "Rahul Sharma".into(),
            phone_number: "9876543210".into(),
            doctor_name: "Dr. Mehta".into(),
            specialization: "Cardiology".into(),
            priority_level: PriorityLevel::Normal,
            reason_for_visit: "Chest pain".into(),
            status: TokenStatus::Waiting,
            slot_date: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
            slot_time: "10:00 AM".into(),
            estimated_wait_minutes: 30,
        }
    }

    #[test]
    fn empty_ledger_starts_at_one() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = TokenLedger::new(dir.path().join("hospital_tokens.json"));
        assert!(ledger.load().unwrap().is_empty());
        assert_eq!(ledger.next_token_number().unwrap(), "T001");
    }

    #[test]
    fn numbers_follow_the_highest_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = TokenLedger::new(dir.path().join("nested").join("hospital_tokens.json"));
        ledger.record(&token("T045")).unwrap();
        ledger.record(&token("T007")).unwrap();
        ledger.record(&token("walk-in")).unwrap();
        assert_eq!(ledger.load().unwrap().len(), 3);
        assert_eq!(ledger.next_token_number().unwrap(), "T046");
    }

    #[test]
    fn huge_token_numbers_do_not_overflow() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = TokenLedger::new(dir.path().join("hospital_tokens.json"));
        ledger.record(&token("T4294967295")).unwrap();
        assert_eq!(ledger.next_token_number().unwrap(), "T4294967296");
        ledger.record(&token(&format!("T{}", u64::MAX))).unwrap();
        assert_eq!(ledger.next_token_number().unwrap(), format!("T{}", u64::MAX));
    }

    #[test]
    fn record_replaces_the_file_whole() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hospital_tokens.json");
        let ledger = TokenLedger::new(&path);
        ledger.record(&token("T001")).unwrap();
        ledger.record(&token("T002")).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("hospital_tokens.json")]);
        let numbers: Vec<String> = ledger
            .load()
            .unwrap()
            .into_iter()
            .map(|token| token.token_number)
            .collect();
        assert_eq!(numbers, vec!["T001", "T002"]);
    }

    #[test]
    fn malformed_ledger_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hospital_tokens.json");
        fs::write(&path, "{not json").unwrap();
        let ledger = TokenLedger::new(&path);
        assert!(ledger.record(&token("T001")).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{not json");
    }

    #[test]
    fn malformed_ledger_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hospital_tokens.json");
        fs::write(&path, "{not json").unwrap();
        let err = TokenLedger::new(&path).load().unwrap_err();
        assert!(err.to_string().contains("Malformed token ledger"));
    }
}
