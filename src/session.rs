use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
};

use anyhow::{anyhow, bail};
use blake2::{Blake2b, Digest};
use chrono::{DateTime, Utc};

use crate::flow::{booking::BookingFlow, otp::OtpPolicy};

struct KioskSession {
    flow: BookingFlow,
    last_seen: DateTime<Utc>,
}

/// One booking flow per kiosk session, keyed by an opaque session token.
///
/// The lock is never held across an await: handlers take what they need, drop
/// the guard, await the backend and come back with the result.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, KioskSession>>,
    policy: OtpPolicy,
    ttl_secs: i64,
    seq: AtomicU64,
}

impl SessionStore {
    pub fn new(policy: OtpPolicy, ttl_secs: i64) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            policy,
            ttl_secs,
            seq: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> anyhow::Result<std::sync::MutexGuard<'_, HashMap<String, KioskSession>>> {
        self.sessions
            .lock()
            .map_err(|_| anyhow!("Session store poisoned"))
    }

    pub fn create(&self, now: DateTime<Utc>) -> anyhow::Result<String> {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let seed = format!("{}:{}", seq, now.timestamp_nanos_opt().unwrap_or_default());
        let token = format!("{:x}", Blake2b::digest(seed.as_bytes()));

        let mut sessions = self.lock()?;
        sessions.retain(|_, s| (now - s.last_seen).num_seconds() <= self.ttl_secs);
        sessions.insert(
            token.clone(),
            KioskSession {
                flow: BookingFlow::new(self.policy.clone()),
                last_seen: now,
            },
        );
        tracing::info!(active = sessions.len(), "kiosk session started");
        Ok(token)
    }

    /// Runs `f` against the session's flow. Errors from `f` leave the flow
    /// exactly as `f` left it.
    pub fn with_flow<T, F>(&self, token: &str, now: DateTime<Utc>, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&mut BookingFlow) -> anyhow::Result<T>,
    {
        let mut sessions = self.lock()?;
        let session = match sessions.get_mut(token) {
            Some(session) => session,
            None => bail!("No such session"),
        };
        if (now - session.last_seen).num_seconds() > self.ttl_secs {
            sessions.remove(token);
            bail!("Session has expired");
        }
        session.last_seen = now;
        f(&mut session.flow)
    }

    pub fn end(&self, token: &str) -> anyhow::Result<()> {
        match self.lock()?.remove(token) {
            Some(_) => Ok(()),
            None => bail!("No such session"),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().map(|sessions| sessions.len()).unwrap_or(0)
    }
}
