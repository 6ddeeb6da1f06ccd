use std::collections::HashMap;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchKey {
    Symptoms,
    Specializations,
    Doctors,
}

/// Handed out when a fetch starts and presented back with its response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub key: FetchKey,
    pub generation: u64,
    /// The input that triggered the fetch, e.g. the symptom text or specialization id.
    pub query: String,
}

/// Per-key request generations. Only the response to the most recently issued
/// ticket for a key is applied; anything older is stale.
#[derive(Debug, Clone, Default)]
pub struct Generations {
    latest: HashMap<FetchKey, u64>,
    in_flight: HashMap<FetchKey, u64>,
}

impl Generations {
    pub fn issue<S: ToString>(&mut self, key: FetchKey, query: S) -> FetchTicket {
        let generation = self.latest.entry(key).or_insert(0);
        *generation += 1;
        self.in_flight.insert(key, *generation);
        FetchTicket {
            key,
            generation: *generation,
            query: query.to_string(),
        }
    }

    /// True when `ticket` is still the latest for its key. Accepting clears the
    /// loading flag; a stale ticket leaves it alone.
    pub fn accept(&mut self, ticket: &FetchTicket) -> bool {
        let current = self.latest.get(&ticket.key).copied().unwrap_or(0);
        if ticket.generation != current {
            tracing::warn!(
                key = ?ticket.key,
                stale = ticket.generation,
                current,
                "discarding stale response"
            );
            return false;
        }
        self.in_flight.remove(&ticket.key);
        true
    }

    /// Invalidates any outstanding ticket for `key`.
    pub fn cancel(&mut self, key: FetchKey) {
        *self.latest.entry(key).or_insert(0) += 1;
        self.in_flight.remove(&key);
    }

    pub fn is_loading(&self, key: FetchKey) -> bool {
        self.in_flight.contains_key(&key)
    }
}
