use std::ops::Range;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use crate::models::catalog::{Doctor, RecordId};

pub const SLOT_PAGE_SIZE: usize = 12;

const TIME_KEYS: [&str; 3] = ["time", "slotTime", "startTime"];
const ID_KEYS: [&str; 2] = ["slotId", "id"];

/// A raw availability entry reduced to what slot matching needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotRef {
    pub time: String,
    pub slot_id: Option<RecordId>,
}

impl SlotRef {
    /// Plain strings have no id; objects carry a time under `time`, `slotTime` or
    /// `startTime` and an id under `slotId` or `id`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(time) => Some(Self {
                time: time.trim().to_string(),
                slot_id: None,
            }),
            Value::Object(map) => {
                let time = TIME_KEYS
                    .iter()
                    .find_map(|key| map.get(*key).and_then(Value::as_str))
                    .map(|time| time.trim().to_string())
                    .unwrap_or_default();
                let slot_id = ID_KEYS
                    .iter()
                    .find_map(|key| map.get(*key).and_then(RecordId::from_value));
                if time.is_empty() && slot_id.is_none() {
                    None
                } else {
                    Some(Self { time, slot_id })
                }
            }
            _ => None,
        }
    }

    /// Ids decide when both sides have one; otherwise the exact time string does.
    pub fn matches(&self, other: &SlotRef) -> bool {
        match (&self.slot_id, &other.slot_id) {
            (Some(a), Some(b)) => a == b,
            _ => !self.time.is_empty() && self.time == other.time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySlot {
    pub date: NaiveDate,
    pub time: String,
    pub display_time: String,
    pub slot_id: Option<RecordId>,
    pub is_booked: bool,
}

impl AvailabilitySlot {
    pub fn slot_ref(&self) -> SlotRef {
        SlotRef {
            time: self.time.clone(),
            slot_id: self.slot_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailableDate {
    pub date: NaiveDate,
    pub weekday: &'static str,
}

/// Distinct dates the doctor has availability on, earliest first.
pub fn available_dates(doctor: &Doctor) -> Vec<AvailableDate> {
    let mut dates: Vec<NaiveDate> = doctor.availability.iter().map(|day| day.date).collect();
    dates.sort();
    dates.dedup();
    dates
        .into_iter()
        .map(|date| AvailableDate {
            date,
            weekday: crate::utils::weekday_label(date),
        })
        .collect()
}

/// Slots of `doctor` on `date`, in source order, each flagged against the union
/// of the day's and the doctor's booked lists. Pure: same input, same output.
pub fn resolve_slots(doctor: &Doctor, date: NaiveDate) -> Vec<AvailabilitySlot> {
    let day = match doctor.availability_on(date) {
        Some(day) => day,
        None => return Vec::new(),
    };

    let booked: Vec<SlotRef> = day
        .booked_slots
        .iter()
        .chain(doctor.booked_slots.iter())
        .filter_map(SlotRef::from_value)
        .collect();

    day.times
        .iter()
        .filter_map(SlotRef::from_value)
        .map(|candidate| {
            let is_booked = booked.iter().any(|b| b.matches(&candidate));
            if is_booked && candidate.slot_id.is_none() {
                tracing::warn!(
                    doctor = %doctor.id,
                    time = %candidate.time,
                    "slot without id matched as booked by time string"
                );
            }
            AvailabilitySlot {
                date,
                display_time: crate::utils::format_display_time(&candidate.time),
                time: candidate.time,
                slot_id: candidate.slot_id,
                is_booked,
            }
        })
        .collect()
}

/// Fixed-size windows over a slot list. Navigation clamps at both ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SlotPager {
    total: usize,
    page: usize,
}

impl SlotPager {
    pub fn new(total: usize) -> Self {
        Self { total, page: 0 }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_count(&self) -> usize {
        ((self.total + SLOT_PAGE_SIZE - 1) / SLOT_PAGE_SIZE).max(1)
    }

    pub fn next(&mut self) {
        self.page = (self.page + 1).min(self.page_count() - 1);
    }

    pub fn prev(&mut self) {
        self.page = self.page.saturating_sub(1);
    }

    /// Keeps the current page when the list shrinks, as far as it still exists.
    pub fn resize(&mut self, total: usize) {
        self.total = total;
        self.page = self.page.min(self.page_count() - 1);
    }

    pub fn window(&self) -> Range<usize> {
        let start = (self.page * SLOT_PAGE_SIZE).min(self.total);
        let end = (start + SLOT_PAGE_SIZE).min(self.total);
        start..end
    }
}
