use std::fmt::Display;

use chrono::NaiveDate;
use serde::Serialize;

use super::{
    fetch::{FetchKey, FetchTicket, Generations},
    otp::OtpPolicy,
    slots::{self, AvailabilitySlot, AvailableDate, SlotPager, SlotRef},
    verification::{VerificationFlow, VerificationState},
};
use crate::{
    error::FlowError,
    models::{
        catalog::{Doctor, RecordId, Specialization, Symptom},
        identity::VerifiedIdentity,
        tokens::{
            estimated_wait_minutes, ConsultationType, CreateTokenRequest, PriorityLevel,
            QueueToken, TokenReceipt, DEFAULT_REASON,
        },
    },
};

pub const NO_SPECIALIZATIONS: &str = "No specializations found for the given symptoms";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStep {
    Verify,
    Symptoms,
    DoctorAndSlot,
    Confirmed,
}

impl BookingStep {
    pub fn number(&self) -> u8 {
        match self {
            BookingStep::Verify => 1,
            BookingStep::Symptoms => 2,
            BookingStep::DoctorAndSlot => 3,
            BookingStep::Confirmed => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BookingStep::Verify => "verifying the patient",
            BookingStep::Symptoms => "entering symptoms",
            BookingStep::DoctorAndSlot => "choosing a doctor and slot",
            BookingStep::Confirmed => "showing the token",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymptomStage {
    pub patient: VerifiedIdentity,
    pub text: String,
    pub suggestions: Vec<Symptom>,
    pub suggestions_open: bool,
    pub specializations: Vec<Specialization>,
    pub notice: Option<String>,
    pub error: Option<String>,
}

impl SymptomStage {
    fn new(patient: VerifiedIdentity) -> Self {
        Self {
            patient,
            text: String::new(),
            suggestions: Vec::new(),
            suggestions_open: false,
            specializations: Vec::new(),
            notice: None,
            error: None,
        }
    }

    fn reason_for_visit(&self) -> String {
        let text = self.text.trim();
        if text.is_empty() {
            DEFAULT_REASON.to_string()
        } else {
            text.to_string()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotPanel {
    #[serde(skip)]
    pub symptoms: SymptomStage,
    pub specialization: Specialization,
    pub doctors: Vec<Doctor>,
    pub doctor: Option<Doctor>,
    pub dates: Vec<AvailableDate>,
    pub date: Option<NaiveDate>,
    pub slots: Vec<AvailabilitySlot>,
    pub pager: SlotPager,
    pub slot: Option<usize>,
    pub consultation: ConsultationType,
    pub priority: PriorityLevel,
    pub submitting: bool,
    pub error: Option<String>,
}

impl SlotPanel {
    fn new(symptoms: SymptomStage, specialization: Specialization) -> Self {
        Self {
            symptoms,
            specialization,
            doctors: Vec::new(),
            doctor: None,
            dates: Vec::new(),
            date: None,
            slots: Vec::new(),
            pager: SlotPager::default(),
            slot: None,
            consultation: ConsultationType::default(),
            priority: PriorityLevel::default(),
            submitting: false,
            error: None,
        }
    }

    pub fn page_slots(&self) -> &[AvailabilitySlot] {
        &self.slots[self.pager.window()]
    }

    pub fn selected_slot(&self) -> Option<&AvailabilitySlot> {
        self.slot.and_then(|i| self.slots.get(i))
    }

    pub fn estimated_wait(&self) -> u32 {
        estimated_wait_minutes(self.consultation, self.priority)
    }

    pub fn can_generate(&self) -> bool {
        self.doctor.is_some()
            && self.date.is_some()
            && self
                .selected_slot()
                .map_or(false, |slot| slot.slot_id.is_some() && !slot.is_booked)
            && !self.submitting
    }

    fn remove_slot(&mut self, consumed: &SlotRef) {
        let before = self.slots.len();
        self.slots.retain(|s| s.slot_ref() != *consumed);
        if self.slots.len() != before {
            self.slot = None;
            self.pager.resize(self.slots.len());
        }
    }

    fn clear_selection(&mut self) {
        self.doctor = None;
        self.dates.clear();
        self.date = None;
        self.slots.clear();
        self.pager = SlotPager::default();
        self.slot = None;
        self.error = None;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedStage {
    #[serde(skip)]
    pub panel: SlotPanel,
    pub token: QueueToken,
}

#[derive(Debug, Clone)]
pub enum BookingState {
    Verify(VerificationFlow),
    Symptoms(SymptomStage),
    DoctorAndSlot(SlotPanel),
    Confirmed(ConfirmedStage),
}

impl BookingState {
    pub fn step(&self) -> BookingStep {
        match self {
            BookingState::Verify(_) => BookingStep::Verify,
            BookingState::Symptoms(_) => BookingStep::Symptoms,
            BookingState::DoctorAndSlot(_) => BookingStep::DoctorAndSlot,
            BookingState::Confirmed(_) => BookingStep::Confirmed,
        }
    }
}

/// Borrowed snapshot of the flow, ready to serialize for a client.
#[derive(Debug, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum BookingView<'a> {
    Verify {
        verification: &'a VerificationState,
    },
    Symptoms {
        stage: &'a SymptomStage,
        loading: bool,
    },
    DoctorAndSlot {
        panel: &'a SlotPanel,
        page_slots: &'a [AvailabilitySlot],
        page_count: usize,
        estimated_wait_minutes: u32,
        can_generate: bool,
        loading: bool,
    },
    Confirmed {
        token: &'a QueueToken,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ConsumedSlot {
    doctor_id: RecordId,
    date: NaiveDate,
    slot: SlotRef,
}

/// The selection a token request was built from. The confirmed token and the
/// consumed slot come from here, never from the live panel.
#[derive(Debug, Clone)]
struct PendingToken {
    panel: SlotPanel,
    doctor: Doctor,
    date: NaiveDate,
    slot: AvailabilitySlot,
    /// Set by `reset`: the answer is still recorded but no longer shown.
    abandoned: bool,
}

/// `Verify → Symptoms → DoctorAndSlot → Confirmed`, with `reset` back to the start.
///
/// Fetches are split in two: a `begin_*`/`submit_*` call hands out a
/// [`FetchTicket`], the caller performs the request, and the matching `apply_*`
/// call feeds the response back. Responses to superseded tickets are dropped.
#[derive(Debug, Clone)]
pub struct BookingFlow {
    state: BookingState,
    policy: OtpPolicy,
    symptom_catalog: Vec<Symptom>,
    consumed: Vec<ConsumedSlot>,
    generations: Generations,
    pending: Option<PendingToken>,
}

impl BookingFlow {
    pub fn new(policy: OtpPolicy) -> Self {
        Self {
            state: BookingState::Verify(VerificationFlow::new(policy.clone())),
            policy,
            symptom_catalog: Vec::new(),
            consumed: Vec::new(),
            generations: Generations::default(),
            pending: None,
        }
    }

    pub fn state(&self) -> &BookingState {
        &self.state
    }

    pub fn step(&self) -> BookingStep {
        self.state.step()
    }

    pub fn is_loading(&self, key: FetchKey) -> bool {
        self.generations.is_loading(key)
    }

    pub fn view(&self) -> BookingView<'_> {
        match &self.state {
            BookingState::Verify(flow) => BookingView::Verify {
                verification: flow.state(),
            },
            BookingState::Symptoms(stage) => BookingView::Symptoms {
                stage,
                loading: self.is_loading(FetchKey::Specializations),
            },
            BookingState::DoctorAndSlot(panel) => BookingView::DoctorAndSlot {
                panel,
                page_slots: panel.page_slots(),
                page_count: panel.pager.page_count(),
                estimated_wait_minutes: panel.estimated_wait(),
                can_generate: panel.can_generate(),
                loading: self.is_loading(FetchKey::Doctors),
            },
            BookingState::Confirmed(confirmed) => BookingView::Confirmed {
                token: &confirmed.token,
            },
        }
    }

    fn invalid(&self, action: &'static str) -> FlowError {
        FlowError::transition(action, self.step().name())
    }

    pub fn verification_mut(&mut self) -> Result<&mut VerificationFlow, FlowError> {
        let step = self.step();
        match &mut self.state {
            BookingState::Verify(flow) => Ok(flow),
            _ => Err(FlowError::transition("verify the patient", step.name())),
        }
    }

    /// Moves on to symptoms once the verification flow has produced `identity`.
    pub fn patient_verified(&mut self, identity: VerifiedIdentity) -> Result<(), FlowError> {
        let verified = match &self.state {
            BookingState::Verify(flow) => {
                matches!(flow.state(), VerificationState::Verified(v) if *v == identity)
            }
            _ => false,
        };
        if !verified {
            return Err(self.invalid("accept a patient"));
        }
        tracing::info!(patient = %identity.id_number.masked(), "patient context set");
        self.state = BookingState::Symptoms(SymptomStage::new(identity));
        Ok(())
    }

    fn symptoms_mut(&mut self, action: &'static str) -> Result<&mut SymptomStage, FlowError> {
        let step = self.step();
        match &mut self.state {
            BookingState::Symptoms(stage) => Ok(stage),
            _ => Err(FlowError::transition(action, step.name())),
        }
    }

    fn panel_mut(&mut self, action: &'static str) -> Result<&mut SlotPanel, FlowError> {
        let step = self.step();
        match &mut self.state {
            BookingState::DoctorAndSlot(panel) => Ok(panel),
            _ => Err(FlowError::transition(action, step.name())),
        }
    }

    pub fn begin_symptom_catalog(&mut self) -> FetchTicket {
        self.generations.issue(FetchKey::Symptoms, "")
    }

    pub fn apply_symptom_catalog<E: Display>(
        &mut self,
        ticket: &FetchTicket,
        result: Result<Vec<Symptom>, E>,
    ) -> bool {
        if !self.generations.accept(ticket) {
            return false;
        }
        self.symptom_catalog = result.unwrap_or_else(|err| {
            tracing::warn!("symptom catalog unavailable: {}", err);
            Vec::new()
        });
        true
    }

    /// Updates the symptom text and re-filters suggestions on every keystroke.
    pub fn type_symptoms(&mut self, text: &str) -> Result<&[Symptom], FlowError> {
        let needle = text.trim().to_lowercase();
        let suggestions: Vec<Symptom> = if needle.is_empty() {
            Vec::new()
        } else {
            self.symptom_catalog
                .iter()
                .filter(|s| s.name.to_lowercase().contains(&needle))
                .cloned()
                .collect()
        };
        let stage = self.symptoms_mut("edit symptoms")?;
        stage.text = text.to_string();
        stage.suggestions_open = !suggestions.is_empty();
        stage.suggestions = suggestions;
        stage.error = None;
        Ok(&stage.suggestions)
    }

    pub fn pick_suggestion(&mut self, index: usize) -> Result<(), FlowError> {
        let stage = self.symptoms_mut("pick a suggestion")?;
        let name = stage
            .suggestions
            .get(index)
            .map(|s| s.name.clone())
            .ok_or(FlowError::UnknownSelection("suggestion"))?;
        stage.text = name;
        stage.suggestions.clear();
        stage.suggestions_open = false;
        stage.error = None;
        Ok(())
    }

    pub fn submit_symptoms(&mut self) -> Result<FetchTicket, FlowError> {
        let stage = self.symptoms_mut("submit symptoms")?;
        let query = stage.text.trim().to_string();
        if query.is_empty() {
            stage.error = Some(FlowError::EmptySymptoms.to_string());
            return Err(FlowError::EmptySymptoms);
        }
        stage.suggestions_open = false;
        stage.specializations.clear();
        stage.notice = None;
        stage.error = None;
        Ok(self.generations.issue(FetchKey::Specializations, query))
    }

    pub fn apply_specializations<E: Display>(
        &mut self,
        ticket: &FetchTicket,
        result: Result<Vec<Specialization>, E>,
    ) -> bool {
        if !matches!(self.state, BookingState::Symptoms(_)) || !self.generations.accept(ticket) {
            return false;
        }
        let specializations = result.unwrap_or_else(|err| {
            tracing::warn!(query = %ticket.query, "specialization lookup failed: {}", err);
            Vec::new()
        });
        if let BookingState::Symptoms(stage) = &mut self.state {
            stage.notice = if specializations.is_empty() {
                Some(NO_SPECIALIZATIONS.to_string())
            } else {
                None
            };
            stage.specializations = specializations;
        }
        true
    }

    pub fn choose_specialization(&mut self, id: &RecordId) -> Result<FetchTicket, FlowError> {
        let stage = self.symptoms_mut("choose a specialization")?;
        let specialization = stage
            .specializations
            .iter()
            .find(|s| &s.id == id)
            .cloned()
            .ok_or(FlowError::UnknownSelection("specialization"))?;
        let stage = stage.clone();
        tracing::info!(specialization = %specialization.name, "specialization chosen");
        let ticket = self
            .generations
            .issue(FetchKey::Doctors, specialization.id.clone());
        self.state = BookingState::DoctorAndSlot(SlotPanel::new(stage, specialization));
        Ok(ticket)
    }

    pub fn apply_doctors<E: Display>(
        &mut self,
        ticket: &FetchTicket,
        result: Result<Vec<Doctor>, E>,
    ) -> bool {
        let for_current = match &self.state {
            BookingState::DoctorAndSlot(panel) => panel.specialization.id.as_str() == ticket.query,
            _ => false,
        };
        if !for_current || !self.generations.accept(ticket) {
            return false;
        }
        let doctors = result.unwrap_or_else(|err| {
            tracing::warn!(specialization = %ticket.query, "doctor lookup failed: {}", err);
            Vec::new()
        });
        if let BookingState::DoctorAndSlot(panel) = &mut self.state {
            panel.clear_selection();
            panel.doctors = doctors;
        }
        true
    }

    /// True while a token request for the current panel awaits its answer.
    pub fn token_in_flight(&self) -> bool {
        self.pending.as_ref().map_or(false, |p| !p.abandoned)
    }

    /// The panel, unless a token request built from it is still in flight.
    fn editable_panel_mut(&mut self, action: &'static str) -> Result<&mut SlotPanel, FlowError> {
        if self.token_in_flight() {
            return Err(FlowError::TokenPending);
        }
        self.panel_mut(action)
    }

    fn resolve_for(&self, doctor: &Doctor, date: NaiveDate) -> Vec<AvailabilitySlot> {
        slots::resolve_slots(doctor, date)
            .into_iter()
            .filter(|slot| {
                let slot_ref = slot.slot_ref();
                !self.consumed.iter().any(|c| {
                    c.doctor_id == doctor.id && c.date == date && c.slot == slot_ref
                })
            })
            .collect()
    }

    /// Picks a doctor; the appointment date is set to `today` (same-day queueing).
    pub fn select_doctor(&mut self, id: &RecordId, today: NaiveDate) -> Result<(), FlowError> {
        let doctor = self
            .editable_panel_mut("select a doctor")?
            .doctors
            .iter()
            .find(|d| &d.id == id)
            .cloned()
            .ok_or(FlowError::UnknownSelection("doctor"))?;
        let slots = self.resolve_for(&doctor, today);
        let panel = self.panel_mut("select a doctor")?;
        panel.clear_selection();
        panel.dates = slots::available_dates(&doctor);
        panel.date = Some(today);
        panel.pager = SlotPager::new(slots.len());
        panel.slots = slots;
        panel.doctor = Some(doctor);
        Ok(())
    }

    pub fn select_date(&mut self, date: NaiveDate, today: NaiveDate) -> Result<(), FlowError> {
        let doctor = self
            .editable_panel_mut("select a date")?
            .doctor
            .clone()
            .ok_or(FlowError::MissingSelection("doctor"))?;
        if date != today {
            let err = FlowError::NotToday;
            self.panel_mut("select a date")?.error = Some(err.to_string());
            return Err(err);
        }
        let slots = self.resolve_for(&doctor, date);
        let panel = self.panel_mut("select a date")?;
        panel.date = Some(date);
        panel.pager = SlotPager::new(slots.len());
        panel.slots = slots;
        panel.slot = None;
        panel.error = None;
        Ok(())
    }

    pub fn next_page(&mut self) -> Result<usize, FlowError> {
        let panel = self.panel_mut("page slots")?;
        panel.pager.next();
        Ok(panel.pager.page())
    }

    pub fn prev_page(&mut self) -> Result<usize, FlowError> {
        let panel = self.panel_mut("page slots")?;
        panel.pager.prev();
        Ok(panel.pager.page())
    }

    /// Selects by index into the full slot list. Slots without an id are refused:
    /// a token must never point at a slot the backend cannot identify.
    pub fn select_slot(&mut self, index: usize) -> Result<(), FlowError> {
        let panel = self.editable_panel_mut("select a slot")?;
        let slot = panel
            .slots
            .get(index)
            .ok_or(FlowError::UnknownSelection("slot"))?;
        let refused = if slot.is_booked {
            Some(FlowError::SlotBooked)
        } else if slot.slot_id.is_none() {
            Some(FlowError::SlotWithoutId)
        } else {
            None
        };
        if let Some(err) = refused {
            panel.slot = None;
            panel.error = Some(err.to_string());
            return Err(err);
        }
        panel.slot = Some(index);
        panel.error = None;
        Ok(())
    }

    pub fn set_consultation(&mut self, consultation: ConsultationType) -> Result<u32, FlowError> {
        let panel = self.editable_panel_mut("choose a consultation type")?;
        panel.consultation = consultation;
        Ok(panel.estimated_wait())
    }

    pub fn set_priority(&mut self, priority: PriorityLevel) -> Result<u32, FlowError> {
        let panel = self.editable_panel_mut("choose a priority")?;
        panel.priority = priority;
        Ok(panel.estimated_wait())
    }

    /// Builds the token request, marks the panel as submitting and keeps a
    /// snapshot of the selection until [`finish_token`](Self::finish_token).
    pub fn begin_token(&mut self) -> Result<CreateTokenRequest, FlowError> {
        if self.pending.is_some() {
            return Err(FlowError::TokenPending);
        }
        let panel = self.panel_mut("generate a token")?;
        let doctor = panel
            .doctor
            .clone()
            .ok_or(FlowError::MissingSelection("doctor"))?;
        let date = panel.date.ok_or(FlowError::MissingSelection("date"))?;
        let slot = panel
            .selected_slot()
            .cloned()
            .ok_or(FlowError::MissingSelection("slot"))?;
        let slot_id = slot.slot_id.clone().ok_or(FlowError::SlotWithoutId)?;

        let request = CreateTokenRequest {
            patient_id: panel.symptoms.patient.id,
            department_id: doctor
                .department_id
                .clone()
                .unwrap_or_else(|| panel.specialization.id.clone()),
            slot_id,
            doctor_id: doctor.id.clone(),
            priority: panel.priority.as_upper().to_string(),
            reason_for_visit: panel.symptoms.reason_for_visit(),
            estimated_wait_time: panel.estimated_wait(),
        };
        panel.submitting = true;
        panel.error = None;
        let snapshot = panel.clone();

        self.pending = Some(PendingToken {
            panel: snapshot,
            doctor,
            date,
            slot,
            abandoned: false,
        });
        Ok(request)
    }

    /// Applies the backend's answer to [`begin_token`](Self::begin_token).
    /// `fallback_number` is only consulted when the receipt has no token number.
    ///
    /// A confirmed token is returned even when the kiosk was reset meanwhile,
    /// so the caller can still record it; the flow only moves to `Confirmed`
    /// when it was not.
    pub fn finish_token<E, F>(
        &mut self,
        result: Result<TokenReceipt, E>,
        fallback_number: F,
    ) -> Result<QueueToken, FlowError>
    where
        E: Display,
        F: FnOnce() -> String,
    {
        let pending = self
            .pending
            .take()
            .ok_or_else(|| FlowError::transition("finish a token", "no token request is pending"))?;

        let receipt = match result {
            Ok(receipt) => receipt,
            Err(err) => {
                let err = FlowError::Submission(err.to_string());
                tracing::warn!("{}", err);
                if let (false, BookingState::DoctorAndSlot(panel)) = (pending.abandoned, &mut self.state) {
                    panel.submitting = false;
                    panel.error = Some(err.to_string());
                }
                return Err(err);
            }
        };

        let PendingToken {
            mut panel,
            doctor,
            date,
            slot,
            abandoned,
        } = pending;

        let token_number = match receipt.token_number {
            Some(number) => number.to_string(),
            None => {
                let number = fallback_number();
                tracing::warn!(token = %number, "backend returned no token number, using local fallback");
                number
            }
        };
        let token = QueueToken {
            token_number,
            patient_name: panel.symptoms.patient.name.clone(),
            phone_number: panel.symptoms.patient.phone_number.clone(),
            doctor_name: doctor.name.clone(),
            specialization: panel.specialization.name.clone(),
            priority_level: panel.priority,
            reason_for_visit: panel.symptoms.reason_for_visit(),
            status: receipt.status.unwrap_or_default(),
            slot_date: date,
            slot_time: slot.display_time.clone(),
            estimated_wait_minutes: receipt
                .estimated_wait_time
                .unwrap_or_else(|| panel.estimated_wait()),
        };

        let consumed = slot.slot_ref();
        panel.submitting = false;
        panel.error = None;
        panel.remove_slot(&consumed);

        tracing::info!(
            token = %token.token_number,
            doctor = %doctor.id,
            slot = %consumed.time,
            abandoned,
            "queue token generated"
        );

        if abandoned {
            if let BookingState::DoctorAndSlot(live) = &mut self.state {
                let same_day = live.date == Some(date);
                if same_day && live.doctor.as_ref().map_or(false, |d| d.id == doctor.id) {
                    live.remove_slot(&consumed);
                }
            }
        } else {
            self.state = BookingState::Confirmed(ConfirmedStage {
                panel,
                token: token.clone(),
            });
        }
        self.consumed.push(ConsumedSlot {
            doctor_id: doctor.id,
            date,
            slot: consumed,
        });
        Ok(token)
    }

    /// One step back: Symptoms → Verify (fresh), DoctorAndSlot → Symptoms,
    /// Confirmed → DoctorAndSlot with the used slot gone.
    pub fn back(&mut self) -> Result<BookingStep, FlowError> {
        if self.token_in_flight() {
            return Err(FlowError::TokenPending);
        }
        let fresh = BookingState::Verify(VerificationFlow::new(self.policy.clone()));
        self.state = match std::mem::replace(&mut self.state, fresh) {
            BookingState::Verify(flow) => {
                self.state = BookingState::Verify(flow);
                return Err(self.invalid("go back"));
            }
            BookingState::Symptoms(_) => {
                self.generations.cancel(FetchKey::Specializations);
                BookingState::Verify(VerificationFlow::new(self.policy.clone()))
            }
            BookingState::DoctorAndSlot(panel) => {
                self.generations.cancel(FetchKey::Doctors);
                BookingState::Symptoms(panel.symptoms)
            }
            BookingState::Confirmed(confirmed) => BookingState::DoctorAndSlot(confirmed.panel),
        };
        Ok(self.step())
    }

    /// "Generate another token": drops patient, symptoms, selections and token.
    pub fn reset(&mut self) {
        if let Some(pending) = &mut self.pending {
            pending.abandoned = true;
        }
        for key in [FetchKey::Specializations, FetchKey::Doctors] {
            self.generations.cancel(key);
        }
        self.state = BookingState::Verify(VerificationFlow::new(self.policy.clone()));
    }
}
