//! Shift screen state machine.
//!
//! Every operator action, remote completion and timer expiry arrives as an
//! [`Event`]. Handling an event mutates the machine and returns the [`Effect`]s
//! the driver must carry out, in order. The machine itself never touches the
//! network or storage, so it can be exercised without either.

use std::time::Duration;

use chrono::{DateTime, Utc};
use shared::{
    domain::{EmployeeId, LogId, ReportRow, Roster, Screen, Session},
    error::ClientError,
    protocol::{EndShiftData, ReportData, Snapshot, StartShiftData},
};
use tracing::{debug, info, warn};

pub const SELECT_OPERATOR_PROMPT: &str = "Please select an operator to start the shift.";
pub const END_SHIFT_CONFIRMATION: &str =
    "Are you sure you want to end your shift? This action cannot be undone.";
pub const DISCARD_SESSION_CONFIRMATION: &str =
    "Discard the saved shift on this terminal without ending it on the server?";
pub const REPORT_SUBMITTED: &str = "Report submitted successfully!";

const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    StartShift,
    SubmitReport,
    EndShift,
    Refresh,
}

impl ControlKind {
    fn idle_label(self) -> &'static str {
        match self {
            Self::StartShift => "Confirm and Start Shift",
            Self::SubmitReport => "Submit Hourly Report",
            Self::EndShift => "End Shift & Logout",
            Self::Refresh => "Refresh Data",
        }
    }

    fn busy_label(self) -> &'static str {
        match self {
            Self::StartShift => "Starting...",
            Self::SubmitReport => "Submitting...",
            Self::EndShift => "Ending Shift...",
            Self::Refresh => "Refreshing...",
        }
    }
}

/// A trigger control. Disabled for exactly as long as its call is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    enabled: bool,
    label: &'static str,
}

impl Control {
    fn idle(kind: ControlKind) -> Self {
        Self {
            enabled: true,
            label: kind.idle_label(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Controls {
    start_shift: Control,
    submit_report: Control,
    end_shift: Control,
    refresh: Control,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            start_shift: Control::idle(ControlKind::StartShift),
            submit_report: Control::idle(ControlKind::SubmitReport),
            end_shift: Control::idle(ControlKind::EndShift),
            refresh: Control::idle(ControlKind::Refresh),
        }
    }
}

impl Controls {
    pub fn get(&self, kind: ControlKind) -> &Control {
        match kind {
            ControlKind::StartShift => &self.start_shift,
            ControlKind::SubmitReport => &self.submit_report,
            ControlKind::EndShift => &self.end_shift,
            ControlKind::Refresh => &self.refresh,
        }
    }

    fn get_mut(&mut self, kind: ControlKind) -> &mut Control {
        match kind {
            ControlKind::StartShift => &mut self.start_shift,
            ControlKind::SubmitReport => &mut self.submit_report,
            ControlKind::EndShift => &mut self.end_shift,
            ControlKind::Refresh => &mut self.refresh,
        }
    }

    /// Disables the control for one call. Returns false if it was already busy.
    fn acquire(&mut self, kind: ControlKind) -> bool {
        let control = self.get_mut(kind);
        if !control.enabled {
            return false;
        }
        control.enabled = false;
        control.label = kind.busy_label();
        true
    }

    fn release(&mut self, kind: ControlKind) {
        *self.get_mut(kind) = Control::idle(kind);
    }

    /// Disables the control without marking a call in flight.
    fn disable(&mut self, kind: ControlKind) {
        self.get_mut(kind).enabled = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub tone: StatusTone,
}

/// The operator's in-progress report, one entry per configured field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportForm {
    fields: Vec<(String, String)>,
}

impl ReportForm {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: names
                .into_iter()
                .map(|name| (name.into(), String::new()))
                .collect(),
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    /// Sets a configured field. Unknown names are rejected.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> bool {
        match self.fields.iter_mut().find(|(field, _)| field == name) {
            Some((_, slot)) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        for (_, value) in &mut self.fields {
            value.clear();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Loading,
    Loaded,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetupState {
    pub roster: Roster,
    pub load: LoadStatus,
    pub selected_operator: Option<EmployeeId>,
    pub selected_helpers: Vec<EmployeeId>,
    pending_start: Option<StartShiftData>,
}

impl SetupState {
    fn loading() -> Self {
        Self {
            roster: Roster::default(),
            load: LoadStatus::Loading,
            selected_operator: None,
            selected_helpers: Vec::new(),
            pending_start: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MainState {
    pub session: Session,
    pub form: ReportForm,
    pub status: Option<StatusLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShiftState {
    Setup(SetupState),
    Main(MainState),
    Ended,
}

/// Why a snapshot was requested; decides how its failure is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotPurpose {
    /// Fresh load with no stored session.
    Initial,
    /// Background refresh after resuming a stored session.
    Resume,
    /// Operator pressed refresh.
    Refresh,
    /// Table refresh after a report was accepted.
    AfterReport,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Init {
        stored: Option<Session>,
    },
    SnapshotLoaded {
        purpose: SnapshotPurpose,
        result: Result<Snapshot, ClientError>,
    },
    SelectOperator(Option<EmployeeId>),
    SelectHelpers(Vec<EmployeeId>),
    StartShiftRequested,
    StartShiftCompleted {
        result: Result<Vec<LogId>, ClientError>,
        at: DateTime<Utc>,
    },
    SetReportField {
        name: String,
        value: String,
    },
    SubmitReportRequested,
    SubmitReportCompleted(Result<(), ClientError>),
    EndShiftRequested {
        confirmed: bool,
    },
    EndShiftCompleted(Result<(), ClientError>),
    RefreshRequested,
    DiscardSessionRequested {
        confirmed: bool,
    },
    RestartRequested,
    RestartElapsed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchSnapshot(SnapshotPurpose),
    StartShift(StartShiftData),
    AddReport(ReportData),
    EndShift(EndShiftData),
    PersistSession(Session),
    ClearSession,
    Alert(String),
    ScheduleRestart(Duration),
    CancelRestart,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineConfig {
    pub report_fields: Vec<String>,
    pub restart_delay: Duration,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            report_fields: Vec::new(),
            restart_delay: DEFAULT_RESTART_DELAY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShiftMachine {
    config: MachineConfig,
    state: ShiftState,
    reports: Vec<ReportRow>,
    controls: Controls,
    initialized: bool,
}

impl ShiftMachine {
    pub fn new(config: MachineConfig) -> Self {
        // Nothing to start from until the roster has loaded.
        let mut controls = Controls::default();
        controls.disable(ControlKind::StartShift);
        Self {
            config,
            state: ShiftState::Setup(SetupState::loading()),
            reports: Vec::new(),
            controls,
            initialized: false,
        }
    }

    pub fn state(&self) -> &ShiftState {
        &self.state
    }

    pub fn screen(&self) -> Screen {
        match self.state {
            ShiftState::Setup(_) => Screen::Setup,
            ShiftState::Main(_) => Screen::Main,
            ShiftState::Ended => Screen::Ended,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            ShiftState::Main(main) => Some(&main.session),
            _ => None,
        }
    }

    pub fn setup(&self) -> Option<&SetupState> {
        match &self.state {
            ShiftState::Setup(setup) => Some(setup),
            _ => None,
        }
    }

    pub fn main(&self) -> Option<&MainState> {
        match &self.state {
            ShiftState::Main(main) => Some(main),
            _ => None,
        }
    }

    pub fn reports(&self) -> &[ReportRow] {
        &self.reports
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::Init { stored } => self.on_init(stored),
            Event::SnapshotLoaded { purpose, result } => self.on_snapshot(purpose, result),
            Event::SelectOperator(id) => self.on_select_operator(id),
            Event::SelectHelpers(ids) => self.on_select_helpers(ids),
            Event::StartShiftRequested => self.on_start_requested(),
            Event::StartShiftCompleted { result, at } => self.on_start_completed(result, at),
            Event::SetReportField { name, value } => self.on_set_field(&name, value),
            Event::SubmitReportRequested => self.on_submit_requested(),
            Event::SubmitReportCompleted(result) => self.on_submit_completed(result),
            Event::EndShiftRequested { confirmed } => self.on_end_requested(confirmed),
            Event::EndShiftCompleted(result) => self.on_end_completed(result),
            Event::RefreshRequested => self.on_refresh_requested(),
            Event::DiscardSessionRequested { confirmed } => self.on_discard_requested(confirmed),
            Event::RestartRequested => self.on_restart_requested(),
            Event::RestartElapsed => self.on_restart_elapsed(),
        }
    }

    fn on_init(&mut self, stored: Option<Session>) -> Vec<Effect> {
        if self.initialized {
            warn!("ignoring repeated init");
            return Vec::new();
        }
        self.initialized = true;

        match stored {
            Some(session) if !session.log_ids.is_empty() => {
                info!(operator = %session.operator.name, "resuming stored shift");
                self.state = ShiftState::Main(MainState {
                    form: ReportForm::new(self.config.report_fields.iter().cloned()),
                    session,
                    status: None,
                });
                vec![Effect::FetchSnapshot(SnapshotPurpose::Resume)]
            }
            Some(_) => {
                warn!("stored shift has no log ids; discarding it");
                vec![
                    Effect::ClearSession,
                    Effect::FetchSnapshot(SnapshotPurpose::Initial),
                ]
            }
            None => vec![Effect::FetchSnapshot(SnapshotPurpose::Initial)],
        }
    }

    fn on_snapshot(
        &mut self,
        purpose: SnapshotPurpose,
        result: Result<Snapshot, ClientError>,
    ) -> Vec<Effect> {
        if purpose == SnapshotPurpose::Refresh {
            self.controls.release(ControlKind::Refresh);
        }

        match result {
            Ok(snapshot) => {
                if matches!(self.state, ShiftState::Ended) {
                    return Vec::new();
                }
                self.reports = snapshot.reports;
                if let ShiftState::Setup(setup) = &mut self.state {
                    let roster = Roster::new(snapshot.employees);
                    if roster != setup.roster {
                        setup.selected_operator = None;
                        setup.selected_helpers.clear();
                        setup.roster = roster;
                    }
                    if setup.load != LoadStatus::Loaded {
                        self.controls.release(ControlKind::StartShift);
                    }
                    setup.load = LoadStatus::Loaded;
                }
                Vec::new()
            }
            Err(err) => {
                let initial_load_failed = purpose == SnapshotPurpose::Initial
                    && matches!(&self.state, ShiftState::Setup(setup) if setup.load == LoadStatus::Loading);
                if initial_load_failed {
                    if let ShiftState::Setup(setup) = &mut self.state {
                        setup.load = LoadStatus::Failed(err.to_string());
                    }
                    vec![Effect::Alert(format!(
                        "Fatal Error: Could not load initial application data. {err}"
                    ))]
                } else {
                    vec![Effect::Alert(format!("Could not refresh data: {err}"))]
                }
            }
        }
    }

    fn on_select_operator(&mut self, id: Option<EmployeeId>) -> Vec<Effect> {
        let ShiftState::Setup(setup) = &mut self.state else {
            return ignored("select operator");
        };
        if let Some(id) = id {
            if !setup.roster.operators().any(|(candidate, _)| candidate == id) {
                return vec![Effect::Alert(
                    ClientError::Validation(format!("No operator with number {id}.")).to_string(),
                )];
            }
        }
        setup.selected_operator = id;
        Vec::new()
    }

    fn on_select_helpers(&mut self, ids: Vec<EmployeeId>) -> Vec<Effect> {
        let ShiftState::Setup(setup) = &mut self.state else {
            return ignored("select helpers");
        };
        let mut selected: Vec<EmployeeId> = Vec::with_capacity(ids.len());
        for id in ids {
            if !setup.roster.helpers().any(|(candidate, _)| candidate == id) {
                return vec![Effect::Alert(
                    ClientError::Validation(format!("No helper with number {id}.")).to_string(),
                )];
            }
            if !selected.contains(&id) {
                selected.push(id);
            }
        }
        setup.selected_helpers = selected;
        Vec::new()
    }

    fn on_start_requested(&mut self) -> Vec<Effect> {
        let ShiftState::Setup(setup) = &mut self.state else {
            return ignored("start shift");
        };
        if !self.controls.get(ControlKind::StartShift).is_enabled() {
            return busy(ControlKind::StartShift);
        }
        let Some(operator) = setup
            .selected_operator
            .and_then(|id| setup.roster.get(id))
            .cloned()
        else {
            return vec![Effect::Alert(
                ClientError::Validation(SELECT_OPERATOR_PROMPT.to_string()).to_string(),
            )];
        };
        if !self.controls.acquire(ControlKind::StartShift) {
            return busy(ControlKind::StartShift);
        }

        let helpers = setup
            .selected_helpers
            .iter()
            .filter_map(|id| setup.roster.get(*id))
            .cloned()
            .collect();
        let data = StartShiftData { operator, helpers };
        setup.pending_start = Some(data.clone());
        vec![Effect::StartShift(data)]
    }

    fn on_start_completed(
        &mut self,
        result: Result<Vec<LogId>, ClientError>,
        at: DateTime<Utc>,
    ) -> Vec<Effect> {
        self.controls.release(ControlKind::StartShift);
        let ShiftState::Setup(setup) = &mut self.state else {
            return ignored("start shift completion");
        };
        let Some(pending) = setup.pending_start.take() else {
            return ignored("start shift completion without a pending start");
        };

        let result = result.and_then(|log_ids| {
            if log_ids.is_empty() {
                Err(ClientError::Remote("service returned no log ids".to_string()))
            } else {
                Ok(log_ids)
            }
        });

        match result {
            Ok(log_ids) => {
                let session = Session {
                    operator: pending.operator,
                    helpers: pending.helpers,
                    log_ids,
                    started_at: at,
                };
                info!(
                    operator = %session.operator.name,
                    helpers = session.helpers.len(),
                    log_ids = session.log_ids.len(),
                    "shift started"
                );
                self.state = ShiftState::Main(MainState {
                    form: ReportForm::new(self.config.report_fields.iter().cloned()),
                    session: session.clone(),
                    status: None,
                });
                vec![Effect::PersistSession(session)]
            }
            Err(err) => vec![Effect::Alert(format!("Error starting shift: {err}"))],
        }
    }

    fn on_set_field(&mut self, name: &str, value: String) -> Vec<Effect> {
        let ShiftState::Main(main) = &mut self.state else {
            return ignored("set report field");
        };
        if main.form.set(name, value) {
            Vec::new()
        } else {
            vec![Effect::Alert(
                ClientError::Validation(format!("Unknown report field '{name}'.")).to_string(),
            )]
        }
    }

    fn on_submit_requested(&mut self) -> Vec<Effect> {
        let ShiftState::Main(main) = &self.state else {
            return ignored("submit report");
        };
        let data = ReportData::new(main.form.fields(), &main.session.operator.name);
        if !self.controls.acquire(ControlKind::SubmitReport) {
            return busy(ControlKind::SubmitReport);
        }
        vec![Effect::AddReport(data)]
    }

    fn on_submit_completed(&mut self, result: Result<(), ClientError>) -> Vec<Effect> {
        self.controls.release(ControlKind::SubmitReport);
        let ShiftState::Main(main) = &mut self.state else {
            return ignored("submit report completion");
        };
        match result {
            Ok(()) => {
                main.form.clear();
                main.status = Some(StatusLine {
                    text: REPORT_SUBMITTED.to_string(),
                    tone: StatusTone::Success,
                });
                vec![Effect::FetchSnapshot(SnapshotPurpose::AfterReport)]
            }
            Err(err) => {
                main.status = Some(StatusLine {
                    text: format!("Error: {err}"),
                    tone: StatusTone::Error,
                });
                Vec::new()
            }
        }
    }

    fn on_end_requested(&mut self, confirmed: bool) -> Vec<Effect> {
        let ShiftState::Main(main) = &self.state else {
            return ignored("end shift");
        };
        if !confirmed {
            debug!("end shift declined");
            return Vec::new();
        }
        let data = EndShiftData {
            log_ids: main.session.log_ids.clone(),
        };
        if !self.controls.acquire(ControlKind::EndShift) {
            return busy(ControlKind::EndShift);
        }
        vec![Effect::EndShift(data)]
    }

    fn on_end_completed(&mut self, result: Result<(), ClientError>) -> Vec<Effect> {
        self.controls.release(ControlKind::EndShift);
        if !matches!(self.state, ShiftState::Main(_)) {
            return ignored("end shift completion");
        }
        match result {
            Ok(()) => {
                info!("shift ended");
                self.state = ShiftState::Ended;
                self.reports.clear();
                vec![
                    Effect::ClearSession,
                    Effect::ScheduleRestart(self.config.restart_delay),
                ]
            }
            Err(err) => vec![Effect::Alert(format!("Error ending shift: {err}"))],
        }
    }

    fn on_refresh_requested(&mut self) -> Vec<Effect> {
        if matches!(self.state, ShiftState::Ended) {
            return ignored("refresh");
        }
        if !self.controls.acquire(ControlKind::Refresh) {
            return busy(ControlKind::Refresh);
        }
        vec![Effect::FetchSnapshot(SnapshotPurpose::Refresh)]
    }

    fn on_discard_requested(&mut self, confirmed: bool) -> Vec<Effect> {
        if !matches!(self.state, ShiftState::Main(_)) {
            return ignored("discard session");
        }
        if !confirmed {
            return Vec::new();
        }
        if !self.controls.get(ControlKind::EndShift).is_enabled() {
            return busy(ControlKind::EndShift);
        }
        warn!("discarding stored shift without ending it remotely");
        let mut effects = vec![Effect::ClearSession];
        effects.extend(self.restart());
        effects
    }

    fn on_restart_requested(&mut self) -> Vec<Effect> {
        let allowed = match &self.state {
            ShiftState::Ended => true,
            ShiftState::Setup(setup) => matches!(setup.load, LoadStatus::Failed(_)),
            ShiftState::Main(_) => false,
        };
        if !allowed {
            return ignored("restart");
        }
        let mut effects = vec![Effect::CancelRestart];
        effects.extend(self.restart());
        effects
    }

    fn on_restart_elapsed(&mut self) -> Vec<Effect> {
        if !matches!(self.state, ShiftState::Ended) {
            return ignored("restart countdown");
        }
        self.restart()
    }

    /// Back to a fresh load: Setup, nothing loaded, no session.
    fn restart(&mut self) -> Vec<Effect> {
        info!("restarting");
        *self = Self {
            initialized: true,
            ..Self::new(self.config.clone())
        };
        vec![Effect::FetchSnapshot(SnapshotPurpose::Initial)]
    }
}

fn ignored(what: &str) -> Vec<Effect> {
    debug!(event = what, "event not valid on the current screen");
    Vec::new()
}

fn busy(kind: ControlKind) -> Vec<Effect> {
    debug!(control = ?kind, "control busy; ignoring trigger");
    Vec::new()
}

#[cfg(test)]
#[path = "tests/machine_tests.rs"]
mod tests;
