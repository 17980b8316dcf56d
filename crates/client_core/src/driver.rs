use std::{future::Future, sync::Arc};

use chrono::Utc;
use tokio::{sync::mpsc, time::Instant};
use tracing::{debug, error, warn};

use crate::{
    gateway::RemoteGateway,
    machine::{Effect, Event, MachineConfig, ShiftMachine},
    session_store::{SessionStore, SessionStoreError},
};

/// Runs a [`ShiftMachine`] against a gateway and a session store.
///
/// Local effects (storage, alerts, the restart timer) run before `dispatch`
/// returns. Remote calls run on spawned tasks; their completions queue up until
/// the owner collects them with [`ShiftClient::next_completion`], so the screen
/// can be redrawn with busy controls while a call is in flight.
pub struct ShiftClient<G, S> {
    gateway: Arc<G>,
    store: S,
    machine: ShiftMachine,
    restart_deadline: Option<Instant>,
    completions_tx: mpsc::UnboundedSender<Event>,
    completions_rx: mpsc::UnboundedReceiver<Event>,
    in_flight: usize,
}

impl<G, S> ShiftClient<G, S>
where
    G: RemoteGateway + 'static,
    S: SessionStore,
{
    pub fn new(gateway: G, store: S, config: MachineConfig) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            gateway: Arc::new(gateway),
            store,
            machine: ShiftMachine::new(config),
            restart_deadline: None,
            completions_tx,
            completions_rx,
            in_flight: 0,
        }
    }

    pub fn machine(&self) -> &ShiftMachine {
        &self.machine
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// When the ended screen should restart into setup, if counting down.
    pub fn restart_deadline(&self) -> Option<Instant> {
        self.restart_deadline
    }

    /// Remote calls started but not yet fed back into the machine.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Loads any stored shift and starts the machine. Returns alerts to show.
    pub async fn init(&mut self) -> Vec<String> {
        let mut alerts = Vec::new();
        let stored = match self.store.load().await {
            Ok(stored) => stored,
            Err(SessionStoreError::Incompatible(reason)) => {
                warn!(%reason, "discarding unreadable stored shift");
                if let Err(err) = self.store.clear().await {
                    error!(error = %err, "failed to discard unreadable stored shift");
                }
                None
            }
            Err(err) => {
                error!(error = %err, "failed to read stored shift");
                alerts.push(format!("Could not read the saved shift: {err}"));
                None
            }
        };
        alerts.extend(self.dispatch(Event::Init { stored }).await);
        alerts
    }

    /// Handles `event`, runs its local effects and starts its remote calls.
    /// Returns alerts to show.
    pub async fn dispatch(&mut self, event: Event) -> Vec<String> {
        let mut alerts = Vec::new();
        for effect in self.machine.handle(event) {
            self.run(effect, &mut alerts).await;
        }
        alerts
    }

    /// Waits for the next remote call to finish. `None` when nothing is in flight.
    ///
    /// Cancel safe: a completion is only taken once it is returned.
    pub async fn next_completion(&mut self) -> Option<Event> {
        if self.in_flight == 0 {
            return None;
        }
        let event = self.completions_rx.recv().await?;
        self.in_flight -= 1;
        Some(event)
    }

    /// Feeds completions back until no remote call is in flight.
    pub async fn settle(&mut self) -> Vec<String> {
        let mut alerts = Vec::new();
        while let Some(event) = self.next_completion().await {
            alerts.extend(self.dispatch(event).await);
        }
        alerts
    }

    async fn run(&mut self, effect: Effect, alerts: &mut Vec<String>) {
        match effect {
            Effect::FetchSnapshot(purpose) => self.spawn_call(move |gateway| async move {
                Event::SnapshotLoaded {
                    purpose,
                    result: gateway.fetch_snapshot().await,
                }
            }),
            Effect::StartShift(data) => self.spawn_call(move |gateway| async move {
                let result = gateway.start_shift(&data).await;
                Event::StartShiftCompleted {
                    result,
                    at: Utc::now(),
                }
            }),
            Effect::AddReport(data) => self.spawn_call(move |gateway| async move {
                Event::SubmitReportCompleted(gateway.add_report(&data).await)
            }),
            Effect::EndShift(data) => self.spawn_call(move |gateway| async move {
                Event::EndShiftCompleted(gateway.end_shift(&data).await)
            }),
            Effect::PersistSession(session) => {
                if let Err(err) = self.store.save(&session).await {
                    error!(error = %err, "failed to persist started shift");
                    alerts.push(format!(
                        "Shift started but could not be saved locally: {err}"
                    ));
                }
            }
            Effect::ClearSession => {
                if let Err(err) = self.store.clear().await {
                    error!(error = %err, "failed to clear stored shift");
                    alerts.push(format!("The saved shift could not be cleared: {err}"));
                }
            }
            Effect::Alert(message) => alerts.push(message),
            Effect::ScheduleRestart(delay) => {
                self.restart_deadline = Some(Instant::now() + delay);
            }
            Effect::CancelRestart => self.restart_deadline = None,
        }
    }

    fn spawn_call<F, Fut>(&mut self, call: F)
    where
        F: FnOnce(Arc<G>) -> Fut,
        Fut: Future<Output = Event> + Send + 'static,
    {
        self.in_flight += 1;
        let completions = self.completions_tx.clone();
        let pending = call(Arc::clone(&self.gateway));
        tokio::spawn(async move {
            if completions.send(pending.await).is_err() {
                debug!("shift client dropped before a remote call finished");
            }
        });
    }

    /// Fires the restart countdown if its deadline has passed.
    pub async fn poll_restart(&mut self) -> Vec<String> {
        match self.restart_deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.restart_deadline = None;
                self.dispatch(Event::RestartElapsed).await
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
#[path = "tests/driver_tests.rs"]
mod tests;
