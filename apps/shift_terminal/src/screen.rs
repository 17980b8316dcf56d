//! Draws the active screen as plain text.

use std::{fmt::Write as _, time::Duration};

use ansi_term::Colour;
use chrono::Local;
use client_core::{
    render_reports_table, Control, ControlKind, LoadStatus, ShiftMachine, ShiftState, StatusTone,
};
use shared::domain::{Employee, Roster};

pub fn render(machine: &ShiftMachine, restart_in: Option<Duration>) -> String {
    let mut out = String::new();
    match machine.state() {
        ShiftState::Setup(setup) => {
            heading(&mut out, "Shift Setup");
            match &setup.load {
                LoadStatus::Loading => out.push_str("Loading employee list...\n"),
                LoadStatus::Failed(reason) => {
                    let _ = writeln!(
                        out,
                        "{}",
                        Colour::Red.paint(format!("Employee list could not be loaded: {reason}"))
                    );
                    out.push_str("Type `restart` to try again.\n");
                }
                LoadStatus::Loaded => {
                    candidates(&mut out, "Operators", setup.roster.operators());
                    candidates(&mut out, "Helpers", setup.roster.helpers());
                }
            }
            let operator = setup
                .selected_operator
                .and_then(|id| setup.roster.get(id))
                .map(|employee| employee.name.as_str())
                .unwrap_or("-- Select Name --");
            let _ = writeln!(out, "Operator: {operator}");
            let _ = writeln!(
                out,
                "Helpers:  {}",
                selected_names(&setup.roster, &setup.selected_helpers)
            );
            controls(&mut out, machine, &[ControlKind::StartShift, ControlKind::Refresh]);
            reports(&mut out, machine);
        }
        ShiftState::Main(main) => {
            heading(&mut out, "Active Shift");
            let session = &main.session;
            let _ = writeln!(out, "Operator: {}", session.operator.name);
            let _ = writeln!(out, "Helpers:  {}", names(&session.helpers));
            let _ = writeln!(
                out,
                "On shift since {}",
                session.started_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
            );

            out.push_str("\nHourly report:\n");
            let width = main.form.fields().map(|(name, _)| name.len()).max().unwrap_or(0);
            for (name, value) in main.form.fields() {
                let _ = writeln!(out, "  {name:<width$} = {value}");
            }
            if let Some(status) = &main.status {
                let colour = match status.tone {
                    StatusTone::Success => Colour::Green,
                    StatusTone::Error => Colour::Red,
                };
                let _ = writeln!(out, "{}", colour.paint(status.text.as_str()));
            }
            controls(
                &mut out,
                machine,
                &[
                    ControlKind::SubmitReport,
                    ControlKind::Refresh,
                    ControlKind::EndShift,
                ],
            );
            reports(&mut out, machine);
        }
        ShiftState::Ended => {
            heading(&mut out, "Shift Ended");
            out.push_str("Your shift has been ended. Thank you!\n");
            match restart_in {
                Some(remaining) => {
                    let _ = writeln!(
                        out,
                        "Returning to shift setup in {} seconds. Type `restart` to start over now.",
                        remaining.as_secs_f64().ceil() as u64
                    );
                }
                None => out.push_str("Type `restart` to start over.\n"),
            }
        }
    }
    out
}

fn heading(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n=== {title} ===");
}

fn candidates<'a>(
    out: &mut String,
    title: &str,
    list: impl Iterator<Item = (shared::domain::EmployeeId, &'a Employee)>,
) {
    let _ = writeln!(out, "{title}:");
    let mut empty = true;
    for (id, employee) in list {
        empty = false;
        let _ = writeln!(out, "  [{id}] {}", employee.name);
    }
    if empty {
        out.push_str("  (none)\n");
    }
}

fn selected_names(roster: &Roster, ids: &[shared::domain::EmployeeId]) -> String {
    let selected: Vec<Employee> = ids.iter().filter_map(|id| roster.get(*id)).cloned().collect();
    names(&selected)
}

fn names(employees: &[Employee]) -> String {
    if employees.is_empty() {
        return "none".to_string();
    }
    employees
        .iter()
        .map(|employee| employee.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn controls(out: &mut String, machine: &ShiftMachine, kinds: &[ControlKind]) {
    let rendered: Vec<String> = kinds
        .iter()
        .map(|kind| button(machine.controls().get(*kind)))
        .collect();
    let _ = writeln!(out, "\n{}", rendered.join("  "));
}

fn button(control: &Control) -> String {
    if control.is_enabled() {
        format!("[{}]", control.label())
    } else {
        Colour::Fixed(8).paint(format!("({})", control.label())).to_string()
    }
}

fn reports(out: &mut String, machine: &ShiftMachine) {
    out.push_str("\n--- Production reports ---\n");
    out.push_str(&render_reports_table(machine.reports()));
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use client_core::{machine::REPORT_SUBMITTED, Event, MachineConfig, SnapshotPurpose};
    use serde_json::json;
    use shared::{
        domain::{EmployeeId, LogId, Session},
        error::ClientError,
    };

    fn machine() -> ShiftMachine {
        ShiftMachine::new(MachineConfig {
            report_fields: vec!["machine".into(), "quantity".into()],
            restart_delay: Duration::from_secs(10),
        })
    }

    #[test]
    fn setup_lists_candidates_with_their_numbers() {
        let mut machine = machine();
        machine.handle(Event::Init { stored: None });
        machine.handle(Event::SnapshotLoaded {
            purpose: SnapshotPurpose::Initial,
            result: Ok(serde_json::from_value(json!({
                "employees": [
                    {"name": "A", "role": "Operator"},
                    {"name": "H", "role": "Helper"}
                ],
                "reports": []
            }))
            .expect("snapshot")),
        });
        machine.handle(Event::SelectOperator(Some(EmployeeId(0))));

        let text = render(&machine, None);

        assert!(text.contains("=== Shift Setup ==="));
        assert!(text.contains("  [0] A"));
        assert!(text.contains("  [1] H"));
        assert!(text.contains("Operator: A"));
        assert!(text.contains("[Confirm and Start Shift]"));
        assert!(text.contains("No production reports have been submitted yet."));
    }

    #[test]
    fn main_shows_operator_and_form() {
        let mut machine = machine();
        machine.handle(Event::Init {
            stored: Some(Session {
                operator: Employee::new("Ana", shared::domain::EmployeeRole::Operator),
                helpers: Vec::new(),
                log_ids: vec![LogId::from("L1")],
                started_at: chrono::Utc::now(),
            }),
        });
        machine.handle(Event::SetReportField {
            name: "machine".into(),
            value: "M7".into(),
        });

        let text = render(&machine, None);

        assert!(text.contains("Operator: Ana"));
        assert!(text.contains("Helpers:  none"));
        assert!(text.contains("  machine  = M7"));
        assert!(text.contains("[End Shift & Logout]"));
    }

    fn active_shift() -> ShiftMachine {
        let mut machine = machine();
        machine.handle(Event::Init {
            stored: Some(Session {
                operator: Employee::new("Ana", shared::domain::EmployeeRole::Operator),
                helpers: Vec::new(),
                log_ids: vec![LogId::from("L1")],
                started_at: chrono::Utc::now(),
            }),
        });
        machine
    }

    #[test]
    fn failed_report_status_is_drawn_in_red() {
        let mut machine = active_shift();
        machine.handle(Event::SubmitReportRequested);
        machine.handle(Event::SubmitReportCompleted(Err(ClientError::Remote(
            "missing field".into(),
        ))));

        let text = render(&machine, None);

        assert!(text.contains(&Colour::Red.paint("Error: missing field").to_string()));
        assert!(!text.contains(&Colour::Green.paint("Error: missing field").to_string()));
    }

    #[test]
    fn accepted_report_status_is_drawn_in_green() {
        let mut machine = active_shift();
        machine.handle(Event::SubmitReportRequested);
        machine.handle(Event::SubmitReportCompleted(Ok(())));

        let text = render(&machine, None);

        assert!(text.contains(&Colour::Green.paint(REPORT_SUBMITTED).to_string()));
    }

    #[test]
    fn busy_control_is_drawn_with_its_busy_label() {
        let mut machine = active_shift();
        machine.handle(Event::SubmitReportRequested);

        let text = render(&machine, None);

        assert!(text.contains("(Submitting...)"));
        assert!(!text.contains("[Submit Hourly Report]"));
    }

    #[test]
    fn ended_shows_countdown() {
        let mut machine = machine();
        machine.handle(Event::Init {
            stored: Some(Session {
                operator: Employee::new("Ana", shared::domain::EmployeeRole::Operator),
                helpers: Vec::new(),
                log_ids: vec![LogId::from("L1")],
                started_at: chrono::Utc::now(),
            }),
        });
        machine.handle(Event::EndShiftRequested { confirmed: true });
        machine.handle(Event::EndShiftCompleted(Ok(())));

        let text = render(&machine, Some(Duration::from_millis(4200)));

        assert!(text.contains("=== Shift Ended ==="));
        assert!(text.contains("in 5 seconds"));
    }
}
