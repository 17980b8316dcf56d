//! Operator input parsing. One line, one command.

use client_core::{ControlKind, Event};
use shared::domain::{EmployeeId, Screen};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Maps straight onto a machine event.
    Dispatch(Event),
    /// Needs a yes/no answer before the event is built.
    EndShift,
    DiscardSession,
    Help,
    Quit,
}

impl Command {
    /// The control this command triggers, if any.
    pub fn control(&self) -> Option<ControlKind> {
        match self {
            Self::Dispatch(Event::StartShiftRequested) => Some(ControlKind::StartShift),
            Self::Dispatch(Event::SubmitReportRequested) => Some(ControlKind::SubmitReport),
            Self::Dispatch(Event::RefreshRequested) => Some(ControlKind::Refresh),
            Self::EndShift => Some(ControlKind::EndShift),
            _ => None,
        }
    }
}

pub fn parse(line: &str, screen: Screen) -> Result<Command, String> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "help" | "?" => return Ok(Command::Help),
        "quit" | "exit" => return Ok(Command::Quit),
        "" => return Err("Type `help` for the list of commands.".to_string()),
        "operator" => {
            let id = if rest.eq_ignore_ascii_case("none") {
                None
            } else {
                Some(parse_id(rest)?)
            };
            Command::Dispatch(Event::SelectOperator(id))
        }
        "helpers" => {
            let ids: Vec<EmployeeId> = if rest.is_empty() || rest.eq_ignore_ascii_case("none") {
                Vec::new()
            } else {
                rest.split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|part| !part.is_empty())
                    .map(parse_id)
                    .collect::<Result<_, _>>()?
            };
            Command::Dispatch(Event::SelectHelpers(ids))
        }
        "start" => Command::Dispatch(Event::StartShiftRequested),
        "set" => {
            let (name, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            if name.is_empty() {
                return Err("Usage: set <field> <value>".to_string());
            }
            Command::Dispatch(Event::SetReportField {
                name: name.to_string(),
                value: value.trim().to_string(),
            })
        }
        "submit" => Command::Dispatch(Event::SubmitReportRequested),
        "refresh" => Command::Dispatch(Event::RefreshRequested),
        "end" => Command::EndShift,
        "discard" => Command::DiscardSession,
        "restart" => Command::Dispatch(Event::RestartRequested),
        other => return Err(format!("Unknown command `{other}`. Type `help`.")),
    };

    if available_on(&command, screen) {
        Ok(command)
    } else {
        Err(format!(
            "`{verb}` is not available on the {} screen.",
            screen_name(screen)
        ))
    }
}

fn available_on(command: &Command, screen: Screen) -> bool {
    match command {
        Command::Dispatch(Event::SelectOperator(_))
        | Command::Dispatch(Event::SelectHelpers(_))
        | Command::Dispatch(Event::StartShiftRequested) => screen == Screen::Setup,
        Command::Dispatch(Event::SetReportField { .. })
        | Command::Dispatch(Event::SubmitReportRequested)
        | Command::EndShift
        | Command::DiscardSession => screen == Screen::Main,
        Command::Dispatch(Event::RefreshRequested) => screen != Screen::Ended,
        Command::Dispatch(Event::RestartRequested) => screen != Screen::Main,
        _ => true,
    }
}

fn parse_id(raw: &str) -> Result<EmployeeId, String> {
    raw.trim()
        .parse::<usize>()
        .map(EmployeeId)
        .map_err(|_| format!("`{raw}` is not a list number."))
}

pub fn screen_name(screen: Screen) -> &'static str {
    match screen {
        Screen::Setup => "setup",
        Screen::Main => "shift",
        Screen::Ended => "shift ended",
    }
}

pub fn help(screen: Screen) -> &'static str {
    match screen {
        Screen::Setup => {
            "operator <n>        choose the operator by list number (or `none`)\n\
             helpers <n> <n>...  choose helpers in order (or `none`)\n\
             start               confirm and start the shift\n\
             refresh             reload the reports table\n\
             restart             reload everything after a failed start-up\n\
             quit                leave the terminal (an active shift stays open)"
        }
        Screen::Main => {
            "set <field> <value> fill in a report field\n\
             submit              send the hourly report\n\
             refresh             reload the reports table\n\
             end                 end the shift and log out\n\
             discard             forget this terminal's saved shift without ending it\n\
             quit                leave the terminal (the shift stays open)"
        }
        Screen::Ended => {
            "restart             start over now\n\
             quit                leave the terminal"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_helper_lists_with_commas_and_spaces() {
        assert_eq!(
            parse("helpers 2, 1 4", Screen::Setup),
            Ok(Command::Dispatch(Event::SelectHelpers(vec![
                EmployeeId(2),
                EmployeeId(1),
                EmployeeId(4),
            ])))
        );
        assert_eq!(
            parse("helpers none", Screen::Setup),
            Ok(Command::Dispatch(Event::SelectHelpers(Vec::new())))
        );
    }

    #[test]
    fn set_keeps_spaces_in_values() {
        assert_eq!(
            parse("set notes belt slipping on line 2", Screen::Main),
            Ok(Command::Dispatch(Event::SetReportField {
                name: "notes".into(),
                value: "belt slipping on line 2".into(),
            }))
        );
    }

    #[test]
    fn commands_are_scoped_to_their_screen() {
        assert!(parse("submit", Screen::Setup).is_err());
        assert!(parse("start", Screen::Main).is_err());
        assert!(parse("refresh", Screen::Ended).is_err());
        assert_eq!(parse("end", Screen::Main), Ok(Command::EndShift));
        assert_eq!(
            parse("restart", Screen::Ended),
            Ok(Command::Dispatch(Event::RestartRequested))
        );
    }

    #[test]
    fn rejects_non_numeric_ids_and_unknown_verbs() {
        assert!(parse("operator Ana", Screen::Setup).is_err());
        assert!(parse("dance", Screen::Setup).is_err());
        assert!(parse("   ", Screen::Setup).is_err());
    }

    #[test]
    fn triggering_commands_name_their_control() {
        assert_eq!(
            parse("start", Screen::Setup).map(|c| c.control()),
            Ok(Some(ControlKind::StartShift))
        );
        assert_eq!(Command::Help.control(), None);
    }
}
