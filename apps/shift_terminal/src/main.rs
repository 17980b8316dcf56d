mod commands;
mod config;
mod screen;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    machine::{DISCARD_SESSION_CONFIRMATION, END_SHIFT_CONFIRMATION},
    Event, HttpGateway, ShiftClient, SqliteSessionStore,
};
use commands::Command;
use storage::Storage;
use tokio::{
    io::{AsyncBufReadExt, BufReader, Lines, Stdin},
    time::{sleep_until, Instant},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

type Client = ShiftClient<HttpGateway, SqliteSessionStore>;

#[derive(Parser, Debug)]
#[command(about = "Shift terminal for production-floor operators")]
struct Args {
    /// Deployed web app endpoint (overrides WEB_APP_URL).
    #[arg(long)]
    web_app_url: Option<String>,
    /// Where the active shift is kept between runs.
    #[arg(long)]
    database_url: Option<String>,
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    #[arg(long)]
    restart_delay_seconds: Option<u64>,
    /// Comma separated report field names.
    #[arg(long, value_delimiter = ',')]
    report_fields: Option<Vec<String>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = config::load_settings(&args.config);
    if let Some(url) = args.web_app_url {
        settings.web_app_url = Some(url);
    }
    if let Some(url) = args.database_url {
        settings.database_url = url;
    }
    if let Some(delay) = args.restart_delay_seconds {
        settings.restart_delay_seconds = delay;
    }
    if let Some(fields) = args.report_fields {
        settings.report_fields = fields
            .iter()
            .flat_map(|raw| config::split_fields(raw))
            .collect();
    }
    let database_url = config::normalize_database_url(&settings.database_url);

    let storage = Storage::new(&database_url)
        .await
        .with_context(|| format!("failed to open local storage at {database_url}"))?;
    let gateway = HttpGateway::new(settings.web_app_url()?)?;
    info!(web_app_url = %gateway.web_app_url(), %database_url, "shift terminal starting");

    let mut client = ShiftClient::new(
        gateway,
        SqliteSessionStore::new(storage),
        settings.machine_config(),
    );
    let alerts = client.init().await;
    show(&client, &alerts);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt(&client);
        let deadline = client.restart_deadline();
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read input")?,
            Some(completion) = client.next_completion() => {
                let alerts = client.dispatch(completion).await;
                show(&client, &alerts);
                continue;
            }
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                let alerts = client.poll_restart().await;
                show(&client, &alerts);
                continue;
            }
        };
        let Some(line) = line else {
            break;
        };

        let command = match commands::parse(&line, client.machine().screen()) {
            Ok(command) => command,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        if let Some(kind) = command.control() {
            let control = client.machine().controls().get(kind);
            if !control.is_enabled() {
                println!("`{}` is not available right now.", control.label());
                continue;
            }
        }

        let event = match command {
            Command::Quit => break,
            Command::Help => {
                println!("{}", commands::help(client.machine().screen()));
                continue;
            }
            Command::Dispatch(event) => event,
            Command::EndShift => Event::EndShiftRequested {
                confirmed: confirm(&mut lines, END_SHIFT_CONFIRMATION).await?,
            },
            Command::DiscardSession => Event::DiscardSessionRequested {
                confirmed: confirm(&mut lines, DISCARD_SESSION_CONFIRMATION).await?,
            },
        };

        let alerts = client.dispatch(event).await;
        show(&client, &alerts);
    }

    if client.in_flight() > 0 {
        println!("Waiting for the service to answer before closing...");
        let alerts = client.settle().await;
        show(&client, &alerts);
    }
    info!("shift terminal closed");
    Ok(())
}

fn show(client: &Client, alerts: &[String]) {
    let restart_in = client
        .restart_deadline()
        .map(|deadline| deadline.saturating_duration_since(Instant::now()));
    print!("{}", screen::render(client.machine(), restart_in));
    if client.in_flight() > 0 {
        println!("Waiting for the service...");
    }
    for alert in alerts {
        println!("\n!! {alert}");
    }
}

fn prompt(client: &Client) {
    use std::io::Write as _;

    print!("\n{}> ", commands::screen_name(client.machine().screen()));
    let _ = std::io::stdout().flush();
}

async fn confirm(lines: &mut Lines<BufReader<Stdin>>, question: &str) -> Result<bool> {
    use std::io::Write as _;

    print!("{question} [y/N] ");
    let _ = std::io::stdout().flush();
    let answer = lines
        .next_line()
        .await
        .context("failed to read confirmation")?
        .unwrap_or_default();
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}
