// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Labelpress — unattended label poller, storage and print station.
//
// Entry point. Initialises logging, parses the command line, opens backend
// services, and runs the requested operation.

mod services;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use labelpress_core::error::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use services::app_services::AppServices;
use services::pipeline::CycleOutcome;
use services::poller::PollerHandle;

#[derive(Parser)]
#[command(name = "labelpress", version)]
#[command(about = "Poll a remote source for labels, store them as PDF, and print them", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll on the configured interval until interrupted (default mode)
    Run,
    /// Run a single poll cycle and exit
    Once,
    /// Forget every processed file so it can be fetched again
    ClearLedger,
    /// Check that the configured endpoint answers
    TestConnection,
    /// Print the most recent event log lines
    Logs {
        /// Number of lines to show
        #[arg(default_value_t = 50)]
        count: usize,
    },
    /// Change and persist settings
    Configure {
        /// Endpoint returning pending labels
        #[arg(long)]
        endpoint: Option<String>,
        /// Caller id sent as `user_id`
        #[arg(long)]
        user_id: Option<String>,
        /// Seconds between polls
        #[arg(long)]
        interval: Option<u64>,
        /// Save finished documents to the destination folder
        #[arg(long)]
        save: Option<bool>,
        /// Destination folder
        #[arg(long)]
        save_path: Option<String>,
        /// Print finished documents directly
        #[arg(long)]
        print: Option<bool>,
        /// Printer name as known to the operating system
        #[arg(long)]
        device: Option<String>,
        /// Wrap image payloads into a PDF page
        #[arg(long)]
        convert_images: Option<bool>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    tracing::info!("Labelpress starting");

    let services = match AppServices::init() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "persistent storage could not be opened");
            eprintln!("labelpress: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = execute(&services, cli.command.unwrap_or(Commands::Run)).await;
    services.shutdown().await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("labelpress: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn execute(services: &AppServices, command: Commands) -> Result<()> {
    match command {
        Commands::Run => {
            let poller =
                PollerHandle::spawn(services.pipeline(), services.events(), services.settings());

            // Operator commands arrive one per line on stdin; a closed stdin
            // (service manager) just leaves the signal as the only way out.
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            let mut stdin_open = true;
            loop {
                tokio::select! {
                    signal = tokio::signal::ctrl_c() => {
                        if let Err(e) = signal {
                            tracing::warn!(error = %e, "could not listen for ctrl-c, stopping");
                        }
                        break;
                    }
                    line = lines.next_line(), if stdin_open => match line {
                        Ok(Some(line)) => operator_command(services, &poller, line.trim()),
                        Ok(None) | Err(_) => stdin_open = false,
                    },
                }
            }
            poller.shutdown().await;
            Ok(())
        }
        Commands::Once => {
            let outcome = services.pipeline().run_cycle(&services.settings()).await;
            match outcome {
                CycleOutcome::Completed(summary) => println!("{summary}"),
                CycleOutcome::Message(message) => println!("{message}"),
                other => println!("{other:?}"),
            }
            Ok(())
        }
        Commands::ClearLedger => {
            let removed = services.clear_ledger()?;
            println!("Cleared {removed} processed file entries.");
            Ok(())
        }
        Commands::TestConnection => {
            let report = services.test_connection().await?;
            println!("HTTP {} ({} bytes)", report.status, report.body_len);
            Ok(())
        }
        Commands::Logs { count } => {
            for line in services.events().read_recent(count)? {
                println!("{line}");
            }
            Ok(())
        }
        Commands::Configure {
            endpoint,
            user_id,
            interval,
            save,
            save_path,
            print,
            device,
            convert_images,
        } => {
            let mut settings = services.settings();
            if let Some(v) = endpoint {
                settings.endpoint_url = v;
            }
            if let Some(v) = user_id {
                settings.caller_id = v;
            }
            if let Some(v) = interval {
                settings.poll_interval_secs = v;
            }
            if let Some(v) = save {
                settings.save_enabled = v;
            }
            if let Some(v) = save_path {
                settings.save_path = v;
            }
            if let Some(v) = print {
                settings.print_enabled = v;
            }
            if let Some(v) = device {
                settings.device_name = v;
            }
            if let Some(v) = convert_images {
                settings.convert_images = v;
            }
            services.save_settings(&settings)?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
            println!("Saved to {}", services.data_dir().display());
            Ok(())
        }
    }
}

/// Handle one line typed while `run` is active.
fn operator_command(services: &AppServices, poller: &PollerHandle, command: &str) {
    match command {
        "" => {}
        "pause" => poller.pause(),
        "resume" => poller.resume(),
        "poll" => poller.trigger(),
        "reload" => match services.reload_settings() {
            Ok(settings) => poller.update_settings(settings),
            Err(e) => eprintln!("labelpress: could not reload settings: {e}"),
        },
        "status" => {
            let settings = poller.settings();
            println!(
                "{} - interval {}s, save {}, print {}",
                if poller.is_paused() { "paused" } else { "polling" },
                settings.poll_interval().as_secs(),
                settings.save_enabled,
                settings.print_enabled
            );
        }
        other => println!("unknown command '{other}' (pause, resume, poll, reload, status)"),
    }
}
