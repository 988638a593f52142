// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print strategies — external programs that hand a staged file to the OS
// print subsystem.
//
// Two kinds exist:
//   Launch:  fire an OS print action. Success means the launcher started
//            and did not fail within the wait window; it may keep running.
//   Command: run a print utility to completion. Only exit code 0 counts.
//
// Argument templates may contain `{device}` and `{file}` placeholders. The
// substituted values are quoted according to the strategy's `Quoting`, so a
// device name or temp path with spaces or apostrophes stays one argument.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use labelpress_core::error::{LabelpressError, Result};
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// How a strategy's process outcome is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Launch,
    Command,
}

/// How placeholder values are made safe for the receiving program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quoting {
    /// Values are substituted as they are; each argument reaches the program
    /// as one argv entry.
    #[default]
    Verbatim,
    /// Values sit inside a single-quoted PowerShell string: `'` becomes `''`.
    PowerShell,
    /// Values are wrapped in double quotes and the arguments are appended to
    /// the command line as written, for `cmd.exe`.
    Cmd,
}

impl Quoting {
    fn apply(self, value: &str) -> String {
        match self {
            Self::Verbatim => value.to_owned(),
            Self::PowerShell => value.replace('\'', "''"),
            // Neither printer names nor paths can contain `"` on Windows.
            Self::Cmd => format!("\"{}\"", value.replace('"', "")),
        }
    }
}

/// One way of sending a file to a named device.
#[derive(Debug, Clone)]
pub struct PrintStrategy {
    pub name: String,
    pub kind: StrategyKind,
    pub program: String,
    pub args: Vec<String>,
    pub quoting: Quoting,
}

impl PrintStrategy {
    pub fn launch(name: &str, program: &str, args: &[&str]) -> Self {
        Self::build(name, StrategyKind::Launch, program, args)
    }

    pub fn command(name: &str, program: &str, args: &[&str]) -> Self {
        Self::build(name, StrategyKind::Command, program, args)
    }

    fn build(name: &str, kind: StrategyKind, program: &str, args: &[&str]) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            program: program.to_owned(),
            args: args.iter().map(|a| (*a).to_owned()).collect(),
            quoting: Quoting::Verbatim,
        }
    }

    pub fn with_quoting(mut self, quoting: Quoting) -> Self {
        self.quoting = quoting;
        self
    }

    /// Arguments with placeholders substituted and quoted.
    pub fn render_args(&self, device: &str, file: &Path) -> Vec<String> {
        let device = self.quoting.apply(device);
        let file = self.quoting.apply(&file.display().to_string());
        self.args
            .iter()
            .map(|arg| arg.replace("{device}", &device).replace("{file}", &file))
            .collect()
    }

    /// Run this strategy against `file`, waiting at most `wait`.
    #[instrument(skip(self, file), fields(strategy = %self.name, kind = ?self.kind))]
    pub async fn run(&self, device: &str, file: &Path, wait: Duration) -> Result<()> {
        let args = self.render_args(device, file);
        debug!(program = %self.program, ?args, "spawning print strategy");

        let mut command = std::process::Command::new(&self.program);
        self.push_args(&mut command, &args);
        let mut child = Command::from(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| self.failure(format!("could not start {}: {e}", self.program)))?;

        match tokio::time::timeout(wait, child.wait()).await {
            Ok(Ok(status)) if status.success() => {
                info!("print strategy succeeded");
                Ok(())
            }
            Ok(Ok(status)) => Err(self.failure(match status.code() {
                Some(code) => format!("exited with code {code}"),
                None => "terminated by signal".to_owned(),
            })),
            Ok(Err(e)) => Err(self.failure(format!("wait failed: {e}"))),
            Err(_) => match self.kind {
                StrategyKind::Launch => {
                    info!(
                        wait_secs = wait.as_secs(),
                        "Print process is taking longer than expected, continuing"
                    );
                    Ok(())
                }
                StrategyKind::Command => {
                    if let Err(e) = child.start_kill() {
                        warn!(error = %e, "could not stop timed-out print command");
                    }
                    Err(self.failure(format!("timed out after {}s", wait.as_secs())))
                }
            },
        }
    }

    fn push_args(&self, command: &mut std::process::Command, args: &[String]) {
        #[cfg(windows)]
        {
            if self.quoting == Quoting::Cmd {
                use std::os::windows::process::CommandExt;
                for arg in args {
                    command.raw_arg(arg);
                }
                return;
            }
        }
        command.args(args);
    }

    fn failure(&self, reason: String) -> LabelpressError {
        LabelpressError::PrintStrategy {
            strategy: self.name.clone(),
            reason,
        }
    }
}

/// The layered strategies for the current platform, in attempt order.
pub fn platform_defaults() -> Vec<PrintStrategy> {
    if cfg!(windows) {
        windows_defaults()
    } else {
        unix_defaults()
    }
}

/// PowerShell `PrintTo` verb, then the `print` command.
pub fn windows_defaults() -> Vec<PrintStrategy> {
    vec![
        PrintStrategy::launch(
            "print-verb",
            "powershell",
            &[
                "-NoProfile",
                "-NonInteractive",
                "-WindowStyle",
                "Hidden",
                "-Command",
                "Start-Process -FilePath '{file}' -Verb PrintTo -ArgumentList '\"{device}\"' -WindowStyle Hidden",
            ],
        )
        .with_quoting(Quoting::PowerShell),
        PrintStrategy::command("print-command", "cmd", &["/c", "print", "/D:{device}", "{file}"])
            .with_quoting(Quoting::Cmd),
    ]
}

/// CUPS `lp`, then BSD `lpr`.
pub fn unix_defaults() -> Vec<PrintStrategy> {
    vec![
        PrintStrategy::launch("lp", "lp", &["-d", "{device}", "{file}"]),
        PrintStrategy::command("lpr", "lpr", &["-P", "{device}", "{file}"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_substituted() {
        let strategy = PrintStrategy::command("lpr", "lpr", &["-P", "{device}", "{file}"]);
        let args = strategy.render_args("Zebra GK420", Path::new("/tmp/labelpress_x.pdf"));
        assert_eq!(args, vec!["-P", "Zebra GK420", "/tmp/labelpress_x.pdf"]);
    }

    #[test]
    fn powershell_values_keep_apostrophes_inside_the_string() {
        let verb = &windows_defaults()[0];
        let args = verb.render_args(
            "O'Neil Zebra",
            Path::new(r"C:\Users\O'Brien\AppData\Local\Temp\labelpress_x.pdf"),
        );
        assert_eq!(
            args.last().unwrap(),
            r#"Start-Process -FilePath 'C:\Users\O''Brien\AppData\Local\Temp\labelpress_x.pdf' -Verb PrintTo -ArgumentList '"O''Neil Zebra"' -WindowStyle Hidden"#
        );
    }

    #[test]
    fn cmd_values_are_double_quoted() {
        let print = &windows_defaults()[1];
        let args = print.render_args(
            "Zebra GK420",
            Path::new(r"C:\Users\O'Brien\Temp\labelpress_x.pdf"),
        );
        assert_eq!(
            args,
            vec![
                "/c",
                "print",
                r#"/D:"Zebra GK420""#,
                r#""C:\Users\O'Brien\Temp\labelpress_x.pdf""#,
            ]
        );
    }

    #[test]
    fn defaults_have_launch_then_command() {
        let defaults = platform_defaults();
        assert_eq!(defaults.len(), 2);
        assert_eq!(defaults[0].kind, StrategyKind::Launch);
        assert_eq!(defaults[1].kind, StrategyKind::Command);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_exit_codes() {
        let file = Path::new("/dev/null");
        let ok = PrintStrategy::command("ok", "true", &[]);
        assert!(ok.run("dev", file, Duration::from_secs(5)).await.is_ok());

        let bad = PrintStrategy::command("bad", "false", &[]);
        let err = bad.run("dev", file, Duration::from_secs(5)).await.unwrap_err();
        assert!(err.to_string().contains("bad"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_program_fails() {
        let strategy = PrintStrategy::launch("ghost", "labelpress-no-such-program", &[]);
        let result = strategy
            .run("dev", Path::new("/dev/null"), Duration::from_secs(1))
            .await;
        assert!(matches!(result, Err(LabelpressError::PrintStrategy { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_launch_counts_as_started_but_slow_command_fails() {
        let file = Path::new("/dev/null");
        let wait = Duration::from_millis(200);

        let launch = PrintStrategy::launch("slow-launch", "sleep", &["2"]);
        assert!(launch.run("dev", file, wait).await.is_ok());

        let command = PrintStrategy::command("slow-command", "sleep", &["2"]);
        assert!(command.run("dev", file, wait).await.is_err());
    }
}
