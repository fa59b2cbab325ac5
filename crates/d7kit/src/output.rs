use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use d7kit::alp::{Action, Command, FirmwareVersionFile, SystemFile};
use d7kit::harness::TrialReport;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MismatchOutput<'a> {
    index: usize,
    received: &'a str,
}

#[derive(Serialize)]
struct TrialOutput<'a> {
    trial: &'a str,
    interface: &'a str,
    verdict: &'static str,
    target_count: usize,
    received_count: usize,
    payload_size: usize,
    mismatches: Vec<MismatchOutput<'a>>,
    timed_out: bool,
    receive_error: Option<&'a str>,
    send_elapsed_ms: f64,
    total_elapsed_ms: f64,
    throughput_bps: Option<f64>,
}

pub fn print_trial(trial: &str, interface: &str, report: &TrialReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = TrialOutput {
                trial,
                interface,
                verdict: report.verdict().as_str(),
                target_count: report.target_count,
                received_count: report.received_count,
                payload_size: report.payload_len,
                mismatches: report
                    .mismatches
                    .iter()
                    .map(|m| MismatchOutput {
                        index: m.index,
                        received: &m.description,
                    })
                    .collect(),
                timed_out: report.timed_out,
                receive_error: report.receive_error.as_deref(),
                send_elapsed_ms: millis(report.send_elapsed),
                total_elapsed_ms: millis(report.total_elapsed),
                throughput_bps: report.throughput_bps(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"])
                .add_row(vec!["trial", trial])
                .add_row(vec!["interface", interface])
                .add_row(vec!["verdict", report.verdict().as_str()])
                .add_row(vec![
                    "received".to_string(),
                    format!("{}/{}", report.received_count, report.target_count),
                ])
                .add_row(vec!["payload size".to_string(), report.payload_len.to_string()])
                .add_row(vec![
                    "mismatches".to_string(),
                    report.mismatches.len().to_string(),
                ])
                .add_row(vec!["timed out".to_string(), report.timed_out.to_string()])
                .add_row(vec![
                    "send time".to_string(),
                    format!("{:.3} s", report.send_elapsed.as_secs_f64()),
                ])
                .add_row(vec!["throughput".to_string(), throughput_text(report)]);
            if let Some(err) = &report.receive_error {
                table.add_row(vec!["receive error", err.as_str()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("==> {trial} ({interface})");
            println!(
                "writer: sending {} messages completed in: {:.3} s",
                report.target_count,
                report.send_elapsed.as_secs_f64()
            );
            println!(
                "writer: throughput = {} with a payload size of {} bytes",
                throughput_text(report),
                report.payload_len
            );
            if report.timed_out {
                println!("reader: timed out waiting for all messages");
            }
            for mismatch in &report.mismatches {
                println!(
                    "reader: received unexpected command #{}: {}",
                    mismatch.index, mismatch.description
                );
            }
            if let Some(err) = &report.receive_error {
                println!("reader: receive failed: {err}");
            }
            println!("reader: {report}");
        }
    }
}

#[derive(Serialize)]
struct FirmwareVersionOutput<'a> {
    #[serde(flatten)]
    file: &'a FirmwareVersionFile,
    hex: String,
}

pub fn print_firmware_version(file: &FirmwareVersionFile, format: OutputFormat) {
    let hex = hex_string(&file.to_bytes());
    match format {
        OutputFormat::Json => {
            let out = FirmwareVersionOutput { file, hex };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["APPLICATION", "GIT SHA1", "BYTES"])
                .add_row(vec![
                    file.application_name().escape_default().to_string(),
                    file.git_sha1().escape_default().to_string(),
                    hex,
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "application_name: {}",
                file.application_name().escape_default()
            );
            println!("git_sha1: {}", file.git_sha1().escape_default());
            println!("bytes: {hex}");
        }
    }
}

#[derive(Serialize)]
struct CommandOutput<'a> {
    endpoint: &'a str,
    actions: Vec<String>,
    return_file_id: Option<u8>,
    return_data: Option<String>,
    timestamp: String,
}

pub fn print_command(endpoint: &str, command: &Command, format: OutputFormat) {
    let returned = command.return_file_payload();
    match format {
        OutputFormat::Json => {
            let out = CommandOutput {
                endpoint,
                actions: command.actions.iter().map(Action::to_string).collect(),
                return_file_id: returned.map(|d| d.file_id),
                return_data: returned.map(|d| hex_string(&d.data)),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "ACTION"]);
            for (index, action) in command.actions.iter().enumerate() {
                table.add_row(vec![index.to_string(), action.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{endpoint}: {command}");
        }
    }
}

pub fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn throughput_text(report: &TrialReport) -> String {
    match report.throughput_bps() {
        Some(bps) => format!("{bps:.0} bps"),
        None => "n/a".to_string(),
    }
}

fn millis(duration: std::time::Duration) -> f64 {
    (duration.as_secs_f64() * 1000.0 * 100.0).round() / 100.0
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
