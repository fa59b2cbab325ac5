#![cfg(all(unix, feature = "cli"))]

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};
use std::thread;

use d7kit::alp::system_files::UID_LENGTH;
use d7kit::alp::{Action, Command as AlpCommand, FileData};
use d7kit::frame::{FrameError, FrameReader, FrameWriter, ALP_DATA, LOGGING};
use d7kit::transport::{ModemStream, UnixDomainSocket};

const READER_UID: [u8; UID_LENGTH] = [0x00, 0x0b, 0x57, 0x00, 0x00, 0x00, 0x12, 0x34];

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/d7kit-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

/// How the emulated radio link treats return-file-data commands.
#[derive(Clone, Copy)]
struct Link {
    /// Commands delivered per trial; the rest are lost.
    deliver: usize,
    /// Hold the first trial's lost commands and deliver them right after the
    /// reader's UID is read, i.e. once the next trial is being set up.
    late: bool,
}

impl Link {
    fn lossless() -> Self {
        Self {
            deliver: usize::MAX,
            late: false,
        }
    }

    fn lossy(deliver: usize) -> Self {
        Self {
            deliver,
            late: false,
        }
    }
}

/// Shared between the writer-side and reader-side emulator threads. A UID
/// read marks the start of the second trial.
#[derive(Default)]
struct LinkState {
    second_trial: bool,
    delivered: usize,
    held: Vec<Vec<u8>>,
}

/// Two emulated modems joined by a radio link.
struct ModemPair {
    dir: PathBuf,
    writer: PathBuf,
    reader: PathBuf,
}

impl ModemPair {
    fn start(tag: &str, link: Link) -> Self {
        let dir = unique_temp_dir(tag);
        let writer = dir.join("writer.sock");
        let reader = dir.join("reader.sock");
        let writer_socket = UnixDomainSocket::bind(&writer).expect("writer should bind");
        let reader_socket = UnixDomainSocket::bind(&reader).expect("reader should bind");

        thread::spawn(move || {
            let writer_conn = writer_socket.accept().expect("writer accept");
            let reader_conn = reader_socket.accept().expect("reader accept");
            let reader_out = Arc::new(Mutex::new(FrameWriter::new(
                reader_conn.try_clone().expect("clone reader"),
            )));
            let state = Arc::new(Mutex::new(LinkState::default()));

            let uid_out = Arc::clone(&reader_out);
            let uid_state = Arc::clone(&state);
            thread::spawn(move || answer_uid_requests(reader_conn, uid_out, uid_state));
            forward_radio_traffic(writer_conn, reader_out, state, link);
        });

        Self {
            dir,
            writer,
            reader,
        }
    }

    fn run(&self, extra: &[&str]) -> std::process::Output {
        Command::new(env!("CARGO_BIN_EXE_d7kit"))
            .args(["--log-level", "error", "--format", "json", "throughput"])
            .arg("-w")
            .arg(&self.writer)
            .arg("-R")
            .arg(&self.reader)
            .args(extra)
            .output()
            .expect("throughput should run")
    }
}

impl Drop for ModemPair {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

fn forward_radio_traffic(
    conn: ModemStream,
    reader_out: Arc<Mutex<FrameWriter<ModemStream>>>,
    state: Arc<Mutex<LinkState>>,
    link: Link,
) {
    let mut frames = FrameReader::new(conn);
    loop {
        let frame = match frames.read_frame() {
            Ok(frame) => frame,
            Err(FrameError::ConnectionClosed) => return,
            Err(err) => panic!("writer side failed: {err}"),
        };
        if frame.msg_type != ALP_DATA {
            continue;
        }
        let command = AlpCommand::parse(&frame.payload).expect("writer sent valid alp");
        let forwarded = command
            .actions
            .iter()
            .any(|action| matches!(action, Action::Forward(_)));
        let Some(data) = command.return_file_payload() else {
            continue;
        };
        if !forwarded {
            continue;
        }
        let received = AlpCommand::return_file_data(data.file_id, data.data.clone(), None);
        let payload = received.to_bytes().expect("encode");

        let mut state = state.lock().expect("link state lock");
        if state.delivered >= link.deliver {
            if link.late && !state.second_trial {
                state.held.push(payload);
            }
            continue;
        }
        state.delivered += 1;
        let mut out = reader_out.lock().expect("reader writer lock");
        if out.send(ALP_DATA, &payload).is_err() {
            return;
        }
    }
}

fn answer_uid_requests(
    conn: ModemStream,
    reader_out: Arc<Mutex<FrameWriter<ModemStream>>>,
    state: Arc<Mutex<LinkState>>,
) {
    let mut frames = FrameReader::new(conn);
    while let Ok(frame) = frames.read_frame() {
        let Ok(command) = AlpCommand::parse(&frame.payload) else {
            continue;
        };
        let asks_uid = command.actions.iter().any(|action| {
            matches!(action, Action::ReadFileData(request) if request.file_id == 0)
        });
        if !asks_uid {
            continue;
        }
        let answer = AlpCommand::new(vec![Action::ReturnFileData(FileData::new(
            0,
            0,
            READER_UID.to_vec(),
        ))]);

        let mut state = state.lock().expect("link state lock");
        state.second_trial = true;
        state.delivered = 0;
        let mut out = reader_out.lock().expect("reader writer lock");
        let _ = out.send(LOGGING, b"uid requested");
        if out
            .send(ALP_DATA, &answer.to_bytes().expect("encode"))
            .is_err()
        {
            return;
        }
        for late in state.held.drain(..) {
            if out.send(ALP_DATA, &late).is_err() {
                return;
            }
        }
    }
}

fn trial_reports(output: &std::process::Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line should be json"))
        .collect()
}

fn field<'a>(report: &'a serde_json::Value, name: &str) -> &'a serde_json::Value {
    report.get(name).unwrap_or(&serde_json::Value::Null)
}

#[test]
fn lossless_link_passes_both_trials() {
    let pair = ModemPair::start("pass", Link::lossless());
    let output = pair.run(&["-n", "5", "-p", "16", "--timeout", "3s"]);

    assert_eq!(
        output.status.code(),
        Some(0),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let reports = trial_reports(&output);
    assert_eq!(reports.len(), 2);
    for report in &reports {
        assert_eq!(field(report, "verdict").as_str(), Some("OK"));
        assert_eq!(field(report, "received_count").as_u64(), Some(5));
        assert_eq!(field(report, "timed_out").as_bool(), Some(false));
    }
    let unicast = field(&reports[1], "interface").as_str().unwrap_or("");
    assert!(unicast.contains("000b570000001234"), "interface: {unicast}");
}

#[test]
fn lossy_link_fails_with_timeout() {
    // Each trial gets 3 of 5 through.
    let pair = ModemPair::start("lossy", Link::lossy(3));
    let output = pair.run(&["-n", "5", "-p", "16", "--timeout", "300ms"]);

    assert_eq!(output.status.code(), Some(30));
    let reports = trial_reports(&output);
    assert_eq!(reports.len(), 2);
    for report in &reports {
        assert_eq!(field(report, "verdict").as_str(), Some("NOK"));
        assert_eq!(field(report, "received_count").as_u64(), Some(3));
        assert_eq!(field(report, "timed_out").as_bool(), Some(true));
    }
}

#[test]
fn late_copies_do_not_count_toward_the_next_trial() {
    // The two broadcast copies lost in trial one show up while trial two is
    // starting; they carry the same payload but must not be counted there.
    let pair = ModemPair::start(
        "late",
        Link {
            deliver: 3,
            late: true,
        },
    );
    let output = pair.run(&["-n", "5", "-p", "16", "--timeout", "300ms"]);

    assert_eq!(output.status.code(), Some(30));
    let reports = trial_reports(&output);
    assert_eq!(reports.len(), 2);
    assert_eq!(field(&reports[0], "received_count").as_u64(), Some(3));
    assert_eq!(field(&reports[1], "verdict").as_str(), Some("NOK"));
    assert_eq!(field(&reports[1], "received_count").as_u64(), Some(3));
    assert_eq!(field(&reports[1], "timed_out").as_bool(), Some(true));
}

#[test]
fn oversized_payload_is_rejected_before_opening_modems() {
    let output = Command::new(env!("CARGO_BIN_EXE_d7kit"))
        .args(["--log-level", "error", "throughput", "-p", "250"])
        .args(["-w", "/nonexistent/writer", "-R", "/nonexistent/reader"])
        .output()
        .expect("throughput should run");
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn huge_payload_size_is_a_usage_error() {
    let output = Command::new(env!("CARGO_BIN_EXE_d7kit"))
        .args(["--log-level", "error", "throughput", "-p", "100000000000"])
        .args(["-w", "/nonexistent/writer", "-R", "/nonexistent/reader"])
        .output()
        .expect("throughput should run");
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn missing_writer_is_a_transport_error() {
    let dir = unique_temp_dir("missing");
    let missing: &Path = &dir.join("absent.sock");
    let output = Command::new(env!("CARGO_BIN_EXE_d7kit"))
        .args(["--log-level", "error", "throughput"])
        .arg("-w")
        .arg(missing)
        .arg("-R")
        .arg(missing)
        .output()
        .expect("throughput should run");
    assert_eq!(output.status.code(), Some(3));
    let _ = std::fs::remove_dir_all(&dir);
}
