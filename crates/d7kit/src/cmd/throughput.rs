use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::time::Duration;

use d7kit::alp::system_files::UID_LENGTH;
use d7kit::alp::{
    Addressee, Command, D7aspConfiguration, DllConfigFile, InterfaceConfiguration, QoS,
    ResponseMode,
};
use d7kit::frame::DEFAULT_MAX_PAYLOAD;
use d7kit::harness::{
    CancellationToken, FrameSource, HarnessConfig, ReceivedFrame, ThroughputHarness, TrialReport,
};
use d7kit::modem::{CommandReceiver, Modem, ModemConfig, ModemError};
use tracing::info;

use crate::cmd::{parse_timeout, ThroughputArgs};
use crate::exit::{
    alp_error, harness_error, modem_error, CliError, CliResult, SUCCESS, TRIAL_FAILED, USAGE,
};
use crate::output::{print_trial, OutputFormat};

/// Access class the writer is switched to, and both trials address.
const TRIAL_ACCESS_CLASS: u8 = 2;

/// User file the payload is returned as.
const PAYLOAD_FILE_ID: u8 = 0x40;

/// Everything a throughput run needs, fixed before any modem is opened.
#[derive(Debug, Clone)]
pub struct TrialPlan {
    pub msg_count: usize,
    pub payload: Vec<u8>,
    pub writer: PathBuf,
    pub reader: PathBuf,
    pub modem: ModemConfig,
    pub gate_timeout: Duration,
    pub access_class: u8,
    pub file_id: u8,
}

impl TrialPlan {
    pub fn from_args(args: ThroughputArgs) -> CliResult<Self> {
        if args.msg_count == 0 {
            return Err(CliError::new(USAGE, "message count must be greater than zero"));
        }
        // The payload alone already exceeds a frame; refuse before allocating it.
        if args.payload_size > DEFAULT_MAX_PAYLOAD {
            return Err(CliError::new(
                USAGE,
                format!(
                    "payload size {} does not fit in one modem frame ({} bytes max)",
                    args.payload_size, DEFAULT_MAX_PAYLOAD
                ),
            ));
        }

        let plan = Self {
            msg_count: args.msg_count,
            payload: (0..args.payload_size).map(|i| i as u8).collect(),
            writer: args.serial_writer,
            reader: args.serial_reader,
            modem: ModemConfig {
                rate: args.rate,
                ..ModemConfig::default()
            },
            gate_timeout: parse_timeout(&args.timeout)?,
            access_class: TRIAL_ACCESS_CLASS,
            file_id: PAYLOAD_FILE_ID,
        };

        // The unicast command carries the longest addressee; if it fits in
        // one frame, both trials do.
        let largest = plan.command(&Trial::unicast(plan.access_class, [0; UID_LENGTH]));
        let encoded = largest
            .to_bytes()
            .map_err(|err| alp_error("invalid trial command", err))?;
        if encoded.len() > DEFAULT_MAX_PAYLOAD {
            return Err(CliError::new(
                USAGE,
                format!(
                    "payload size {} does not fit in one modem frame ({} of {} bytes)",
                    plan.payload.len(),
                    encoded.len(),
                    DEFAULT_MAX_PAYLOAD
                ),
            ));
        }

        Ok(plan)
    }

    fn harness_config(&self) -> HarnessConfig {
        HarnessConfig {
            target_count: self.msg_count,
            gate_timeout: self.gate_timeout,
        }
    }

    fn command(&self, trial: &Trial) -> Command {
        Command::return_file_data(
            self.file_id,
            self.payload.clone(),
            Some(trial.interface.clone()),
        )
    }
}

struct Trial {
    name: &'static str,
    interface: InterfaceConfiguration,
}

impl Trial {
    fn broadcast(access_class: u8) -> Self {
        Self {
            name: "broadcast, no QoS",
            interface: InterfaceConfiguration::D7asp(D7aspConfiguration::new(
                QoS::new(ResponseMode::No),
                Addressee::broadcast(access_class),
            )),
        }
    }

    fn unicast(access_class: u8, uid: [u8; UID_LENGTH]) -> Self {
        Self {
            name: "unicast, with QoS",
            interface: InterfaceConfiguration::D7asp(D7aspConfiguration::new(
                QoS::new(ResponseMode::Any),
                Addressee::unicast(access_class, uid),
            )),
        }
    }
}

/// Reader modem as the harness's frame source.
struct ModemSource(CommandReceiver);

impl FrameSource for ModemSource {
    type Frame = ReceivedCommand;
    type Error = ModemError;

    fn next_frame(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Option<ReceivedCommand>, ModemError> {
        Ok(self.0.recv(cancel)?.map(ReceivedCommand))
    }
}

/// A command seen by the reader. It carries the payload when its first
/// returned file region holds exactly the bytes that were sent.
#[derive(Debug)]
struct ReceivedCommand(Command);

impl ReceivedFrame for ReceivedCommand {
    fn matches_payload(&self, expected: &[u8]) -> bool {
        self.0
            .return_file_payload()
            .is_some_and(|data| data.data.as_ref() == expected)
    }

    fn describe(&self) -> String {
        self.0.to_string()
    }
}

pub fn run(args: ThroughputArgs, format: OutputFormat) -> CliResult<i32> {
    let plan = TrialPlan::from_args(args)?;

    let mut writer = Modem::open(&plan.writer, plan.modem.clone())
        .map_err(|err| modem_error("open writer modem failed", err))?;
    let mut reader = Modem::open(&plan.reader, plan.modem.clone())
        .map_err(|err| modem_error("open reader modem failed", err))?;

    writer
        .send_command(&Command::write_system_file(
            &DllConfigFile::with_active_access_class(plan.access_class),
        ))
        .map_err(|err| modem_error("configure writer modem failed", err))?;
    info!(access_class = plan.access_class, "writer access class set");

    let broadcast = Trial::broadcast(plan.access_class);
    let first = run_trial(&plan, &broadcast, &mut writer, &reader)?;
    print_trial(broadcast.name, &broadcast.interface.to_string(), &first, format);

    let uid = reader
        .read_uid()
        .map_err(|err| modem_error("read reader uid failed", err))?;
    let unicast = Trial::unicast(plan.access_class, uid);
    let second = run_trial(&plan, &unicast, &mut writer, &reader)?;
    print_trial(unicast.name, &unicast.interface.to_string(), &second, format);

    if first.is_pass() && second.is_pass() {
        Ok(SUCCESS)
    } else {
        Ok(TRIAL_FAILED)
    }
}

fn run_trial(
    plan: &TrialPlan,
    trial: &Trial,
    writer: &mut Modem,
    reader: &Modem,
) -> CliResult<TrialReport> {
    info!(
        trial = trial.name,
        interface = %trial.interface,
        payload_size = plan.payload.len(),
        msg_count = plan.msg_count,
        "running throughput trial"
    );

    // Every send is the same command; encode it once.
    let encoded = plan
        .command(trial)
        .to_bytes()
        .map_err(|err| alp_error("invalid trial command", err))?;
    let mut receiver = reader
        .receiver()
        .map_err(|err| modem_error("open reader modem failed", err))?;
    // Copies still in flight from a previous timed-out trial carry the same
    // payload and would count toward this one.
    receiver
        .drain(plan.gate_timeout)
        .map_err(|err| modem_error("drain reader modem failed", err))?;
    let source = ModemSource(receiver);

    let mut harness = ThroughputHarness::new(plan.harness_config())
        .map_err(|err| harness_error("trial setup failed", err))?;
    if std::io::stderr().is_terminal() {
        harness = harness.with_progress(print_progress);
    }

    harness
        .run(&plan.payload, source, |_: &[u8]| writer.send_alp(&encoded))
        .map_err(|err| harness_error("trial failed", err))
}

fn print_progress(sent: usize, total: usize) {
    let mut err = std::io::stderr();
    let _ = write!(err, "\r{sent}/{total}");
    if sent == total {
        let _ = writeln!(err);
    }
    let _ = err.flush();
}

#[cfg(test)]
mod tests {
    use d7kit::alp::{Action, FileData};

    use super::*;

    fn args(msg_count: usize, payload_size: usize) -> ThroughputArgs {
        ThroughputArgs {
            msg_count,
            payload_size,
            serial_writer: PathBuf::from("/dev/ttyUSB0"),
            serial_reader: PathBuf::from("/dev/ttyUSB1"),
            rate: 115_200,
            timeout: "5s".to_string(),
        }
    }

    #[test]
    fn plan_counts_up_payload_bytes() {
        let plan = TrialPlan::from_args(args(10, 5)).unwrap();
        assert_eq!(plan.payload, vec![0, 1, 2, 3, 4]);
        assert_eq!(plan.gate_timeout, Duration::from_secs(5));
        assert_eq!(plan.harness_config().target_count, 10);
    }

    #[test]
    fn plan_rejects_zero_messages() {
        assert_eq!(TrialPlan::from_args(args(0, 5)).unwrap_err().code, USAGE);
    }

    #[test]
    fn plan_rejects_payload_larger_than_a_frame() {
        assert_eq!(TrialPlan::from_args(args(1, 250)).unwrap_err().code, USAGE);
        assert!(TrialPlan::from_args(args(1, 200)).is_ok());
    }

    #[test]
    fn plan_rejects_huge_payload_without_building_it() {
        let err = TrialPlan::from_args(args(1, usize::MAX)).unwrap_err();
        assert_eq!(err.code, USAGE);
        assert!(err.message.contains("does not fit"));
    }

    #[test]
    fn received_command_matches_first_returned_region() {
        let payload = [1u8, 2, 3];
        let good = ReceivedCommand(Command::return_file_data(
            PAYLOAD_FILE_ID,
            payload.to_vec(),
            None,
        ));
        assert!(good.matches_payload(&payload));

        let wrong = ReceivedCommand(Command::return_file_data(PAYLOAD_FILE_ID, vec![1, 2], None));
        assert!(!wrong.matches_payload(&payload));

        let no_data = ReceivedCommand(Command::new(vec![Action::WriteFileData(FileData::new(
            PAYLOAD_FILE_ID,
            0,
            payload.to_vec(),
        ))]));
        assert!(!no_data.matches_payload(&payload));
    }
}
