use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use d7kit_alp::system_files::UID_LENGTH;
use d7kit_alp::{Action, Command, SystemFileId};
use d7kit_frame::{FrameConfig, FrameWriter, ALP_DATA, DEFAULT_MAX_PAYLOAD};
use d7kit_transport::{open_endpoint, ModemStream};
use tracing::{debug, info};

use crate::error::{ModemError, Result};
use crate::receiver::CommandReceiver;

/// Serial baud rate used when none is given.
pub const DEFAULT_RATE: u32 = 115_200;

/// How often a blocked receive wakes up to check for cancellation.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long to wait for the modem to answer a local request.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Modem connection settings.
#[derive(Debug, Clone)]
pub struct ModemConfig {
    /// Serial baud rate. Ignored for Unix socket endpoints.
    pub rate: u32,
    pub poll_interval: Duration,
    pub response_timeout: Duration,
    pub write_timeout: Option<Duration>,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            rate: DEFAULT_RATE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            write_timeout: Some(DEFAULT_RESPONSE_TIMEOUT),
        }
    }
}

/// A connected modem.
pub struct Modem {
    endpoint: PathBuf,
    stream: ModemStream,
    writer: FrameWriter<ModemStream>,
    receiver: CommandReceiver,
    config: ModemConfig,
    uid: Option<[u8; UID_LENGTH]>,
}

impl Modem {
    /// Open the modem at `endpoint` (serial device or Unix socket path).
    pub fn open(endpoint: impl AsRef<Path>, config: ModemConfig) -> Result<Self> {
        let endpoint = endpoint.as_ref();
        let stream = open_endpoint(endpoint, config.rate)?;
        let frame_config = Self::frame_config(&config);

        let writer = FrameWriter::with_config_stream(stream.try_clone()?, frame_config.clone())?;
        let receiver = CommandReceiver::new(stream.try_clone()?, endpoint, frame_config)?;

        info!(
            endpoint = %endpoint.display(),
            transport = stream.transport_name(),
            rate = config.rate,
            "modem opened"
        );

        Ok(Self {
            endpoint: endpoint.to_path_buf(),
            stream,
            writer,
            receiver,
            config,
            uid: None,
        })
    }

    /// Endpoint this modem was opened on.
    pub fn endpoint(&self) -> &Path {
        &self.endpoint
    }

    pub fn config(&self) -> &ModemConfig {
        &self.config
    }

    /// Encode and send one command.
    pub fn send_command(&mut self, command: &Command) -> Result<()> {
        let payload = command.to_bytes()?;
        self.send_alp(&payload)
    }

    /// Send an already encoded ALP command.
    ///
    /// Lets a caller that sends the same command many times encode it once.
    pub fn send_alp(&mut self, payload: &[u8]) -> Result<()> {
        self.writer.send(ALP_DATA, payload)?;
        debug!(
            endpoint = %self.endpoint.display(),
            len = payload.len(),
            "command sent"
        );
        Ok(())
    }

    /// The modem's UID, read from system file 0x00 on first use.
    ///
    /// # Errors
    ///
    /// `ModemError::Timeout` if no matching answer arrives within the
    /// configured response timeout. Unrelated commands received meanwhile
    /// are discarded.
    pub fn read_uid(&mut self) -> Result<[u8; UID_LENGTH]> {
        if let Some(uid) = self.uid {
            return Ok(uid);
        }

        let file_id = SystemFileId::Uid.id();
        self.send_command(&Command::read_system_file(
            SystemFileId::Uid,
            UID_LENGTH as u32,
        ))?;

        let deadline = Instant::now() + self.config.response_timeout;
        while Instant::now() < deadline {
            let Some(command) = self.receiver.poll()? else {
                continue;
            };
            if let Some(uid) = uid_from(&command, file_id) {
                info!(endpoint = %self.endpoint.display(), uid = %hex(&uid), "modem uid");
                self.uid = Some(uid);
                return Ok(uid);
            }
            debug!(%command, "discarding unrelated command while waiting for uid");
        }
        Err(ModemError::Timeout(self.config.response_timeout))
    }

    /// A new receiver reading from this modem's line.
    ///
    /// The receiver shares the underlying connection; only one of the
    /// receivers (or [`read_uid`](Self::read_uid)) should be reading at a
    /// time.
    pub fn receiver(&self) -> Result<CommandReceiver> {
        CommandReceiver::new(
            self.stream.try_clone()?,
            &self.endpoint,
            Self::frame_config(&self.config),
        )
    }

    fn frame_config(config: &ModemConfig) -> FrameConfig {
        FrameConfig {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: Some(config.poll_interval),
            write_timeout: config.write_timeout,
        }
    }
}

impl std::fmt::Debug for Modem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Modem")
            .field("endpoint", &self.endpoint)
            .field("transport", &self.stream.transport_name())
            .field("uid", &self.uid.map(|uid| hex(&uid)))
            .finish_non_exhaustive()
    }
}

fn uid_from(command: &Command, file_id: u8) -> Option<[u8; UID_LENGTH]> {
    command.actions.iter().find_map(|action| match action {
        Action::ReturnFileData(data) if data.file_id == file_id && data.offset == 0 => {
            data.data.as_ref().try_into().ok()
        }
        _ => None,
    })
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
