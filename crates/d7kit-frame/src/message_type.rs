//! Serial interface message types.

/// ALP command payload.
pub const ALP_DATA: u8 = 0x01;

/// Ping request from host to modem.
pub const PING_REQUEST: u8 = 0x02;

/// Ping response from modem to host.
pub const PING_RESPONSE: u8 = 0x03;

/// Free-form firmware log line.
pub const LOGGING: u8 = 0x04;

/// Emitted by the modem after a reset.
pub const REBOOTED: u8 = 0x05;

/// Returns a human-readable name for a message type.
pub fn message_type_name(msg_type: u8) -> &'static str {
    match msg_type {
        ALP_DATA => "ALP_DATA",
        PING_REQUEST => "PING_REQUEST",
        PING_RESPONSE => "PING_RESPONSE",
        LOGGING => "LOGGING",
        REBOOTED => "REBOOTED",
        _ => "UNKNOWN",
    }
}
