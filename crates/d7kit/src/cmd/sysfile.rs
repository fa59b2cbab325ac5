use d7kit::alp::{FirmwareVersionFile, SystemFile};
use tracing::debug;

use crate::cmd::SysfileCommand;
use crate::exit::{alp_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_firmware_version, OutputFormat};

pub fn run(command: SysfileCommand, format: OutputFormat) -> CliResult<i32> {
    let file = match command {
        SysfileCommand::Encode(args) => FirmwareVersionFile::new(args.app_name, args.git_sha1)
            .map_err(|err| alp_error("invalid firmware version", err))?,
        SysfileCommand::Decode(args) => {
            let bytes = parse_hex(&args.hex)?;
            if bytes.len() > FirmwareVersionFile::LENGTH {
                debug!(
                    len = bytes.len(),
                    "ignoring bytes past the end of the record"
                );
            }
            FirmwareVersionFile::parse(&bytes)
                .map_err(|err| alp_error("invalid firmware version record", err))?
        }
    };

    print_firmware_version(&file, format);
    Ok(SUCCESS)
}

fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: Vec<u8> = input
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    let digits = digits
        .strip_prefix(b"0x")
        .unwrap_or(digits.as_slice());

    if digits.len() % 2 != 0 {
        return Err(CliError::new(USAGE, "hex input must have an even number of digits"));
    }

    digits
        .chunks(2)
        .map(|pair| {
            let text = String::from_utf8_lossy(pair);
            let invalid = || CliError::new(USAGE, format!("invalid hex byte: {text:?}"));
            if !pair.iter().all(u8::is_ascii_hexdigit) {
                return Err(invalid());
            }
            u8::from_str_radix(&text, 16).map_err(|_| invalid())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_accepts_spacing_and_prefix() {
        assert_eq!(parse_hex("0x74 65").unwrap(), vec![0x74, 0x65]);
        assert_eq!(parse_hex("ABcd").unwrap(), vec![0xAB, 0xCD]);
    }

    #[test]
    fn parse_hex_rejects_bad_input() {
        assert_eq!(parse_hex("abc").unwrap_err().code, USAGE);
        assert_eq!(parse_hex("zz").unwrap_err().code, USAGE);
        assert_eq!(parse_hex("+f").unwrap_err().code, USAGE);
    }
}
