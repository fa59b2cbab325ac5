use d7kit::harness::CancellationToken;
use d7kit::modem::{Modem, ModemConfig};

use crate::cmd::ListenArgs;
use crate::exit::{modem_error, CliError, CliResult, SUCCESS};
use crate::output::{print_command, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let config = ModemConfig {
        rate: args.rate,
        ..ModemConfig::default()
    };
    let modem =
        Modem::open(&args.endpoint, config).map_err(|err| modem_error("open failed", err))?;
    let mut receiver = modem
        .receiver()
        .map_err(|err| modem_error("open failed", err))?;

    let cancel = CancellationToken::new();
    install_ctrlc_handler(cancel.clone())?;

    let endpoint = args.endpoint.display().to_string();
    let mut printed = 0usize;

    while let Some(command) = receiver
        .recv(&cancel)
        .map_err(|err| modem_error("receive failed", err))?
    {
        print_command(&endpoint, &command, format);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                break;
            }
        }
    }

    Ok(SUCCESS)
}

fn install_ctrlc_handler(cancel: CancellationToken) -> CliResult<()> {
    ctrlc::set_handler(move || cancel.cancel()).map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
