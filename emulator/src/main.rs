mod session;

use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use gate_core::config::{DEFAULT_GATE_CONFIG, GateConfig};
use gate_core::cycle::ScanFlag;
use session::Session;

const USAGE: &str = "Usage: gate-emulator [--threshold <n>] [--transcript <path>]";

#[derive(Debug, Default, PartialEq)]
struct Options {
    threshold: Option<u8>,
    transcript: Option<PathBuf>,
}

fn main() -> io::Result<()> {
    let options = parse_options(env::args().skip(1)).unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("{USAGE}");
        process::exit(2);
    });

    let config = options
        .threshold
        .map_or(DEFAULT_GATE_CONFIG, |threshold| {
            DEFAULT_GATE_CONFIG.with_confirm_threshold(threshold)
        });

    let flag = ScanFlag::new();
    let mut session = open_session(&config, &flag, &options)?;

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut line = String::new();

    writeln!(
        writer,
        "Touch Gate Emulator ready (confirm threshold {}). Type `help` for commands or `exit` to quit.",
        session.controller().confirm_threshold()
    )?;

    loop {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if should_terminate(trimmed) {
            writeln!(writer, "Session closed.")?;
            break;
        }

        for response in session.handle_command(trimmed)? {
            writeln!(writer, "{response}")?;
        }
    }

    Ok(())
}

fn open_session<'f>(
    config: &GateConfig,
    flag: &'f ScanFlag,
    options: &Options,
) -> io::Result<Session<'f>> {
    let session = Session::new(config, flag)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))?;

    match &options.transcript {
        Some(path) => session.with_transcript(path, "Touch Gate Emulator session transcript"),
        None => Ok(session),
    }
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn parse_options(args: impl IntoIterator<Item = String>) -> Result<Options, String> {
    let mut options = Options::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        if let Some(value) = arg.strip_prefix("--threshold=") {
            options.threshold = Some(parse_threshold(value)?);
        } else if arg == "--threshold" {
            let value = args
                .next()
                .ok_or_else(|| "Expected value after --threshold".to_string())?;
            options.threshold = Some(parse_threshold(&value)?);
        } else if let Some(value) = arg.strip_prefix("--transcript=") {
            options.transcript = Some(PathBuf::from(value));
        } else if arg == "--transcript" {
            let value = args
                .next()
                .ok_or_else(|| "Expected value after --transcript".to_string())?;
            options.transcript = Some(PathBuf::from(value));
        } else {
            return Err(format!("Unknown argument `{arg}`"));
        }
    }

    Ok(options)
}

fn parse_threshold(value: &str) -> Result<u8, String> {
    match value.parse::<u8>() {
        Ok(0) | Err(_) => Err(format!("Invalid confirm threshold `{value}` (expected 1-255)")),
        Ok(threshold) => Ok(threshold),
    }
}
