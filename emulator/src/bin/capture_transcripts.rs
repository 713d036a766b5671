use std::io;
use std::path::Path;

#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use gate_core::config::DEFAULT_GATE_CONFIG;
use gate_core::cycle::ScanFlag;
use session::Session;

const TRANSCRIPT_DIR: &str = "transcripts";

/// Console scripts replayed into `transcripts/<name>.log`.
const SCRIPTS: &[(&str, &str, &[&str])] = &[
    (
        "zones",
        "gate selection across the three zones",
        &[
            "zones",
            "scan b0=1 pos=50",
            "scan b0=1 pos=150",
            "scan b0=1 pos=250",
            "status",
        ],
    ),
    (
        "boundary",
        "slider at a zone boundary",
        &["scan b0=1 b1=1 pos=99", "scan b0=1 b1=1 pos=100", "status"],
    ),
    (
        "steady",
        "output edges with steady inputs",
        &["scan b0=1 b1=1 pos=120", "scan b0=1 b1=1 pos=120 count=10", "status"],
    ),
    (
        "sequencing",
        "provider reads outside a completed scan",
        &["poll", "scan", "poll", "status"],
    ),
];

fn main() -> io::Result<()> {
    for (name, title, commands) in SCRIPTS {
        record(name, title, commands)?;
    }
    Ok(())
}

fn record(name: &str, title: &str, commands: &[&str]) -> io::Result<()> {
    let flag = ScanFlag::new();
    let path = Path::new(TRANSCRIPT_DIR).join(format!("{name}.log"));
    let header = format!("Touch Gate Emulator transcript: {title}");
    let mut session = Session::new(&DEFAULT_GATE_CONFIG, &flag)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))?
        .with_transcript(&path, &header)?;

    for command in commands {
        session.handle_command(command)?;
    }
    println!("wrote {}", path.display());
    Ok(())
}
