//! Serial Port Monitor
//!
//! Shows device output live, one row per completed line, and logs the
//! telemetry fields of every `log[...]` line. Lines typed on stdin are sent
//! to the device followed by a carriage return.
//!
//! Usage:
//!   cargo run --example monitor -- [OPTIONS]
//!
//! Options:
//!   --config PATH     Config file (default: platform config dir, spm/config.json)
//!   --port PORT       Serial port, overrides the config
//!   --baud RATE       Baud rate, overrides the config
//!   --interactive     Send stdin text without a trailing carriage return
//!   --save-config     Write the effective config back to the config file
//!
//! Set RUST_LOG (e.g. RUST_LOG=spm_core=debug) for more detail.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use spm_core::prelude::*;
use spm_core::telemetry::DecodeError;
use tracing_subscriber::EnvFilter;

struct Options {
    config_path: Option<PathBuf>,
    port: Option<String>,
    baud: Option<u32>,
    mode: InputMode,
    save_config: bool,
}

fn parse_args() -> anyhow::Result<Options> {
    let args: Vec<String> = std::env::args().collect();
    let mut options = Options {
        config_path: None,
        port: None,
        baud: None,
        mode: InputMode::Line,
        save_config: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                options.config_path = args.get(i).map(PathBuf::from);
            }
            "--port" | "-p" => {
                i += 1;
                options.port = args.get(i).cloned();
            }
            "--baud" | "-b" => {
                i += 1;
                let raw = args.get(i).context("--baud needs a value")?;
                options.baud = Some(raw.parse().context("invalid baud rate")?);
            }
            "--interactive" | "-i" => options.mode = InputMode::Interactive,
            "--save-config" => options.save_config = true,
            other => anyhow::bail!("unknown argument: {}", other),
        }
        i += 1;
    }

    Ok(options)
}

/// Live echo that holds back incomplete UTF-8 sequences
///
/// Bytes arrive one at a time, so a multi-byte character is only printed once
/// all of its bytes are in. Invalid sequences are shown as U+FFFD.
#[derive(Default)]
struct Echo {
    pending: Vec<u8>,
}

impl Echo {
    /// Add a byte, returning text that is ready to print
    fn push(&mut self, byte: u8) -> Option<String> {
        self.pending.push(byte);
        match std::str::from_utf8(&self.pending) {
            Ok(text) => {
                let text = text.to_string();
                self.pending.clear();
                Some(text)
            }
            Err(e) if e.error_len().is_none() => None,
            Err(_) => Some(self.take_lossy()),
        }
    }

    /// Forget the current line, returning anything still held back
    fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.take_lossy())
        }
    }

    fn take_lossy(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        text
    }
}

fn handle_record(record: &LineRecord) {
    match telemetry::decode_record(record) {
        Ok(frame) => tracing::info!(
            serial = %frame.serial_number,
            temperature = frame.meter.temperature,
            led = frame.led_status,
            locked = frame.locked,
            pp = frame.pp,
            cp = frame.cp,
            current_l1 = frame.meter.current_l1,
            "Telemetry"
        ),
        Err(DecodeError::NotTelemetry) => {}
        Err(e) => tracing::warn!("Skipping telemetry line: {e}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let options = parse_args()?;
    let config_path = match options.config_path {
        Some(path) => path,
        None => MonitorConfig::default_path()?,
    };

    let mut config = MonitorConfig::load_or_default(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if let Some(port) = options.port {
        config.serial.port_name = Some(port);
    }
    if let Some(baud) = options.baud {
        config.serial.baud_rate = baud;
    }
    config.validate()?;

    if options.save_config {
        config.save(&config_path)?;
        tracing::info!(path = %config_path.display(), "Saved config");
    }

    let transport = Arc::new(SerialTransport::open(&config.serial)?);
    let session = Arc::new(StreamSession::new(transport.clone(), config.session.clone()));
    let (sink, mut events) = ChannelSink::channel();
    let handle = session.start_with(sink)?;

    // stdin is blocking, so it gets its own thread; EOF ends the session.
    let writer = session.clone();
    let mode = options.mode;
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(text) = line else { break };
            if let Err(e) = writer.write(&ConsoleInput::with_mode(text, mode).to_bytes()) {
                tracing::error!("Write failed: {e}");
            }
        }
        writer.stop();
    });

    let mut stdout = std::io::stdout();
    let mut echo = Echo::default();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                session.stop();
                break;
            }
            event = events.recv() => match event {
                Some(SessionEvent::Partial(byte)) => {
                    if let Some(text) = echo.push(byte.value) {
                        print!("{}", text);
                        let _ = stdout.flush();
                    }
                }
                Some(SessionEvent::Overflow(e)) => {
                    echo.finish();
                    println!("\r[dropped: {}]", e);
                }
                Some(SessionEvent::Record(record)) => {
                    echo.finish();
                    // Replace the live echo of this line with the finished row.
                    println!(
                        "\r{} {}",
                        record.timestamp.format("%d.%m.%Y:%H.%M.%S"),
                        String::from_utf8_lossy(record.trimmed())
                    );
                    handle_record(&record);
                }
                None => break,
            }
        }
    }

    let outcome = handle.wait().await;
    transport.close();

    let summary = outcome?;
    tracing::info!(
        bytes = summary.bytes_read,
        lines = summary.lines,
        "Monitor stopped"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_all(echo: &mut Echo, bytes: &[u8]) -> String {
        bytes.iter().filter_map(|&b| echo.push(b)).collect()
    }

    #[test]
    fn test_echo_ascii_is_immediate() {
        let mut echo = Echo::default();
        assert_eq!(echo.push(b'a'), Some("a".to_string()));
    }

    #[test]
    fn test_echo_waits_for_whole_character() {
        let mut echo = Echo::default();
        let bytes = "°C".as_bytes();

        assert_eq!(echo.push(bytes[0]), None);
        assert_eq!(echo.push(bytes[1]), Some("°".to_string()));
        assert_eq!(echo.push(bytes[2]), Some("C".to_string()));
    }

    #[test]
    fn test_echo_replaces_invalid_bytes() {
        let mut echo = Echo::default();
        assert_eq!(echo_all(&mut echo, &[0xff, b'x']), "\u{fffd}x");
    }

    #[test]
    fn test_echo_finish_flushes_truncated_character() {
        let mut echo = Echo::default();
        assert_eq!(echo.push(0xe2), None);
        assert_eq!(echo.finish(), Some("\u{fffd}".to_string()));
        assert_eq!(echo.finish(), None);
    }
}
