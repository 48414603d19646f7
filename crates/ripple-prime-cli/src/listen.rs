/*
[INPUT]:  Credentials, stream settings, socket connector, shutdown token
[OUTPUT]: One JSON line per emitted envelope until shutdown or exhaustion
[POS]:    Command layer - event stream listener
[UPDATE]: When changing listener output or shutdown flow
*/

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use ripple_prime_adapter::ws::Connector;
use ripple_prime_adapter::{Credentials, Envelope, EventStream, StreamConfig, StreamState};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Writes envelopes as JSON lines
pub struct EnvelopePrinter<W> {
    out: W,
    printed: usize,
}

impl<W: Write> EnvelopePrinter<W> {
    pub fn new(out: W) -> Self {
        Self { out, printed: 0 }
    }

    pub fn print(&mut self, envelopes: &[Envelope]) -> anyhow::Result<()> {
        for envelope in envelopes {
            let line = serde_json::to_string(envelope).context("serialize envelope")?;
            writeln!(self.out, "{line}").context("write envelope")?;
            self.printed += 1;
        }
        self.out.flush().context("flush output")?;
        Ok(())
    }

    pub fn printed(&self) -> usize {
        self.printed
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Stream events until `shutdown` fires or the stream gives up
pub async fn run_listener<W: Write>(
    credentials: &Credentials,
    config: StreamConfig,
    connector: Arc<dyn Connector>,
    ws_url: Option<&str>,
    shutdown: CancellationToken,
    printer: &mut EnvelopePrinter<W>,
) -> anyhow::Result<StreamState> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<Envelope>>();
    let handle = match ws_url {
        Some(url) => EventStream::start_with_url(credentials, config, connector, tx, url),
        None => EventStream::start(credentials, config, connector, tx),
    }
    .context("start event stream")?;

    let result = loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("shutdown requested, closing event stream");
                break Ok(());
            }
            batch = rx.recv() => match batch {
                Some(envelopes) => {
                    if let Err(err) = printer.print(&envelopes) {
                        break Err(err);
                    }
                }
                None => break Ok(()),
            },
            state = handle.wait_terminal() => {
                warn!(?state, "event stream stopped on its own");
                break Ok(());
            }
        }
    };

    handle.close().await;
    while let Ok(envelopes) = rx.try_recv() {
        printer.print(&envelopes)?;
    }
    result?;

    let state = handle.state();
    info!(?state, printed = printer.printed(), "listener finished");
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_printer_writes_json_lines() {
        let mut printer = EnvelopePrinter::new(Vec::new());
        printer
            .print(&[Envelope::error("first"), Envelope::error("second")])
            .unwrap();
        assert_eq!(printer.printed(), 2);

        let output = String::from_utf8(printer.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["error"], json!("second"));
    }
}
