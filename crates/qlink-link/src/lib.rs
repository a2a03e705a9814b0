use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf,
};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

#[derive(Debug, Clone, Deserialize)]
pub struct LinkConfig {
    pub device: String,

    #[serde(default = "default_baud")]
    pub baud: u32,

    /// Per-read timeout for the telemetry side. Keeps the receiver loop from
    /// blocking indefinitely on a silent peer.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

fn default_baud() -> u32 {
    1_000_000
}

fn default_read_timeout_ms() -> u64 {
    100
}

#[derive(Debug, Error)]
pub enum LinkError {
    /// Fatal at startup: no link, no ground station.
    #[error("open serial device {device}: {source}")]
    Open {
        device: String,
        #[source]
        source: tokio_serial::Error,
    },

    /// Non-fatal: the current tick's command is dropped, next tick retries fresh.
    #[error("serial write: {0}")]
    Write(#[source] std::io::Error),

    /// Non-fatal: the receiver loop logs and keeps reading.
    #[error("serial read: {0}")]
    Read(#[source] std::io::Error),
}

/// One read attempt on the telemetry side of the link.
#[derive(Debug)]
pub enum ReadOutcome {
    Line(String),
    TimedOut,
    Closed,
}

pub type SerialWriter = LinkWriter<WriteHalf<SerialStream>>;
pub type SerialReader = LineReader<ReadHalf<SerialStream>>;

pub struct SerialLink;

impl SerialLink {
    /// Opens the port and splits it into independently owned halves: the
    /// control loop drives the writer, the telemetry receiver the reader.
    pub fn open(cfg: &LinkConfig) -> Result<(SerialWriter, SerialReader), LinkError> {
        let port = tokio_serial::new(&cfg.device, cfg.baud)
            .open_native_async()
            .map_err(|source| LinkError::Open {
                device: cfg.device.clone(),
                source,
            })?;
        let (rd, wr) = tokio::io::split(port);
        Ok((
            LinkWriter::new(wr),
            LineReader::new(rd, Duration::from_millis(cfg.read_timeout_ms)),
        ))
    }
}

/// Write half of the link. Generic over the stream so tests can run against
/// in-memory pipes instead of a serial port.
pub struct LinkWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> LinkWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub async fn write_frame(&mut self, frame: &[u8]) -> Result<(), LinkError> {
        self.inner.write_all(frame).await.map_err(LinkError::Write)?;
        self.inner.flush().await.map_err(LinkError::Write)
    }
}

/// Read half of the link: one line per call, bounded by the read timeout.
pub struct LineReader<R> {
    inner: BufReader<R>,
    timeout: Duration,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(inner: R, timeout: Duration) -> Self {
        Self {
            inner: BufReader::new(inner),
            timeout,
        }
    }

    /// `TimedOut` is not an error; it is the receiver loop's natural pacing.
    /// `Closed` means the peer went away (EOF).
    pub async fn read_line(&mut self) -> Result<ReadOutcome, LinkError> {
        let mut line = String::new();
        match tokio::time::timeout(self.timeout, self.inner.read_line(&mut line)).await {
            Err(_) => Ok(ReadOutcome::TimedOut),
            Ok(Ok(0)) => Ok(ReadOutcome::Closed),
            Ok(Ok(_)) => {
                while line.ends_with('\n') || line.ends_with('\r') {
                    line.pop();
                }
                Ok(ReadOutcome::Line(line))
            }
            Ok(Err(e)) => Err(LinkError::Read(e)),
        }
    }
}
