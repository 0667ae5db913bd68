//! Run loop: polls the input line, broadcasts the magic packet on a falling
//! edge and returns once a termination signal arrives.
//!
//! ```text
//! run()
//!  ├─ open GPIO line          (fatal)
//!  ├─ register SIGINT/SIGTERM (fatal)
//!  ├─ read initial level      (fatal)
//!  ├─ build magic packet      (fatal)
//!  ├─ resolve interface + open broadcast socket (fatal)
//!  └─ Supervisor::run_until(signal)
//!       loop: shutdown? -> sample -> edge? -> send / log -> wait one interval
//! ```

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::edge::{detect_edge, Edge};
use crate::gpio::{CdevInputLine, GpioError, InputLevel, InputLine};
use crate::net::{resolve_broadcast_source, BroadcastSocket, PacketSink, ResolveError};
use crate::wol::{create_magic_packet, MagicPacket, ParseError};

/// Everything a run needs, fixed before the run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerConfig {
    pub pin: u32,
    pub mac_address: String,
    pub interface: String,
    pub dry_run: bool,
    pub gpio_chip: PathBuf,
    pub port: u16,
    pub poll_interval: Duration,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("error opening GPIO: {0}")]
    Gpio(#[from] GpioError),

    #[error("unable to register termination signal handlers: {0}")]
    Signals(#[source] io::Error),

    #[error("error creating magic packet: {0}")]
    PacketBuild(#[from] ParseError),

    #[error("error getting broadcast interface address: {0}")]
    InterfaceResolution(#[from] ResolveError),

    #[error("error setting up UDP client: {0}")]
    SocketSetup(#[source] io::Error),
}

/// What happened during a run, reported on shutdown.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WatchStats {
    pub samples: u64,
    pub read_failures: u64,
    pub triggers: u64,
    pub clears: u64,
    pub sent: u64,
    pub send_failures: u64,
    pub skipped: u64,
}

/// Owns the input line and packet sink for the duration of a run; both are
/// released when the run returns.
pub struct Supervisor<L, S> {
    line: L,
    sink: S,
    packet: MagicPacket,
    previous: InputLevel,
    dry_run: bool,
    poll_interval: Duration,
    stats: WatchStats,
}

impl<L: InputLine, S: PacketSink> Supervisor<L, S> {
    pub fn new(
        line: L,
        sink: S,
        packet: MagicPacket,
        initial: InputLevel,
        dry_run: bool,
        poll_interval: Duration,
    ) -> Self {
        Self {
            line,
            sink,
            packet,
            previous: initial,
            dry_run,
            poll_interval,
            stats: WatchStats::default(),
        }
    }

    /// Polls until `shutdown` completes. Shutdown is checked before every
    /// sample and also interrupts the wait between samples.
    pub async fn run_until<F>(mut self, shutdown: F) -> WatchStats
    where
        F: Future<Output = ()>,
    {
        let mut ticker = time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("shutting down gracefully...");
                    return self.stats;
                }
                _ = ticker.tick() => {}
            }

            self.poll_once();
        }
    }

    fn poll_once(&mut self) {
        let current = match self.line.read_level() {
            Ok(level) => level,
            Err(e) => {
                self.stats.read_failures += 1;
                warn!(error = %e, "unable to read input level");
                return;
            }
        };
        self.stats.samples += 1;

        match detect_edge(self.previous, current) {
            Some(Edge::Falling) => {
                self.stats.triggers += 1;
                info!("signal received");
                self.wake();
            }
            Some(Edge::Rising) => {
                self.stats.clears += 1;
                info!("signal cleared");
            }
            None => {}
        }

        self.previous = current;
    }

    fn wake(&mut self) {
        if self.dry_run {
            self.stats.skipped += 1;
            info!("dry run mode: WOL packet not sent");
            return;
        }

        match self.sink.send(&self.packet) {
            Ok(()) => {
                self.stats.sent += 1;
                debug!(packet = ?self.packet, "WOL packet sent");
            }
            Err(e) => {
                self.stats.send_failures += 1;
                error!(error = %e, "error sending WOL packet");
            }
        }
    }
}

/// Registers SIGINT and SIGTERM right away and returns a future that
/// completes when either arrives.
fn termination_signal() -> io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => info!("received SIGINT"),
            _ = terminate.recv() => info!("received SIGTERM"),
        }
    })
}

/// Starts up, then watches the input line until SIGINT or SIGTERM.
pub async fn run(config: &TriggerConfig) -> Result<WatchStats, RunError> {
    let span = info_span!(
        "wake",
        pin = config.pin,
        mac_address = %config.mac_address,
        interface = %config.interface
    );

    start(config).instrument(span).await
}

async fn start(config: &TriggerConfig) -> Result<WatchStats, RunError> {
    info!(dry_run = config.dry_run, "starting wake utility");

    let mut line = CdevInputLine::open(&config.gpio_chip, config.pin)?;
    let shutdown = termination_signal().map_err(RunError::Signals)?;
    let initial = line.read_level()?;
    debug!(?initial, "initial input level");

    let packet = create_magic_packet(&config.mac_address)?;
    let source = resolve_broadcast_source(&config.interface)?;
    let socket = BroadcastSocket::open(source, config.port).map_err(RunError::SocketSetup)?;
    info!(
        %source,
        broadcast = %socket.target(),
        poll_ms = config.poll_interval.as_millis() as u64,
        "watching input line"
    );

    let supervisor = Supervisor::new(
        line,
        socket,
        packet,
        initial,
        config.dry_run,
        config.poll_interval,
    );
    let stats = supervisor.run_until(shutdown).await;

    info!(
        samples = stats.samples,
        read_failures = stats.read_failures,
        triggers = stats.triggers,
        clears = stats.clears,
        sent = stats.sent,
        send_failures = stats.send_failures,
        skipped = stats.skipped,
        "stopped"
    );
    Ok(stats)
}
