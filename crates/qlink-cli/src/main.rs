use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::AsyncBufReadExt;
use tokio::sync::watch;
use tracing::{info, warn};

use qlink_control::{send_command, ControlState, InputSnapshot};
use qlink_link::{LinkConfig, SerialLink};
use qlink_telemetry::{run_receiver, TelemetrySnapshot, TelemetryStore};

#[derive(Debug, Parser)]
#[command(name = "qlink", version, about = "quadlink - serial ground-control link")]
struct Cli {
    #[arg(long)]
    config: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate the configuration without opening the link.
    Doctor,
    /// Open the link and drive the control loop.
    Run,
}

#[derive(Debug, serde::Deserialize)]
struct Config {
    link: LinkConfig,
    control: ControlCfg,
    input: InputCfg,
}

#[derive(Debug, serde::Deserialize)]
struct ControlCfg {
    /// Control tick cadence. The original ground station ran at its display
    /// refresh of 30; here it is just a scheduler parameter.
    #[serde(default = "default_tick_hz")]
    tick_hz: f32,
}

fn default_tick_hz() -> f32 {
    30.0
}

#[derive(Debug, serde::Deserialize)]
struct InputCfg {
    /// "stdin" (interactive token lines) or "script" (replay file, one line
    /// of tokens per tick, EOF quits).
    source: String,
    script_path: Option<String>,
}

fn load_config(path: &str) -> Result<Config> {
    let s = std::fs::read_to_string(path).context("read config")?;
    Ok(toml::from_str(&s).context("parse config toml")?)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.cmd {
        Command::Doctor => doctor(&cfg)?,
        Command::Run => run(&cfg).await?,
    }
    Ok(())
}

fn doctor(cfg: &Config) -> Result<()> {
    anyhow::ensure!(!cfg.link.device.is_empty(), "link.device missing");
    anyhow::ensure!(cfg.link.baud > 0, "link.baud invalid");
    anyhow::ensure!(cfg.link.read_timeout_ms > 0, "link.read_timeout_ms must be > 0");
    anyhow::ensure!(cfg.control.tick_hz > 0.0, "control.tick_hz must be > 0");
    match cfg.input.source.as_str() {
        "stdin" => {}
        "script" => anyhow::ensure!(
            cfg.input.script_path.as_ref().map(|p| !p.is_empty()).unwrap_or(false),
            "input.script_path missing (source=script)"
        ),
        other => anyhow::bail!("unknown input.source: {}", other),
    }
    info!("doctor: OK");
    Ok(())
}

async fn run(cfg: &Config) -> Result<()> {
    info!("run: opening link {} @ {}", cfg.link.device, cfg.link.baud);
    // A link that won't open is fatal; everything after this is not.
    let (mut writer, reader) = SerialLink::open(&cfg.link).context("open control link")?;

    let store = TelemetryStore::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let receiver = tokio::spawn(run_receiver(reader, store.clone(), shutdown_rx));

    let mut input = InputSource::from_config(&cfg.input)?;
    let mut state = ControlState::default();

    let period = std::time::Duration::from_secs_f32(1.0 / cfg.control.tick_hz);
    let mut ticker = tokio::time::interval(period);
    // Cadence comes from the scheduler; a slow write must not pile up ticks.
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let mut shown = TelemetrySnapshot::default();

    loop {
        ticker.tick().await;

        let snap = input.sample();
        let outcome = state.update(&snap);
        if outcome.arm_toggled {
            info!("{}", if state.armed { "vehicle armed" } else { "vehicle disarmed" });
        }
        if outcome.quit {
            info!("quit requested");
            break;
        }

        // A failed write drops this tick's command; next tick sends fresh state.
        if let Err(e) = send_command(&state, &mut writer).await {
            warn!("command send failed: {e}");
        }

        let latest = store.latest();
        if latest != shown {
            info!("telemetry: {}", latest.fields.join(" | "));
            shown = latest;
        }
    }

    let _ = shutdown_tx.send(true);
    let _ = receiver.await;
    Ok(())
}

/// Where per-tick held-button state comes from. The token-line format keeps
/// the binary headless; a GUI front end would feed the same snapshots.
enum InputSource {
    /// Latest stdin line wins; held state persists until the next line.
    Stdin(watch::Receiver<InputSnapshot>),
    /// Replay file, one line per tick. EOF maps to quit.
    Script(std::vec::IntoIter<String>),
}

impl InputSource {
    fn from_config(cfg: &InputCfg) -> Result<Self> {
        match cfg.source.as_str() {
            "stdin" => Ok(Self::Stdin(spawn_stdin_reader())),
            "script" => {
                let path = cfg.script_path.as_ref().context("input.script_path missing")?;
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("read input script {}", path))?;
                let lines: Vec<String> = text.lines().map(str::to_string).collect();
                Ok(Self::Script(lines.into_iter()))
            }
            other => anyhow::bail!("unknown input.source: {}", other),
        }
    }

    fn sample(&mut self) -> InputSnapshot {
        match self {
            Self::Stdin(rx) => *rx.borrow(),
            Self::Script(lines) => match lines.next() {
                Some(line) => parse_input_line(&line),
                None => InputSnapshot { quit: true, ..Default::default() },
            },
        }
    }
}

fn spawn_stdin_reader() -> watch::Receiver<InputSnapshot> {
    let (tx, rx) = watch::channel(InputSnapshot::default());
    tokio::spawn(async move {
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(parse_input_line(&line)).is_err() {
                return; // control loop gone
            }
        }
    });
    rx
}

fn parse_input_line(line: &str) -> InputSnapshot {
    let mut snap = InputSnapshot::default();
    for tok in line.split_whitespace() {
        match tok {
            "arm" => snap.arm = true,
            "throttle-up" => snap.throttle_up = true,
            "throttle-down" => snap.throttle_down = true,
            "yaw-left" => snap.yaw_left = true,
            "yaw-right" => snap.yaw_right = true,
            "pitch-fwd" => snap.pitch_forward = true,
            "pitch-back" => snap.pitch_back = true,
            "roll-left" => snap.roll_left = true,
            "roll-right" => snap.roll_right = true,
            "quit" => snap.quit = true,
            other => warn!("unknown input token: {}", other),
        }
    }
    snap
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_input_tokens() {
        let snap = parse_input_line("arm throttle-up yaw-left");
        assert!(snap.arm && snap.throttle_up && snap.yaw_left);
        assert!(!snap.quit && !snap.yaw_right && !snap.roll_left);

        let snap = parse_input_line("");
        assert_eq!(snap, InputSnapshot::default());

        // Unknown tokens are ignored, not fatal.
        let snap = parse_input_line("warp-drive quit");
        assert!(snap.quit);
    }

    #[test]
    fn config_defaults_apply() {
        let cfg: Config = toml::from_str(
            r#"
            [link]
            device = "/dev/ttyACM0"

            [control]

            [input]
            source = "stdin"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.link.baud, 1_000_000);
        assert_eq!(cfg.link.read_timeout_ms, 100);
        assert_eq!(cfg.control.tick_hz, 30.0);
    }

    #[test]
    fn doctor_rejects_bad_config() {
        let cfg: Config = toml::from_str(
            r#"
            [link]
            device = ""

            [control]

            [input]
            source = "keyboard"
            "#,
        )
        .unwrap();
        assert!(doctor(&cfg).is_err());

        let cfg: Config = toml::from_str(
            r#"
            [link]
            device = "/dev/ttyACM0"

            [control]

            [input]
            source = "script"
            "#,
        )
        .unwrap();
        assert!(doctor(&cfg).is_err());
    }
}
