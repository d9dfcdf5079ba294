//! spectro-cli — entry point.
//!
//! ```text
//! spectro-cli dark-reference                Request one measurement
//! spectro-cli dark-reference neon-reference Request several, in order
//! spectro-cli --server 10.0.0.9:7000 ...    Override the config address
//! spectro-cli --gen-config                  Dump default config and exit
//! ```

mod config;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use spectro_core::{
    Action, Endpoint, Measurement, Op, Sample, ServiceConfig, ServiceEvent, SpectroService,
};

use crate::config::CliConfig;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "spectro-cli", about = "Spectral-instrument reference measurement client")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "spectro-cli.toml")]
    config: PathBuf,

    /// Server address (overrides config). Example: 127.0.0.1:12345
    #[arg(short, long)]
    server: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Measurements to request, in order.
    #[arg(value_enum, required_unless_present = "gen_config")]
    actions: Vec<CliAction>,
}

/// Clap-facing mirror of the six fixed actions.
#[derive(ValueEnum, Debug, Clone, Copy)]
enum CliAction {
    DarkReference,
    WhiteReference,
    AttenuatedWhiteReference,
    MercuryReference,
    NeonReference,
    AimingBeam,
}

impl CliAction {
    fn action(self) -> Action {
        match self {
            CliAction::DarkReference => Action::DarkReference,
            CliAction::WhiteReference => Action::WhiteReference,
            CliAction::AttenuatedWhiteReference => Action::AttenuatedWhiteReference,
            CliAction::MercuryReference => Action::MercuryReference,
            CliAction::NeonReference => Action::NeonReference,
            CliAction::AimingBeam => Action::AimingBeam,
        }
    }
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&CliConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = CliConfig::load(&cli.config);
    if let Some(addr) = cli.server {
        config.network.server_address = addr;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("spectro-cli v{}", env!("CARGO_PKG_VERSION"));

    let endpoint: Endpoint = config.network.server_address.parse()?;
    let service_config = ServiceConfig {
        connect_timeout: Duration::from_millis(config.network.connect_timeout_ms),
        request_timeout: Duration::from_millis(config.network.request_timeout_ms),
    };

    // ── 1. Spawn the network worker ─────────────────────────────

    let (handle, mut events) = SpectroService::spawn(service_config);

    // ── 2. Connect ──────────────────────────────────────────────

    handle.submit(Op::Connect(endpoint.clone()))?;
    loop {
        match next_event(&mut events).await? {
            ServiceEvent::ConnectFinished(Ok(())) => {
                info!(%endpoint, "connected");
                break;
            }
            ServiceEvent::ConnectFinished(Err(e)) => {
                error!(%endpoint, "connect failed: {e}");
                handle.shutdown();
                return Err(e.into());
            }
            ServiceEvent::StatusChanged(state) => info!(%state, "status"),
            ServiceEvent::MeasurementReady { .. } => {}
        }
    }

    // ── 3. Run the requested measurements ───────────────────────

    for cli_action in cli.actions {
        let action = cli_action.action();
        handle.submit(Op::Request(action))?;

        loop {
            match next_event(&mut events).await? {
                ServiceEvent::MeasurementReady { action, result } => {
                    match result {
                        Ok(m) => print_measurement(action, &m),
                        Err(e) => {
                            error!(%action, "request failed: {e}");
                            handle.shutdown();
                            return Err(e.into());
                        }
                    }
                    break;
                }
                ServiceEvent::StatusChanged(state) => info!(%state, "status"),
                ServiceEvent::ConnectFinished(_) => {}
            }
        }
    }

    // ── 4. Shutdown ─────────────────────────────────────────────

    handle.shutdown();
    Ok(())
}

async fn next_event(
    events: &mut mpsc::Receiver<ServiceEvent>,
) -> Result<ServiceEvent, Box<dyn std::error::Error>> {
    events
        .recv()
        .await
        .ok_or_else(|| "service worker stopped unexpectedly".into())
}

// ── Rendering ────────────────────────────────────────────────────

fn print_measurement(action: Action, m: &Measurement) {
    println!("{action}: {} samples (status: {})", m.len(), m.status());
    if let (Some((lo, hi)), Some(peak)) = (m.wavelength_span(), m.peak()) {
        println!(
            "  {lo:.1} to {hi:.1} nm, peak {:.2} at {:.1} nm",
            peak.intensity, peak.wavelength
        );
    }
    let line = sparkline(m.samples(), 60);
    if !line.is_empty() {
        println!("  {line}");
    }
}

/// Coarse textual rendering of a spectrum: bucket the samples into at
/// most `width` columns and draw the per-bucket peak intensity.
fn sparkline(samples: &[Sample], width: usize) -> String {
    const LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

    if samples.is_empty() || width == 0 {
        return String::new();
    }
    let n = width.min(samples.len());
    let mut buckets = vec![f64::NEG_INFINITY; n];
    for (i, s) in samples.iter().enumerate() {
        let b = i * n / samples.len();
        // NaN never wins a comparison, so NaN-only buckets stay empty.
        if s.intensity > buckets[b] {
            buckets[b] = s.intensity;
        }
    }

    let (min, max) = buckets
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if !min.is_finite() || !max.is_finite() {
        return String::new();
    }
    let range = (max - min).max(f64::EPSILON);

    buckets
        .iter()
        .map(|&v| {
            if !v.is_finite() {
                return ' ';
            }
            let idx = (((v - min) / range) * (LEVELS.len() - 1) as f64).round() as usize;
            LEVELS[idx.min(LEVELS.len() - 1)]
        })
        .collect()
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use spectro_core::ALL_ACTIONS;

    fn samples(intensities: &[f64]) -> Vec<Sample> {
        intensities
            .iter()
            .enumerate()
            .map(|(i, &intensity)| Sample {
                wavelength: 400.0 + i as f64,
                intensity,
            })
            .collect()
    }

    #[test]
    fn cli_action_mapping_is_total() {
        let mapped: Vec<Action> = [
            CliAction::DarkReference,
            CliAction::WhiteReference,
            CliAction::AttenuatedWhiteReference,
            CliAction::MercuryReference,
            CliAction::NeonReference,
            CliAction::AimingBeam,
        ]
        .into_iter()
        .map(CliAction::action)
        .collect();
        assert_eq!(mapped, ALL_ACTIONS.to_vec());
    }

    #[test]
    fn sparkline_spans_levels() {
        let line = sparkline(&samples(&[0.0, 1.0]), 2);
        assert_eq!(line, "▁█");
    }

    #[test]
    fn sparkline_flat_spectrum() {
        let line = sparkline(&samples(&[5.0, 5.0, 5.0]), 3);
        assert_eq!(line, "▁▁▁");
    }

    #[test]
    fn sparkline_caps_width() {
        let line = sparkline(&samples(&[0.0; 100]), 10);
        assert_eq!(line.chars().count(), 10);
    }

    #[test]
    fn sparkline_empty_input() {
        assert_eq!(sparkline(&[], 10), "");
        assert_eq!(sparkline(&samples(&[f64::NAN]), 4), "");
    }
}
