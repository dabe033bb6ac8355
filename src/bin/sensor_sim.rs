//! Sensor Stream Simulation
//!
//! Generates synthetic `<encoder>,<current>` records for testing the
//! monitor without hardware. Simulates two regimes:
//! - Unclogged: steady encoder advance, low current with small noise
//! - Clogged: stalling encoder advance, elevated and noisier current
//!
//! # Usage
//! ```bash
//! ./sensor-sim --regime clogged --rate 10 | ./nozzle-sentinel --stdin
//! ```

use clap::{Parser, ValueEnum};
use rand::prelude::*;
use std::io::{self, Write};

// ============================================================================
// Regime Constants
// ============================================================================

/// Encoder advance per sample while extruding freely (counts)
const UNCLOGGED_ADVANCE: f64 = 4.0;
/// Encoder advance per sample while clogged (counts)
const CLOGGED_ADVANCE: f64 = 0.3;
/// Baseline motor current while extruding freely (amps)
const UNCLOGGED_CURRENT: f64 = 0.35;
/// Baseline motor current while clogged (amps)
const CLOGGED_CURRENT: f64 = 0.85;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Regime {
    /// Free extrusion
    Unclogged,
    /// Obstructed nozzle
    Clogged,
    /// Alternate between the two every `--switch-every` samples
    Alternating,
    /// Fully stalled encoder (exercises the degenerate-window guard)
    Stalled,
}

#[derive(Parser, Debug)]
#[command(name = "sensor-sim")]
#[command(about = "Synthetic encoder/current stream for nozzle-sentinel testing")]
#[command(version)]
struct Args {
    /// Operating regime to simulate
    #[arg(long, value_enum, default_value = "unclogged")]
    regime: Regime,

    /// Samples per second (0 = as fast as possible)
    #[arg(long, default_value = "10")]
    rate: u64,

    /// Total samples to emit (0 = unbounded)
    #[arg(long, default_value = "0")]
    count: u64,

    /// Samples between regime switches in alternating mode
    #[arg(long, default_value = "600")]
    switch_every: u64,

    /// Fraction of lines corrupted to exercise parser error paths (0.0-1.0)
    #[arg(long, default_value = "0.0")]
    corruption: f64,
}

fn main() -> io::Result<()> {
    let args = Args::parse();
    let mut rng = rand::thread_rng();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let mut encoder: f64 = 0.0;
    let mut emitted: u64 = 0;

    loop {
        if args.count > 0 && emitted >= args.count {
            break;
        }

        let clogged = match args.regime {
            Regime::Unclogged => false,
            Regime::Clogged => true,
            Regime::Alternating => (emitted / args.switch_every.max(1)) % 2 == 1,
            Regime::Stalled => false,
        };

        let (advance, base_current, jitter) = if clogged {
            (CLOGGED_ADVANCE, CLOGGED_CURRENT, 0.15)
        } else {
            (UNCLOGGED_ADVANCE, UNCLOGGED_CURRENT, 0.03)
        };

        if args.regime != Regime::Stalled {
            encoder += advance * rng.gen_range(0.8..1.2);
        }
        let current = (base_current + rng.gen_range(-jitter..jitter)).max(0.0);

        if args.corruption > 0.0 && rng.gen_bool(args.corruption.clamp(0.0, 1.0)) {
            // Emit a line the parser must reject and report
            writeln!(out, "##{:.1}", encoder)?;
        } else {
            writeln!(out, "{:.1},{:.3}", encoder, current)?;
        }
        out.flush()?;
        emitted += 1;

        if args.rate > 0 {
            std::thread::sleep(std::time::Duration::from_millis(1000 / args.rate.max(1)));
        }
    }

    Ok(())
}
