// Linehaul: SLA path feasibility for parcel middle-mile networks
// Copyright (C) 2025 Linehaul contributors
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand};
use log::{error, info, LevelFilter};

use linehaul::{io, pathing, report, validate, NetworkContext};

/// Time-in-transit feasibility analysis for parcel middle-mile networks.
#[derive(Debug, Parser)]
#[command(name = "linehaul", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the feasibility model end to end.
    Run {
        /// Input workbook directory (one CSV file per table).
        #[clap(long = "input", short = 'i')]
        input: PathBuf,
        /// Output directory name. Derived from the scenario ids when omitted.
        #[clap(long = "output", short = 'o')]
        output: Option<String>,
        /// Parent directory for outputs.
        #[clap(long = "output-dir", default_value = "outputs")]
        output_dir: PathBuf,
        /// Worker threads for the per-OD evaluation fold.
        #[clap(long = "threads", short = 't')]
        threads: Option<usize>,
        /// Additionally write per-OD best-path step traces as JSON.
        #[clap(long)]
        trace: bool,
        /// Enable verbose (debug) logging.
        #[clap(short, long)]
        verbose: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            input,
            output,
            output_dir,
            threads,
            trace,
            verbose,
        } => {
            init_logging(verbose);
            match run(input, output, output_dir, threads, trace) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    error!("{e}");
                    ExitCode::FAILURE
                }
            }
        }
    }
}

/// Timed, pretty logging; `--verbose` lowers the filter to debug, RUST_LOG
/// still wins when set.
fn init_logging(verbose: bool) {
    let mut builder = pretty_env_logger::formatted_timed_builder();
    builder.filter_level(if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn run(
    input: PathBuf,
    output: Option<String>,
    output_dir: PathBuf,
    threads: Option<usize>,
    trace: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();

    rayon::ThreadPoolBuilder::new()
        .num_threads(threads.unwrap_or_else(num_cpus::get))
        .build_global()?;

    info!("loading inputs from {}", input.display());
    let inputs = io::load(&input)?;

    validate::validate(&inputs)?;

    let demands = pathing::build_demand(&inputs)?;

    let ctx = NetworkContext::new(&inputs);
    let od_timings = pathing::evaluate(&ctx, &demands);

    let reports = report::build_reports(&demands, &od_timings);

    let name = output.unwrap_or_else(|| io::default_output_name(&inputs.scenarios));
    let out_path = output_dir.join(name);
    io::write_reports(&out_path, &reports)?;
    if trace {
        io::write_step_traces(&out_path.join("step_traces.json"), &od_timings)?;
    }

    for row in &reports.summary {
        info!(
            "scenario {}: {:.0} pkgs/day, {:.1}% at SLA, avg TIT {:.1} h",
            row.scenario_id,
            row.total_packages,
            row.pct_volume_at_sla * 100.0,
            row.avg_tit_hours
        );
    }
    info!(
        "complete in {:.1}s, outputs in {}",
        start.elapsed().as_secs_f64(),
        out_path.display()
    );

    Ok(())
}
