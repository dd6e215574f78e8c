//! chainsim command line: simulate chain files, print their equations of
//! motion and replay saved runs.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ftlog::{LevelFilter, LoggerGuard};

use chainsim::config::ChainConfig;
use chainsim::persistence;
use chainsim::presentation;
use chainsim::{Simulation, SolverKind};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Log debug messages, including rejected steps
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Integrate a chain file and save the result
    Simulate {
        /// Chain file (JSON)
        chain: PathBuf,

        /// Where to write the saved simulation
        #[arg(short, long, default_value = "simulation.json")]
        out: PathBuf,

        /// Override the end time
        #[arg(long)]
        t_end: Option<f64>,

        /// Override the number of output samples
        #[arg(long)]
        points: Option<usize>,

        /// Override the solver (dopri54, rkf45, esdirk32)
        #[arg(long)]
        solver: Option<SolverKind>,
    },

    /// Print the resolved equations of motion of a chain file
    Equations {
        chain: PathBuf,

        /// Print LaTeX instead of plain text
        #[arg(long)]
        latex: bool,
    },

    /// Print mass positions (presentation frame) of a saved simulation
    Replay {
        saved: PathBuf,

        /// Print every n-th sample
        #[arg(long, default_value_t = 1)]
        every: usize,
    },
}

fn configure_logger(verbose: bool) -> Result<LoggerGuard, String> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    ftlog::Builder::new()
        .max_log_level(level)
        .root(std::io::stderr())
        .try_init()
        .map_err(|e| e.to_string())
}

fn main() -> Result<(), String> {
    let args = Args::parse();
    let _guard = configure_logger(args.verbose)?;

    match args.command {
        Command::Simulate {
            chain,
            out,
            t_end,
            points,
            solver,
        } => {
            let config = ChainConfig::from_path(&chain).map_err(|e| e.to_string())?;
            let mut simulation = Simulation::from_config(&config).map_err(|e| e.to_string())?;
            let settings = simulation.settings_mut();
            if let Some(t_end) = t_end {
                settings.t_end = t_end;
            }
            if let Some(points) = points {
                settings.num_points = points;
            }
            if let Some(solver) = solver {
                settings.solver = solver;
            }

            match simulation.run() {
                Ok(result) => {
                    persistence::save(&out, &result).map_err(|e| e.to_string())?;
                    println!("{}", result.trajectory.message);
                    println!("saved to {}", out.display());
                    Ok(())
                }
                Err(chainsim::Error::Integration(err)) => {
                    let partial = out.with_extension("partial.json");
                    let result = chainsim::SimulationResult {
                        trajectory: (*err.partial).clone(),
                        system: simulation.mechanics().map_err(|e| e.to_string())?.snapshot(),
                        chain: simulation.chain().description(None),
                        settings: simulation.settings().clone(),
                    };
                    persistence::save(&partial, &result).map_err(|e| e.to_string())?;
                    Err(format!("{err}; partial trajectory saved to {}", partial.display()))
                }
                Err(err) => Err(err.to_string()),
            }
        }
        Command::Equations { chain, latex } => {
            let config = ChainConfig::from_path(&chain).map_err(|e| e.to_string())?;
            let simulation = Simulation::from_config(&config).map_err(|e| e.to_string())?;
            let mechanics = simulation.mechanics().map_err(|e| e.to_string())?;
            let text = if latex {
                presentation::latex_equations(&mechanics)
            } else {
                presentation::plain_equations(&mechanics)
            }
            .map_err(|e| e.to_string())?;
            println!("{text}");
            Ok(())
        }
        Command::Replay { saved, every } => {
            let saved = persistence::load(&saved).map_err(|e| e.to_string())?;
            let mut chain = saved.chain().map_err(|e| e.to_string())?;
            let trajectory = &saved.result.trajectory;
            for sample in (0..trajectory.len()).step_by(every.max(1)) {
                chain
                    .apply_sample(trajectory, sample)
                    .map_err(|e| e.to_string())?;
                let positions: Vec<String> = chain
                    .masses()
                    .iter()
                    .map(|m| {
                        let [x, y] = m.position();
                        format!("{}=({x:.6}, {y:.6})", m.name())
                    })
                    .collect();
                println!("t={:.6} {}", trajectory.t[sample], positions.join(" "));
            }
            Ok(())
        }
    }
}
