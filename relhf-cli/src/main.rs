use std::{path::PathBuf, time::Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use relhf::{
    atom::{Atom, AtomSummary},
    config::ConfigAtom,
    hf::Method,
    orbital::OrbitalSummary,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Solve the core and valence states of the atom described by an input file
    Run {
        /// JSON input file
        input: PathBuf,
        /// Overrides the method of the input file
        #[arg(long)]
        method: Option<Method>,
        /// Overrides the convergence target. Values of one or more are read as an
        /// exponent, i.e. 13 means 1e-13
        #[arg(long)]
        eps: Option<f64>,
        /// Overrides the maximum number of SCF iterations
        #[arg(long)]
        max_iterations: Option<usize>,
        /// Print a JSON summary instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn print_orbitals(title: &str, orbitals: &[OrbitalSummary]) {
    if orbitals.is_empty() {
        return;
    }
    println!("{title}");
    println!("{:>6} {:>4} {:>6} {:>18} {:>8}", "state", "k", "occ", "energy", "eps");
    for orbital in orbitals {
        println!(
            "{:>6} {:>4} {:>6.2} {:>18.9} {:>8.1e}",
            orbital.symbol, orbital.kappa, orbital.occupation, orbital.energy, orbital.eps
        );
    }
}

fn print_summary(summary: &AtomSummary) {
    println!("{} - {}", summary.element, summary.method);
    println!("{:<7}: {}", "Core", summary.core_convergence);
    if !summary.valence.is_empty() {
        println!("{:<7}: {}", "Val", summary.valence_convergence);
    }
    print_orbitals("core:", &summary.core);
    print_orbitals("valence:", &summary.valence);
    println!("core energy: {:.9}", summary.core_energy);
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let args = Args::parse();

    match args.command {
        Command::Run {
            input,
            method,
            eps,
            max_iterations,
            json,
        } => {
            let mut config = ConfigAtom::load(&input)
                .with_context(|| format!("loading {}", input.display()))?;
            if let Some(method) = method {
                config.hartree_fock.method = method;
            }
            if let Some(eps) = eps {
                config.hartree_fock.eps = eps;
            }
            if let Some(max_iterations) = max_iterations {
                config.hartree_fock.max_iterations = max_iterations;
            }

            let mut atom = Atom::try_from(config)?;
            let start = Instant::now();
            let summary = atom.solve();
            log::info!("solved in {:0.2?}", start.elapsed());

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
        }
    }

    Ok(())
}
