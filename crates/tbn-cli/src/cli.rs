//! Command-line surface of the `tbnx` binary.

use clap::{Parser, Subcommand, ValueHint};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tbnx", author, version, about = "Thermodynamic Binding Network analyzer", long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute the polymer basis, free energies, and equilibrium
    /// concentrations of a TBN
    Analyze {
        /// Input `.tbn` file
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        /// Skip the equilibrium solver (no concentration column)
        #[arg(long)]
        no_concentrations: bool,
        /// Skip free energies (implies no concentrations)
        #[arg(long)]
        no_free_energies: bool,
        /// Also emit the basis as a user-friendly `.tbnpolys` file
        #[arg(long)]
        friendly: bool,
        /// `k=v` substitutions for `{{expr}}` concentration parameters
        #[arg(long = "param", value_name = "K=V")]
        params: Vec<String>,
        /// Temperature in °C for free energies and the equilibrium solver
        #[arg(long, default_value_t = 37.0)]
        temperature: f64,
        /// Association penalty ΔG at 37 °C (enables the penalty term)
        #[arg(long)]
        dg_assoc: Option<f64>,
        /// Association penalty ΔH (defaults to ΔG_assoc when omitted)
        #[arg(long)]
        dh_assoc: Option<f64>,
        #[command(flatten)]
        solver: SolverArgs,
    },
    /// Assign concentration exponents to off-target polymers (IBOT)
    Ibot {
        /// Input `.tbn` file
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        /// On-target polymers, one per paragraph (`.tbnpolys`)
        #[arg(long, value_hint = ValueHint::FilePath)]
        on_target: PathBuf,
        /// Bounded-target mode: solve strict slices only for the polymers
        /// listed in this `.tbnpolys` file (computed exponents are lower
        /// bounds)
        #[arg(long, value_hint = ValueHint::FilePath)]
        bounded: Option<PathBuf>,
        /// Emit a balanced `.tbn` with monomer concentrations derived from
        /// the exponents, e.g. `--generate-tbn 100,nM`
        #[arg(long, value_name = "CONC,UNIT")]
        generate_tbn: Option<String>,
        /// Output path (defaults to `<input>-ibot.tbnpolys`)
        #[arg(long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
        /// `k=v` substitutions for `{{expr}}` concentration parameters
        #[arg(long = "param", value_name = "K=V")]
        params: Vec<String>,
        #[command(flatten)]
        solver: SolverArgs,
    },
    /// Query a polymer-matrix artifact with monomer constraints
    Filter {
        /// Input `.tbn` file (its artifact must exist)
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        /// Filter specification file (`CONTAINS` / `EXACTLY` lines)
        #[arg(value_hint = ValueHint::FilePath)]
        spec: PathBuf,
        /// `k=v` substitutions for `{{expr}}` concentration parameters
        #[arg(long = "param", value_name = "K=V")]
        params: Vec<String>,
        /// Keep at most this many matches
        #[arg(long)]
        max_count: Option<usize>,
        /// Drop matches below this concentration (declared units)
        #[arg(long)]
        min_concentration: Option<f64>,
        /// Drop matches below this percent of total concentration
        #[arg(long)]
        min_percent: Option<f64>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
        /// Write output to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Inspect the local environment and report solver setup issues
    Doctor {},
}

/// Solver selection and subprocess options shared by analyze and ibot.
#[derive(clap::Args, Debug)]
pub struct SolverArgs {
    /// Use the alternate lattice backend
    #[arg(long)]
    pub alt_lattice: bool,
    /// Path to the lattice solver binary (overrides the environment)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub lattice_solver: Option<PathBuf>,
    /// Path to the equilibrium solver binary (overrides the environment)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub equilibrium_solver: Option<PathBuf>,
    /// Use the alternate (row-augmented) equilibrium backend
    #[arg(long)]
    pub alt_equilibrium: bool,
    /// Solver deadline in seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
    /// Preserve solver input files under `solver-inputs/`
    #[arg(long)]
    pub keep_solver_inputs: bool,
    /// Worker threads ("auto" or a count)
    #[arg(long, default_value = "auto")]
    pub threads: String,
}
