use clap::Parser;
use cli::{Cli, Commands};
use tbn_core::{TbnError, TbnResult};
use tracing_subscriber::FmtSubscriber;

mod cli;
mod commands;

fn main() {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    if let Err(err) = run(cli) {
        report(&err);
        std::process::exit(err.exit_code());
    }
}

fn run(cli: Cli) -> TbnResult<()> {
    match cli.command {
        Commands::Analyze {
            input,
            no_concentrations,
            no_free_energies,
            friendly,
            params,
            temperature,
            dg_assoc,
            dh_assoc,
            solver,
        } => commands::analyze::handle(
            &input,
            no_concentrations,
            no_free_energies,
            friendly,
            &params,
            temperature,
            dg_assoc,
            dh_assoc,
            &solver,
        ),
        Commands::Ibot {
            input,
            on_target,
            bounded,
            generate_tbn,
            out,
            params,
            solver,
        } => commands::ibot::handle(
            &input,
            &on_target,
            bounded.as_deref(),
            generate_tbn.as_deref(),
            out.as_deref(),
            &params,
            &solver,
        ),
        Commands::Filter {
            input,
            spec,
            params,
            max_count,
            min_concentration,
            min_percent,
        } => commands::filter::handle(
            &input,
            &spec,
            &params,
            max_count,
            min_concentration,
            min_percent,
        ),
        Commands::Completions { shell, out } => commands::completions::handle(shell, out.as_deref()),
        Commands::Doctor {} => commands::doctor::handle(),
    }
}

fn report(err: &TbnError) {
    eprintln!("error[{}]: {err}", err.component());
}
