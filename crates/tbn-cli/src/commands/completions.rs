//! Shell completion generation.

use crate::cli::Cli;
use clap::CommandFactory;
use clap_complete::{generate, Shell};
use std::fs::File;
use std::io;
use std::path::Path;
use tbn_core::TbnResult;

pub fn handle(shell: Shell, out: Option<&Path>) -> TbnResult<()> {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    match out {
        Some(path) => {
            let mut file = File::create(path)?;
            generate(shell, &mut command, name, &mut file);
        }
        None => generate(shell, &mut command, name, &mut io::stdout()),
    }
    Ok(())
}
