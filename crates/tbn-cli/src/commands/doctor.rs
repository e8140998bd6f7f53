//! Environment inspection: report which external solvers are reachable.

use tbn_core::TbnResult;
use tbn_solvers::{
    find_binary, EQUILIBRIUM_BINARY, EQUILIBRIUM_SOLVER_ENV, LATTICE_ALT_BINARY, LATTICE_BINARY,
    LATTICE_SOLVER_ALT_ENV, LATTICE_SOLVER_ENV,
};

pub fn handle() -> TbnResult<()> {
    let checks = [
        ("lattice solver (primary)", LATTICE_BINARY, LATTICE_SOLVER_ENV),
        (
            "lattice solver (alternate)",
            LATTICE_ALT_BINARY,
            LATTICE_SOLVER_ALT_ENV,
        ),
        (
            "equilibrium solver",
            EQUILIBRIUM_BINARY,
            EQUILIBRIUM_SOLVER_ENV,
        ),
    ];
    for (label, binary, env) in checks {
        match find_binary(binary, env, None) {
            Ok(path) => println!("{label}: {}", path.display()),
            Err(_) => println!("{label}: not found (set {env} or install `{binary}` on PATH)"),
        }
    }
    Ok(())
}
