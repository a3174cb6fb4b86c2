/// Resumable CLI
///
/// Runs the synthetic renderer against the engine and prints the effective
/// configuration. Useful for checking suspension behaviour and tuning budgets.
use resumable_core::cli;

fn main() {
    if let Err(e) = cli::run_cli() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
