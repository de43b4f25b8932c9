//! Main entry point for the parzip CLI app

fn main() -> std::process::ExitCode {
    if let Err(e) = parzip::cli_runner::run_cli_app() {
        if let Some(clap_err) = e.downcast_ref::<clap::Error>() {
            // Help and version requests also arrive here; clap picks the exit code.
            clap_err.exit();
        }
        eprintln!("Error: {}", e);
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}
