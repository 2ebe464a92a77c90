//! Main entry point for the filepack CLI app

fn main() -> std::process::ExitCode {
    filepack::cli_runner::run_cli_app()
}
