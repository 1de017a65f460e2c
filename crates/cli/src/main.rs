use std::process::ExitCode;

fn main() -> ExitCode {
    erpflow_cli::run()
}
