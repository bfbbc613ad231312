use std::process::ExitCode;

fn main() -> ExitCode {
    fieldgate_cli::run()
}
