use std::process::ExitCode;

fn main() -> ExitCode {
    waitline::app::startup::startup()
}
