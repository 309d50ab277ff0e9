use std::process::ExitCode;

fn main() -> ExitCode {
    match linebridged::run_bridge() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("linebridged: {error}");
            ExitCode::FAILURE
        }
    }
}
