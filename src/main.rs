use std::process::ExitCode;

fn main() -> ExitCode {
    labeldup::logging::init_tracing();

    match labeldup::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
