use std::{env, fs, process::ExitCode};

use fig::{Runner, StdInput, StdPrint};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.iter().any(|arg| arg == "--version") {
        println!("fig {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }
    let Some(path) = args.first() else {
        eprintln!("usage: fig <source> | fig --version");
        return ExitCode::FAILURE;
    };

    let source = match read_file(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let runner = match Runner::new(source, path) {
        Ok(runner) => runner,
        Err(exception) => {
            eprintln!("{exception}");
            return ExitCode::FAILURE;
        }
    };
    // Warnings go out before the program prints anything.
    for warning in runner.warnings() {
        eprintln!("{warning}");
    }

    let mut print = StdPrint::default();
    let mut input = StdInput::new();
    let result = runner.run(&mut print, &mut input);
    drop(print); // flush buffered stdout before diagnostics

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(exception) => {
            eprintln!("{exception}");
            ExitCode::FAILURE
        }
    }
}

fn read_file(path: &str) -> Result<String, String> {
    match fs::metadata(path) {
        Ok(metadata) if !metadata.is_file() => return Err(format!("{path} is not a file")),
        Ok(_) => {}
        Err(err) => return Err(format!("could not read {path}: {err}")),
    }
    fs::read_to_string(path).map_err(|err| format!("could not read {path}: {err}"))
}
