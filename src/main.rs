// CLI driver: parse Config, build a Core, run each file argument (or
// stdin with none), optionally dump core, exit non-zero on failure.

use std::fs::File;
use std::process::ExitCode;

use threadforth::config::Config;
use threadforth::internals::files::InputSource;
use threadforth::{Core, Msg};

fn run_forth(config: Config) -> bool {
    let mut msg = Msg::new();
    msg.set_level(config.debug_level);

    let mut core = match Core::with_io(
        config.core_size,
        config.blocks_dir.clone(),
        InputSource::from_string(""),
        threadforth::OutputSink::stdout(),
        msg,
    ) {
        Ok(core) => core,
        Err(e) => {
            eprintln!("could not start core: {:?}", e);
            return false;
        }
    };

    if config.files.is_empty() {
        core.set_stdin_input();
        core.run();
    } else {
        for path in &config.files {
            if core.is_invalid() {
                break;
            }
            if let Err(e) = load_and_eval(&mut core, path) {
                eprintln!("{}", e);
                return false;
            }
        }
    }

    if config.dump_core && !core.is_invalid() {
        match File::create("forth.core") {
            Ok(mut f) => {
                if let Err(e) = core.dump_core(&mut f) {
                    eprintln!("could not write forth.core: {}", e);
                    return false;
                }
            }
            Err(e) => {
                eprintln!("could not write forth.core: {}", e);
                return false;
            }
        }
    }

    !core.is_invalid()
}

fn load_and_eval(core: &mut Core, path: &std::path::Path) -> Result<(), threadforth::ForthIoError> {
    core.set_file_input(path)?;
    core.run();
    Ok(())
}

fn main() -> ExitCode {
    let config = Config::parse_args();
    if run_forth(config) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
