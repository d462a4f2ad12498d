// Command line configuration, mirroring f3's own Config/process_args split
// but expressed with clap's derive API.

use std::path::PathBuf;

use clap::Parser;

use crate::internals::messages::DebugLevel;
use crate::kernel::MINIMUM_CORE_SIZE;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

fn parse_debug_level(s: &str) -> Result<DebugLevel, String> {
    match s {
        "error" => Ok(DebugLevel::Error),
        "warning" => Ok(DebugLevel::Warning),
        "info" => Ok(DebugLevel::Info),
        "debug" => Ok(DebugLevel::Debug),
        other => Err(format!(
            "invalid debug level '{}': expected one of error, warning, info, debug",
            other
        )),
    }
}

#[derive(Parser, Debug)]
#[command(name = "forth", version = VERSION, about = "A minimal threaded-code Forth interpreter")]
pub struct Config {
    /// Verbosity of diagnostic output.
    #[arg(long = "debug-level", value_parser = parse_debug_level, default_value = "error")]
    pub debug_level: DebugLevel,

    /// On a clean exit, write a raw core dump to forth.core.
    #[arg(short = 'd', long = "dump-core")]
    pub dump_core: bool,

    /// Base directory for BSAVE/BLOAD's XXXX.blk files.
    #[arg(long = "blocks-dir", default_value = ".")]
    pub blocks_dir: PathBuf,

    /// Number of cells in the memory image.
    #[arg(long = "core-size", default_value_t = MINIMUM_CORE_SIZE * 16)]
    pub core_size: usize,

    /// Source files to run; with none, read from standard input.
    pub files: Vec<PathBuf>,
}

impl Config {
    pub fn parse_args() -> Config {
        Config::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_with_no_args() {
        let config = Config::parse_from(["forth"]);
        assert_eq!(config.debug_level, DebugLevel::Error);
        assert!(!config.dump_core);
        assert!(config.files.is_empty());
        assert_eq!(config.core_size, MINIMUM_CORE_SIZE * 16);
    }

    #[test]
    fn test_debug_level_flag() {
        let config = Config::parse_from(["forth", "--debug-level", "debug"]);
        assert_eq!(config.debug_level, DebugLevel::Debug);
    }

    #[test]
    fn test_dump_core_flag() {
        let config = Config::parse_from(["forth", "-d"]);
        assert!(config.dump_core);
    }

    #[test]
    fn test_positional_files() {
        let config = Config::parse_from(["forth", "a.fs", "b.fs"]);
        assert_eq!(config.files, vec![PathBuf::from("a.fs"), PathBuf::from("b.fs")]);
    }

    #[test]
    fn test_rejects_bad_debug_level() {
        let result = Config::try_parse_from(["forth", "--debug-level", "bogus"]);
        assert!(result.is_err());
    }
}
