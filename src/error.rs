// Typed errors at the I/O boundary: file loading and block storage.
//
// Everything inside the inner interpreter still reports recoverable
// failures through `Msg` and a stack value (see internals::inner); this
// type exists so the CLI driver and the block I/O adapter have something
// better than a bare `Option` to hand back to their callers.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ForthIoError {
    #[error("could not open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("block {id:04x} short read/write: expected {expected} bytes, got {actual}")]
    ShortBlock {
        id: u16,
        expected: usize,
        actual: usize,
    },

    #[error("block offset {offset} out of range for core of {core_bytes} bytes")]
    BlockOffsetOutOfRange { offset: usize, core_bytes: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_block_display() {
        let e = ForthIoError::ShortBlock {
            id: 0x0a,
            expected: 1024,
            actual: 512,
        };
        assert_eq!(
            e.to_string(),
            "block 000a short read/write: expected 1024 bytes, got 512"
        );
    }

    #[test]
    fn test_offset_out_of_range_display() {
        let e = ForthIoError::BlockOffsetOutOfRange {
            offset: 9000,
            core_bytes: 8192,
        };
        assert_eq!(
            e.to_string(),
            "block offset 9000 out of range for core of 8192 bytes"
        );
    }
}
