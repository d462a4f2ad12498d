// Input sources, output sinks, and the block storage adapter.
//
// The outer interpreter only ever asks an InputSource for one character at
// a time; everything it needs (get_word, comment, shebang stripping) is
// built on top of that single primitive, the same way f3's FileHandle
// reduces every source to get_line/read_char.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::ForthIoError;
use crate::kernel::{Cell, Image};

pub const BLOCK_SIZE_BYTES: usize = 1024;

/// Supplies one byte at a time to the tokenizer. A string source is fully
/// buffered up front; stdin is drained a line at a time so a REPL still
/// blocks for input at sensible points rather than on process exit.
pub enum InputSource {
    Buffer { bytes: Vec<u8>, pos: usize },
    Stdin { pending: VecDeque<u8> },
}

impl InputSource {
    pub fn from_string(s: impl Into<String>) -> InputSource {
        InputSource::Buffer {
            bytes: s.into().into_bytes(),
            pos: 0,
        }
    }

    pub fn stdin() -> InputSource {
        InputSource::Stdin {
            pending: VecDeque::new(),
        }
    }

    /// Reads `path` in full, stripping a leading shebang line (`#!` up to
    /// and including the newline) if present.
    pub fn from_file(path: &Path) -> Result<InputSource, ForthIoError> {
        let mut file = File::open(path).map_err(|source| ForthIoError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|source| ForthIoError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        if contents.starts_with("#!") {
            if let Some(idx) = contents.find('\n') {
                contents.drain(..=idx);
            } else {
                contents.clear();
            }
        }
        Ok(InputSource::from_string(contents))
    }

    /// Returns the next byte, or None at end of input.
    pub fn get_char(&mut self) -> Option<u8> {
        match self {
            InputSource::Buffer { bytes, pos } => {
                if *pos >= bytes.len() {
                    None
                } else {
                    let b = bytes[*pos];
                    *pos += 1;
                    Some(b)
                }
            }
            InputSource::Stdin { pending } => {
                if pending.is_empty() {
                    let mut line = String::new();
                    io::stdout().flush().ok();
                    match io::stdin().read_line(&mut line) {
                        Ok(0) | Err(_) => return None,
                        Ok(_) => pending.extend(line.into_bytes()),
                    }
                }
                pending.pop_front()
            }
        }
    }
}

/// Destination for EMIT, `.`, `print`, and diagnostics the core itself
/// writes (as opposed to Msg, which goes to stderr).
pub enum OutputSink {
    Stdout,
    File(File),
    Buffer(Vec<u8>),
}

impl OutputSink {
    pub fn stdout() -> OutputSink {
        OutputSink::Stdout
    }

    pub fn buffer() -> OutputSink {
        OutputSink::Buffer(Vec::new())
    }

    pub fn to_file(path: &Path) -> Result<OutputSink, ForthIoError> {
        let file = File::create(path).map_err(|source| ForthIoError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(OutputSink::File(file))
    }

    /// Contents written so far, for sinks that buffer in memory. Used by
    /// tests that need to assert on interpreter output.
    pub fn captured(&self) -> Option<&[u8]> {
        match self {
            OutputSink::Buffer(v) => Some(v),
            _ => None,
        }
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputSink::Stdout => io::stdout().write(buf),
            OutputSink::File(f) => f.write(buf),
            OutputSink::Buffer(v) => v.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputSink::Stdout => io::stdout().flush(),
            OutputSink::File(f) => f.flush(),
            OutputSink::Buffer(v) => v.flush(),
        }
    }
}

/// Mode for a BSAVE/BLOAD transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockMode {
    Read,
    Write,
}

fn block_path(blocks_dir: &Path, block_id: u16) -> PathBuf {
    blocks_dir.join(format!("{:04x}.blk", block_id))
}

/// Reads or writes exactly BLOCK_SIZE_BYTES bytes between `image` (starting
/// at byte offset `buf_offset_bytes`, per the spec's byte-granular contract
/// for BSAVE/BLOAD) and the external file `XXXX.blk`.
///
/// Cells are serialized little-endian regardless of host endianness so
/// block files are portable across machines even though core dumps (§6)
/// are not.
pub fn blockio(
    image: &mut Image,
    buf_offset_bytes: usize,
    block_id: u16,
    mode: BlockMode,
    blocks_dir: &Path,
) -> Result<(), ForthIoError> {
    let cell_size = std::mem::size_of::<Cell>();
    let cells_per_block = BLOCK_SIZE_BYTES / cell_size;
    let core_bytes = image.len() * cell_size;
    let offset_bytes = buf_offset_bytes;
    if offset_bytes > core_bytes.saturating_sub(BLOCK_SIZE_BYTES) {
        return Err(ForthIoError::BlockOffsetOutOfRange {
            offset: offset_bytes,
            core_bytes,
        });
    }
    let buf_offset_cells = offset_bytes / cell_size;

    let path = block_path(blocks_dir, block_id);
    match mode {
        BlockMode::Read => {
            let mut file = File::open(&path).map_err(|source| ForthIoError::Open {
                path: path.clone(),
                source,
            })?;
            let mut raw = vec![0u8; BLOCK_SIZE_BYTES];
            let n = file
                .read(&mut raw)
                .map_err(|source| ForthIoError::Read {
                    path: path.clone(),
                    source,
                })?;
            if n != BLOCK_SIZE_BYTES {
                return Err(ForthIoError::ShortBlock {
                    id: block_id,
                    expected: BLOCK_SIZE_BYTES,
                    actual: n,
                });
            }
            for i in 0..cells_per_block {
                let start = i * cell_size;
                let mut cell_bytes = [0u8; 8];
                cell_bytes[..cell_size].copy_from_slice(&raw[start..start + cell_size]);
                let value = Cell::from_le_bytes(cell_bytes);
                image
                    .set(buf_offset_cells + i, value)
                    .map_err(|_| ForthIoError::BlockOffsetOutOfRange {
                        offset: offset_bytes,
                        core_bytes,
                    })?;
            }
            Ok(())
        }
        BlockMode::Write => {
            let mut raw = Vec::with_capacity(BLOCK_SIZE_BYTES);
            for i in 0..cells_per_block {
                let value = image
                    .get(buf_offset_cells + i)
                    .map_err(|_| ForthIoError::BlockOffsetOutOfRange {
                        offset: offset_bytes,
                        core_bytes,
                    })?;
                raw.extend_from_slice(&value.to_le_bytes()[..cell_size]);
            }
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&path)
                .map_err(|source| ForthIoError::Open {
                    path: path.clone(),
                    source,
                })?;
            file.write_all(&raw)
                .map_err(|source| ForthIoError::Write {
                    path: path.clone(),
                    source,
                })?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_input_get_char() {
        let mut src = InputSource::from_string("ab");
        assert_eq!(src.get_char(), Some(b'a'));
        assert_eq!(src.get_char(), Some(b'b'));
        assert_eq!(src.get_char(), None);
    }

    #[test]
    fn test_file_input_strips_shebang() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prog.fs");
        std::fs::write(&path, "#!/usr/bin/env forth\n2 3 + .").unwrap();
        let mut src = InputSource::from_file(&path).unwrap();
        let mut collected = Vec::new();
        while let Some(b) = src.get_char() {
            collected.push(b);
        }
        assert_eq!(String::from_utf8(collected).unwrap(), "2 3 + .");
    }

    #[test]
    fn test_file_input_without_shebang_is_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prog.fs");
        std::fs::write(&path, "2 3 + .").unwrap();
        let mut src = InputSource::from_file(&path).unwrap();
        let mut collected = Vec::new();
        while let Some(b) = src.get_char() {
            collected.push(b);
        }
        assert_eq!(String::from_utf8(collected).unwrap(), "2 3 + .");
    }

    #[test]
    fn test_output_sink_buffer_captures() {
        let mut sink = OutputSink::buffer();
        sink.write_all(b"hi").unwrap();
        assert_eq!(sink.captured(), Some(b"hi".as_ref()));
    }

    #[test]
    fn test_blockio_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cell_size = std::mem::size_of::<Cell>();
        let mut image = Image::new(4096);
        for i in 0..128 {
            image.set(64 + i, (i * 3) as Cell).unwrap();
        }
        blockio(&mut image, 64 * cell_size, 0x2a, BlockMode::Write, dir.path()).unwrap();

        let mut image2 = Image::new(4096);
        blockio(&mut image2, 200 * cell_size, 0x2a, BlockMode::Read, dir.path()).unwrap();
        for i in 0..128 {
            assert_eq!(image2.get(200 + i).unwrap(), (i * 3) as Cell);
        }
        assert!(dir.path().join("002a.blk").exists());
    }

    #[test]
    fn test_blockio_offset_is_byte_granular_not_cell_granular() {
        let dir = tempfile::tempdir().unwrap();
        let cell_size = std::mem::size_of::<Cell>();
        let mut image = Image::new(4096);
        for i in 0..128 {
            image.set(i, (i * 7) as Cell).unwrap();
        }
        // A byte offset of one cell's width must land the block at cell
        // index 1, not at cell index `cell_size` (which a cell-indexed
        // misinterpretation of the same offset would produce).
        blockio(&mut image, cell_size, 0x33, BlockMode::Write, dir.path()).unwrap();

        let mut image2 = Image::new(4096);
        blockio(&mut image2, cell_size, 0x33, BlockMode::Read, dir.path()).unwrap();
        for i in 0..128 {
            assert_eq!(image2.get(1 + i).unwrap(), ((1 + i) * 7) as Cell);
        }
    }

    #[test]
    fn test_blockio_rejects_out_of_range_offset() {
        let dir = tempfile::tempdir().unwrap();
        let mut image = Image::new(8);
        let result = blockio(&mut image, 0, 1, BlockMode::Write, dir.path());
        assert!(matches!(
            result,
            Err(ForthIoError::BlockOffsetOutOfRange { .. })
        ));
    }

    #[test]
    fn test_blockio_read_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let cell_size = std::mem::size_of::<Cell>();
        let mut image = Image::new(4096);
        let result = blockio(&mut image, 64 * cell_size, 0x99, BlockMode::Read, dir.path());
        assert!(matches!(result, Err(ForthIoError::Open { .. })));
    }
}
