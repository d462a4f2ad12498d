// The compiler (append a new word header) and the dictionary search it
// feeds from. Both operate directly on Core's image and registers; they
// know nothing about threading or dispatch, only about header layout.

use crate::internals::inner::Fatal;
use crate::internals::tokenizer::get_word;
use crate::kernel::{
    is_hidden, make_flags_cell, name_len_cells, BoundsError, Cell, DICTIONARY_START,
};
use crate::runtime::Core;

/// compile() failed: either input was exhausted before a name could be
/// read (recoverable — matches the source's own EOF handling), or a
/// dictionary write ran past the end of the core (fatal, propagated like
/// every other bounds failure rather than panicking).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    Eof,
    Fatal(Fatal),
}

impl From<Fatal> for CompileError {
    fn from(f: Fatal) -> CompileError {
        CompileError::Fatal(f)
    }
}

impl From<BoundsError> for CompileError {
    fn from(b: BoundsError) -> CompileError {
        CompileError::Fatal(Fatal::Bounds(b))
    }
}

impl Core {
    /// Appends one cell to the dictionary at DIC, advancing DIC. The
    /// bread-and-butter operation every header field and every threaded
    /// reference goes through.
    pub(crate) fn comma_raw(&mut self, value: Cell) -> Result<usize, crate::internals::inner::Fatal> {
        let idx = self.dic();
        self.image.set(idx, value)?;
        self.set_dic(idx + 1);
        Ok(idx)
    }

    /// Appends a new word header: name bytes (from `name` or parsed from
    /// input), a link field pointing at the previous PWD, and a flags/code
    /// cell recording the name length and `code`. Leaves DIC positioned
    /// at the first cell of the (still empty) body.
    pub fn compile(&mut self, code: Cell, name: Option<&[u8]>) -> Result<(), CompileError> {
        let owned;
        let name = match name {
            Some(n) => n,
            None => {
                owned = get_word(&mut self.input).ok_or(CompileError::Eof)?;
                &owned
            }
        };
        let header = self.dic();
        let used = self.image.write_bytes_nul_terminated(header, name)?;
        self.set_dic(header + used);

        let old_pwd = self.pwd();
        let link_idx = self.comma_raw(old_pwd as Cell)?;
        self.set_pwd(link_idx as Cell);

        let flags = make_flags_cell(used, code);
        self.comma_raw(flags)?;
        Ok(())
    }

    /// Walks the dictionary from PWD looking for an exact, case-sensitive,
    /// non-hidden match. Returns the link-field index, or 0 if absent.
    pub fn find(&self, name: &[u8]) -> usize {
        let mut w = self.pwd() as usize;
        loop {
            if w <= DICTIONARY_START {
                return 0;
            }
            let flags = match self.image.get(w + 1) {
                Ok(v) => v,
                Err(_) => return 0,
            };
            let len = name_len_cells(flags);
            if !is_hidden(flags) {
                if let Ok(candidate) = self.image.read_bytes_until_nul(w - len) {
                    if candidate == name {
                        return w;
                    }
                }
            }
            w = match self.image.get(w) {
                Ok(v) => v as usize,
                Err(_) => return 0,
            };
        }
    }
}
