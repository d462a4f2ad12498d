// The threaded-code inner interpreter: primitive opcodes and the dispatch
// loop that walks compiled bodies.
//
// Mirrors the classic indirect-threaded design directly: a thread cell
// holds the address of another cell (`pc`) whose own contents, once
// masked, name the primitive to execute. Executing RUN at that cell is
// what makes calling a colon word and calling a raw builtin look
// identical to the dispatcher.

use crate::kernel::{opcode, BoundsError, Cell, INSTRUCTION_MASK};
use crate::runtime::Core;

pub const PUSH: Cell = 0;
pub const COMPILE: Cell = 1;
pub const RUN: Cell = 2;
pub const DEFINE: Cell = 3;
pub const IMMEDIATE: Cell = 4;
pub const COMMENT: Cell = 5;
pub const READ: Cell = 6;
pub const LOAD: Cell = 7;
pub const STORE: Cell = 8;
pub const SUB: Cell = 9;
pub const ADD: Cell = 10;
pub const AND: Cell = 11;
pub const OR: Cell = 12;
pub const XOR: Cell = 13;
pub const INV: Cell = 14;
pub const SHL: Cell = 15;
pub const SHR: Cell = 16;
pub const MUL: Cell = 17;
pub const LESS: Cell = 18;
pub const EXIT: Cell = 19;
pub const EMIT: Cell = 20;
pub const KEY: Cell = 21;
pub const FROMR: Cell = 22;
pub const TOR: Cell = 23;
pub const JMP: Cell = 24;
pub const JMPZ: Cell = 25;
pub const PNUM: Cell = 26;
pub const QUOTE: Cell = 27;
pub const COMMA: Cell = 28;
pub const EQUAL: Cell = 29;
pub const SWAP: Cell = 30;
pub const DUP: Cell = 31;
pub const DROP: Cell = 32;
pub const OVER: Cell = 33;
pub const TAIL: Cell = 34;
pub const BSAVE: Cell = 35;
pub const BLOAD: Cell = 36;
pub const FIND: Cell = 37;
pub const PRINT: Cell = 38;
pub const PSTK: Cell = 39;

/// Builtin names in exactly the order the bootstrap compiles them against
/// the opcodes READ..PSTK (in order). Keeping this table and the constants
/// above in lockstep is what the design notes mean by "opcode table
/// ordering must be preserved".
pub const BUILTIN_NAMES: [&str; 34] = [
    "read", "@", "!", "-", "+", "and", "or", "xor", "invert", "lshift", "rshift", "*", "<",
    "exit", "emit", "key", "r>", ">r", "j", "jz", ".", "'", ",", "=", "swap", "dup", "drop",
    "over", "tail", "save", "load", "find", "print", ".s",
];

/// A fatal condition: a bounds failure or a dispatch on an opcode with no
/// case. Carried up through `?` to `Core::run`, which sets `invalid` and
/// stops. This is the re-architected replacement for the source's
/// longjmp-based non-local exit (see design notes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fatal {
    Bounds(BoundsError),
    IllegalOpcode(Cell),
}

impl std::fmt::Display for Fatal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Fatal::Bounds(b) => write!(f, "fatal \"{}\"", b),
            Fatal::IllegalOpcode(op) => write!(f, "fatal 'illegal-op' ({})", op),
        }
    }
}

impl From<BoundsError> for Fatal {
    fn from(b: BoundsError) -> Fatal {
        Fatal::Bounds(b)
    }
}

/// What happened after one primitive dispatched.
pub(crate) enum Step {
    /// Dispatch is done; the outer loop should refetch `pc` from `I`.
    Done,
    /// READ found a word and wants to dispatch it immediately, without
    /// going back through the outer `I`-driven fetch (the `goto INNER` in
    /// the source).
    Rebranch(usize),
    /// READ hit end of input; `run` should stop cleanly.
    Eof,
}

impl Core {
    /// Drives the inner interpreter until EOF or a fatal error. Returns
    /// `Ok(())` on a clean stop; a fatal error is reported to `self.msg`
    /// and also returned so `run` can mark the core invalid.
    pub(crate) fn execute(&mut self) -> Result<(), Fatal> {
        loop {
            let pc0 = self.image.get(self.instruction_ptr)?;
            self.instruction_ptr += 1;
            if pc0 == 0 {
                return Ok(());
            }
            let mut pc = pc0 as usize;
            loop {
                match self.dispatch(pc)? {
                    Step::Done => break,
                    Step::Rebranch(next_pc) => {
                        pc = next_pc;
                        continue;
                    }
                    Step::Eof => return Ok(()),
                }
            }
        }
    }

    /// Executes exactly one primitive found at `pc`: reads `image[pc]`,
    /// masks it to a primitive opcode, and dispatches. `pc` is always a
    /// "code field" index per the header layout (link_index + 1 for a
    /// freshly-found word, or a raw thread-cell value otherwise).
    fn dispatch(&mut self, pc: usize) -> Result<Step, Fatal> {
        let code_cell = self.image.get(pc)?;
        let pc = pc + 1;
        match opcode(code_cell) {
            PUSH | QUOTE => {
                self.array_push(self.top)?;
                self.top = self.image.get(self.instruction_ptr)?;
                self.instruction_ptr += 1;
            }
            COMPILE => {
                let dic = self.dic();
                self.image.set(dic, pc as Cell)?;
                self.set_dic(dic + 1);
            }
            RUN => {
                let rstk = self.rstk().wrapping_add(1);
                self.set_rstk(rstk);
                self.image.set(rstk as usize, self.instruction_ptr as Cell)?;
                self.instruction_ptr = pc;
            }
            DEFINE => {
                self.set_state(1);
                match self.compile(COMPILE, None) {
                    Ok(()) => {}
                    Err(crate::internals::compiler::CompileError::Eof) => {
                        return Ok(Step::Eof)
                    }
                    Err(crate::internals::compiler::CompileError::Fatal(f)) => return Err(f),
                }
                let dic = self.dic();
                self.image.set(dic, RUN)?;
                self.set_dic(dic + 1);
            }
            IMMEDIATE => {
                // Consult PWD directly rather than rewinding DIC by a
                // hard-coded constant (see design notes): the code cell
                // of the word just defined always sits at PWD + 1.
                let code_field = self.pwd() as usize + 1;
                let flags = self.image.get(code_field)?;
                self.image
                    .set(code_field, (flags & !INSTRUCTION_MASK) | RUN)?;
            }
            COMMENT => {
                crate::internals::tokenizer::comment(&mut self.input);
            }
            READ => return self.dispatch_read(),
            LOAD => {
                self.top = self.image.get(self.top as usize)?;
            }
            STORE => {
                let addr = self.top as usize;
                let value = self.array_pop()?;
                self.image.set(addr, value)?;
                self.top = self.array_pop()?;
            }
            SUB => {
                let s = self.array_pop()?;
                self.top = s.wrapping_sub(self.top);
            }
            ADD => {
                let s = self.array_pop()?;
                self.top = s.wrapping_add(self.top);
            }
            AND => {
                let s = self.array_pop()?;
                self.top = s & self.top;
            }
            OR => {
                let s = self.array_pop()?;
                self.top = s | self.top;
            }
            XOR => {
                let s = self.array_pop()?;
                self.top = s ^ self.top;
            }
            INV => {
                self.top = !self.top;
            }
            SHL => {
                let s = self.array_pop()?;
                self.top = s.wrapping_shl(self.top as u32);
            }
            SHR => {
                let s = self.array_pop()?;
                self.top = s.wrapping_shr(self.top as u32);
            }
            MUL => {
                let s = self.array_pop()?;
                self.top = s.wrapping_mul(self.top);
            }
            LESS => {
                let s = self.array_pop()?;
                self.top = (s < self.top) as Cell;
            }
            EXIT => {
                let rstk = self.rstk();
                self.instruction_ptr = self.image.get(rstk as usize)? as usize;
                self.set_rstk(rstk.wrapping_sub(1));
            }
            EMIT => {
                use std::io::Write;
                let byte = self.top as u8;
                let _ = self.output.write_all(&[byte]);
                self.top = self.array_pop()?;
            }
            KEY => {
                self.array_push(self.top)?;
                self.top = crate::internals::tokenizer::get_char(&mut self.input)
                    .map(|b| b as Cell)
                    .unwrap_or(Cell::MAX);
            }
            FROMR => {
                self.array_push(self.top)?;
                let rstk = self.rstk();
                self.top = self.image.get(rstk as usize)?;
                self.set_rstk(rstk.wrapping_sub(1));
            }
            TOR => {
                let rstk = self.rstk().wrapping_add(1);
                self.set_rstk(rstk);
                self.image.set(rstk as usize, self.top)?;
                self.top = self.array_pop()?;
            }
            JMP => {
                let offset = self.image.get(self.instruction_ptr)?;
                self.instruction_ptr =
                    (self.instruction_ptr as Cell).wrapping_add(offset) as usize;
            }
            JMPZ => {
                if self.top == 0 {
                    let offset = self.image.get(self.instruction_ptr)?;
                    self.instruction_ptr =
                        (self.instruction_ptr as Cell).wrapping_add(offset) as usize;
                } else {
                    self.instruction_ptr += 1;
                }
                self.top = self.array_pop()?;
            }
            PNUM => {
                self.print_number(self.top);
                self.top = self.array_pop()?;
            }
            COMMA => {
                let dic = self.dic();
                self.image.set(dic, self.top)?;
                self.set_dic(dic + 1);
                self.top = self.array_pop()?;
            }
            EQUAL => {
                let s = self.array_pop()?;
                self.top = (s == self.top) as Cell;
            }
            SWAP => {
                let w = self.top;
                self.top = self.array_pop()?;
                self.array_push(w)?;
            }
            DUP => {
                self.array_push(self.top)?;
            }
            DROP => {
                self.top = self.array_pop()?;
            }
            OVER => {
                let w = self.array_peek()?;
                self.array_push(self.top)?;
                self.top = w;
            }
            TAIL => {
                let rstk = self.rstk();
                self.set_rstk(rstk.wrapping_sub(1));
            }
            BSAVE => {
                let offset = self.array_pop()?;
                self.top = self.blockio_primitive(offset, crate::internals::files::BlockMode::Write);
            }
            BLOAD => {
                let offset = self.array_pop()?;
                self.top = self.blockio_primitive(offset, crate::internals::files::BlockMode::Read);
            }
            FIND => {
                self.array_push(self.top)?;
                match crate::internals::tokenizer::get_word(&mut self.input) {
                    None => return Ok(Step::Eof),
                    Some(word) => {
                        let w = self.find(&word);
                        let addr = w + 2;
                        self.top = if w == 0 || addr < crate::kernel::DICTIONARY_START {
                            0
                        } else {
                            addr as Cell
                        };
                    }
                }
            }
            PRINT => {
                let bytes = self.image.read_bytes_until_nul(self.top as usize)?;
                use std::io::Write;
                let _ = self.output.write_all(&bytes);
                self.top = self.array_pop()?;
            }
            PSTK => {
                self.print_stack();
            }
            other => return Err(Fatal::IllegalOpcode(other)),
        }
        Ok(Step::Done)
    }

    fn dispatch_read(&mut self) -> Result<Step, Fatal> {
        let rstk = self.rstk();
        self.set_rstk(rstk.wrapping_sub(1));

        let word = match crate::internals::tokenizer::get_word(&mut self.input) {
            Some(w) => w,
            None => return Ok(Step::Eof),
        };

        let found = self.find(&word);
        if found > 1 {
            let mut pc = found + 1;
            let code_cell = self.image.get(pc)?;
            if self.state() == 0 && opcode(code_cell) == COMPILE {
                pc += 1;
            }
            return Ok(Step::Rebranch(pc));
        }

        if !crate::internals::tokenizer::is_number(&word) {
            self.msg_error_unknown_word(&word);
            return Ok(Step::Done);
        }

        let value = crate::internals::tokenizer::parse_number(&word).unwrap_or(0);
        if self.state() != 0 {
            // Compile a literal: a reference to the always-zero register
            // cell at index 2 (which decodes to opcode PUSH), followed by
            // the value itself. See design notes on literal compiling.
            let dic = self.dic();
            self.image.set(dic, 2)?;
            self.set_dic(dic + 1);
            let dic = self.dic();
            self.image.set(dic, value)?;
            self.set_dic(dic + 1);
        } else {
            self.array_push(self.top)?;
            self.top = value;
        }
        Ok(Step::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_length_matches_opcode_span() {
        assert_eq!(BUILTIN_NAMES.len(), (PSTK - READ + 1) as usize);
    }

    #[test]
    fn test_opcodes_fit_in_seven_bits() {
        assert!(PSTK < 128);
    }
}
