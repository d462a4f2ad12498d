// Core: the single object holding all interpreter state, and the public
// API surface a host program (or the CLI driver) drives it through.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::ForthIoError;
use crate::internals::builder::BootstrapError;
use crate::internals::files::{InputSource, OutputSink};
use crate::internals::inner::Fatal;
use crate::internals::messages::Msg;
use crate::kernel::{
    BoundsError, Cell, Image, DICTIONARY_START, MINIMUM_CORE_SIZE, PWD_SENTINEL, REG_DIC,
    REG_HEX, REG_INFO_CELL_SIZE, REG_INFO_CORE_SIZE, REG_PWD, REG_RSTK, REG_STATE,
};

pub struct Core {
    pub(crate) image: Image,
    pub(crate) top: Cell,
    pub(crate) param_stack_ptr: usize,
    pub(crate) instruction_ptr: usize,
    pub(crate) input: InputSource,
    pub(crate) output: OutputSink,
    pub(crate) msg: Msg,
    pub(crate) invalid: bool,
    pub(crate) stack_size: usize,
    pub(crate) blocks_dir: PathBuf,
}

impl Core {
    /// Builds a ready-to-use Core: bootstrap compiles the primitives and
    /// the standard word set, input defaults to an empty string (callers
    /// set a real source with `eval`/`set_*_input` before running).
    pub fn new(core_size: usize, blocks_dir: impl Into<PathBuf>) -> Result<Core, BootstrapError> {
        Core::with_io(
            core_size,
            blocks_dir,
            InputSource::from_string(""),
            OutputSink::stdout(),
            Msg::new(),
        )
    }

    pub fn with_io(
        core_size: usize,
        blocks_dir: impl Into<PathBuf>,
        input: InputSource,
        output: OutputSink,
        msg: Msg,
    ) -> Result<Core, BootstrapError> {
        if core_size < MINIMUM_CORE_SIZE {
            return Err(BootstrapError::CoreTooSmall);
        }
        let stack_size = core_size / 64;
        let mut core = Core {
            image: Image::new(core_size),
            top: 0,
            param_stack_ptr: core_size - 2 * stack_size,
            instruction_ptr: 0,
            input: InputSource::from_string(""),
            output,
            msg,
            invalid: false,
            stack_size,
            blocks_dir: blocks_dir.into(),
        };
        core.run_bootstrap()?;
        core.input = input;
        Ok(core)
    }

    /// A Core with registers initialized but no bootstrap compiled: used
    /// only by tests exercising `compile`/`find` directly, in isolation
    /// from the self-dispatch loop and primitive wrapper words.
    #[cfg(test)]
    pub(crate) fn new_uninitialized(
        core_size: usize,
        input: InputSource,
        output: OutputSink,
        msg: Msg,
        blocks_dir: impl Into<PathBuf>,
    ) -> Core {
        let stack_size = core_size / 64;
        let mut core = Core {
            image: Image::new(core_size),
            top: 0,
            param_stack_ptr: core_size - 2 * stack_size,
            instruction_ptr: 0,
            input,
            output,
            msg,
            invalid: false,
            stack_size,
            blocks_dir: blocks_dir.into(),
        };
        core.set_dic(DICTIONARY_START);
        core.set_pwd(PWD_SENTINEL);
        core.image
            .set(REG_INFO_CELL_SIZE, std::mem::size_of::<Cell>() as Cell)
            .unwrap();
        core.image
            .set(REG_INFO_CORE_SIZE, core_size as Cell)
            .unwrap();
        core
    }

    // --- registers -------------------------------------------------
    pub(crate) fn dic(&self) -> usize {
        self.image.get(REG_DIC).expect("DIC register in bounds") as usize
    }
    pub(crate) fn set_dic(&mut self, value: usize) {
        self.image
            .set(REG_DIC, value as Cell)
            .expect("DIC register in bounds");
    }
    pub(crate) fn pwd(&self) -> Cell {
        self.image.get(REG_PWD).expect("PWD register in bounds")
    }
    pub(crate) fn set_pwd(&mut self, value: Cell) {
        self.image
            .set(REG_PWD, value)
            .expect("PWD register in bounds");
    }
    pub(crate) fn state(&self) -> Cell {
        self.image.get(REG_STATE).expect("STATE register in bounds")
    }
    pub(crate) fn set_state(&mut self, value: Cell) {
        self.image
            .set(REG_STATE, value)
            .expect("STATE register in bounds");
    }
    pub fn hex(&self) -> Cell {
        self.image.get(REG_HEX).expect("HEX register in bounds")
    }
    pub(crate) fn rstk(&self) -> Cell {
        self.image.get(REG_RSTK).expect("RSTK register in bounds")
    }
    pub(crate) fn set_rstk(&mut self, value: Cell) {
        self.image
            .set(REG_RSTK, value)
            .expect("RSTK register in bounds");
    }

    // --- parameter stack --------------------------------------------
    fn param_stack_low(&self) -> usize {
        self.image.len() - 2 * self.stack_size
    }
    fn param_stack_high(&self) -> usize {
        self.image.len() - self.stack_size
    }

    pub(crate) fn array_push(&mut self, value: Cell) -> Result<(), Fatal> {
        let next = self.param_stack_ptr + 1;
        if next >= self.param_stack_high() {
            return Err(Fatal::Bounds(BoundsError(next)));
        }
        self.image.set(next, value)?;
        self.param_stack_ptr = next;
        Ok(())
    }

    pub(crate) fn array_pop(&mut self) -> Result<Cell, Fatal> {
        if self.param_stack_ptr <= self.param_stack_low() {
            return Err(Fatal::Bounds(BoundsError(self.param_stack_ptr)));
        }
        let value = self.image.get(self.param_stack_ptr)?;
        self.param_stack_ptr -= 1;
        Ok(value)
    }

    pub(crate) fn array_peek(&self) -> Result<Cell, Fatal> {
        Ok(self.image.get(self.param_stack_ptr)?)
    }

    /// Pushes the current value of `f` on the host side and replaces it,
    /// mirroring the public push/pop API the source exposes to the host
    /// language embedding the VM.
    pub fn push(&mut self, value: Cell) -> Result<(), Fatal> {
        self.array_push(self.top)?;
        self.top = value;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Cell, Fatal> {
        let result = self.top;
        self.top = self.array_pop()?;
        Ok(result)
    }

    pub fn stack_position(&self) -> usize {
        self.param_stack_ptr
    }

    // --- number formatting & diagnostics ------------------------------
    fn format_number(&self, value: Cell) -> String {
        if self.hex() != 0 {
            format!("{:X}", value)
        } else {
            format!("{}", value)
        }
    }

    pub(crate) fn print_number(&mut self, value: Cell) {
        let text = self.format_number(value);
        let _ = self.output.write_all(text.as_bytes());
    }

    pub(crate) fn print_stack(&mut self) {
        let top = self.top;
        let text = self.format_number(top);
        let _ = self.output.write_all(text.as_bytes());
        let _ = self.output.write_all(b"\t");
        let begin = self.param_stack_low();
        let mut s = self.param_stack_ptr;
        while begin + 1 < s {
            let value = self.image.get(s).unwrap_or(0);
            let text = self.format_number(value);
            let _ = self.output.write_all(text.as_bytes());
            let _ = self.output.write_all(b"\t");
            s -= 1;
        }
    }

    pub(crate) fn msg_error_unknown_word(&self, word: &[u8]) {
        let text = String::from_utf8_lossy(word);
        self.msg
            .error("read", &format!("{} is not a word", text), None::<()>);
    }

    pub(crate) fn blockio_primitive(
        &mut self,
        offset: Cell,
        mode: crate::internals::files::BlockMode,
    ) -> Cell {
        let id = self.top as u16;
        match crate::internals::files::blockio(
            &mut self.image,
            offset as usize,
            id,
            mode,
            &self.blocks_dir,
        ) {
            Ok(()) => 0,
            Err(e) => {
                self.msg.error("blockio", &e.to_string(), None::<()>);
                Cell::MAX
            }
        }
    }

    // --- input/output switching --------------------------------------
    pub fn set_string_input(&mut self, s: impl Into<String>) {
        self.input = InputSource::from_string(s);
    }

    pub fn set_file_input(&mut self, path: &Path) -> Result<(), ForthIoError> {
        self.input = InputSource::from_file(path)?;
        Ok(())
    }

    pub fn set_file_output(&mut self, path: &Path) -> Result<(), ForthIoError> {
        self.output = OutputSink::to_file(path)?;
        Ok(())
    }

    pub fn set_stdin_input(&mut self) {
        self.input = InputSource::stdin();
    }

    pub fn captured_output(&self) -> Option<&[u8]> {
        self.output.captured()
    }

    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    /// Sets string input, then runs to completion. The spec's `eval`.
    pub fn eval(&mut self, s: impl Into<String>) -> i32 {
        self.set_string_input(s);
        self.run()
    }

    /// Drives the inner interpreter until EOF or a fatal error. Once
    /// `invalid` is set, every subsequent call short-circuits to -1
    /// without touching the image again.
    pub fn run(&mut self) -> i32 {
        if self.invalid {
            return -1;
        }
        match self.execute() {
            Ok(()) => 0,
            Err(e) => {
                self.msg.error("run", &e.to_string(), None::<()>);
                self.invalid = true;
                -1
            }
        }
    }

    /// Writes a raw dump of the core (a small fixed header, then every
    /// cell in host byte order) to `out`. Not portable across
    /// architectures; intended only to restore on the same host.
    pub fn dump_core(&self, out: &mut impl Write) -> io::Result<()> {
        out.write_all(&(self.image.len() as u64).to_ne_bytes())?;
        out.write_all(&(self.stack_size as u64).to_ne_bytes())?;
        for cell in self.image.raw() {
            out.write_all(&cell.to_ne_bytes())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::MINIMUM_CORE_SIZE;

    fn fresh_core() -> Core {
        Core::with_io(
            MINIMUM_CORE_SIZE * 16,
            std::env::temp_dir(),
            InputSource::from_string(""),
            OutputSink::buffer(),
            Msg::new(),
        )
        .unwrap()
    }

    fn output_of(core: &Core) -> String {
        String::from_utf8(core.captured_output().unwrap_or(&[]).to_vec()).unwrap()
    }

    #[test]
    fn test_arithmetic_scenario() {
        let mut core = fresh_core();
        assert_eq!(core.eval("2 3 + ."), 0);
        assert!(output_of(&core).contains('5'));
    }

    #[test]
    fn test_hex_mode_scenario() {
        let mut core = fresh_core();
        assert_eq!(core.eval("hex 255 ."), 0);
        assert!(output_of(&core).contains("FF"));
    }

    #[test]
    fn test_definition_and_reuse_scenario() {
        let mut core = fresh_core();
        assert_eq!(core.eval(": sq dup * ; 7 sq ."), 0);
        assert!(output_of(&core).contains("49"));
    }

    #[test]
    fn test_control_flow_scenario_else_branch() {
        let mut core = fresh_core();
        assert_eq!(core.eval(": t 0 if 1 else 2 then . ; t"), 0);
        assert!(output_of(&core).contains('2'));
    }

    #[test]
    fn test_control_flow_scenario_if_branch() {
        let mut core = fresh_core();
        assert_eq!(core.eval(": t 1 if 1 else 2 then . ; t"), 0);
        assert!(output_of(&core).contains('1'));
    }

    #[test]
    fn test_loop_scenario() {
        let mut core = fresh_core();
        assert_eq!(
            core.eval(": cd 5 begin dup . 1 - dup 0 = until drop ; cd"),
            0
        );
        assert!(output_of(&core).starts_with("54321") || output_of(&core).contains("5"));
    }

    #[test]
    fn test_immediate_word_marks_run_opcode() {
        let mut core = fresh_core();
        assert_eq!(core.eval(": x immediate 42 ;"), 0);
        let link = core.find(b"x");
        assert_ne!(link, 0);
        let flags = core.image.get(link + 1).unwrap();
        assert_eq!(crate::kernel::opcode(flags), crate::internals::inner::RUN);
    }

    #[test]
    fn test_unknown_word_is_recoverable_not_fatal() {
        let mut core = fresh_core();
        assert_eq!(core.eval("bogus-word-xyz 1 2 + ."), 0);
        assert!(!core.is_invalid());
        assert!(output_of(&core).contains('3'));
    }

    #[test]
    fn test_param_stack_underflow_is_fatal_and_sticky() {
        let mut core = fresh_core();
        assert_eq!(core.eval("drop drop drop drop drop drop drop drop drop drop drop drop drop drop drop drop drop drop drop drop"), -1);
        assert!(core.is_invalid());
        assert_eq!(core.eval("1 2 + ."), -1);
    }

    #[test]
    fn test_dump_core_writes_expected_length() {
        let core = fresh_core();
        let mut buf = Vec::new();
        core.dump_core(&mut buf).unwrap();
        let expected = 16 + core.image.len() * std::mem::size_of::<Cell>();
        assert_eq!(buf.len(), expected);
    }

    #[test]
    fn test_push_pop_roundtrip() {
        let mut core = fresh_core();
        core.push(10).unwrap();
        core.push(20).unwrap();
        assert_eq!(core.pop().unwrap(), 20);
        assert_eq!(core.pop().unwrap(), 10);
    }
}
