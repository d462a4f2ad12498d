// The bootstrap bring-up sequence: hand-written self-dispatch loop, three
// hand-compiled immediates, the 34 single-primitive wrapper words, and
// finally the bootstrap Forth source that defines everything else.
//
// The bootstrap program text is carried verbatim, as data the VM itself
// compiles — not Rust source to imitate.

use crate::internals::inner::{
    Fatal, BUILTIN_NAMES, COMMENT, DEFINE, IMMEDIATE, READ, RUN,
};
use crate::kernel::{Cell, DICTIONARY_START};
use crate::runtime::Core;

pub const BOOTSTRAP_SOURCE: &str = "\\ FORTH startup program.       \n\
: state 8 ! exit : ; immediate ' exit , 0 state exit : hex 9 ! ; : pwd 10 ; \n\
: h 0 ; : r 1 ; : here h @ ; : [ immediate 0 state ; : ] 1 state ;          \n\
: :noname immediate here 2 , ] ; : if immediate ' jz , here 0 , ;           \n\
: else immediate ' j , here 0 , swap dup here swap - swap ! ;               \n\
: then immediate dup here swap - swap ! ; : 2dup over over ;                \n\
: begin immediate here ; : until immediate ' jz , here - , ;                \n\
: 0= 0 = ; : 1+ 1 + ; : 1- 1 - ; : ')' 41 ; : tab 9 emit ; : cr 10 emit ;   \n\
: .( key drop begin key dup ')' = if drop exit then emit 0 until ;          \n\
: line dup . tab dup 4 + swap begin dup @ . tab 1+ 2dup = until drop ;      \n\
: literal 2 , , ; : size [ 11 @ literal ] ;                                 \n\
: list swap begin line cr 2dup < until ; : allot here + h ! ;               \n\
: words pwd @ begin dup dup 1 + @ 8 rshift 255 and - size * print tab @ dup 32 < until drop cr ;  \n\
: tuck swap over ; : nip swap drop ; : rot >r swap r> swap ;                \n\
: -rot rot rot ; : ? 0= if [ find \\ , ] then ; : :: [ find : , ] ;";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapError {
    CoreTooSmall,
    NameTableEof,
    SourceFatal(CoreFatalKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreFatalKind {
    Bounds,
    IllegalOpcode,
}

impl From<Fatal> for BootstrapError {
    fn from(f: Fatal) -> BootstrapError {
        BootstrapError::SourceFatal(match f {
            Fatal::Bounds(_) => CoreFatalKind::Bounds,
            Fatal::IllegalOpcode(_) => CoreFatalKind::IllegalOpcode,
        })
    }
}

impl Core {
    pub(crate) fn run_bootstrap(&mut self) -> Result<(), BootstrapError> {
        self.set_dic(DICTIONARY_START);
        self.set_pwd(crate::kernel::PWD_SENTINEL);
        self.image
            .set(crate::kernel::REG_INFO_CELL_SIZE, std::mem::size_of::<Cell>() as Cell)?;
        self.image
            .set(crate::kernel::REG_INFO_CORE_SIZE, self.image.len() as Cell)?;

        self.comma_raw(READ)?;
        self.comma_raw(RUN)?;
        let instruction_start = self.dic();
        self.comma_raw(DICTIONARY_START as Cell)?;
        self.comma_raw((instruction_start - 1) as Cell)?;
        self.instruction_ptr = instruction_start as usize;

        self.compile(DEFINE, Some(b":")).map_err(|_| BootstrapError::NameTableEof)?;
        self.compile(IMMEDIATE, Some(b"immediate")).map_err(|_| BootstrapError::NameTableEof)?;
        self.compile(COMMENT, Some(b"\\")).map_err(|_| BootstrapError::NameTableEof)?;

        for (i, name) in BUILTIN_NAMES.iter().enumerate() {
            self.compile(crate::internals::inner::COMPILE, Some(name.as_bytes()))
                .map_err(|_| BootstrapError::NameTableEof)?;
            let op = READ + i as Cell;
            self.comma_raw(op)?;
        }

        let stack_size = self.stack_size;
        let core_size = self.image.len();
        self.set_rstk((core_size - stack_size) as Cell);
        self.param_stack_ptr = core_size - 2 * stack_size;

        self.set_string_input(BOOTSTRAP_SOURCE);
        self.execute()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::kernel::MINIMUM_CORE_SIZE;
    use crate::runtime::Core;

    #[test]
    fn test_bootstrap_defines_colon_and_semicolon() {
        let core = Core::new(MINIMUM_CORE_SIZE * 16, std::env::temp_dir()).unwrap();
        assert_ne!(core.find(b":"), 0);
        assert_ne!(core.find(b";"), 0);
        assert_ne!(core.find(b"if"), 0);
        assert_ne!(core.find(b"begin"), 0);
        assert_ne!(core.find(b"words"), 0);
    }

    #[test]
    fn test_bootstrap_rejects_undersized_core() {
        let result = Core::new(8, std::env::temp_dir());
        assert!(result.is_err());
    }
}
