// Threaded-code Forth VM: a flat cell-indexed memory image driving an
// indirect-threaded dispatch loop, with file/stdin input, buffered or
// file output, and an external block storage adapter.

pub mod config;
pub mod error;
pub mod internals;
pub mod kernel;
pub mod runtime;

pub use error::ForthIoError;
pub use internals::files::{InputSource, OutputSink};
pub use internals::messages::{DebugLevel, Msg};
pub use kernel::Cell;
pub use runtime::Core;
