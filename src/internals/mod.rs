// Everything below Core's own register/stack bookkeeping: header layout
// and dictionary search, tokenizing, leveled diagnostics, I/O adapters,
// the primitive dispatch table, and bootstrap bring-up.

pub mod builder;
pub mod compiler;
pub mod files;
pub mod inner;
pub mod messages;
pub mod tokenizer;
