// Leveled diagnostic logging, used by the core and every adapter around it.
//
// This is deliberately not the `log`/`tracing` crate: the core needs a single
// cheap, Clone-able sink it can hand to primitives without wiring up a global
// logger, and printing straight to stdout/stderr is all a REPL needs.

use std::fmt::Debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebugLevel {
    Error,
    Warning,
    Info,
    Debug,
}

#[derive(Debug, Clone, Copy)]
pub struct Msg {
    level: DebugLevel,
}

impl Default for Msg {
    fn default() -> Self {
        Msg::new()
    }
}

impl Msg {
    pub fn new() -> Msg {
        Msg {
            level: DebugLevel::Error,
        }
    }

    pub fn set_level(&mut self, level: DebugLevel) {
        self.level = level;
    }

    pub fn get_level(&self) -> DebugLevel {
        self.level
    }

    fn emit<T: Debug>(caller: &str, text: &str, detail: Option<T>) {
        match detail {
            Some(d) => eprintln!("[{}] {}: {:?}", caller, text, d),
            None => eprintln!("[{}] {}", caller, text),
        }
    }

    /// Errors are always reported, regardless of the configured level.
    pub fn error<T: Debug>(&self, caller: &str, text: &str, detail: Option<T>) {
        Self::emit(caller, text, detail);
    }

    pub fn warning<T: Debug>(&self, caller: &str, text: &str, detail: Option<T>) {
        if self.level >= DebugLevel::Warning {
            Self::emit(caller, text, detail);
        }
    }

    pub fn info<T: Debug>(&self, caller: &str, text: &str, detail: Option<T>) {
        if self.level >= DebugLevel::Info {
            Self::emit(caller, text, detail);
        }
    }

    pub fn debug<T: Debug>(&self, caller: &str, text: &str, detail: Option<T>) {
        if self.level >= DebugLevel::Debug {
            Self::emit(caller, text, detail);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level_is_error() {
        let msg = Msg::new();
        assert_eq!(msg.get_level(), DebugLevel::Error);
    }

    #[test]
    fn test_set_get_level() {
        let mut msg = Msg::new();
        msg.set_level(DebugLevel::Debug);
        assert_eq!(msg.get_level(), DebugLevel::Debug);
    }

    #[test]
    fn test_level_ordering() {
        assert!(DebugLevel::Debug > DebugLevel::Info);
        assert!(DebugLevel::Info > DebugLevel::Warning);
        assert!(DebugLevel::Warning > DebugLevel::Error);
    }

    #[test]
    fn test_error_always_fires_regardless_of_level() {
        let msg = Msg::new();
        // Nothing to assert on stdout capture here; this just checks it
        // doesn't panic at the lowest configured level.
        msg.error("test", "something went wrong", Some(42));
        msg.error::<()>("test", "no detail", None);
    }
}
