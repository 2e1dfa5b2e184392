// ABOUTME: The two-tier error surface shared by the compiler and the VM

use thiserror::Error;

// ===== Arity constant strings (eliminates allocations in error paths) =====
pub const ARITY_ONE: &str = "1";
pub const ARITY_TWO: &str = "2";
pub const ARITY_TWO_OR_THREE: &str = "2-3";

/// Faults raised synchronously while compiling a form: bad argument
/// counts, malformed special forms, non-symbol `set!` targets,
/// unresolved jump labels, nonsense parameter lists. Not recoverable at
/// a finer grain than aborting the whole compilation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("{form}: expected {expected} argument{}, got {actual}", if expected == "1" { "" } else { "s" })]
    ArityMismatch {
        form: String,
        expected: String,
        actual: usize,
    },

    #[error("malformed special form `{form}`: {reason}")]
    MalformedForm { form: String, reason: String },

    #[error("set!: target `{0}` is not a symbol")]
    NotAnLvalue(String),

    #[error("lambda: parameter list contains non-symbol `{0}`")]
    NonSymbolParameter(String),

    #[error("unknown label `{0}` referenced by a jump instruction")]
    UnknownLabel(String),

    #[error("{0}")]
    Other(String),
}

impl CompileError {
    pub fn arity(form: impl Into<String>, expected: impl Into<String>, actual: usize) -> Self {
        CompileError::ArityMismatch {
            form: form.into(),
            expected: expected.into(),
            actual,
        }
    }

    pub fn malformed(form: impl Into<String>, reason: impl Into<String>) -> Self {
        CompileError::MalformedForm {
            form: form.into(),
            reason: reason.into(),
        }
    }
}

/// Runtime faults raised from `Vm::run`: an unreachable program counter,
/// stack underflow, arity mismatch at `MAKE_ENV(DOT)`, a call to a
/// non-closure, an unknown opcode, or an unknown primitive. Abort the
/// current VM invocation; never retried internally.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LanguageError {
    #[error("program counter {pc} out of bounds (code length {len})")]
    PcOutOfBounds { pc: usize, len: usize },

    #[error("stack underflow in `{op}`")]
    StackUnderflow { op: String },

    #[error("arity mismatch: closure expects {expected}, got {actual}")]
    ArityMismatch { expected: String, actual: usize },

    #[error("attempted to call a non-closure value of type `{0}`")]
    NotCallable(String),

    #[error("unknown or unresolved jump label `{0}`")]
    UnknownLabel(String),

    #[error("unknown primitive `{name}` with arity {arity}")]
    UnknownPrimitive { name: String, arity: usize },

    #[error("undefined global `{0}`")]
    UndefinedGlobal(String),

    #[error("{0}")]
    Other(String),
}
