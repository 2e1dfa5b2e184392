// ABOUTME: Small constants module -- version string and compiler/CLI tunables

/// Crate version, surfaced by the CLI's `--version` flag.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Label prefix for ordinary jump targets generated during compilation: `L0, L1, ...`.
pub const LABEL_PREFIX: &str = "L";

/// Label prefix for continuation labels generated at non-tail call sites: `K0, K1, ...`.
pub const CONTINUATION_LABEL_PREFIX: &str = "K";

pub const WELCOME_MESSAGE: &str = "Lisp compiler+VM core";
pub const WELCOME_SUBTITLE: &str = "compile/run/macroexpand a form, or start the REPL";

pub const REPL_HISTORY_FILE: &str = ".lisp_history";
