// ABOUTME: Closures — compiled code plus the environment captured at creation

use crate::code::CodeHandle;
use crate::env::FrameId;
use crate::value::Value;

/// Compiled code body + captured environment + formal parameter list.
///
/// Closures refer to their code by handle (`CodeHandle`) rather than by
/// a direct pointer into a `CodeBlock`, and to their environment by
/// `FrameId` rather than an `Rc` parent chain — see `env::EnvArena` for
/// why. Neither handle form lets a closure's own `Rc` participate in a
/// reference cycle with the environment it closes over.
#[derive(Debug)]
pub struct Closure {
    pub code: CodeHandle,
    pub env: Option<FrameId>,
    /// Formal parameter names, in order, for arity checks and messages.
    /// Does not include a synthesized name for a dotted rest parameter.
    pub params: Vec<Value>,
    pub dotted: bool,
    pub name: Option<String>,
}

impl Closure {
    pub fn new(
        code: CodeHandle,
        env: Option<FrameId>,
        params: Vec<Value>,
        dotted: bool,
        name: Option<String>,
    ) -> Self {
        Closure {
            code,
            env,
            params,
            dotted,
            name,
        }
    }

    /// Number of named parameters before a dotted rest slot, if any.
    pub fn named_count(&self) -> usize {
        self.params.len()
    }
}
