// ABOUTME: Process-wide composition of package, code registry, environment arena and VM

use std::rc::Rc;

use crate::closure::Closure;
use crate::code::CodeRegistry;
use crate::compiler::Compiler;
use crate::env::EnvArena;
use crate::error::{CompileError, LanguageError};
use crate::symbol::Package;
use crate::value::Value;
use crate::vm::Vm;

/// Ties together the package (symbols, globals, macros), the code
/// registry, and the environment arena for one embedding session.
/// Created once; everything it owns is torn down with it. Not `Sync` --
/// concurrent embedders must serialize access themselves.
pub struct Context {
    pkg: Rc<Package>,
    code: Rc<CodeRegistry>,
    envs: Rc<EnvArena>,
}

impl Context {
    pub fn new() -> Self {
        Context {
            pkg: Package::new("user"),
            code: CodeRegistry::new(),
            envs: EnvArena::new(),
        }
    }

    pub fn package(&self) -> &Rc<Package> {
        &self.pkg
    }

    /// Interns `name` into this context's package. The reader and any
    /// embedder-supplied primitives go through this to build `Value`s
    /// the compiler will recognize.
    pub fn intern(&self, name: &str) -> Rc<crate::symbol::Symbol> {
        self.pkg.intern(name)
    }

    /// Top-level compile entry: a fresh `Compiler` per call, so the label
    /// counter restarts at `L0`/`K0` for every compilation.
    pub fn compile(&self, x: Value) -> Result<Rc<Closure>, CompileError> {
        let mut compiler = Compiler::new(self.pkg.clone(), self.code.clone(), self.envs.clone());
        compiler.compile_top(x)
    }

    /// Runs `closure` with `args` to termination and returns the result.
    pub fn execute(&self, closure: Rc<Closure>, args: Vec<Value>) -> Result<Value, LanguageError> {
        let mut vm = Vm::new(self.code.clone(), self.envs.clone(), closure, args);
        vm.run()
    }

    /// Compiles `x` and immediately executes it with no arguments --
    /// the common case for REPL-style "evaluate this" calls.
    pub fn eval(&self, x: Value) -> Result<Value, EvalError> {
        let closure = self.compile(x)?;
        Ok(self.execute(closure, vec![])?)
    }

    pub fn macro_expand_1_step(&self, x: Value) -> Result<Value, CompileError> {
        let mut compiler = Compiler::new(self.pkg.clone(), self.code.clone(), self.envs.clone());
        compiler.macro_expand_1_step(x)
    }

    pub fn macro_expand_full(&self, x: Value) -> Result<Value, CompileError> {
        let mut compiler = Compiler::new(self.pkg.clone(), self.code.clone(), self.envs.clone());
        compiler.macro_expand_full(x)
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new()
    }
}

/// Either stage of `compile`-then-`execute` can fail; this is the error
/// type for the combined `eval` convenience entry point only -- the
/// two-tier split is preserved on the `compile`/`execute` path, which
/// returns `CompileError`/`LanguageError` directly.
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum EvalError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Language(#[from] LanguageError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cons;

    fn sym(ctx: &Context, name: &str) -> Value {
        Value::Symbol(ctx.intern(name))
    }

    #[test]
    fn compiles_and_executes_a_constant() {
        let ctx = Context::new();
        assert_eq!(ctx.eval(Value::Int(42)).unwrap(), Value::Int(42));
    }

    #[test]
    fn scenario_set_and_sequence() {
        // (begin (set! x 1) (set! x (+ x 2)) x) => 3
        let ctx = Context::new();
        let x = sym(&ctx, "x");
        let plus = sym(&ctx, "+");
        let prog = cons::from_vec(vec![
            sym(&ctx, "begin"),
            cons::from_vec(vec![sym(&ctx, "set!"), x.clone(), Value::Int(1)]),
            cons::from_vec(vec![
                sym(&ctx, "set!"),
                x.clone(),
                cons::from_vec(vec![plus, x.clone(), Value::Int(2)]),
            ]),
            x,
        ]);
        assert_eq!(ctx.eval(prog).unwrap(), Value::Int(3));
    }

    #[test]
    fn scenario_lambda_call_picks_smaller() {
        // ((lambda (a b) (if (< a b) a b)) 7 4) => 4
        let ctx = Context::new();
        let a = sym(&ctx, "a");
        let b = sym(&ctx, "b");
        let lambda = cons::from_vec(vec![
            sym(&ctx, "lambda"),
            cons::from_vec(vec![a.clone(), b.clone()]),
            cons::from_vec(vec![
                sym(&ctx, "if"),
                cons::from_vec(vec![sym(&ctx, "<"), a.clone(), b.clone()]),
                a,
                b,
            ]),
        ]);
        let call = cons::from_vec(vec![lambda, Value::Int(7), Value::Int(4)]);
        assert_eq!(ctx.eval(call).unwrap(), Value::Int(4));
    }

    #[test]
    fn scenario_dotted_rest_parameter() {
        // ((lambda (a . rest) rest) 1 2 3 4) => (2 3 4)
        let ctx = Context::new();
        let a = sym(&ctx, "a");
        let rest = sym(&ctx, "rest");
        let params = cons::from_vec_dotted(vec![a], rest.clone());
        let lambda = cons::from_vec(vec![sym(&ctx, "lambda"), params, rest]);
        let call = cons::from_vec(vec![lambda, Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)]);
        let result = ctx.eval(call).unwrap();
        assert_eq!(format!("{result}"), "(2 3 4)");
    }

    #[test]
    fn scenario_if_star_truthy_zero() {
        // (if* 0 99) => 0 (zero is truthy)
        let ctx = Context::new();
        let prog = cons::from_vec(vec![sym(&ctx, "if*"), Value::Int(0), Value::Int(99)]);
        assert_eq!(ctx.eval(prog).unwrap(), Value::Int(0));
    }

    #[test]
    fn macro_expand_1_step_is_identity_when_head_is_not_a_macro() {
        let ctx = Context::new();
        let form = cons::from_vec(vec![sym(&ctx, "list"), Value::Int(1)]);
        let expanded = ctx.macro_expand_1_step(form.clone()).unwrap();
        assert_eq!(expanded, form);
    }
}
