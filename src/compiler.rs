// ABOUTME: The compiler — s-expression to bytecode, label assembly, macro expansion

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::closure::Closure;
use crate::code::{CodeBlock, CodeRegistry};
use crate::cons;
use crate::env::EnvArena;
use crate::error::{CompileError, ARITY_ONE, ARITY_TWO, ARITY_TWO_OR_THREE};
use crate::instr::{Instruction, Opcode};
use crate::symbol::{Macro, Package, Symbol};
use crate::value::Value;
use crate::vm::Vm;

/// Compile-time lexical environment: a chain of frames of parameter
/// names, one frame per enclosing `lambda`. Mirrors the nesting of
/// runtime frames allocated by `MAKE_ENV`/`MAKE_ENVDOT` one-for-one, so
/// a `VarPos` resolved here is valid against `env::EnvArena` at runtime.
#[derive(Debug, Clone, Default)]
pub struct Lex {
    frames: Vec<Rc<Vec<String>>>,
}

impl Lex {
    pub fn empty() -> Self {
        Lex { frames: Vec::new() }
    }

    fn push_frame(&self, names: Vec<String>) -> Lex {
        let mut frames = Vec::with_capacity(self.frames.len() + 1);
        frames.push(Rc::new(names));
        frames.extend(self.frames.iter().cloned());
        Lex { frames }
    }

    /// A `VarPos` is valid iff the symbol exists at some enclosing frame.
    /// Absence here means "this is a global".
    fn lookup(&self, sym: &Symbol) -> Option<VarPos> {
        for (frame, names) in self.frames.iter().enumerate() {
            if let Some(slot) = names.iter().position(|n| n == &sym.name) {
                return Some(VarPos { frame, slot });
            }
        }
        None
    }
}

#[derive(Debug, Clone, Copy)]
struct VarPos {
    frame: usize,
    slot: usize,
}

/// One compilation. A fresh `Compiler` is built for every top-level
/// `Context::compile` call so the label counter restarts at `L0`/`K0`.
pub struct Compiler {
    pkg: Rc<Package>,
    code: Rc<CodeRegistry>,
    envs: Rc<EnvArena>,
    labels: Cell<usize>,
}

impl Compiler {
    pub fn new(pkg: Rc<Package>, code: Rc<CodeRegistry>, envs: Rc<EnvArena>) -> Self {
        Compiler {
            pkg,
            code,
            envs,
            labels: Cell::new(0),
        }
    }

    fn new_label(&self, prefix: &str) -> String {
        let n = self.labels.get();
        self.labels.set(n + 1);
        format!("{prefix}{n}")
    }

    /// Top-level entry: compiles `x` as a zero-argument lambda body, so
    /// the result is a `Closure` ready for `Vm::new`/`Execute`.
    pub fn compile_top(&mut self, x: Value) -> Result<Rc<Closure>, CompileError> {
        let body = cons::from_vec(vec![x]);
        self.compile_lambda(Value::Nil, body, &Lex::empty(), None)
    }

    // ---- main dispatch ---------------------------------------------------

    pub fn compile(
        &mut self,
        x: Value,
        lex: &Lex,
        val: bool,
        more: bool,
    ) -> Result<Vec<Instruction>, CompileError> {
        if let Value::Cons(c) = &x {
            if let Value::Symbol(sym) = c.get_first() {
                if self.pkg.has_macro(&sym) {
                    let expanded = self.macro_expand_full(x.clone())?;
                    return self.compile(expanded, lex, val, more);
                }
            }
        }

        match &x {
            Value::Symbol(sym) => return Ok(self.compile_var(sym.clone(), lex, val, more)),
            Value::Cons(_) => {}
            _ => return Ok(compile_const(x, val, more)),
        }

        let head = cons::first(&x);
        let args_rest = cons::rest(&x);

        if let Value::Symbol(sym) = &head {
            match sym.name.as_str() {
                "quote" => return self.compile_quote(args_rest, val, more),
                "begin" => {
                    let items = cons::to_vec(&args_rest);
                    return self.compile_begin_seq(&items, lex, val, more);
                }
                "set!" => return self.compile_set(args_rest, lex, val, more),
                "if" => return self.compile_if_form(args_rest, lex, val, more),
                "if*" => return self.compile_if_star(args_rest, lex, val, more),
                "lambda" => return self.compile_lambda_expr(args_rest, lex, val, more),
                "defmacro" => return self.compile_defmacro(args_rest, val, more),
                _ => {}
            }
        }

        if matches!(args_rest, Value::Nil) {
            if let Some(body) = zero_arg_lambda_body(&head) {
                let items = cons::to_vec(&body);
                return self.compile_begin_seq(&items, lex, val, more);
            }
        }

        self.compile_call(head, args_rest, lex, val, more)
    }

    // ---- constants & variables ------------------------------------------

    fn compile_var(&self, sym: Rc<Symbol>, lex: &Lex, val: bool, more: bool) -> Vec<Instruction> {
        if !val {
            return Vec::new();
        }
        let mut out = match lex.lookup(&sym) {
            Some(pos) => vec![Instruction::new(
                Opcode::LocalGet,
                Value::Int(pos.frame as i64),
                Value::Int(pos.slot as i64),
            )],
            None => vec![Instruction::new(Opcode::GlobalGet, Value::Symbol(sym), Value::Nil)],
        };
        if !more {
            out.push(Instruction::bare(Opcode::ReturnVal));
        }
        out
    }

    fn compile_quote(
        &self,
        args_rest: Value,
        val: bool,
        more: bool,
    ) -> Result<Vec<Instruction>, CompileError> {
        verify_arg_count("quote", &args_rest, 1, 1, ARITY_ONE)?;
        Ok(compile_const(cons::first(&args_rest), val, more))
    }

    // ---- begin ------------------------------------------------------------

    fn compile_begin_seq(
        &mut self,
        items: &[Value],
        lex: &Lex,
        val: bool,
        more: bool,
    ) -> Result<Vec<Instruction>, CompileError> {
        match items {
            [] => Ok(compile_const(Value::Nil, val, more)),
            [only] => self.compile(only.clone(), lex, val, more),
            [first, rest @ ..] => {
                let mut out = self.compile(first.clone(), lex, false, true)?;
                out.extend(self.compile_begin_seq(rest, lex, val, more)?);
                Ok(out)
            }
        }
    }

    // ---- set! ---------------------------------------------------------------

    fn compile_set(
        &mut self,
        args_rest: Value,
        lex: &Lex,
        val: bool,
        more: bool,
    ) -> Result<Vec<Instruction>, CompileError> {
        verify_arg_count("set!", &args_rest, 2, 2, ARITY_TWO)?;
        let target = cons::first(&args_rest);
        let sym = match target {
            Value::Symbol(s) => s,
            other => return Err(CompileError::NotAnLvalue(format!("{other}"))),
        };
        let value_expr = cons::second(&args_rest);
        let mut out = self.compile(value_expr, lex, true, true)?;
        match lex.lookup(&sym) {
            Some(pos) => out.push(Instruction::new(
                Opcode::LocalSet,
                Value::Int(pos.frame as i64),
                Value::Int(pos.slot as i64),
            )),
            None => out.push(Instruction::new(Opcode::GlobalSet, Value::Symbol(sym), Value::Nil)),
        }
        if !val {
            out.push(Instruction::bare(Opcode::StackPop));
        }
        if !more {
            out.push(Instruction::bare(Opcode::ReturnVal));
        }
        Ok(out)
    }

    // ---- if / if* -------------------------------------------------------------

    fn compile_if_form(
        &mut self,
        args_rest: Value,
        lex: &Lex,
        val: bool,
        more: bool,
    ) -> Result<Vec<Instruction>, CompileError> {
        let len = cons::list_len(&args_rest);
        if len < 2 || len > 3 {
            return Err(CompileError::arity("if", ARITY_TWO_OR_THREE, len));
        }
        let p = cons::first(&args_rest);
        let t = cons::second(&args_rest);
        let e = if len == 3 {
            Some(cons::third(&args_rest))
        } else {
            None
        };
        self.compile_if(p, t, e, lex, val, more)
    }

    fn compile_if(
        &mut self,
        p: Value,
        t: Value,
        e: Option<Value>,
        lex: &Lex,
        val: bool,
        more: bool,
    ) -> Result<Vec<Instruction>, CompileError> {
        // Peephole 1: predicate is the literal `false`.
        if matches!(p, Value::Bool(false)) {
            return self.compile(e.unwrap_or(Value::Nil), lex, val, more);
        }
        // Peephole 2: predicate is any other self-evaluating constant.
        if is_self_evaluating_non_false(&p) {
            return self.compile(t, lex, val, more);
        }
        // Peephole 3: predicate is `(not q)` -- rewrite to `(if q e t)`.
        // Tests the head symbol's name textually, so a locally rebound
        // `not` still triggers this, deliberately, rather than resolving
        // it through `lex`.
        if let Some(q) = match_not(&p) {
            if let Some(e_val) = e.clone() {
                return self.compile_if(q, e_val, Some(t), lex, val, more);
            }
        }

        if let Some(e_val) = e.clone() {
            let t_code = self.compile(t.clone(), lex, val, more)?;
            let e_code = self.compile(e_val.clone(), lex, val, more)?;

            // Peephole 4: both branches compile identically -- keep the
            // predicate only for its side effect, then the shared code.
            if instrs_equal(&t_code, &e_code) {
                let mut out = self.compile(p, lex, false, true)?;
                out.extend(e_code);
                return Ok(out);
            }

            let pred_code = self.compile(p, lex, true, true)?;
            let l1 = self.new_label(crate::config::LABEL_PREFIX);
            let mut out = pred_code;
            out.push(Instruction::new(Opcode::JmpIfFalse, Value::str(l1.clone()), Value::Nil));
            if more {
                // Non-tail: each branch leaves a value; skip the else arm
                // after running the then arm.
                let l2 = self.new_label(crate::config::LABEL_PREFIX);
                out.extend(t_code);
                out.push(Instruction::new(Opcode::JmpToLabel, Value::str(l2.clone()), Value::Nil));
                out.push(Instruction::new(Opcode::MakeLabel, Value::str(l1), Value::Nil));
                out.extend(e_code);
                out.push(Instruction::new(Opcode::MakeLabel, Value::str(l2), Value::Nil));
            } else {
                // Tail: each branch already carries its own RETURN_VAL.
                out.extend(t_code);
                out.push(Instruction::new(Opcode::MakeLabel, Value::str(l1), Value::Nil));
                out.extend(e_code);
            }
            return Ok(out);
        }

        // No else clause.
        if matches!(t, Value::Nil) {
            // Degenerate then-nil form with no else is unreachable under
            // the val/more contract (there would be nothing to produce on
            // the true branch and nothing to fall through to on false);
            // fall through to the general no-else path below.
        }
        let pred_code = self.compile(p, lex, true, true)?;
        let l1 = self.new_label(crate::config::LABEL_PREFIX);
        let mut out = pred_code;
        out.push(Instruction::new(Opcode::JmpIfFalse, Value::str(l1.clone()), Value::Nil));
        out.extend(self.compile(t, lex, val, more)?);
        out.push(Instruction::new(Opcode::MakeLabel, Value::str(l1), Value::Nil));
        Ok(out)
    }

    fn compile_if_star(
        &mut self,
        args_rest: Value,
        lex: &Lex,
        val: bool,
        more: bool,
    ) -> Result<Vec<Instruction>, CompileError> {
        verify_arg_count("if*", &args_rest, 2, 2, ARITY_TWO)?;
        let p = cons::first(&args_rest);
        let e = cons::second(&args_rest);

        // The predicate's value is the result when truthy, so it must be
        // DUPLICATEd before the test: the test consumes one copy, the
        // other survives to become the result. Do not "optimize" the
        // DUPLICATE away -- removing it drops the result whenever the
        // predicate is truthy.
        let pred_code = self.compile(p, lex, true, true)?;
        let l1 = self.new_label(crate::config::LABEL_PREFIX);
        let mut out = pred_code;
        out.push(Instruction::bare(Opcode::Duplicate));
        out.push(Instruction::new(Opcode::JmpIfTrue, Value::str(l1.clone()), Value::Nil));
        out.push(Instruction::bare(Opcode::StackPop));
        out.extend(self.compile(e, lex, true, true)?);
        out.push(Instruction::new(Opcode::MakeLabel, Value::str(l1), Value::Nil));
        if !val {
            out.push(Instruction::bare(Opcode::StackPop));
        }
        if !more {
            out.push(Instruction::bare(Opcode::ReturnVal));
        }
        Ok(out)
    }

    // ---- lambda -----------------------------------------------------------------

    fn compile_lambda_expr(
        &mut self,
        args_rest: Value,
        lex: &Lex,
        val: bool,
        more: bool,
    ) -> Result<Vec<Instruction>, CompileError> {
        if !val {
            return Ok(Vec::new());
        }
        let params_form = cons::first(&args_rest);
        let body = cons::rest(&args_rest);
        let template = self.compile_lambda(params_form, body, lex, None)?;
        let mut out = vec![Instruction::new(Opcode::MakeClosure, Value::Closure(template), Value::Nil)];
        if !more {
            out.push(Instruction::bare(Opcode::ReturnVal));
        }
        Ok(out)
    }

    /// Builds a fresh code block for a lambda body: a `MAKE_ENV`/
    /// `MAKE_ENVDOT` prologue followed by the compiled body, assembled
    /// and registered. Returns a closure *template* -- `env: None`,
    /// resolved by `MAKE_CLOSURE` at runtime to the VM's current frame.
    fn compile_lambda(
        &mut self,
        params_form: Value,
        body: Value,
        outer_lex: &Lex,
        name: Option<String>,
    ) -> Result<Rc<Closure>, CompileError> {
        let (named, rest_sym, dotted) = parse_param_list(&params_form)?;
        let n = named.len();

        let mut frame_names: Vec<String> = named.iter().map(|s| s.name.clone()).collect();
        if let Some(r) = &rest_sym {
            frame_names.push(r.name.clone());
        }
        let inner_lex = outer_lex.push_frame(frame_names);

        let prologue = if dotted {
            Instruction::new(Opcode::MakeEnvDot, Value::Int(n as i64), Value::Nil)
        } else {
            Instruction::new(Opcode::MakeEnv, Value::Int(n as i64), Value::Nil)
        };

        let body_items = cons::to_vec(&body);
        let body_code = self.compile_begin_seq(&body_items, &inner_lex, true, false)?;

        let mut instrs = vec![prologue];
        instrs.extend(body_code);
        let assembled = assemble(instrs)?;

        let handle = self.code.register(CodeBlock {
            instructions: assembled,
            name: name.clone(),
        });
        let params: Vec<Value> = named.into_iter().map(Value::Symbol).collect();
        Ok(Rc::new(Closure::new(handle, None, params, dotted, name)))
    }

    // ---- defmacro ---------------------------------------------------------------

    fn compile_defmacro(
        &mut self,
        args_rest: Value,
        val: bool,
        more: bool,
    ) -> Result<Vec<Instruction>, CompileError> {
        let name_sym = match cons::first(&args_rest) {
            Value::Symbol(s) => s,
            other => return Err(CompileError::malformed("defmacro", format!("name must be a symbol, got {other}"))),
        };
        let params_form = cons::second(&args_rest);
        let body = cons::after_second(&args_rest);
        let closure = self.compile_lambda(params_form, body, &Lex::empty(), Some(name_sym.name.clone()))?;
        self.pkg.set_macro(
            &name_sym,
            Macro {
                name: name_sym.clone(),
                closure,
            },
        );
        Ok(compile_const(Value::Nil, val, more))
    }

    // ---- function call ----------------------------------------------------------

    fn compile_call(
        &mut self,
        head: Value,
        arg_list: Value,
        lex: &Lex,
        val: bool,
        more: bool,
    ) -> Result<Vec<Instruction>, CompileError> {
        let args = cons::to_vec(&arg_list);
        let n = args.len();

        // Compiler-extension path: a call to a symbol not locally shadowed
        // and known to the external primitive registry at this arity
        // compiles directly to PRIM rather than the general
        // SAVE_RETURN/JMP_CLOSURE protocol.
        if let Value::Symbol(sym) = &head {
            if lex.lookup(sym).is_none() && crate::primitives::lookup(&sym.name, Some(n)).is_some() {
                let mut out = Vec::new();
                for a in &args {
                    out.extend(self.compile(a.clone(), lex, true, true)?);
                }
                out.push(Instruction::new(Opcode::Prim, Value::str(sym.name.clone()), Value::Int(n as i64)));
                if !val {
                    out.push(Instruction::bare(Opcode::StackPop));
                }
                if !more {
                    out.push(Instruction::bare(Opcode::ReturnVal));
                }
                return Ok(out);
            }
        }

        if !more {
            let mut out = Vec::new();
            for a in &args {
                out.extend(self.compile(a.clone(), lex, true, true)?);
            }
            out.extend(self.compile(head, lex, true, true)?);
            out.push(Instruction::new(Opcode::JmpClosure, Value::Int(n as i64), Value::Nil));
            Ok(out)
        } else {
            let k = self.new_label(crate::config::CONTINUATION_LABEL_PREFIX);
            let mut out = vec![Instruction::new(Opcode::SaveReturn, Value::str(k.clone()), Value::Nil)];
            for a in &args {
                out.extend(self.compile(a.clone(), lex, true, true)?);
            }
            out.extend(self.compile(head, lex, true, true)?);
            out.push(Instruction::new(Opcode::JmpClosure, Value::Int(n as i64), Value::Nil));
            out.push(Instruction::new(Opcode::MakeLabel, Value::str(k), Value::Nil));
            if !val {
                out.push(Instruction::bare(Opcode::StackPop));
            }
            Ok(out)
        }
    }

    // ---- macro expansion --------------------------------------------------

    /// Pure one-step expansion: returns `e` unchanged if its head is not
    /// bound to a macro.
    pub fn macro_expand_1_step(&mut self, e: Value) -> Result<Value, CompileError> {
        if let Value::Cons(c) = &e {
            if let Value::Symbol(sym) = c.get_first() {
                if let Some(m) = self.pkg.get_macro(&sym) {
                    let args = cons::to_vec(&c.get_rest());
                    return self.run_macro(&m.closure, args);
                }
            }
        }
        Ok(e)
    }

    /// Expands the head one level; if the result is a list whose head is
    /// a symbol, recursively expands child sub-forms in place. Mutates
    /// the expansion's cons cells -- an acceptable destructive alternative
    /// to a purely functional rewrite, since `macro_expand_1_step` itself
    /// stays pure.
    pub fn macro_expand_full(&mut self, e: Value) -> Result<Value, CompileError> {
        let expanded = self.macro_expand_1_step(e)?;
        if let Value::Cons(c) = &expanded {
            if matches!(c.get_first(), Value::Symbol(_)) {
                let mut cur = c.get_rest();
                while let Value::Cons(cell) = cur.clone() {
                    let child = cell.get_first();
                    if child.is_cons() {
                        let new_child = self.macro_expand_full(child)?;
                        cell.set_first(new_child);
                    }
                    cur = cell.get_rest();
                }
            }
        }
        Ok(expanded)
    }

    fn run_macro(&mut self, closure: &Rc<Closure>, args: Vec<Value>) -> Result<Value, CompileError> {
        let mut vm = Vm::new(self.code.clone(), self.envs.clone(), closure.clone(), args);
        vm.run()
            .map_err(|e| CompileError::Other(format!("macro expansion failed: {e}")))
    }
}

// ---- free helper functions -------------------------------------------------------

fn compile_const(x: Value, val: bool, more: bool) -> Vec<Instruction> {
    if !val {
        return Vec::new();
    }
    let mut out = vec![Instruction::new(Opcode::PushConst, x, Value::Nil)];
    if !more {
        out.push(Instruction::bare(Opcode::ReturnVal));
    }
    out
}

fn is_self_evaluating_non_false(v: &Value) -> bool {
    matches!(v, Value::Bool(true) | Value::Int(_) | Value::Float(_) | Value::Str(_))
}

fn match_not(p: &Value) -> Option<Value> {
    if let Value::Cons(c) = p {
        if let Value::Symbol(s) = c.get_first() {
            if s.name == "not" && cons::list_len(p) == 2 {
                return Some(cons::second(p));
            }
        }
    }
    None
}

fn zero_arg_lambda_body(head: &Value) -> Option<Value> {
    if let Value::Cons(c) = head {
        if let Value::Symbol(s) = c.get_first() {
            if s.name == "lambda" {
                let rest = c.get_rest();
                if matches!(cons::first(&rest), Value::Nil) {
                    return Some(cons::rest(&rest));
                }
            }
        }
    }
    None
}

/// Parses a lambda's parameter list: `()`/`nil` (no params), a bare
/// symbol (fully variadic), a proper list of symbols, or a dotted list
/// of symbols ending in a rest symbol. Only symbols are accepted in any
/// position; a literal atom anywhere in the list is a `CompileError`.
fn parse_param_list(v: &Value) -> Result<(Vec<Rc<Symbol>>, Option<Rc<Symbol>>, bool), CompileError> {
    match v {
        Value::Nil => Ok((Vec::new(), None, false)),
        Value::Symbol(s) => Ok((Vec::new(), Some(s.clone()), true)),
        Value::Cons(_) => {
            let mut named = Vec::new();
            let mut cur = v.clone();
            loop {
                match cur {
                    Value::Cons(c) => {
                        match c.get_first() {
                            Value::Symbol(s) => named.push(s),
                            other => return Err(CompileError::NonSymbolParameter(format!("{other}"))),
                        }
                        cur = c.get_rest();
                    }
                    Value::Nil => return Ok((named, None, false)),
                    Value::Symbol(s) => return Ok((named, Some(s), true)),
                    other => return Err(CompileError::NonSymbolParameter(format!("{other}"))),
                }
            }
        }
        other => Err(CompileError::NonSymbolParameter(format!("{other}"))),
    }
}

fn verify_arg_count(form: &str, list: &Value, min: usize, max: usize, expected: &str) -> Result<(), CompileError> {
    let n = cons::list_len(list);
    if n < min || n > max {
        return Err(CompileError::arity(form, expected, n));
    }
    Ok(())
}

/// Opcode-wise equality for the `if`-peephole that collapses identical
/// branches: same opcode and operands at every index, ignoring the
/// debug label.
fn instrs_equal(a: &[Instruction], b: &[Instruction]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|(x, y)| x.op == y.op && x.first == y.first && x.second == y.second)
}

/// Second assembly pass: records every `MAKE_LABEL`'s position, then
/// resolves every jump's `second` operand to an absolute index.
/// `MAKE_LABEL` entries are left in place so positions stay stable; an
/// unresolved label is a compile error.
pub fn assemble(instrs: Vec<Instruction>) -> Result<Vec<Instruction>, CompileError> {
    let mut labels: HashMap<String, usize> = HashMap::new();
    for (i, ins) in instrs.iter().enumerate() {
        if ins.op == Opcode::MakeLabel {
            if let Value::Str(name) = &ins.first {
                labels.insert(name.to_string(), i);
            }
        }
    }

    let mut out = Vec::with_capacity(instrs.len());
    for (i, mut ins) in instrs.into_iter().enumerate() {
        match ins.op {
            Opcode::MakeLabel => {
                ins.second = Value::Int(i as i64);
            }
            Opcode::JmpIfTrue | Opcode::JmpIfFalse | Opcode::JmpToLabel | Opcode::SaveReturn => {
                let name = match &ins.first {
                    Value::Str(s) => s.to_string(),
                    _ => return Err(CompileError::Other("jump instruction missing a label name".into())),
                };
                let target = labels
                    .get(&name)
                    .copied()
                    .ok_or_else(|| CompileError::UnknownLabel(name.clone()))?;
                ins.second = Value::Int(target as i64);
            }
            _ => {}
        }
        out.push(ins);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lbl(name: &str) -> Instruction {
        Instruction::new(Opcode::MakeLabel, Value::str(name), Value::Nil)
    }

    fn jmp(name: &str) -> Instruction {
        Instruction::new(Opcode::JmpToLabel, Value::str(name), Value::Nil)
    }

    #[test]
    fn assemble_resolves_forward_jump() {
        let instrs = vec![jmp("L0"), Instruction::bare(Opcode::StackPop), lbl("L0")];
        let assembled = assemble(instrs).unwrap();
        assert_eq!(assembled[0].target_pc(), 2);
        assert_eq!(assembled[2].target_pc(), 2);
    }

    #[test]
    fn assemble_unknown_label_is_error() {
        let instrs = vec![jmp("L9")];
        assert!(assemble(instrs).is_err());
    }

    #[test]
    fn assemble_is_idempotent() {
        let instrs = vec![jmp("L0"), lbl("L0")];
        let once = assemble(instrs).unwrap();
        let twice = assemble(once.clone()).unwrap();
        assert_eq!(once[0].target_pc(), twice[0].target_pc());
    }

    #[test]
    fn parse_param_list_accepts_dotted() {
        let pkg = Package::new("test");
        let params = cons::from_vec_dotted(
            vec![Value::Symbol(pkg.intern("a"))],
            Value::Symbol(pkg.intern("rest")),
        );
        let (named, rest, dotted) = parse_param_list(&params).unwrap();
        assert_eq!(named.len(), 1);
        assert!(rest.is_some());
        assert!(dotted);
    }

    #[test]
    fn parse_param_list_rejects_non_symbol() {
        let params = cons::from_vec(vec![Value::Int(1)]);
        assert!(parse_param_list(&params).is_err());
    }
}
