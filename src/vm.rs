// ABOUTME: The stack VM -- fetch/decode/execute loop over assembled bytecode

use std::rc::Rc;

use crate::closure::Closure;
use crate::code::CodeRegistry;
use crate::env::{EnvArena, FrameId, VarPos};
use crate::error::LanguageError;
use crate::instr::Opcode;
use crate::value::Value;

/// A saved `(fn, pc, env)` triple, pushed by `SAVE_RETURN` and restored by
/// `RETURN_VAL` to resume the caller after a non-tail call.
#[derive(Debug)]
pub struct ReturnAddress {
    pub fn_: Rc<Closure>,
    pub pc: usize,
    pub env: Option<FrameId>,
}

/// VM state: current closure, its code, program counter, current
/// environment frame, value stack, transient arg-count register, and a
/// termination flag.
///
/// A fresh `Vm` is constructed for every top-level `Execute` and every
/// macro-expansion reentry: there is no shared mutable pc/stack across
/// invocations, only the shared `Context` state (`CodeRegistry`,
/// `EnvArena`, package globals) they all read and write.
pub struct Vm {
    code: Rc<CodeRegistry>,
    envs: Rc<EnvArena>,
    fn_: Rc<Closure>,
    pc: usize,
    env: Option<FrameId>,
    stack: Vec<Value>,
    nargs: usize,
    done: bool,
}

impl Vm {
    pub fn new(code: Rc<CodeRegistry>, envs: Rc<EnvArena>, closure: Rc<Closure>, args: Vec<Value>) -> Self {
        let nargs = args.len();
        let env = closure.env;
        Vm {
            code,
            envs,
            fn_: closure,
            pc: 0,
            env,
            stack: args,
            nargs,
            done: false,
        }
    }

    /// Runs until termination and returns the top of the stack: the
    /// program's result is whatever is left on the stack when exactly
    /// one value remains.
    pub fn run(&mut self) -> Result<Value, LanguageError> {
        while !self.done {
            self.step()?;
        }
        self.stack
            .pop()
            .ok_or_else(|| LanguageError::StackUnderflow { op: "<terminate>".into() })
    }

    fn pop(&mut self, op: &'static str) -> Result<Value, LanguageError> {
        self.stack
            .pop()
            .ok_or(LanguageError::StackUnderflow { op: op.into() })
    }

    fn peek(&self, op: &'static str) -> Result<&Value, LanguageError> {
        self.stack
            .last()
            .ok_or(LanguageError::StackUnderflow { op: op.into() })
    }

    fn step(&mut self) -> Result<(), LanguageError> {
        let code_len = self.code.len(self.fn_.code);
        if self.pc >= code_len {
            return Err(LanguageError::PcOutOfBounds { pc: self.pc, len: code_len });
        }
        let ins = self.code.get(self.fn_.code).instructions[self.pc].clone();
        self.pc += 1;

        match ins.op {
            Opcode::Label | Opcode::MakeLabel => {}

            Opcode::PushConst => self.stack.push(ins.first),

            Opcode::LocalGet => {
                let pos = var_pos(&ins)?;
                let frame = self.env.ok_or(LanguageError::Other("local access with no frame".into()))?;
                self.stack.push(self.envs.get(frame, pos));
            }

            Opcode::LocalSet => {
                let pos = var_pos(&ins)?;
                let frame = self.env.ok_or(LanguageError::Other("local access with no frame".into()))?;
                let v = self.peek("LOCAL_SET")?.clone();
                self.envs.set(frame, pos, v);
            }

            Opcode::GlobalGet => {
                let sym = as_symbol(&ins.first)?;
                let pkg = sym.home().ok_or(LanguageError::UndefinedGlobal(sym.name.clone()))?;
                let v = pkg
                    .get_value(&sym)
                    .ok_or_else(|| LanguageError::UndefinedGlobal(sym.name.clone()))?;
                self.stack.push(v);
            }

            Opcode::GlobalSet => {
                let sym = as_symbol(&ins.first)?;
                let pkg = sym.home().ok_or(LanguageError::UndefinedGlobal(sym.name.clone()))?;
                let v = self.peek("GLOBAL_SET")?.clone();
                pkg.set_value(&sym, v);
            }

            Opcode::StackPop => {
                self.pop("STACK_POP")?;
            }

            Opcode::Duplicate => {
                let v = self.peek("DUPLICATE")?.clone();
                self.stack.push(v);
            }

            Opcode::JmpIfTrue => {
                let v = self.pop("JMP_IF_TRUE")?;
                if v.is_truthy() {
                    self.pc = ins.target_pc();
                }
            }

            Opcode::JmpIfFalse => {
                let v = self.pop("JMP_IF_FALSE")?;
                if !v.is_truthy() {
                    self.pc = ins.target_pc();
                }
            }

            Opcode::JmpToLabel => {
                self.pc = ins.target_pc();
            }

            Opcode::SaveReturn => {
                let addr = ReturnAddress {
                    fn_: self.fn_.clone(),
                    pc: ins.target_pc(),
                    env: self.env,
                };
                self.stack.push(Value::ReturnAddress(Rc::new(addr)));
            }

            Opcode::MakeEnv => {
                let n = as_usize(&ins.first)?;
                if self.nargs != n {
                    return Err(LanguageError::ArityMismatch { expected: n.to_string(), actual: self.nargs });
                }
                let frame = self.envs.alloc(self.env, n);
                let args = self.pop_n(n)?;
                self.envs.init_args(frame, &args);
                self.env = Some(frame);
            }

            Opcode::MakeEnvDot => {
                let n = as_usize(&ins.first)?;
                if self.nargs < n {
                    return Err(LanguageError::ArityMismatch { expected: format!("at least {n}"), actual: self.nargs });
                }
                let extra = self.nargs - n;
                let frame = self.envs.alloc(self.env, n + 1);
                let extra_args = self.pop_n(extra)?;
                let rest_list = crate::cons::from_vec(extra_args);
                let named_args = self.pop_n(n)?;
                self.envs.init_args(frame, &named_args);
                self.envs.set_slot(frame, n, rest_list);
                self.env = Some(frame);
            }

            Opcode::JmpClosure => {
                let n = as_usize(&ins.first)?;
                let callee = self.pop("JMP_CLOSURE")?;
                let closure = match callee {
                    Value::Closure(c) => c,
                    other => return Err(LanguageError::NotCallable(other.type_name().to_string())),
                };
                self.fn_ = closure.clone();
                self.env = closure.env;
                self.pc = 0;
                self.nargs = n;
            }

            Opcode::MakeClosure => {
                let template = match &ins.first {
                    Value::Closure(c) => c.clone(),
                    other => return Err(LanguageError::Other(format!("MAKE_CLOSURE operand not a closure template: {other}"))),
                };
                let instance = Closure::new(
                    template.code,
                    self.env,
                    template.params.clone(),
                    template.dotted,
                    template.name.clone(),
                );
                self.stack.push(Value::Closure(Rc::new(instance)));
            }

            Opcode::ReturnVal => {
                if self.stack.len() > 1 {
                    let retval = self.pop("RETURN_VAL")?;
                    let addr = self.pop("RETURN_VAL")?;
                    let addr = match addr {
                        Value::ReturnAddress(a) => a,
                        other => return Err(LanguageError::Other(format!("RETURN_VAL expected a return address beneath the result, found {other}"))),
                    };
                    self.stack.push(retval);
                    self.fn_ = addr.fn_.clone();
                    self.env = addr.env;
                    self.pc = addr.pc;
                } else {
                    self.done = true;
                }
            }

            Opcode::Prim => {
                let name = match &ins.first {
                    Value::Str(s) => s.to_string(),
                    other => return Err(LanguageError::Other(format!("PRIM operand not a name: {other}"))),
                };
                let arity = as_usize(&ins.second)?;
                let f = crate::primitives::lookup(&name, Some(arity))
                    .ok_or_else(|| LanguageError::UnknownPrimitive { name: name.clone(), arity })?;
                let args = self.pop_n(arity)?;
                let result = f(&args)?;
                self.stack.push(result);
            }
        }
        Ok(())
    }

    fn pop_n(&mut self, n: usize) -> Result<Vec<Value>, LanguageError> {
        if self.stack.len() < n {
            return Err(LanguageError::StackUnderflow { op: "pop_n".into() });
        }
        let at = self.stack.len() - n;
        Ok(self.stack.split_off(at))
    }
}

fn var_pos(ins: &crate::instr::Instruction) -> Result<VarPos, LanguageError> {
    Ok(VarPos {
        frame: as_usize(&ins.first)?,
        slot: as_usize(&ins.second)?,
    })
}

fn as_usize(v: &Value) -> Result<usize, LanguageError> {
    match v {
        Value::Int(n) if *n >= 0 => Ok(*n as usize),
        other => Err(LanguageError::Other(format!("expected a non-negative integer operand, got {other}"))),
    }
}

fn as_symbol(v: &Value) -> Result<Rc<crate::symbol::Symbol>, LanguageError> {
    match v {
        Value::Symbol(s) => Ok(s.clone()),
        other => Err(LanguageError::Other(format!("expected a symbol operand, got {other}"))),
    }
}
