// ABOUTME: Property tests -- random small programs checked against a from-scratch tree-walking reference interpreter

use lisp_core::cons;
use lisp_core::context::Context;
use lisp_core::value::Value;

/// Deterministic xorshift64 PRNG. No external crate: a fixed-seed PRNG
/// over a tiny grammar is sufficient to generate the random small
/// programs these properties need, and keeps the dependency stack
/// unchanged.
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Rng(seed | 1)
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    fn range(&mut self, n: u64) -> u64 {
        self.next_u64() % n
    }

    fn bool(&mut self) -> bool {
        self.range(2) == 0
    }

    fn small_int(&mut self) -> i64 {
        self.range(21) as i64 - 10
    }
}

/// A fixed small grammar: integer/boolean literals, arithmetic and
/// comparison primitives, `not`, `if`, `if*`, and `begin` sequencing.
/// Arithmetic/comparison operands are always drawn from the int-typed
/// sub-grammar (`gen_int_expr`) so the reference evaluator never has to
/// guess at implicit type coercions.
#[derive(Debug, Clone)]
enum Expr {
    Int(i64),
    Bool(bool),
    Not(Box<Expr>),
    Arith(&'static str, Box<Expr>, Box<Expr>),
    Cmp(&'static str, Box<Expr>, Box<Expr>),
    If(Box<Expr>, Box<Expr>, Option<Box<Expr>>),
    IfStar(Box<Expr>, Box<Expr>),
    Begin(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
enum RefValue {
    Int(i64),
    Bool(bool),
    Nil,
}

impl RefValue {
    fn is_truthy(&self) -> bool {
        !matches!(self, RefValue::Bool(false) | RefValue::Nil)
    }
}

/// Deliberately shares no code with `compiler`/`vm`: agreement between
/// this and `Context::eval` is the whole point of the property.
fn eval_ref(e: &Expr) -> RefValue {
    match e {
        Expr::Int(n) => RefValue::Int(*n),
        Expr::Bool(b) => RefValue::Bool(*b),
        Expr::Not(inner) => RefValue::Bool(!eval_ref(inner).is_truthy()),
        Expr::Arith(op, a, b) => {
            let (x, y) = (int_of(eval_ref(a)), int_of(eval_ref(b)));
            RefValue::Int(match *op {
                "+" => x + y,
                "-" => x - y,
                "*" => x * y,
                other => panic!("unknown arith op {other}"),
            })
        }
        Expr::Cmp(op, a, b) => {
            let (x, y) = (int_of(eval_ref(a)), int_of(eval_ref(b)));
            RefValue::Bool(match *op {
                "<" => x < y,
                ">" => x > y,
                "=" => x == y,
                "<=" => x <= y,
                ">=" => x >= y,
                other => panic!("unknown cmp op {other}"),
            })
        }
        Expr::If(p, t, e_opt) => {
            if eval_ref(p).is_truthy() {
                eval_ref(t)
            } else {
                match e_opt {
                    Some(e) => eval_ref(e),
                    None => RefValue::Nil,
                }
            }
        }
        Expr::IfStar(p, e) => {
            let pv = eval_ref(p);
            if pv.is_truthy() {
                pv
            } else {
                eval_ref(e)
            }
        }
        Expr::Begin(items) => {
            let mut result = RefValue::Nil;
            for item in items {
                result = eval_ref(item);
            }
            result
        }
    }
}

fn int_of(v: RefValue) -> i64 {
    match v {
        RefValue::Int(n) => n,
        other => panic!("expected an int-typed sub-expression, got {other:?}"),
    }
}

const ARITH_OPS: &[&str] = &["+", "-", "*"];
const CMP_OPS: &[&str] = &["<", ">", "=", "<=", ">="];

/// Only these predicate shapes let the compiler's `if`-peephole chain
/// bypass the general jump-based lowering entirely (peephole 1/2), so
/// only these are safe to pair with a missing `else` branch -- see the
/// `if`-compilation open question in DESIGN.md about the degenerate
/// then-nil/no-else path.
fn is_peephole_constant(p: &Expr) -> bool {
    matches!(p, Expr::Bool(_) | Expr::Int(_))
}

/// Int-typed sub-grammar: literals, arithmetic over int-typed operands,
/// and `if` with both branches int-typed (always carries an `else`, so
/// the result is never `Nil`).
fn gen_int_expr(rng: &mut Rng, depth: u32) -> Expr {
    if depth == 0 {
        return Expr::Int(rng.small_int());
    }
    match rng.range(3) {
        0 => Expr::Int(rng.small_int()),
        1 => {
            let op = ARITH_OPS[rng.range(ARITH_OPS.len() as u64) as usize];
            Expr::Arith(op, Box::new(gen_int_expr(rng, depth - 1)), Box::new(gen_int_expr(rng, depth - 1)))
        }
        _ => {
            let p = gen_expr(rng, depth - 1);
            let t = gen_int_expr(rng, depth - 1);
            let e = gen_int_expr(rng, depth - 1);
            Expr::If(Box::new(p), Box::new(t), Some(Box::new(e)))
        }
    }
}

/// General grammar: may produce an int- or bool-typed result. Used for
/// `if`/`if*` predicates and branches, and `begin` items.
fn gen_expr(rng: &mut Rng, depth: u32) -> Expr {
    if depth == 0 {
        return if rng.bool() { Expr::Int(rng.small_int()) } else { Expr::Bool(rng.bool()) };
    }
    match rng.range(7) {
        0 => Expr::Int(rng.small_int()),
        1 => Expr::Bool(rng.bool()),
        2 => Expr::Not(Box::new(gen_expr(rng, depth - 1))),
        3 => {
            let op = CMP_OPS[rng.range(CMP_OPS.len() as u64) as usize];
            Expr::Cmp(op, Box::new(gen_int_expr(rng, depth - 1)), Box::new(gen_int_expr(rng, depth - 1)))
        }
        4 => gen_int_expr(rng, depth),
        5 => gen_if(rng, depth),
        _ => {
            let n = 1 + rng.range(3);
            Expr::Begin((0..n).map(|_| gen_expr(rng, depth - 1)).collect())
        }
    }
}

/// Builds an `if`, biasing the predicate toward the shapes the
/// compiler's peephole chain special-cases (literal `false`, another
/// self-evaluating constant, `(not q)`, and the fully general case) and
/// only omitting `else` when the predicate is one of the constant shapes
/// that short-circuits before the general no-else code path runs.
fn gen_if(rng: &mut Rng, depth: u32) -> Expr {
    let p = gen_if_predicate(rng, depth - 1);
    let t = gen_expr(rng, depth - 1);
    let e = if is_peephole_constant(&p) && rng.bool() {
        None
    } else {
        Some(Box::new(gen_expr(rng, depth - 1)))
    };
    Expr::If(Box::new(p), Box::new(t), e)
}

fn gen_if_predicate(rng: &mut Rng, depth: u32) -> Expr {
    match rng.range(4) {
        0 => Expr::Bool(false),
        1 => {
            if rng.bool() {
                Expr::Int(rng.small_int())
            } else {
                Expr::Bool(true)
            }
        }
        2 => Expr::Not(Box::new(gen_expr(rng, depth))),
        _ => gen_expr(rng, depth),
    }
}

/// Lowers `Expr` to the s-expression `Value` the compiler consumes.
fn to_value(ctx: &Context, e: &Expr) -> Value {
    let sym = |name: &str| Value::Symbol(ctx.intern(name));
    match e {
        Expr::Int(n) => Value::Int(*n),
        Expr::Bool(b) => Value::Bool(*b),
        Expr::Not(inner) => cons::from_vec(vec![sym("not"), to_value(ctx, inner)]),
        Expr::Arith(op, a, b) => cons::from_vec(vec![sym(op), to_value(ctx, a), to_value(ctx, b)]),
        Expr::Cmp(op, a, b) => cons::from_vec(vec![sym(op), to_value(ctx, a), to_value(ctx, b)]),
        Expr::If(p, t, e_opt) => {
            let mut items = vec![sym("if"), to_value(ctx, p), to_value(ctx, t)];
            if let Some(e) = e_opt {
                items.push(to_value(ctx, e));
            }
            cons::from_vec(items)
        }
        Expr::IfStar(p, e) => cons::from_vec(vec![sym("if*"), to_value(ctx, p), to_value(ctx, e)]),
        Expr::Begin(items) => {
            let mut v = vec![sym("begin")];
            v.extend(items.iter().map(|i| to_value(ctx, i)));
            cons::from_vec(v)
        }
    }
}

fn matches_ref(expected: &RefValue, actual: &Value) -> bool {
    match (expected, actual) {
        (RefValue::Int(n), Value::Int(m)) => n == m,
        (RefValue::Bool(b), Value::Bool(c)) => b == c,
        (RefValue::Nil, Value::Nil) => true,
        _ => false,
    }
}

fn check_program(i: usize, expr: &Expr) {
    let expected = eval_ref(expr);
    let ctx = Context::new();
    let form = to_value(&ctx, expr);
    let actual = ctx
        .eval(form)
        .unwrap_or_else(|e| panic!("program {i} failed to evaluate ({expr:?}): {e}"));
    assert!(
        matches_ref(&expected, &actual),
        "program {i} mismatch: reference said {expected:?}, compiler+VM said {actual} ({expr:?})"
    );
}

#[test]
fn property_compile_execute_matches_reference_interpreter() {
    let mut rng = Rng::new(0xC0FFEE_u64);
    for i in 0..300 {
        let expr = gen_expr(&mut rng, 3);
        check_program(i, &expr);
    }
}

#[test]
fn property_if_star_matches_reference_interpreter() {
    let mut rng = Rng::new(0x1F5_u64);
    for i in 0..200 {
        let p = gen_if_predicate(&mut rng, 3);
        let e = gen_expr(&mut rng, 3);
        let expr = Expr::IfStar(Box::new(p), Box::new(e));
        check_program(i, &expr);
    }
}

#[test]
fn property_if_peephole_preserves_semantics_on_random_programs() {
    let mut rng = Rng::new(0xBEEF_u64);
    for i in 0..300 {
        let expr = gen_if(&mut rng, 3);
        check_program(i, &expr);
    }
}
