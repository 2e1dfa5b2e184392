// ABOUTME: Runtime environment — a chain of frames addressed by handle, not pointer

use crate::value::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// Handle into an `EnvArena`. Frames never move once allocated, so a
/// `FrameId` stays valid for the arena's whole lifetime.
pub type FrameId = usize;

/// `(frame-depth, slot-index)` — valid iff the symbol exists at some
/// enclosing compile-time frame (see `compiler::lexenv`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarPos {
    pub frame: usize,
    pub slot: usize,
}

#[derive(Debug)]
struct Frame {
    slots: RefCell<Vec<Value>>,
    parent: Option<FrameId>,
}

/// Owns every environment frame ever created in a `Context`.
///
/// Frames are addressed by index rather than linked via `Rc` parent
/// pointers: a closure that captures frame `F` and is itself stored back
/// into a slot of `F` (ordinary local recursion) would otherwise form an
/// `Rc` cycle. Indexing into a shared arena sidesteps that outright —
/// a pool of frames addressed by index, rather than the weak-back-
/// reference alternative.
#[derive(Debug, Default)]
pub struct EnvArena {
    frames: RefCell<Vec<Frame>>,
}

impl EnvArena {
    pub fn new() -> Rc<Self> {
        Rc::new(EnvArena::default())
    }

    /// Allocates a new frame of `size` nil slots linked to `parent`.
    pub fn alloc(&self, parent: Option<FrameId>, size: usize) -> FrameId {
        let mut frames = self.frames.borrow_mut();
        frames.push(Frame {
            slots: RefCell::new(vec![Value::Nil; size]),
            parent,
        });
        frames.len() - 1
    }

    fn walk(&self, start: FrameId, depth: usize) -> FrameId {
        let mut cur = start;
        for _ in 0..depth {
            cur = self.frames.borrow()[cur]
                .parent
                .expect("walk past outermost frame");
        }
        cur
    }

    pub fn get(&self, start: FrameId, pos: VarPos) -> Value {
        let frame = self.walk(start, pos.frame);
        self.frames.borrow()[frame].slots.borrow()[pos.slot].clone()
    }

    pub fn set(&self, start: FrameId, pos: VarPos, value: Value) {
        let frame = self.walk(start, pos.frame);
        self.frames.borrow()[frame].slots.borrow_mut()[pos.slot] = value;
    }

    /// Writes `n` popped-argument values into the new frame's first `n`
    /// slots (`MAKE_ENV`).
    pub fn init_args(&self, frame: FrameId, values: &[Value]) {
        let frames = self.frames.borrow();
        let mut slots = frames[frame].slots.borrow_mut();
        for (i, v) in values.iter().enumerate() {
            slots[i] = v.clone();
        }
    }

    pub fn set_slot(&self, frame: FrameId, slot: usize, value: Value) {
        self.frames.borrow()[frame].slots.borrow_mut()[slot] = value;
    }
}
