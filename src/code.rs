// ABOUTME: Process-wide registry of assembled code blocks, addressed by handle

use crate::instr::Instruction;
use std::cell::RefCell;
use std::rc::Rc;

pub type CodeHandle = usize;

#[derive(Debug)]
pub struct CodeBlock {
    pub instructions: Vec<Instruction>,
    /// Display name, if the lambda that produced this block had one
    /// (e.g. from `(define (f ...) ...)` sugar at a higher layer).
    pub name: Option<String>,
}

/// Holds every assembled code block for a `Context`.
///
/// Closures refer to code by handle rather than by direct reference, so
/// the reference graph stays easy to reason about (and, incidentally,
/// serializable) rather than a web of `Rc<CodeBlock>` pointers. A block
/// never mutates after registration.
#[derive(Debug, Default)]
pub struct CodeRegistry {
    blocks: RefCell<Vec<CodeBlock>>,
}

impl CodeRegistry {
    pub fn new() -> Rc<Self> {
        Rc::new(CodeRegistry::default())
    }

    pub fn register(&self, block: CodeBlock) -> CodeHandle {
        let mut blocks = self.blocks.borrow_mut();
        blocks.push(block);
        blocks.len() - 1
    }

    pub fn get(&self, handle: CodeHandle) -> std::cell::Ref<'_, CodeBlock> {
        std::cell::Ref::map(self.blocks.borrow(), |b| &b[handle])
    }

    pub fn len(&self, handle: CodeHandle) -> usize {
        self.blocks.borrow()[handle].instructions.len()
    }
}
