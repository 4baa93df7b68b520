//! Compiled function bodies.

use std::fmt::Write as _;

use rustc_hash::FxHashMap;

use super::Instruction;
use crate::opimpl::OpImpl;
use crate::value::Constant;
use crate::{QualifiedName, TypeHash};

// ============================================================================
// Constant pool
// ============================================================================

/// Constants referenced by `const_load` and `abort`, deduplicated.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    constants: Vec<Constant>,
    index: FxHashMap<Constant, u32>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or get existing constant, returns index.
    pub fn add(&mut self, constant: Constant) -> u32 {
        if let Some(&idx) = self.index.get(&constant) {
            return idx;
        }
        let idx = self.constants.len() as u32;
        self.constants.push(constant.clone());
        self.index.insert(constant, idx);
        idx
    }

    pub fn get(&self, index: u32) -> Option<&Constant> {
        self.constants.get(index as usize)
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }
}

// ============================================================================
// Code object
// ============================================================================

/// A local variable slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSlot {
    pub name: String,
    pub ty: TypeHash,
}

/// The ordered operation sequence of one function plus the tables its
/// operands index into.
#[derive(Debug, Clone)]
pub struct CodeObject {
    pub name: QualifiedName,
    instructions: Vec<Instruction>,
    constants: ConstantPool,
    opimpls: Vec<OpImpl>,
    callees: Vec<QualifiedName>,
    callee_index: FxHashMap<QualifiedName, u32>,
    locals: Vec<LocalSlot>,
    param_count: usize,
}

impl CodeObject {
    pub fn new(name: QualifiedName) -> Self {
        Self {
            name,
            instructions: Vec::new(),
            constants: ConstantPool::new(),
            opimpls: Vec::new(),
            callees: Vec::new(),
            callee_index: FxHashMap::default(),
            locals: Vec::new(),
            param_count: 0,
        }
    }

    // ------------------------------------------------------------------
    // Building
    // ------------------------------------------------------------------

    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    pub fn add_constant(&mut self, constant: Constant) -> u32 {
        self.constants.add(constant)
    }

    /// Every operator use gets its own entry, even when bindings repeat.
    pub fn add_opimpl(&mut self, opimpl: OpImpl) -> u32 {
        self.opimpls.push(opimpl);
        (self.opimpls.len() - 1) as u32
    }

    pub fn add_callee(&mut self, qn: QualifiedName) -> u32 {
        if let Some(&idx) = self.callee_index.get(&qn) {
            return idx;
        }
        let idx = self.callees.len() as u32;
        self.callees.push(qn.clone());
        self.callee_index.insert(qn, idx);
        idx
    }

    /// Set the local slot table; the first `param_count` slots are parameters.
    pub fn set_locals(&mut self, locals: Vec<LocalSlot>, param_count: usize) {
        self.locals = locals;
        self.param_count = param_count;
    }

    // ------------------------------------------------------------------
    // Reading
    // ------------------------------------------------------------------

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn constant(&self, index: u32) -> Option<&Constant> {
        self.constants.get(index)
    }

    pub fn constants(&self) -> &ConstantPool {
        &self.constants
    }

    pub fn opimpl(&self, index: u32) -> Option<&OpImpl> {
        self.opimpls.get(index as usize)
    }

    pub fn opimpls(&self) -> &[OpImpl] {
        &self.opimpls
    }

    pub fn callee(&self, index: u32) -> Option<&QualifiedName> {
        self.callees.get(index as usize)
    }

    pub fn locals(&self) -> &[LocalSlot] {
        &self.locals
    }

    pub fn param_count(&self) -> usize {
        self.param_count
    }

    /// Byte encoding of the instruction stream.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for ins in &self.instructions {
            ins.encode(&mut out);
        }
        out
    }

    /// Human-readable listing, one instruction per line.
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "== {} ==", self.name);
        for (i, ins) in self.instructions.iter().enumerate() {
            let _ = write!(out, "{i:04} {ins}");
            match ins.op() {
                super::OpCode::ConstLoad | super::OpCode::Abort => {
                    if let Some(c) = self.constant(ins.operand(0)) {
                        let _ = write!(out, "    ; {c:?}");
                    }
                }
                super::OpCode::CallOpImpl => {
                    if let Some(op) = self.opimpl(ins.operand(0)) {
                        let _ = write!(out, "    ; {op:?}");
                    }
                }
                super::OpCode::Call => {
                    if let Some(qn) = self.callee(ins.operand(0)) {
                        let _ = write!(out, "    ; {qn}");
                    }
                }
                _ => {}
            }
            out.push('\n');
        }
        out
    }
}
