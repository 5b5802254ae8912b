//! the AST as a flat arena: `Vec<Node>` indexed by `NodeId`, rather than the
//! original's heap of raw owning pointers. no node outlives the `Ast` that
//! holds it and there is no cycle to worry about - see design notes §9.

use crate::compiler::error::SourceLoc;
use crate::compiler::types::Type;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(pub usize);

#[derive(Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub loc: SourceLoc,
    pub ty: Type,
}

#[derive(Debug)]
pub enum NodeKind {
    Function {
        name: String,
        return_type: Type,
        params: Vec<NodeId>,
        body: Vec<NodeId>,
    },
    Param {
        name: String,
    },
    FunctionCall {
        name: String,
        args: Vec<NodeId>,
    },
    VarDecl {
        name: String,
        declared_type: Type,
        init: Option<NodeId>,
    },
    Identifier {
        name: String,
        /// true when this occurrence is the target of an assignment - the
        /// codegen skips emitting a read for it (mirrors `isInAssignExpr`).
        is_assign_target: bool,
    },
    ArraySubscript {
        base: NodeId,
        index: NodeId,
    },
    Return {
        value: Option<NodeId>,
    },
    If {
        condition: NodeId,
        then_body: Vec<NodeId>,
        else_body: Vec<NodeId>,
    },
    ForLoop {
        init: NodeId,
        condition: NodeId,
        update: NodeId,
        body: Vec<NodeId>,
    },
    WhileLoop {
        condition: NodeId,
        body: Vec<NodeId>,
    },
    /// a statement-level expression wrapper; its child is the value.
    Expr {
        inner: NodeId,
    },
    UnaryOp {
        op: UnaryOp,
        operand: NodeId,
    },
    BinOp {
        op: BinOp,
        lhs: NodeId,
        rhs: NodeId,
    },
    TypeCast {
        target: Type,
        operand: NodeId,
    },
    ArrayLiteral {
        elements: Vec<NodeId>,
    },
    IntLit(i32),
    BoolLit(bool),
    CharLit(u8),
    FloatLit(f32),
    VoidLit,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnaryOp {
    Plus,
    Neg,
    Not,
    BitNot,
    Deref,
    AddressOf,
    Sizeof,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
    Neq,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
    Assign,
}

/// owns every node in the program; nodes reference each other by `NodeId`.
#[derive(Default)]
pub struct Ast {
    nodes: Vec<Node>,
    pub functions: Vec<NodeId>,
}

impl Ast {
    pub fn new() -> Ast {
        Ast::default()
    }

    pub fn push(&mut self, kind: NodeKind, loc: SourceLoc, ty: Type) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { kind, loc, ty });
        id
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }
}
