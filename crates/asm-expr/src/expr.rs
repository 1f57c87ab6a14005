//! Expression tree data model.
//!
//! An [`Expr`] is one operator applied to one or two [`ExprItem`]s. Items own
//! their payload (nested expressions, integer and float literals) except for
//! symbol references, which are plain [`SymbolId`] handles into a
//! [`SymbolTable`](crate::symbol::SymbolTable) that outlives every tree.
//!
//! Trees are built bottom-up and never share nodes, so `Clone` is a deep
//! copy whose symbol handles still name the same table entries, and dropping
//! a tree releases everything it owns.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use crate::error::ExprError;
use crate::num::{FloatNum, IntNum};
use crate::symbol::SymbolId;

/// Expression operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Op {
    /// Identity wrapper around a single operand.
    Ident,
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Unsigned division.
    Div,
    /// Signed division.
    SignDiv,
    /// Unsigned modulo.
    Mod,
    /// Signed modulo.
    SignMod,
    /// Arithmetic negation.
    Neg,
    /// Bitwise complement.
    Not,
    /// Bitwise or.
    Or,
    /// Bitwise and.
    And,
    /// Bitwise exclusive or.
    Xor,
    /// Left shift.
    Shl,
    /// Right shift.
    Shr,
    /// Logical or.
    LOr,
    /// Logical and.
    LAnd,
    /// Logical not.
    LNot,
    /// Less than.
    Lt,
    /// Greater than.
    Gt,
    /// Equal.
    Eq,
    /// Less than or equal.
    Le,
    /// Greater than or equal.
    Ge,
    /// Not equal.
    Ne,
    /// `segment:offset` far-pointer pairing.
    SegOff,
}

impl Op {
    /// Every operator, in declaration order.
    pub const ALL: [Op; 25] = [
        Op::Ident,
        Op::Add,
        Op::Sub,
        Op::Mul,
        Op::Div,
        Op::SignDiv,
        Op::Mod,
        Op::SignMod,
        Op::Neg,
        Op::Not,
        Op::Or,
        Op::And,
        Op::Xor,
        Op::Shl,
        Op::Shr,
        Op::LOr,
        Op::LAnd,
        Op::LNot,
        Op::Lt,
        Op::Gt,
        Op::Eq,
        Op::Le,
        Op::Ge,
        Op::Ne,
        Op::SegOff,
    ];

    /// Upper-case mnemonic used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Op::Ident => "IDENT",
            Op::Add => "ADD",
            Op::Sub => "SUB",
            Op::Mul => "MUL",
            Op::Div => "DIV",
            Op::SignDiv => "SIGNDIV",
            Op::Mod => "MOD",
            Op::SignMod => "SIGNMOD",
            Op::Neg => "NEG",
            Op::Not => "NOT",
            Op::Or => "OR",
            Op::And => "AND",
            Op::Xor => "XOR",
            Op::Shl => "SHL",
            Op::Shr => "SHR",
            Op::LOr => "LOR",
            Op::LAnd => "LAND",
            Op::LNot => "LNOT",
            Op::Lt => "LT",
            Op::Gt => "GT",
            Op::Eq => "EQ",
            Op::Le => "LE",
            Op::Ge => "GE",
            Op::Ne => "NE",
            Op::SegOff => "SEGOFF",
        }
    }

    /// Operator token used by the printer. Empty for `IDENT`.
    pub fn symbol(self) -> &'static str {
        match self {
            Op::Ident => "",
            Op::Add => "+",
            Op::Sub | Op::Neg => "-",
            Op::Mul => "*",
            Op::Div => "/",
            Op::SignDiv => "//",
            Op::Mod => "%",
            Op::SignMod => "%%",
            Op::Not => "~",
            Op::Or => "|",
            Op::And => "&",
            Op::Xor => "^",
            Op::Shl => "<<",
            Op::Shr => ">>",
            Op::LOr => "||",
            Op::LAnd => "&&",
            Op::LNot => "!",
            Op::Lt => "<",
            Op::Gt => ">",
            Op::Eq => "==",
            Op::Le => "<=",
            Op::Ge => ">=",
            Op::Ne => "!=",
            Op::SegOff => ":",
        }
    }

    /// `IDENT`, `NEG`, `NOT` and `LNOT` take one operand.
    pub fn is_unary(self) -> bool {
        matches!(self, Op::Ident | Op::Neg | Op::Not | Op::LNot)
    }

    /// Number of operands the operator takes.
    pub fn arity(self) -> usize {
        if self.is_unary() {
            1
        } else {
            2
        }
    }

    /// Operators that are associative and commutative, and therefore
    /// flattened into operand lists by the leveler.
    pub fn is_associative(self) -> bool {
        matches!(
            self,
            Op::Add | Op::Mul | Op::Or | Op::And | Op::Xor | Op::LOr | Op::LAnd
        )
    }

    /// Operators with a floating-point meaning. Integer literals are
    /// promoted when folded together with a float under one of these.
    pub fn is_float_capable(self) -> bool {
        matches!(
            self,
            Op::Ident | Op::Add | Op::Sub | Op::Mul | Op::Div | Op::SignDiv | Op::Neg
        )
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value at one operand position of an [`Expr`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExprItem {
    /// Reference to a symbol table entry (not owned).
    Sym(SymbolId),
    /// Nested expression (owned).
    Expr(Box<Expr>),
    /// Integer literal (owned).
    Int(IntNum),
    /// Float literal (owned).
    Float(FloatNum),
    /// Machine register number.
    Reg(u32),
}

impl ExprItem {
    /// Wraps a symbol reference.
    pub fn sym(id: SymbolId) -> Self {
        ExprItem::Sym(id)
    }

    /// Wraps a nested expression, taking ownership of it.
    pub fn expr(expr: Expr) -> Self {
        ExprItem::Expr(Box::new(expr))
    }

    /// Wraps an integer literal.
    pub fn int(value: impl Into<IntNum>) -> Self {
        ExprItem::Int(value.into())
    }

    /// Wraps a float literal.
    pub fn float(value: FloatNum) -> Self {
        ExprItem::Float(value)
    }

    /// Wraps a register number.
    pub fn reg(reg: u32) -> Self {
        ExprItem::Reg(reg)
    }

    /// Integer or float literal.
    pub fn is_literal(&self) -> bool {
        matches!(self, ExprItem::Int(_) | ExprItem::Float(_))
    }

    pub fn as_int(&self) -> Option<&IntNum> {
        match self {
            ExprItem::Int(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<&FloatNum> {
        match self {
            ExprItem::Float(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_sym(&self) -> Option<SymbolId> {
        match self {
            ExprItem::Sym(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_reg(&self) -> Option<u32> {
        match self {
            ExprItem::Reg(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_expr(&self) -> Option<&Expr> {
        match self {
            ExprItem::Expr(e) => Some(e),
            _ => None,
        }
    }

    /// Returns true if a symbol reference occurs anywhere in this item.
    pub fn contains_symbol(&self) -> bool {
        match self {
            ExprItem::Sym(_) => true,
            ExprItem::Expr(e) => e.contains_symbol(),
            _ => false,
        }
    }

    fn collect_symbols(&self, out: &mut Vec<SymbolId>) {
        match self {
            ExprItem::Sym(id) => out.push(*id),
            ExprItem::Expr(e) => e.collect_symbols(out),
            _ => {}
        }
    }
}

impl From<SymbolId> for ExprItem {
    fn from(id: SymbolId) -> Self {
        ExprItem::Sym(id)
    }
}

impl From<Expr> for ExprItem {
    fn from(expr: Expr) -> Self {
        ExprItem::expr(expr)
    }
}

impl From<IntNum> for ExprItem {
    fn from(value: IntNum) -> Self {
        ExprItem::Int(value)
    }
}

impl From<FloatNum> for ExprItem {
    fn from(value: FloatNum) -> Self {
        ExprItem::Float(value)
    }
}

/// One expression node: an operator with its operands and the source line
/// it came from.
///
/// Unary operators hold exactly one operand, binary operators exactly two;
/// the constructors reject anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Expr {
    op: Op,
    first: ExprItem,
    second: Option<ExprItem>,
    line: u32,
}

impl Expr {
    /// Builds a node, taking ownership of both operands.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::OperandCount`] if the number of operands does not
    /// match [`Op::arity`].
    pub fn new(
        op: Op,
        first: ExprItem,
        second: Option<ExprItem>,
        line: u32,
    ) -> Result<Self, ExprError> {
        let found = 1 + usize::from(second.is_some());
        if found != op.arity() {
            return Err(ExprError::OperandCount {
                op,
                expected: op.arity(),
                found,
                line,
            });
        }
        Ok(Self {
            op,
            first,
            second,
            line,
        })
    }

    /// `IDENT` node around a single item.
    pub fn ident(item: impl Into<ExprItem>, line: u32) -> Self {
        Self {
            op: Op::Ident,
            first: item.into(),
            second: None,
            line,
        }
    }

    /// Unary node.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::OperandCount`] if `op` is binary.
    pub fn unary(op: Op, operand: impl Into<ExprItem>, line: u32) -> Result<Self, ExprError> {
        Self::new(op, operand.into(), None, line)
    }

    /// Binary node.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::OperandCount`] if `op` is unary.
    pub fn binary(
        op: Op,
        left: impl Into<ExprItem>,
        right: impl Into<ExprItem>,
        line: u32,
    ) -> Result<Self, ExprError> {
        Self::new(op, left.into(), Some(right.into()), line)
    }

    /// Joins two existing trees under a binary operator.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::OperandCount`] if `op` is unary.
    pub fn tree(left: Expr, op: Op, right: Expr, line: u32) -> Result<Self, ExprError> {
        Self::binary(op, left, right, line)
    }

    /// Applies a unary operator to an existing tree.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::OperandCount`] if `op` is binary.
    pub fn branch(op: Op, operand: Expr, line: u32) -> Result<Self, ExprError> {
        Self::unary(op, operand, line)
    }

    /// Node assembly for the leveler, which only ever pairs operators with
    /// the operand count they take.
    pub(crate) fn from_parts(op: Op, first: ExprItem, second: Option<ExprItem>, line: u32) -> Self {
        debug_assert_eq!(op.arity(), 1 + usize::from(second.is_some()));
        Self {
            op,
            first,
            second,
            line,
        }
    }

    pub(crate) fn into_parts(self) -> (Op, ExprItem, Option<ExprItem>, u32) {
        (self.op, self.first, self.second, self.line)
    }

    /// Moves the tree out, leaving an `IDENT 0` placeholder behind.
    pub(crate) fn take(&mut self) -> Expr {
        let placeholder = Expr::ident(IntNum::zero(), self.line);
        core::mem::replace(self, placeholder)
    }

    pub fn op(&self) -> Op {
        self.op
    }

    pub fn first(&self) -> &ExprItem {
        &self.first
    }

    pub fn second(&self) -> Option<&ExprItem> {
        self.second.as_ref()
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    /// Operands in order.
    pub fn operands(&self) -> impl Iterator<Item = &ExprItem> {
        core::iter::once(&self.first).chain(self.second.as_ref())
    }

    pub(crate) fn operands_mut(&mut self) -> impl Iterator<Item = &mut ExprItem> {
        core::iter::once(&mut self.first).chain(self.second.as_mut())
    }

    /// Returns true if a symbol reference occurs anywhere in the tree.
    pub fn contains_symbol(&self) -> bool {
        self.operands().any(ExprItem::contains_symbol)
    }

    /// Every symbol reference in the tree, left to right.
    pub fn symbols(&self) -> Vec<SymbolId> {
        let mut out = Vec::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut Vec<SymbolId>) {
        for item in self.operands() {
            item.collect_symbols(out);
        }
    }

    /// Nesting depth: 1 for a node whose operands are all leaves.
    pub fn depth(&self) -> usize {
        1 + self
            .operands()
            .filter_map(ExprItem::as_expr)
            .map(Expr::depth)
            .max()
            .unwrap_or(0)
    }
}
