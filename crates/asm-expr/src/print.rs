//! Diagnostic rendering of expression trees.
//!
//! The output follows the stored tree shape exactly: binary operators are
//! infix without spaces, nested subexpressions are parenthesised and unary
//! operators are prefix. Nothing is simplified before printing. The format
//! is for humans and is not meant to be parsed back.

use core::fmt;

use crate::expr::{Expr, ExprItem, Op};
use crate::symbol::SymbolId;

/// Name lookup used when printing symbols and registers.
pub trait ExprNames {
    fn symbol_name(&self, id: SymbolId) -> Option<&str>;

    fn register_name(&self, _reg: u32) -> Option<&str> {
        None
    }
}

/// Prints raw handles: `sym#N` and `regN`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNames;

impl ExprNames for NoNames {
    fn symbol_name(&self, _id: SymbolId) -> Option<&str> {
        None
    }
}

/// [`Display`](fmt::Display) adapter returned by [`Expr::display`].
pub struct ExprDisplay<'a> {
    expr: &'a Expr,
    names: &'a dyn ExprNames,
}

impl Expr {
    /// Renders the tree, resolving symbol and register names via `names`.
    ///
    /// ```rust
    /// use asm_expr::{Expr, IntNum, Op, SymbolTable};
    ///
    /// let mut symbols = SymbolTable::new();
    /// let start = symbols.use_symbol("start", 1);
    /// let e = Expr::binary(Op::Add, start, IntNum::from(4), 1).unwrap();
    /// assert_eq!(e.display(&symbols).to_string(), "start+4");
    /// ```
    pub fn display<'a>(&'a self, names: &'a dyn ExprNames) -> ExprDisplay<'a> {
        ExprDisplay { expr: self, names }
    }
}

impl fmt::Display for ExprDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_expr(f, self.expr, self.names)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_expr(f, self, &NoNames)
    }
}

/// Writes `expr` to an arbitrary sink.
pub fn write_expr(out: &mut dyn fmt::Write, expr: &Expr, names: &dyn ExprNames) -> fmt::Result {
    match (expr.op(), expr.second()) {
        (Op::Ident, _) => write_item(out, expr.first(), names),
        (op, None) => {
            out.write_str(op.symbol())?;
            write_item(out, expr.first(), names)
        }
        (op, Some(second)) => {
            write_item(out, expr.first(), names)?;
            out.write_str(op.symbol())?;
            write_item(out, second, names)
        }
    }
}

fn write_item(out: &mut dyn fmt::Write, item: &ExprItem, names: &dyn ExprNames) -> fmt::Result {
    match item {
        ExprItem::Sym(id) => match names.symbol_name(*id) {
            Some(name) => out.write_str(name),
            None => write!(out, "{}", id),
        },
        ExprItem::Expr(sub) => {
            out.write_char('(')?;
            write_expr(out, sub, names)?;
            out.write_char(')')
        }
        ExprItem::Int(n) => write!(out, "{}", n),
        ExprItem::Float(n) => write!(out, "{}", n),
        ExprItem::Reg(reg) => match names.register_name(*reg) {
            Some(name) => out.write_str(name),
            None => write!(out, "reg{}", reg),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::num::{FloatNum, IntNum};
    use crate::symbol::SymbolTable;
    use alloc::string::{String, ToString};

    struct X86Regs;

    impl ExprNames for X86Regs {
        fn symbol_name(&self, _id: SymbolId) -> Option<&str> {
            None
        }

        fn register_name(&self, reg: u32) -> Option<&str> {
            ["eax", "ecx", "edx", "ebx"].get(reg as usize).copied()
        }
    }

    fn int(n: i64) -> ExprItem {
        ExprItem::int(n)
    }

    #[test]
    fn binary_infix_without_spaces() {
        let e = Expr::binary(Op::Add, int(1), int(2), 1).unwrap();
        assert_eq!(e.to_string(), "1+2");
    }

    #[test]
    fn nested_subexpressions_are_parenthesised() {
        let inner = Expr::binary(Op::Add, int(1), int(2), 1).unwrap();
        let e = Expr::binary(Op::Mul, inner, int(3), 1).unwrap();
        assert_eq!(e.to_string(), "(1+2)*3");
    }

    #[test]
    fn unary_prefix() {
        let neg = Expr::unary(Op::Neg, int(5), 1).unwrap();
        let not = Expr::unary(Op::Not, neg, 1).unwrap();
        assert_eq!(not.to_string(), "~(-5)");
        let lnot = Expr::unary(Op::LNot, int(0), 1).unwrap();
        assert_eq!(lnot.to_string(), "!0");
    }

    #[test]
    fn ident_prints_operand_bare() {
        assert_eq!(Expr::ident(IntNum::from(42), 1).to_string(), "42");
        let wrapped = Expr::ident(Expr::binary(Op::Sub, int(4), int(1), 1).unwrap(), 1);
        assert_eq!(wrapped.to_string(), "(4-1)");
    }

    #[test]
    fn signed_operators_and_segoff() {
        let sdiv = Expr::binary(Op::SignDiv, int(-8), int(2), 1).unwrap();
        assert_eq!(sdiv.to_string(), "-8//2");
        let smod = Expr::binary(Op::SignMod, int(7), int(3), 1).unwrap();
        assert_eq!(smod.to_string(), "7%%3");
        let far = Expr::binary(Op::SegOff, ExprItem::reg(0), int(16), 1).unwrap();
        assert_eq!(far.to_string(), "reg0:16");
    }

    #[test]
    fn names_from_symbol_table() {
        let mut symbols = SymbolTable::new();
        let end = symbols.use_symbol("end", 1);
        let start = symbols.use_symbol("start", 1);
        let e = Expr::binary(Op::Sub, end, start, 1).unwrap();
        assert_eq!(e.display(&symbols).to_string(), "end-start");
        assert_eq!(e.to_string(), "sym#0-sym#1");
    }

    #[test]
    fn register_names() {
        let e = Expr::binary(Op::Add, ExprItem::reg(3), int(8), 1).unwrap();
        assert_eq!(e.display(&X86Regs).to_string(), "ebx+8");
        let unknown = Expr::ident(ExprItem::reg(30), 1);
        assert_eq!(unknown.display(&X86Regs).to_string(), "reg30");
    }

    #[test]
    fn floats_and_big_ints() {
        let f: FloatNum = "1.5".parse().unwrap();
        assert_eq!(Expr::ident(f, 1).to_string(), "1.5");
        let big: IntNum = "123456789012345678901234567890".parse().unwrap();
        assert_eq!(Expr::ident(big, 1).to_string(), "123456789012345678901234567890");
    }

    #[test]
    fn write_to_string_sink() {
        let e = Expr::binary(Op::Shl, int(1), int(4), 1).unwrap();
        let mut out = String::new();
        write_expr(&mut out, &e, &NoNames).unwrap();
        assert_eq!(out, "1<<4");
    }
}
