//! Regression tests for bug fixes.
//!
//! Each test documents a specific bug that was found and fixed, ensuring the
//! fix is never accidentally reverted.

use asm_expr::{
    Expr, ExprItem, FloatNum, IntNum, LevelOptions, Leveler, Op, SectionLayout, Sections,
    SymbolId, SymbolTable,
};

fn int(n: i64) -> ExprItem {
    ExprItem::int(n)
}

fn bin(op: Op, l: impl Into<ExprItem>, r: impl Into<ExprItem>) -> Expr {
    Expr::binary(op, l, r, 1).unwrap()
}

/// Regression: an integer promoted to a float carried unlimited precision
/// while a parsed float carried its digit count, and the narrower one won.
/// `2 + 0.5` rounded to `3`.
#[test]
fn promoted_float_keeps_precision() {
    let half: FloatNum = "0.5".parse().unwrap();
    let mut e = bin(Op::Add, int(2), ExprItem::Float(half));
    let expected: FloatNum = "2.5".parse().unwrap();
    assert_eq!(e.get_float(), Some(&expected));
}

/// Regression: float division of short literals was performed at the
/// literals' own precision, so `1 / 3.0` came out as `0.3`.
#[test]
fn float_division_keeps_working_digits() {
    let three: FloatNum = "3.0".parse().unwrap();
    let mut e = bin(Op::Div, int(1), ExprItem::Float(three));
    let q = e.get_float().unwrap().to_string();
    assert!(q.starts_with("0.3333333333"), "{}", q);
}

/// Regression: unsigned `DIV` of a negative value was folded with signed
/// semantics. It must stay unevaluated.
#[test]
fn unsigned_division_of_negative_is_not_folded() {
    let e = bin(Op::Div, int(-8), int(2));
    assert_eq!(e.clone().simplify(None), e);
    let mut signed = bin(Op::SignDiv, int(-8), int(2));
    assert_eq!(signed.get_integer(None), Some(&IntNum::from(-4)));
}

/// Regression: a self-referencing EQU recursed without bound.
#[test]
fn self_referencing_equ_terminates() {
    let sections = Sections::new(".text");
    let mut symbols = SymbolTable::new();
    let x = symbols.use_symbol("x", 1);
    symbols.define_equ("x", bin(Op::Add, x, int(1)), 1).unwrap();
    let layout = SectionLayout::new(&sections, &symbols);

    let mut e = Expr::ident(x, 2);
    assert_eq!(e.get_integer(Some(&layout)), None);
    assert_eq!(e.get_symbol(false), Some(x));
}

/// Regression: a failed `extract_symbol` left the caller holding the
/// half-rewritten tree.
#[test]
fn failed_extraction_restores_tree() {
    let mut symbols = SymbolTable::new();
    let a = symbols.use_symbol("a", 1);
    let b = symbols.use_symbol("b", 1);
    let mut e = bin(Op::Add, bin(Op::Add, a, int(4)), bin(Op::Mul, b, int(2)));
    let before = e.clone();
    assert_eq!(e.extract_symbol(None), None);
    assert_eq!(e, before);
}

/// Regression: folding `end + 4 - start` dropped the `+ 4` addend.
#[test]
fn distance_in_chain_keeps_other_addends() {
    let start = SymbolId::from_raw(0);
    let end = SymbolId::from_raw(1);
    let layout = move |a: SymbolId, b: SymbolId| -> Option<IntNum> {
        (a == end && b == start).then(|| IntNum::from(100))
    };
    let mut e = bin(Op::Sub, bin(Op::Add, end, int(4)), start);
    assert_eq!(e.get_integer(Some(&layout)), Some(&IntNum::from(104)));
}

/// Regression: a huge shift count tried to allocate the shifted value.
#[test]
fn huge_shift_is_left_unevaluated() {
    let e = bin(Op::Shl, int(1), int(1 << 40));
    assert_eq!(e.clone().simplify(None), e);
}

/// Regression: `!!x` was cancelled like `--x`, turning any nonzero `x` into
/// itself instead of 1.
#[test]
fn double_logical_not_is_kept() {
    let e = Expr::unary(Op::LNot, Expr::unary(Op::LNot, ExprItem::reg(2), 1).unwrap(), 1).unwrap();
    assert_eq!(e.clone().simplify(None), e);
    let e = Expr::unary(Op::Neg, Expr::unary(Op::Neg, ExprItem::reg(2), 1).unwrap(), 1).unwrap();
    assert_eq!(e.simplify(None), Expr::ident(ExprItem::reg(2), 1));
}

/// Regression: identity removal ran with folding disabled and short-circuited
/// `x * 0` even when the caller asked for structural leveling only.
#[test]
fn structural_leveling_keeps_identities() {
    let opts = LevelOptions::default()
        .with_fold_const(false)
        .with_simplify_ident(false);
    let e = bin(Op::Mul, bin(Op::Mul, ExprItem::reg(1), int(0)), int(1));
    let flat = bin(Op::Mul, bin(Op::Mul, ExprItem::reg(1), int(0)), int(1));
    assert_eq!(e.level_tree(opts, None, None), flat);
}

/// Regression: a label defined after the last bytecode reported no offset.
#[test]
fn label_at_section_end_has_offset() {
    let mut sections = Sections::new(".text");
    let mut symbols = SymbolTable::new();
    let text = sections.default_section();
    sections.append_bytecode(text, Some(6), 1).unwrap();
    let end = symbols
        .define_label("end", sections.here(text, 2).unwrap(), 2)
        .unwrap();
    let layout = SectionLayout::new(&sections, &symbols);
    let mut e = bin(Op::Add, end, int(1));
    assert_eq!(e.extract_symbol(Some(&layout)), Some(end));
    assert_eq!(e.get_integer(None), Some(&IntNum::from(7)));
}

/// Regression: distance folding only looked at a bare-symbol subtrahend, so
/// `end - 4 - start` and `end - (start + 2)` stayed symbolic with the
/// distance known.
#[test]
fn distance_folds_through_nested_subtraction() {
    let start = SymbolId::from_raw(0);
    let end = SymbolId::from_raw(1);
    let layout = move |a: SymbolId, b: SymbolId| -> Option<IntNum> {
        (a == end && b == start).then(|| IntNum::from(10))
    };
    let mut e = bin(Op::Sub, bin(Op::Sub, end, int(4)), start);
    assert_eq!(e.get_integer(Some(&layout)), Some(&IntNum::from(6)));
    let mut e = bin(Op::Sub, end, bin(Op::Add, start, int(2)));
    assert_eq!(e.get_integer(Some(&layout)), Some(&IntNum::from(8)));
}

/// Regression: a node that collapsed onto an already leveled operand, as in
/// `IDENT(a + b)`, was handed to the post-node hook a second time.
#[test]
fn hook_runs_once_per_node() {
    let mut calls = 0usize;
    let mut hook = |e: Expr| {
        calls += 1;
        e
    };
    let a = SymbolId::from_raw(0);
    let b = SymbolId::from_raw(1);
    let e = Expr::ident(bin(Op::Add, a, b), 1);
    let out = Leveler::new(LevelOptions::default()).xform(&mut hook).level(e);
    assert_eq!(out, bin(Op::Add, a, b));
    assert_eq!(calls, 1);
}
