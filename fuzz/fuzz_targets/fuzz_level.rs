#![no_main]
use asm_expr::{Expr, ExprItem, IntNum, Op, SymbolId};
use libfuzzer_sys::fuzz_target;

/// Symbols below 4 share a section, 4 bytes per symbol number.
fn layout(a: SymbolId, b: SymbolId) -> Option<IntNum> {
    let (a, b) = (i64::from(a.raw()), i64::from(b.raw()));
    (a < 4 && b < 4).then(|| IntNum::from(4 * (a - b)))
}

/// Decode bytes as a small stack machine: leaves push, operators pop.
fn decode(data: &[u8]) -> Option<Expr> {
    let mut stack: Vec<Expr> = Vec::new();
    let mut bytes = data.iter().copied();
    while let Some(b) = bytes.next() {
        let arg = bytes.next().unwrap_or(0);
        match b % 4 {
            0 => stack.push(Expr::ident(IntNum::from(i8::from_le_bytes([arg])), 1)),
            1 => stack.push(Expr::ident(SymbolId::from_raw(u32::from(arg % 8)), 1)),
            2 => stack.push(Expr::ident(ExprItem::reg(u32::from(arg % 4)), 1)),
            _ => {
                let op = Op::ALL[usize::from(arg) % Op::ALL.len()];
                let node = if op.is_unary() {
                    Expr::unary(op, stack.pop()?, 1).ok()?
                } else {
                    let right = stack.pop()?;
                    let left = stack.pop()?;
                    Expr::binary(op, left, right, 1).ok()?
                };
                stack.push(node);
            }
        }
        if stack.len() > 64 {
            return None;
        }
    }
    stack.pop()
}

fuzz_target!(|data: &[u8]| {
    let Some(expr) = decode(data) else { return };

    // Leveling never panics and is idempotent.
    let once = expr.clone().simplify(Some(&layout));
    let twice = once.clone().simplify(Some(&layout));
    assert_eq!(once, twice);

    // Printing and extraction never panic.
    let _ = expr.to_string();
    let mut copy = expr.clone();
    let _ = copy.get_integer(Some(&layout));
    let mut copy = expr.clone();
    if copy.extract_symbol(Some(&layout)).is_none() {
        assert_eq!(copy, expr);
    }
});
