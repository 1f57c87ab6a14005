//! Arbitrary-precision numeric literals.
//!
//! [`IntNum`] and [`FloatNum`] wrap `dashu` integers and decimal floats and
//! expose the one operation the leveler needs from them: apply an
//! [`Op`] and report whether the result is defined. An undefined result
//! (division by zero, an unbounded shift, ...) is `None`, which the leveler
//! treats as "leave this operand pair alone".

use core::fmt;
use core::str::FromStr;

use dashu::base::ParseError;
use dashu::float::DBig;
use dashu::integer::IBig;

use crate::expr::Op;

/// Largest shift count that is folded. Larger counts are left unevaluated.
const MAX_SHIFT_BITS: usize = 1 << 16;

/// Minimum number of significant decimal digits kept by float division.
const FLOAT_DIV_DIGITS: usize = 40;

// ─── IntNum ──────────────────────────────────────────────────────────────────

/// An arbitrary-precision signed integer literal.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntNum(IBig);

impl IntNum {
    /// Integer zero.
    #[must_use]
    pub fn zero() -> Self {
        Self(IBig::ZERO)
    }

    /// Returns true if the value is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the value is exactly +1.
    pub fn is_pos1(&self) -> bool {
        self.0.is_one()
    }

    /// Returns true if the value is below zero.
    pub fn is_negative(&self) -> bool {
        self.0 < IBig::ZERO
    }

    /// Converts to `i64` if the value fits.
    pub fn to_i64(&self) -> Option<i64> {
        i64::try_from(&self.0).ok()
    }

    /// Borrows the underlying `dashu` integer.
    pub fn as_ibig(&self) -> &IBig {
        &self.0
    }

    /// Unwraps the underlying `dashu` integer.
    pub fn into_ibig(self) -> IBig {
        self.0
    }

    /// Applies `op` with `self` as the left (or only) operand.
    ///
    /// Unary operators take `rhs == None`, binary ones `Some`. Returns
    /// `None` when the result is not defined for these operands:
    ///
    /// - division or modulo by zero;
    /// - unsigned `DIV`/`MOD` with a negative operand;
    /// - a negative shift count or one above the fold limit;
    /// - `SEGOFF`, which pairs values rather than computing one;
    /// - an operand count that does not match the operator.
    pub fn calc(&self, op: Op, rhs: Option<&IntNum>) -> Option<IntNum> {
        let a = &self.0;
        let value = match (op, rhs) {
            (Op::Ident, None) => a.clone(),
            (Op::Neg, None) => -a,
            (Op::Not, None) => !a,
            (Op::LNot, None) => IBig::from(a.is_zero()),
            (_, None) | (Op::Ident | Op::Neg | Op::Not | Op::LNot, Some(_)) => return None,
            (op, Some(IntNum(b))) => match op {
                Op::Add => a + b,
                Op::Sub => a - b,
                Op::Mul => a * b,
                Op::Div | Op::Mod => {
                    if b.is_zero() || *a < IBig::ZERO || *b < IBig::ZERO {
                        return None;
                    }
                    if op == Op::Div {
                        a / b
                    } else {
                        a % b
                    }
                }
                Op::SignDiv => {
                    if b.is_zero() {
                        return None;
                    }
                    a / b
                }
                Op::SignMod => {
                    if b.is_zero() {
                        return None;
                    }
                    a % b
                }
                Op::Or => a | b,
                Op::And => a & b,
                Op::Xor => a ^ b,
                Op::Shl => a << shift_count(b)?,
                Op::Shr => a >> shift_count(b)?,
                Op::LOr => IBig::from(!a.is_zero() || !b.is_zero()),
                Op::LAnd => IBig::from(!a.is_zero() && !b.is_zero()),
                Op::Lt => IBig::from(a < b),
                Op::Gt => IBig::from(a > b),
                Op::Le => IBig::from(a <= b),
                Op::Ge => IBig::from(a >= b),
                Op::Eq => IBig::from(a == b),
                Op::Ne => IBig::from(a != b),
                Op::SegOff | Op::Ident | Op::Neg | Op::Not | Op::LNot => return None,
            },
        };
        Some(IntNum(value))
    }
}

fn shift_count(count: &IBig) -> Option<usize> {
    usize::try_from(count)
        .ok()
        .filter(|&n| n <= MAX_SHIFT_BITS)
}

macro_rules! intnum_from_primitive {
    ($($t:ty)*) => {$(
        impl From<$t> for IntNum {
            fn from(value: $t) -> Self {
                Self(IBig::from(value))
            }
        }
    )*};
}

intnum_from_primitive!(i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 usize isize);

impl From<IBig> for IntNum {
    fn from(value: IBig) -> Self {
        Self(value)
    }
}

impl FromStr for IntNum {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IBig::from_str(s).map(Self)
    }
}

impl fmt::Debug for IntNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IntNum({})", self.0)
    }
}

impl fmt::Display for IntNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── FloatNum ────────────────────────────────────────────────────────────────

/// An arbitrary-precision decimal floating-point literal.
///
/// Values are held at unlimited precision so that addition, subtraction and
/// multiplication are exact; only division rounds.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FloatNum(DBig);

impl FloatNum {
    /// Returns true if the value is zero.
    pub fn is_zero(&self) -> bool {
        self.0.repr().is_zero()
    }

    /// Borrows the underlying `dashu` float.
    pub fn as_dbig(&self) -> &DBig {
        &self.0
    }

    /// Applies `op` with `self` as the left (or only) operand.
    ///
    /// Only `IDENT`, `NEG`, `ADD`, `SUB`, `MUL`, `DIV` and `SIGNDIV` are
    /// defined on floats; everything else, and division by zero, is `None`.
    pub fn calc(&self, op: Op, rhs: Option<&FloatNum>) -> Option<FloatNum> {
        let a = &self.0;
        let value = match (op, rhs) {
            (Op::Ident, None) => a.clone(),
            (Op::Neg, None) => -a,
            (Op::Add, Some(b)) => a + &b.0,
            (Op::Sub, Some(b)) => a - &b.0,
            (Op::Mul, Some(b)) => a * &b.0,
            (Op::Div | Op::SignDiv, Some(b)) => {
                if b.is_zero() {
                    return None;
                }
                let precision = a.digits().max(b.0.digits()).max(FLOAT_DIV_DIGITS);
                let num = a.clone().with_precision(precision).value();
                let den = b.0.clone().with_precision(precision).value();
                num / den
            }
            _ => return None,
        };
        Some(FloatNum::from(value))
    }
}

impl From<IntNum> for FloatNum {
    fn from(value: IntNum) -> Self {
        Self::from(DBig::from(value.0))
    }
}

impl From<DBig> for FloatNum {
    fn from(value: DBig) -> Self {
        Self(value.with_precision(0).value())
    }
}

impl FromStr for FloatNum {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DBig::from_str(s).map(Self::from)
    }
}

impl fmt::Debug for FloatNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FloatNum({})", self.0)
    }
}

impl fmt::Display for FloatNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
