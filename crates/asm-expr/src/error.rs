//! Error types for expression construction and symbol/section bookkeeping.
//!
//! Leveling and value extraction never fail: an expression that cannot be
//! reduced further is an ordinary result. The variants here cover the
//! construction API and the internal-error channel for upstream defects.

use alloc::string::String;
use core::fmt;

use crate::expr::Op;

/// Error raised while building expressions or maintaining the symbol and
/// section tables.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExprError {
    /// An operator was given the wrong number of operands.
    OperandCount {
        /// The operator being constructed.
        op: Op,
        /// Operands the operator requires (1 or 2).
        expected: usize,
        /// Operands actually supplied.
        found: usize,
        /// Source line of the construct.
        line: u32,
    },

    /// A symbol was defined more than once.
    DuplicateSymbol {
        /// The symbol name.
        name: String,
        /// Source line of the redefinition.
        line: u32,
        /// Source line of the first definition.
        first_line: u32,
    },

    /// Violation of an internal invariant. Indicates a defect in whatever
    /// built the tables, never a user error.
    Internal {
        /// Description of the broken invariant.
        msg: String,
        /// Source line being processed when the defect surfaced.
        line: u32,
    },
}

impl ExprError {
    /// Source line the error is attributed to.
    pub fn line(&self) -> u32 {
        match self {
            ExprError::OperandCount { line, .. }
            | ExprError::DuplicateSymbol { line, .. }
            | ExprError::Internal { line, .. } => *line,
        }
    }

    /// Whether this error reports an internal defect rather than bad input.
    pub fn is_internal(&self) -> bool {
        matches!(self, ExprError::Internal { .. })
    }
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprError::OperandCount {
                op,
                expected,
                found,
                line,
            } => {
                write!(
                    f,
                    "{}: operator '{}' takes {} operand(s), got {}",
                    line,
                    op.name(),
                    expected,
                    found
                )
            }
            ExprError::DuplicateSymbol {
                name,
                line,
                first_line,
            } => {
                write!(
                    f,
                    "{}: redefinition of '{}' (first defined at line {})",
                    line, name, first_line
                )
            }
            ExprError::Internal { msg, line } => {
                write!(f, "{}: internal error: {}", line, msg)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ExprError {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn error_operand_count_display() {
        let err = ExprError::OperandCount {
            op: Op::Add,
            expected: 2,
            found: 1,
            line: 7,
        };
        assert_eq!(
            format!("{}", err),
            "7: operator 'ADD' takes 2 operand(s), got 1"
        );
        assert_eq!(err.line(), 7);
        assert!(!err.is_internal());
    }

    #[test]
    fn error_duplicate_symbol_display() {
        let err = ExprError::DuplicateSymbol {
            name: "loop".into(),
            line: 20,
            first_line: 5,
        };
        assert_eq!(
            format!("{}", err),
            "20: redefinition of 'loop' (first defined at line 5)"
        );
    }

    #[test]
    fn error_internal_display() {
        let err = ExprError::Internal {
            msg: "label past end of section".into(),
            line: 3,
        };
        assert_eq!(
            format!("{}", err),
            "3: internal error: label past end of section"
        );
        assert!(err.is_internal());
    }
}
