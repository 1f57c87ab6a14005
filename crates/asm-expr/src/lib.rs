//! # asm-expr: Assembler Expression Core
//!
//! `asm-expr` represents and reduces the expressions that appear in assembly
//! source: operand displacements, section start addresses and relocation
//! targets. Expressions mix integer and float literals, symbol references,
//! registers and nested subexpressions, and are re-simplified on every
//! assembler pass as more of the layout becomes known.
//!
//! ## Quick Start
//!
//! ```rust
//! use asm_expr::{Expr, IntNum, Op, SectionLayout, Sections, SymbolTable};
//!
//! let mut sections = Sections::new(".text");
//! let mut symbols = SymbolTable::new();
//! let text = sections.default_section();
//!
//! let start = symbols.define_label("start", sections.here(text, 1).unwrap(), 1).unwrap();
//! sections.append_bytecode(text, Some(5), 2).unwrap();
//! let end = symbols.define_label("end", sections.here(text, 3).unwrap(), 3).unwrap();
//!
//! // (end - start) * 2
//! let len = Expr::binary(Op::Sub, end, start, 4).unwrap();
//! let mut e = Expr::binary(Op::Mul, len, IntNum::from(2), 4).unwrap();
//!
//! let layout = SectionLayout::new(&sections, &symbols);
//! assert_eq!(e.get_integer(Some(&layout)), Some(&IntNum::from(10)));
//! ```
//!
//! ## Features
//!
//! - **Leveling**: flattening, constant folding, identity removal and
//!   symbol-distance folding in one bottom-up pass.
//! - **Non-destructive**: whatever cannot be reduced yet is kept for the
//!   next pass; simplification never fails.
//! - **Arbitrary precision**: integer and decimal float literals backed by
//!   `dashu`.
//! - **`no_std` + `alloc`**: the `std` feature is on by default but optional.

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]
// ── Pedantic lint policy ─────────────────────────────────────────────────
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_lossless,
    clippy::match_same_arms,
    clippy::redundant_closure_for_method_calls,
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::uninlined_format_args,
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::return_self_not_must_use,
    clippy::manual_let_else,
    clippy::missing_panics_doc
)]

extern crate alloc;

/// Error types for construction and table maintenance.
pub mod error;
/// Expression tree: operators, items and nodes.
pub mod expr;
mod extract;
/// Layout capability consumed by the leveler.
pub mod layout;
/// Flattening, folding and simplification.
pub mod level;
/// Arbitrary-precision integer and float literals.
pub mod num;
/// Diagnostic printer.
pub mod print;
/// Sections, bytecode lengths and the section-backed layout.
pub mod section;
/// Symbol table.
pub mod symbol;

// Re-exports
pub use error::ExprError;
pub use expr::{Expr, ExprItem, Op};
pub use layout::Layout;
pub use level::{LevelOptions, Leveler, Xform};
pub use num::{FloatNum, IntNum};
pub use print::{write_expr, ExprDisplay, ExprNames, NoNames};
pub use section::{Bytecode, Section, SectionId, SectionKind, SectionLayout, Sections};
pub use symbol::{Location, Symbol, SymbolId, SymbolKind, SymbolTable};
