//! Symbol table.
//!
//! Expressions refer to symbols through [`SymbolId`] handles. The table owns
//! the names and definitions and must outlive every expression holding one of
//! its handles.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use crate::error::ExprError;
use crate::expr::Expr;
use crate::print::ExprNames;
use crate::section::SectionId;

/// Handle to a [`SymbolTable`] entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SymbolId(u32);

impl SymbolId {
    /// Handle from a raw index. Meaningful only against the table that
    /// issued the index; intended for mock layouts in tests.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sym#{}", self.0)
    }
}

/// Position of a label: the section it lives in and the number of bytecodes
/// of that section preceding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub section: SectionId,
    pub index: usize,
}

/// What a symbol stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    /// Referenced but not (yet) defined; also the state of externals.
    Undefined,
    /// `name EQU expr`.
    Equ(Expr),
    /// A code or data label.
    Label(Location),
}

/// One symbol table record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    name: String,
    kind: SymbolKind,
    line: u32,
}

impl Symbol {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &SymbolKind {
        &self.kind
    }

    /// Line of the definition, or of the first reference while undefined.
    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn is_defined(&self) -> bool {
        !matches!(self.kind, SymbolKind::Undefined)
    }
}

/// Name-indexed symbol storage.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    by_name: BTreeMap<String, SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Returns the handle for `name`, creating an undefined entry on first
    /// reference.
    pub fn use_symbol(&mut self, name: &str, line: u32) -> SymbolId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(Symbol {
            name: name.to_string(),
            kind: SymbolKind::Undefined,
            line,
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Defines `name` as an alias for `value`.
    pub fn define_equ(
        &mut self,
        name: &str,
        value: Expr,
        line: u32,
    ) -> Result<SymbolId, ExprError> {
        self.define(name, SymbolKind::Equ(value), line)
    }

    /// Defines `name` as a label at `location`.
    pub fn define_label(
        &mut self,
        name: &str,
        location: Location,
        line: u32,
    ) -> Result<SymbolId, ExprError> {
        self.define(name, SymbolKind::Label(location), line)
    }

    fn define(&mut self, name: &str, kind: SymbolKind, line: u32) -> Result<SymbolId, ExprError> {
        let id = self.use_symbol(name, line);
        let symbol = &mut self.symbols[id.index()];
        if symbol.is_defined() {
            return Err(ExprError::DuplicateSymbol {
                name: symbol.name.clone(),
                line,
                first_line: symbol.line,
            });
        }
        symbol.kind = kind;
        symbol.line = line;
        Ok(id)
    }

    pub fn find(&self, name: &str) -> Option<SymbolId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id.index())
    }

    pub fn name(&self, id: SymbolId) -> Option<&str> {
        self.get(id).map(Symbol::name)
    }

    /// Value expression of an EQU symbol.
    pub fn equ(&self, id: SymbolId) -> Option<&Expr> {
        match self.get(id)?.kind() {
            SymbolKind::Equ(value) => Some(value),
            _ => None,
        }
    }

    /// Location of a label symbol.
    pub fn label(&self, id: SymbolId) -> Option<Location> {
        match self.get(id)?.kind() {
            SymbolKind::Label(location) => Some(*location),
            _ => None,
        }
    }

    /// Entries in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (SymbolId(i as u32), s))
    }
}

impl ExprNames for SymbolTable {
    fn symbol_name(&self, id: SymbolId) -> Option<&str> {
        self.name(id)
    }
}
