//! Sections and the bytecode layout behind symbol distances.
//!
//! A section is an ordered run of bytecodes with a start expression. Only
//! bytecode lengths matter here: a length is `None` until the assembler has
//! settled it (for example a branch whose encoding depends on its target),
//! and every distance across an unsettled bytecode stays unknown.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use core::ops::ControlFlow;

use crate::error::ExprError;
use crate::expr::Expr;
use crate::layout::Layout;
use crate::num::IntNum;
use crate::print::{write_expr, ExprNames};
use crate::symbol::{Location, SymbolId, SymbolTable};

/// Handle to a section in [`Sections`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionId(u32);

impl SectionId {
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

/// A positioned unit of output. Only its length is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bytecode {
    /// Length in bytes, once known.
    pub len: Option<u64>,
    /// Source line that produced it.
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionKind {
    /// Named output section.
    General { name: String },
    /// `ABSOLUTE` block: reserves space at a fixed address, emits nothing.
    Absolute,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    kind: SectionKind,
    start: Expr,
    res_only: bool,
    bytecodes: Vec<Bytecode>,
}

impl Section {
    pub fn kind(&self) -> &SectionKind {
        &self.kind
    }

    /// Name of a general section; absolute sections have none.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            SectionKind::General { name } => Some(name),
            SectionKind::Absolute => None,
        }
    }

    pub fn is_absolute(&self) -> bool {
        matches!(self.kind, SectionKind::Absolute)
    }

    pub fn start(&self) -> &Expr {
        &self.start
    }

    /// Replaces the start expression, dropping the previous one.
    pub fn set_start(&mut self, start: Expr) {
        self.start = start;
    }

    /// Only space reservations are allowed in this section.
    pub fn res_only(&self) -> bool {
        self.res_only
    }

    pub fn bytecodes(&self) -> &[Bytecode] {
        &self.bytecodes
    }

    /// Total length of the bytecodes in `range`, if all are known.
    fn span(&self, from: usize, to: usize) -> Option<u64> {
        self.bytecodes
            .get(from..to)?
            .iter()
            .try_fold(0u64, |acc, bc| acc.checked_add(bc.len?))
    }

    /// Offset of bytecode position `index` from the section start.
    pub fn offset_of(&self, index: usize) -> Option<u64> {
        self.span(0, index)
    }

    /// Writes the diagnostic block for this section.
    pub fn print(
        &self,
        out: &mut dyn fmt::Write,
        indent: usize,
        names: &dyn ExprNames,
    ) -> fmt::Result {
        let pad = "";
        match &self.kind {
            SectionKind::General { name } => {
                writeln!(out, "{pad:indent$}type=general")?;
                writeln!(out, "{pad:indent$}name={name}")?;
            }
            SectionKind::Absolute => writeln!(out, "{pad:indent$}type=absolute")?,
        }
        write!(out, "{pad:indent$}start=")?;
        write_expr(out, &self.start, names)?;
        writeln!(out)?;
        writeln!(out, "{pad:indent$}res_only={}", u8::from(self.res_only))?;
        writeln!(out, "{pad:indent$}bytecodes={}", self.bytecodes.len())
    }
}

/// The ordered list of all sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sections {
    list: Vec<Section>,
}

impl Sections {
    /// Creates the list with a default general section starting at 0.
    pub fn new(default_name: &str) -> Self {
        let mut sections = Self { list: Vec::new() };
        sections.push(
            SectionKind::General {
                name: default_name.to_string(),
            },
            Expr::ident(IntNum::zero(), 0),
            false,
        );
        sections
    }

    fn push(&mut self, kind: SectionKind, start: Expr, res_only: bool) -> SectionId {
        let id = SectionId(self.list.len() as u32);
        self.list.push(Section {
            kind,
            start,
            res_only,
            bytecodes: Vec::new(),
        });
        id
    }

    /// The section assembly starts in.
    pub fn default_section(&self) -> SectionId {
        SectionId(0)
    }

    /// Switches to the general section `name`, creating it if needed. The
    /// flag is true for a newly created section. Start address and
    /// `res_only` only apply on creation.
    pub fn switch_general(
        &mut self,
        name: &str,
        start: u64,
        res_only: bool,
        line: u32,
    ) -> (SectionId, bool) {
        if let Some(id) = self.find_general(name) {
            return (id, false);
        }
        let id = self.push(
            SectionKind::General {
                name: name.to_string(),
            },
            Expr::ident(IntNum::from(start), line),
            res_only,
        );
        (id, true)
    }

    /// Starts a new absolute section at `start`.
    pub fn switch_absolute(&mut self, start: Expr) -> SectionId {
        self.push(SectionKind::Absolute, start, true)
    }

    pub fn find_general(&self, name: &str) -> Option<SectionId> {
        self.iter()
            .find(|(_, s)| s.name() == Some(name))
            .map(|(id, _)| id)
    }

    pub fn get(&self, id: SectionId) -> Option<&Section> {
        self.list.get(id.index())
    }

    pub fn get_mut(&mut self, id: SectionId) -> Option<&mut Section> {
        self.list.get_mut(id.index())
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SectionId, &Section)> {
        self.list
            .iter()
            .enumerate()
            .map(|(i, s)| (SectionId(i as u32), s))
    }

    /// Visits sections in order until `f` breaks, returning its value.
    pub fn traverse<B>(
        &mut self,
        mut f: impl FnMut(SectionId, &mut Section) -> ControlFlow<B>,
    ) -> ControlFlow<B> {
        for (i, section) in self.list.iter_mut().enumerate() {
            f(SectionId(i as u32), section)?;
        }
        ControlFlow::Continue(())
    }

    fn section_mut(&mut self, id: SectionId, line: u32) -> Result<&mut Section, ExprError> {
        self.list.get_mut(id.index()).ok_or_else(|| ExprError::Internal {
            msg: format!("no section #{}", id.0),
            line,
        })
    }

    /// Appends a bytecode and returns its index.
    pub fn append_bytecode(
        &mut self,
        id: SectionId,
        len: Option<u64>,
        line: u32,
    ) -> Result<usize, ExprError> {
        let section = self.section_mut(id, line)?;
        section.bytecodes.push(Bytecode { len, line });
        Ok(section.bytecodes.len() - 1)
    }

    /// Replaces the start expression of section `id`.
    pub fn set_start(&mut self, id: SectionId, start: Expr, line: u32) -> Result<(), ExprError> {
        self.section_mut(id, line)?.set_start(start);
        Ok(())
    }

    /// Settles the length of an existing bytecode.
    pub fn set_bytecode_len(
        &mut self,
        id: SectionId,
        index: usize,
        len: u64,
    ) -> Result<(), ExprError> {
        let section = self.section_mut(id, 0)?;
        let count = section.bytecodes.len();
        match section.bytecodes.get_mut(index) {
            Some(bc) => {
                bc.len = Some(len);
                Ok(())
            }
            None => Err(ExprError::Internal {
                msg: format!("bytecode {} out of range ({} in section)", index, count),
                line: 0,
            }),
        }
    }

    /// Label position after the last bytecode of `id`.
    pub fn here(&self, id: SectionId, line: u32) -> Result<Location, ExprError> {
        let section = self.get(id).ok_or_else(|| ExprError::Internal {
            msg: format!("no section #{}", id.0),
            line,
        })?;
        Ok(Location {
            section: id,
            index: section.bytecodes.len(),
        })
    }

    /// Label position before bytecode `index` of `id`.
    pub fn location(&self, id: SectionId, index: usize, line: u32) -> Result<Location, ExprError> {
        let here = self.here(id, line)?;
        if index > here.index {
            return Err(ExprError::Internal {
                msg: format!(
                    "label position {} past end of section ({} bytecodes)",
                    index, here.index
                ),
                line,
            });
        }
        Ok(Location { section: id, index })
    }

    /// Diagnostic dump of every section.
    pub fn print(
        &self,
        out: &mut dyn fmt::Write,
        indent: usize,
        names: &dyn ExprNames,
    ) -> fmt::Result {
        for (_, section) in self.iter() {
            section.print(out, indent, names)?;
        }
        Ok(())
    }
}

// ─── Layout ──────────────────────────────────────────────────────────────────

/// [`Layout`] over the current section contents and symbol table.
#[derive(Debug, Clone, Copy)]
pub struct SectionLayout<'a> {
    sections: &'a Sections,
    symbols: &'a SymbolTable,
}

impl<'a> SectionLayout<'a> {
    pub fn new(sections: &'a Sections, symbols: &'a SymbolTable) -> Self {
        Self { sections, symbols }
    }

    fn label(&self, sym: SymbolId) -> Option<(&'a Section, Location)> {
        let location = self.symbols.label(sym)?;
        let section = self.sections.get(location.section)?;
        Some((section, location))
    }
}

impl Layout for SectionLayout<'_> {
    fn distance(&self, minuend: SymbolId, subtrahend: SymbolId) -> Option<IntNum> {
        let (section, a) = self.label(minuend)?;
        let (_, b) = self.label(subtrahend)?;
        if a.section != b.section {
            return None;
        }
        if a.index >= b.index {
            section.span(b.index, a.index).map(IntNum::from)
        } else {
            section
                .span(a.index, b.index)
                .map(|span| IntNum::from(-i128::from(span)))
        }
    }

    fn is_label(&self, sym: SymbolId) -> bool {
        self.symbols.label(sym).is_some()
    }

    fn label_offset(&self, sym: SymbolId) -> Option<IntNum> {
        let (section, location) = self.label(sym)?;
        section.offset_of(location.index).map(IntNum::from)
    }

    fn equ(&self, sym: SymbolId) -> Option<&Expr> {
        self.symbols.equ(sym)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::print::NoNames;

    #[test]
    fn default_section() {
        let sections = Sections::new(".text");
        assert_eq!(sections.len(), 1);
        let text = sections.get(sections.default_section()).unwrap();
        assert_eq!(text.name(), Some(".text"));
        assert!(!text.is_absolute());
        assert_eq!(text.start(), &Expr::ident(IntNum::zero(), 0));
    }

    #[test]
    fn switch_general_finds_or_creates() {
        let mut sections = Sections::new(".text");
        let (data, new) = sections.switch_general(".data", 0x1000, false, 3);
        assert!(new);
        let (again, new) = sections.switch_general(".data", 0x2000, true, 9);
        assert_eq!(again, data);
        assert!(!new);
        let section = sections.get(data).unwrap();
        assert_eq!(section.start(), &Expr::ident(IntNum::from(0x1000u64), 3));
        assert!(!section.res_only());
        assert_eq!(sections.find_general(".text"), Some(SectionId(0)));
        assert_eq!(sections.find_general(".bss"), None);
    }

    #[test]
    fn absolute_sections_are_anonymous_and_reserve_only() {
        let mut sections = Sections::new(".text");
        let abs = sections.switch_absolute(Expr::ident(IntNum::from(0x400), 7));
        let abs2 = sections.switch_absolute(Expr::ident(IntNum::from(0x400), 8));
        assert_ne!(abs, abs2);
        let section = sections.get(abs).unwrap();
        assert!(section.is_absolute());
        assert!(section.res_only());
        assert_eq!(section.name(), None);
        assert_eq!(sections.find_general(""), None);
    }

    #[test]
    fn set_start_replaces() {
        let mut sections = Sections::new(".text");
        let text = sections.default_section();
        sections
            .set_start(text, Expr::ident(IntNum::from(0x7c00), 2), 2)
            .unwrap();
        assert_eq!(
            sections.get(text).unwrap().start(),
            &Expr::ident(IntNum::from(0x7c00), 2)
        );
        let err = sections
            .set_start(SectionId(3), Expr::ident(IntNum::zero(), 4), 4)
            .unwrap_err();
        assert!(err.is_internal());
        assert_eq!(err.line(), 4);
    }

    #[test]
    fn traverse_stops_on_break() {
        let mut sections = Sections::new("a");
        sections.switch_general("b", 0, false, 1);
        sections.switch_general("c", 0, false, 1);
        let mut visited = 0;
        let result = sections.traverse(|_, s| {
            visited += 1;
            if s.name() == Some("b") {
                ControlFlow::Break(7)
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(result, ControlFlow::Break(7));
        assert_eq!(visited, 2);
        let all: ControlFlow<()> = sections.traverse(|_, s| {
            s.set_start(Expr::ident(IntNum::from(0x100), 1));
            ControlFlow::Continue(())
        });
        assert_eq!(all, ControlFlow::Continue(()));
    }

    #[test]
    fn bytecode_bookkeeping() {
        let mut sections = Sections::new(".text");
        let text = sections.default_section();
        assert_eq!(sections.append_bytecode(text, Some(2), 1), Ok(0));
        assert_eq!(sections.append_bytecode(text, None, 2), Ok(1));
        let section = sections.get(text).unwrap();
        assert_eq!(section.offset_of(1), Some(2));
        assert_eq!(section.offset_of(2), None);
        sections.set_bytecode_len(text, 1, 5).unwrap();
        assert_eq!(sections.get(text).unwrap().offset_of(2), Some(7));
        assert!(sections.set_bytecode_len(text, 9, 1).unwrap_err().is_internal());
        assert!(sections
            .append_bytecode(SectionId(5), None, 4)
            .unwrap_err()
            .is_internal());
    }

    #[test]
    fn label_past_end_is_internal_error() {
        let mut sections = Sections::new(".text");
        let text = sections.default_section();
        sections.append_bytecode(text, Some(1), 1).unwrap();
        assert_eq!(
            sections.here(text, 2),
            Ok(Location {
                section: text,
                index: 1
            })
        );
        assert!(sections.location(text, 1, 2).is_ok());
        let err = sections.location(text, 2, 2).unwrap_err();
        assert!(err.is_internal());
        assert_eq!(err.line(), 2);
    }

    #[test]
    fn layout_distances() {
        let mut sections = Sections::new(".text");
        let text = sections.default_section();
        let (data, _) = sections.switch_general(".data", 0, false, 1);
        let mut symbols = SymbolTable::new();

        let start = symbols
            .define_label("start", sections.here(text, 1).unwrap(), 1)
            .unwrap();
        sections.append_bytecode(text, Some(3), 1).unwrap();
        let jmp = sections.append_bytecode(text, None, 2).unwrap();
        let mid = symbols
            .define_label("mid", sections.here(text, 3).unwrap(), 3)
            .unwrap();
        sections.append_bytecode(text, Some(4), 3).unwrap();
        let end = symbols
            .define_label("end", sections.here(text, 4).unwrap(), 4)
            .unwrap();
        let var = symbols
            .define_label("var", sections.here(data, 5).unwrap(), 5)
            .unwrap();
        let ext = symbols.use_symbol("printf", 6);

        {
            let layout = SectionLayout::new(&sections, &symbols);
            assert_eq!(layout.distance(end, mid), Some(IntNum::from(4)));
            assert_eq!(layout.distance(mid, end), Some(IntNum::from(-4)));
            assert_eq!(layout.distance(end, start), None);
            assert_eq!(layout.distance(end, var), None);
            assert_eq!(layout.distance(end, ext), None);
            assert_eq!(layout.distance(end, end), Some(IntNum::zero()));
            assert!(layout.is_label(start));
            assert!(!layout.is_label(ext));
            assert_eq!(layout.label_offset(start), Some(IntNum::zero()));
            assert_eq!(layout.label_offset(mid), None);
            assert_eq!(layout.label_offset(var), Some(IntNum::zero()));
        }

        sections.set_bytecode_len(text, jmp, 2).unwrap();
        let layout = SectionLayout::new(&sections, &symbols);
        assert_eq!(layout.distance(end, start), Some(IntNum::from(9)));
        assert_eq!(layout.label_offset(mid), Some(IntNum::from(5)));
    }

    #[test]
    fn layout_exposes_equ() {
        let sections = Sections::new(".text");
        let mut symbols = SymbolTable::new();
        let four = symbols
            .define_equ("FOUR", Expr::ident(IntNum::from(4), 1), 1)
            .unwrap();
        let layout = SectionLayout::new(&sections, &symbols);
        assert!(layout.equ(four).is_some());
        assert!(!layout.is_label(four));
    }

    #[test]
    fn print_blocks() {
        let mut sections = Sections::new(".text");
        sections.switch_absolute(Expr::ident(IntNum::from(0x100), 2));
        let mut out = String::new();
        sections.print(&mut out, 2, &NoNames).unwrap();
        assert_eq!(
            out,
            "  type=general\n  name=.text\n  start=0\n  res_only=0\n  bytecodes=0\n  \
             type=absolute\n  start=256\n  res_only=1\n  bytecodes=0\n"
        );
    }
}
