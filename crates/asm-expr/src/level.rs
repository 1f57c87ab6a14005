//! Expression leveling.
//!
//! Leveling rewrites a tree bottom-up into a canonical, maximally reduced
//! form:
//!
//! 1. children are leveled first, and `IDENT` wrappers around them dropped;
//! 2. EQU symbols are replaced by their (leveled) values;
//! 3. runs of one associative operator are flattened into a single list;
//! 4. in `ADD`/`SUB` context, symbol pairs of opposite sign are replaced
//!    by their distance when the [`Layout`] knows it;
//! 5. literals are folded (with float promotion);
//! 6. identities are removed and unary literals evaluated;
//! 7. the list is rebuilt as a left-associated chain, or collapsed to
//!    `IDENT` when a single term is left;
//! 8. the optional post-node hook sees every newly built node once.
//!
//! Leveling never fails. Anything that cannot be proven reducible is left
//! as it was, so the same tree can be offered again on a later pass when
//! more of the layout is fixed. Leveling an already leveled tree with the
//! same options and layout returns it unchanged.

use alloc::boxed::Box;
use alloc::vec::Vec;

use tracing::{trace, warn};

use crate::expr::{Expr, ExprItem, Op};
use crate::layout::Layout;
use crate::num::{FloatNum, IntNum};
use crate::symbol::SymbolId;

// ─── Options ─────────────────────────────────────────────────────────────────

/// Leveling policy.
///
/// ```rust
/// use asm_expr::LevelOptions;
///
/// let structural = LevelOptions::default()
///     .with_fold_const(false)
///     .with_simplify_ident(false);
/// assert!(!structural.fold_const);
/// assert_eq!(structural.max_equ_depth, 64);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LevelOptions {
    /// Fold literal operands together.
    pub fold_const: bool,
    /// Remove identity operands, evaluate unary operators on literals and
    /// cancel double `NEG`/`NOT`.
    pub simplify_ident: bool,
    /// Maximum nesting of EQU expansions. Deeper references stay symbolic.
    pub max_equ_depth: usize,
}

impl Default for LevelOptions {
    fn default() -> Self {
        Self {
            fold_const: true,
            simplify_ident: true,
            max_equ_depth: 64,
        }
    }
}

impl LevelOptions {
    pub fn with_fold_const(mut self, on: bool) -> Self {
        self.fold_const = on;
        self
    }

    pub fn with_simplify_ident(mut self, on: bool) -> Self {
        self.simplify_ident = on;
        self
    }

    pub fn with_max_equ_depth(mut self, depth: usize) -> Self {
        self.max_equ_depth = depth;
        self
    }
}

// ─── Leveler ─────────────────────────────────────────────────────────────────

/// Post-node rewrite hook.
pub type Xform<'a> = dyn FnMut(Expr) -> Expr + 'a;

/// Configured leveling pass.
///
/// ```rust
/// use asm_expr::{Expr, IntNum, LevelOptions, Leveler, Op};
///
/// let e = Expr::binary(Op::Mul, IntNum::from(6), IntNum::from(7), 1).unwrap();
/// let leveled = Leveler::new(LevelOptions::default()).level(e);
/// assert_eq!(leveled.first().as_int(), Some(&IntNum::from(42)));
/// ```
pub struct Leveler<'a> {
    options: LevelOptions,
    layout: Option<&'a dyn Layout>,
    xform: Option<&'a mut Xform<'a>>,
    /// EQU symbols whose values are currently being expanded.
    expanding: Vec<SymbolId>,
    /// Start of a circular EQU chain met during the current expansion.
    cycle: Option<SymbolId>,
}

impl<'a> Leveler<'a> {
    pub fn new(options: LevelOptions) -> Self {
        Self {
            options,
            layout: None,
            xform: None,
            expanding: Vec::new(),
            cycle: None,
        }
    }

    /// Supplies symbol distances, label offsets and EQU values.
    pub fn layout(mut self, layout: &'a dyn Layout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Installs a hook called with every leveled node. Whatever it returns
    /// takes the node's place.
    pub fn xform(mut self, xform: &'a mut Xform<'a>) -> Self {
        self.xform = Some(xform);
        self
    }

    pub fn options(&self) -> LevelOptions {
        self.options
    }

    /// Levels `expr`. The result is a full node: a lone term comes back
    /// wrapped in `IDENT`.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn level(&mut self, expr: Expr) -> Expr {
        self.expanding.clear();
        self.cycle = None;
        self.level_expr(expr)
    }

    fn level_expr(&mut self, expr: Expr) -> Expr {
        let (op, first, second, line) = expr.into_parts();
        let first = self.level_item(first);
        let second = second.map(|item| self.level_item(item));

        let leveled = match (op, second) {
            (Op::Ident, _) => collapse(first, line),
            (op, None) => self.level_unary(op, first, line),
            (op @ (Op::Add | Op::Sub), Some(second)) if self.has_distance(op, &first, &second) => {
                self.fold_distances(op, first, second, line)
            }
            (op, Some(second)) if op.is_associative() => {
                let mut terms = Vec::with_capacity(2);
                flatten_into(op, first, &mut terms);
                flatten_into(op, second, &mut terms);
                self.finish(op, terms, line)
            }
            (op, Some(second)) => self.level_binary(op, first, second, line),
        };
        self.hook(leveled)
    }

    /// Runs the post-node hook on a newly built node. A reused operand has
    /// already been through it.
    fn hook(&mut self, node: Node) -> Expr {
        match node {
            Node::Built(expr) => match self.xform.as_deref_mut() {
                Some(xform) => xform(expr),
                None => expr,
            },
            Node::Reused(expr) => expr,
        }
    }

    fn level_item(&mut self, item: ExprItem) -> ExprItem {
        match item {
            ExprItem::Expr(sub) => unwrap_ident(self.level_expr(*sub)),
            ExprItem::Sym(sym) => self.expand_equ(sym),
            other => other,
        }
    }

    fn expand_equ(&mut self, sym: SymbolId) -> ExprItem {
        let Some(layout) = self.layout else {
            return ExprItem::Sym(sym);
        };
        let Some(value) = layout.equ(sym) else {
            return ExprItem::Sym(sym);
        };
        if self.expanding.contains(&sym) {
            warn!(symbol = sym.raw(), "circular EQU reference left unexpanded");
            self.cycle.get_or_insert(sym);
            return ExprItem::Sym(sym);
        }
        if self.expanding.len() >= self.options.max_equ_depth {
            warn!(
                symbol = sym.raw(),
                depth = self.expanding.len(),
                "EQU nesting too deep, reference left unexpanded"
            );
            return ExprItem::Sym(sym);
        }
        self.expanding.push(sym);
        let item = unwrap_ident(self.level_expr(value.clone()));
        self.expanding.pop();
        if self.cycle == Some(sym) {
            self.cycle = None;
            return ExprItem::Sym(sym);
        }
        item
    }

    fn level_unary(&mut self, op: Op, operand: ExprItem, line: u32) -> Node {
        if !self.options.simplify_ident {
            return Node::Built(Expr::from_parts(op, operand, None, line));
        }
        if let Some(value) = calc_items(op, &operand, None) {
            return collapse(value, line);
        }
        match operand {
            ExprItem::Expr(inner) if inner.op() == op && matches!(op, Op::Neg | Op::Not) => {
                let (_, x, _, _) = (*inner).into_parts();
                collapse(x, line)
            }
            other => Node::Built(Expr::from_parts(op, other, None, line)),
        }
    }

    fn level_binary(&mut self, op: Op, left: ExprItem, right: ExprItem, line: u32) -> Node {
        if self.options.fold_const {
            if let Some(value) = calc_items(op, &left, Some(&right)) {
                return collapse(value, line);
            }
        }

        if self.options.simplify_ident {
            if let ExprItem::Int(n) = &right {
                let neutral = match op {
                    Op::Sub | Op::Shl | Op::Shr => n.is_zero(),
                    Op::Div | Op::SignDiv => n.is_pos1(),
                    _ => false,
                };
                if neutral {
                    return collapse(left, line);
                }
            }
        }

        Node::Built(Expr::from_parts(op, left, Some(right), line))
    }

    /// True if `left op right`, opened up into signed addends, holds a
    /// positive and a negative symbol whose distance is known.
    fn has_distance(&self, op: Op, left: &ExprItem, right: &ExprItem) -> bool {
        let Some(layout) = self.layout else {
            return false;
        };
        let mut terms = Vec::new();
        signed_terms(left, false, &mut terms);
        signed_terms(right, op == Op::Sub, &mut terms);
        let syms = |negated: bool| {
            terms
                .iter()
                .filter(move |(n, _)| *n == negated)
                .filter_map(|(_, t)| t.as_sym())
        };
        syms(false).any(|plus| syms(true).any(|minus| distance(layout, plus, minus).is_some()))
    }

    /// Rewrites `left op right` as one `ADD` list of signed addends, with
    /// subtrahends negated, and folds the symbol pairs in it.
    fn fold_distances(&mut self, op: Op, left: ExprItem, right: ExprItem, line: u32) -> Node {
        let mut signed = Vec::new();
        into_signed_terms(left, false, &mut signed);
        into_signed_terms(right, op == Op::Sub, &mut signed);
        let mut terms = Vec::with_capacity(signed.len());
        for (negated, term) in signed {
            let term = if negated { self.negate(term, line) } else { term };
            terms.push(term);
        }
        self.fold_negated_pairs(&mut terms);
        self.finish(Op::Add, terms, line)
    }

    fn negate(&mut self, term: ExprItem, line: u32) -> ExprItem {
        if self.options.simplify_ident {
            if let Some(value) = calc_items(Op::Neg, &term, None) {
                return value;
            }
        }
        let neg = Expr::from_parts(Op::Neg, term, None, line);
        unwrap_ident(self.hook(Node::Built(neg)))
    }

    /// Replaces `sym + ... + -other` pairs in an addend list by their
    /// distance.
    fn fold_negated_pairs(&self, terms: &mut Vec<ExprItem>) {
        let Some(layout) = self.layout else {
            return;
        };
        let mut i = 0;
        while i < terms.len() {
            if let Some(plus) = terms[i].as_sym() {
                let hit = terms.iter().enumerate().find_map(|(j, t)| {
                    let minus = negated_symbol(t)?;
                    distance(layout, plus, minus).map(|d| (j, d))
                });
                if let Some((j, d)) = hit {
                    terms[i] = ExprItem::Int(d);
                    terms.remove(j);
                    if j < i {
                        i -= 1;
                    }
                }
            }
            i += 1;
        }
    }

    fn finish(&self, op: Op, mut terms: Vec<ExprItem>, line: u32) -> Node {
        if self.options.fold_const {
            fold_literals(op, &mut terms);
        }
        if self.options.simplify_ident {
            drop_identities(op, &mut terms);
        }
        rebuild(op, terms, line)
    }
}

// ─── Expr entry points ───────────────────────────────────────────────────────

impl Expr {
    /// Levels the tree with explicit options, layout and hook.
    pub fn level_tree<'a>(
        self,
        options: LevelOptions,
        layout: Option<&'a dyn Layout>,
        xform: Option<&'a mut Xform<'a>>,
    ) -> Expr {
        let mut leveler = Leveler::new(options);
        leveler.layout = layout;
        leveler.xform = xform;
        leveler.level(self)
    }

    /// Levels with folding and identity removal enabled.
    ///
    /// ```rust
    /// use asm_expr::{Expr, IntNum, Op};
    ///
    /// let inner = Expr::binary(Op::Add, IntNum::from(2), IntNum::from(3), 1).unwrap();
    /// let e = Expr::binary(Op::Add, IntNum::from(1), inner, 1).unwrap();
    /// assert_eq!(e.simplify(None).first().as_int(), Some(&IntNum::from(6)));
    /// ```
    pub fn simplify(self, layout: Option<&dyn Layout>) -> Expr {
        self.level_tree(LevelOptions::default(), layout, None)
    }

    /// [`simplify`](Expr::simplify) through a mutable handle.
    pub fn simplify_in_place(&mut self, layout: Option<&dyn Layout>) {
        let expr = self.take();
        *self = expr.simplify(layout);
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Result of leveling one node.
enum Node {
    /// Built at this level.
    Built(Expr),
    /// An operand subexpression that was leveled on its own.
    Reused(Expr),
}

/// A lone term as a full node.
fn collapse(term: ExprItem, line: u32) -> Node {
    match term {
        ExprItem::Expr(inner) => Node::Reused(*inner),
        other => Node::Built(Expr::from_parts(Op::Ident, other, None, line)),
    }
}

/// A node as an operand: `IDENT x` becomes `x`.
fn unwrap_ident(expr: Expr) -> ExprItem {
    if expr.op() == Op::Ident {
        let (_, first, _, _) = expr.into_parts();
        first
    } else {
        ExprItem::expr(expr)
    }
}

fn flatten_into(op: Op, term: ExprItem, out: &mut Vec<ExprItem>) {
    match term {
        ExprItem::Expr(sub) if sub.op() == op => {
            let (_, first, second, _) = (*sub).into_parts();
            flatten_into(op, first, out);
            if let Some(second) = second {
                flatten_into(op, second, out);
            }
        }
        other => out.push(other),
    }
}

fn rebuild(op: Op, terms: Vec<ExprItem>, line: u32) -> Node {
    debug_assert!(!terms.is_empty());
    let mut terms = terms.into_iter();
    let Some(first) = terms.next() else {
        return Node::Built(Expr::ident(IntNum::zero(), line));
    };
    let Some(second) = terms.next() else {
        return collapse(first, line);
    };
    let mut chain = Expr::from_parts(op, first, Some(second), line);
    for term in terms {
        chain = Expr::from_parts(op, ExprItem::Expr(Box::new(chain)), Some(term), line);
    }
    Node::Built(chain)
}

fn distance(layout: &dyn Layout, plus: SymbolId, minus: SymbolId) -> Option<IntNum> {
    let d = layout.distance(plus, minus);
    if d.is_none() {
        trace!(
            minuend = plus.raw(),
            subtrahend = minus.raw(),
            "symbol distance not yet known"
        );
    }
    d
}

/// Additive terms of `item` with their sign: `ADD` and `SUB` are opened
/// up and `NEG` flips the sign.
fn signed_terms<'t>(item: &'t ExprItem, negated: bool, out: &mut Vec<(bool, &'t ExprItem)>) {
    if let ExprItem::Expr(e) = item {
        match (e.op(), e.second()) {
            (Op::Neg, None) => return signed_terms(e.first(), !negated, out),
            (Op::Add, Some(right)) => {
                signed_terms(e.first(), negated, out);
                return signed_terms(right, negated, out);
            }
            (Op::Sub, Some(right)) => {
                signed_terms(e.first(), negated, out);
                return signed_terms(right, !negated, out);
            }
            _ => {}
        }
    }
    out.push((negated, item));
}

/// Owning counterpart of [`signed_terms`].
fn into_signed_terms(item: ExprItem, negated: bool, out: &mut Vec<(bool, ExprItem)>) {
    let e = match item {
        ExprItem::Expr(e) if matches!(e.op(), Op::Add | Op::Sub | Op::Neg) => *e,
        other => return out.push((negated, other)),
    };
    match e.into_parts() {
        (Op::Neg, first, None, _) => into_signed_terms(first, !negated, out),
        (Op::Add, first, Some(right), _) => {
            into_signed_terms(first, negated, out);
            into_signed_terms(right, negated, out);
        }
        (Op::Sub, first, Some(right), _) => {
            into_signed_terms(first, negated, out);
            into_signed_terms(right, !negated, out);
        }
        (op, first, second, line) => {
            out.push((negated, ExprItem::expr(Expr::from_parts(op, first, second, line))));
        }
    }
}

fn negated_symbol(item: &ExprItem) -> Option<SymbolId> {
    match item {
        ExprItem::Expr(e) if e.op() == Op::Neg => e.first().as_sym(),
        _ => None,
    }
}

fn to_float(item: &ExprItem) -> Option<FloatNum> {
    match item {
        ExprItem::Int(n) => Some(FloatNum::from(n.clone())),
        ExprItem::Float(f) => Some(f.clone()),
        _ => None,
    }
}

/// Evaluates `op` on literal operands. `None` if either operand is not a
/// literal or the operation is undefined for the values.
fn calc_items(op: Op, lhs: &ExprItem, rhs: Option<&ExprItem>) -> Option<ExprItem> {
    match (lhs, rhs) {
        (ExprItem::Int(a), None) => a.calc(op, None).map(ExprItem::Int),
        (ExprItem::Float(a), None) => a.calc(op, None).map(ExprItem::Float),
        (ExprItem::Int(a), Some(ExprItem::Int(b))) => a.calc(op, Some(b)).map(ExprItem::Int),
        (
            ExprItem::Int(_) | ExprItem::Float(_),
            Some(rhs @ (ExprItem::Int(_) | ExprItem::Float(_))),
        ) => {
            let a = to_float(lhs)?;
            let b = to_float(rhs)?;
            a.calc(op, Some(&b)).map(ExprItem::Float)
        }
        _ => None,
    }
}

/// Folds every literal of an associative list into the slot of the first
/// one. Floats join only under float-capable operators, and then promote
/// the whole literal contribution.
fn fold_literals(op: Op, terms: &mut Vec<ExprItem>) {
    let promote = op.is_float_capable() && terms.iter().any(|t| matches!(t, ExprItem::Float(_)));
    let foldable = |t: &ExprItem| match t {
        ExprItem::Int(_) => true,
        ExprItem::Float(_) => promote,
        _ => false,
    };

    let mut kept: Vec<ExprItem> = Vec::with_capacity(terms.len());
    let mut slot: Option<usize> = None;
    for term in core::mem::take(terms) {
        if foldable(&term) {
            match slot {
                Some(i) => {
                    if let Some(value) = calc_items(op, &kept[i], Some(&term)) {
                        kept[i] = value;
                        continue;
                    }
                }
                None => slot = Some(kept.len()),
            }
        }
        kept.push(term);
    }
    *terms = kept;
}

fn is_absorbing(op: Op, item: &ExprItem) -> bool {
    matches!((op, item), (Op::Mul | Op::And, ExprItem::Int(n)) if n.is_zero())
}

fn is_neutral(op: Op, item: &ExprItem) -> bool {
    match (op, item) {
        (Op::Add | Op::Or | Op::Xor, ExprItem::Int(n)) => n.is_zero(),
        (Op::Mul, ExprItem::Int(n)) => n.is_pos1(),
        _ => false,
    }
}

fn drop_identities(op: Op, terms: &mut Vec<ExprItem>) {
    if terms.len() < 2 {
        return;
    }
    if let Some(zero) = terms.iter().position(|t| is_absorbing(op, t)) {
        let zero = terms.swap_remove(zero);
        terms.clear();
        terms.push(zero);
        return;
    }
    let mut i = 0;
    while terms.len() > 1 && i < terms.len() {
        if is_neutral(op, &terms[i]) {
            terms.remove(i);
        } else {
            i += 1;
        }
    }
}
