//! Symbolic heap of owned struct cells.
//!
//! Each live cell is an ownership token: the context that holds it may read,
//! write and dispose it. Pointer expressions are resolved to cells through
//! the prover, so `p` and `q` name the same cell once `p == q` is known.
//!
//! Every cell insertion records the separation facts `root != NULL` and
//! `root != other_root` for every other live cell.

use std::collections::BTreeMap;
use std::fmt;

use sepcheck_logic::Term;
use sepcheck_solver::Prover;

use crate::error::CheckError;
use crate::ir::{FreshNames, StructDef};

/// Identifier of a heap location. Address 0 is `NULL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(u64);

impl Address {
    pub const NULL: Address = Address(0);

    pub fn new(raw: u64) -> Self {
        Address(raw)
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// The address as a pointer term.
    pub fn to_term(self) -> Term {
        if self.is_null() {
            Term::Null
        } else {
            Term::Loc(self.0)
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "NULL")
        } else {
            write!(f, "@{}", self.0)
        }
    }
}

/// One owned struct cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapCell {
    /// Pointer expression the cell was created for.
    pub root: Term,
    /// Struct layout name.
    pub layout: String,
    /// Cell content; a constructor named after the layout once written.
    pub value: Term,
}

#[derive(Debug, Clone)]
pub struct Heap {
    cells: BTreeMap<Address, HeapCell>,
    disposed: Vec<(Address, Term)>,
    next: u64,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap {
    pub fn new() -> Self {
        Self {
            cells: BTreeMap::new(),
            disposed: Vec::new(),
            next: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, addr: Address) -> bool {
        self.cells.contains_key(&addr)
    }

    pub fn is_disposed(&self, addr: Address) -> bool {
        self.disposed.iter().any(|(a, _)| *a == addr)
    }

    /// Live cells in address order.
    pub fn iter(&self) -> impl Iterator<Item = (Address, &HeapCell)> {
        self.cells.iter().map(|(addr, cell)| (*addr, cell))
    }

    /// Allocate a fresh cell whose fields are unconstrained variables.
    pub fn allocate(
        &mut self,
        layout: &StructDef,
        fresh: &mut FreshNames,
        prover: &mut Prover,
    ) -> Address {
        let addr = self.fresh_address();
        let value = Term::Ctor {
            name: layout.name.clone(),
            fields: layout
                .fields
                .iter()
                .map(|f| (f.clone(), fresh.fresh_var(f)))
                .collect(),
        };
        let root = addr.to_term();
        self.separate(&root, prover);
        tracing::debug!(addr = %addr, layout = %layout.name, "Allocate");
        self.cells.insert(
            addr,
            HeapCell {
                root,
                layout: layout.name.clone(),
                value,
            },
        );
        addr
    }

    /// Take ownership of an existing cell at a symbolic pointer.
    ///
    /// Used for precondition takes and unfolded predicate roots.
    pub fn adopt(
        &mut self,
        root: Term,
        layout: &str,
        value: Term,
        prover: &mut Prover,
    ) -> Result<Address, CheckError> {
        let root = prover.normalize(&root);
        if !prover.is_inconsistent()
            && self
                .cells
                .values()
                .any(|cell| prover.entails(&Term::eq(root.clone(), cell.root.clone())).is_proved())
        {
            return Err(CheckError::AliasedOwnership { ptr: root });
        }
        let addr = match root {
            Term::Loc(raw) if !self.cells.contains_key(&Address(raw)) => Address(raw),
            _ => self.fresh_address(),
        };
        self.separate(&root, prover);
        tracing::debug!(addr = %addr, root = %root, layout, "Adopt cell");
        self.cells.insert(
            addr,
            HeapCell {
                root,
                layout: layout.to_string(),
                value,
            },
        );
        Ok(addr)
    }

    /// The live cell a pointer expression denotes.
    pub fn find(&self, ptr: &Term, prover: &Prover) -> Option<Address> {
        let normalized = prover.normalize(ptr);
        if let Some((addr, _)) = self
            .cells
            .iter()
            .find(|(_, cell)| cell.root == *ptr || cell.root == normalized)
        {
            return Some(*addr);
        }
        self.cells
            .iter()
            .find(|(_, cell)| {
                prover
                    .entails(&Term::eq(normalized.clone(), cell.root.clone()))
                    .is_proved()
            })
            .map(|(addr, _)| *addr)
    }

    /// Resolve a pointer expression to an owned address.
    pub fn resolve(&self, ptr: &Term, prover: &Prover) -> Result<Address, CheckError> {
        if let Some(addr) = self.find(ptr, prover) {
            return Ok(addr);
        }
        let normalized = prover.normalize(ptr);
        if self.disposed.iter().any(|(_, root)| {
            *root == normalized
                || prover
                    .entails(&Term::eq(normalized.clone(), root.clone()))
                    .is_proved()
        }) {
            return Err(CheckError::UseAfterDispose { ptr: ptr.clone() });
        }
        Err(CheckError::NotOwned { ptr: ptr.clone() })
    }

    pub fn read(&self, addr: Address) -> Result<&HeapCell, CheckError> {
        self.cells.get(&addr).ok_or_else(|| self.missing(addr))
    }

    pub fn write(&mut self, addr: Address, value: Term) -> Result<(), CheckError> {
        let err = self.missing(addr);
        let cell = self.cells.get_mut(&addr).ok_or(err)?;
        cell.value = value;
        Ok(())
    }

    /// Release a cell. Later accesses fail with `UseAfterDispose`.
    pub fn dispose(&mut self, addr: Address) -> Result<HeapCell, CheckError> {
        let cell = self.cells.remove(&addr).ok_or_else(|| self.missing(addr))?;
        tracing::debug!(addr = %addr, root = %cell.root, "Dispose");
        self.disposed.push((addr, cell.root.clone()));
        Ok(cell)
    }

    /// Transfer a cell out of the heap (into a predicate, callee or caller).
    pub fn take(&mut self, addr: Address) -> Result<HeapCell, CheckError> {
        self.cells.remove(&addr).ok_or_else(|| self.missing(addr))
    }

    /// `cell.field` for the cell at `addr`.
    pub fn read_field(
        &self,
        addr: Address,
        layout: &StructDef,
        field: &str,
    ) -> Result<Term, CheckError> {
        let cell = self.read(addr)?;
        check_field(layout, field)?;
        Ok(field_of(&cell.value, field))
    }

    /// Replace one field of the cell at `addr`.
    pub fn write_field(
        &mut self,
        addr: Address,
        layout: &StructDef,
        field: &str,
        new: Term,
    ) -> Result<(), CheckError> {
        check_field(layout, field)?;
        let value = with_field(&self.read(addr)?.value, layout, field, new);
        self.write(addr, value)
    }

    fn fresh_address(&mut self) -> Address {
        let addr = Address(self.next);
        self.next += 1;
        addr
    }

    fn separate(&self, root: &Term, prover: &mut Prover) {
        prover.assume(Term::ne(root.clone(), Term::Null));
        for cell in self.cells.values() {
            prover.assume(Term::ne(root.clone(), cell.root.clone()));
        }
    }

    fn missing(&self, addr: Address) -> CheckError {
        if self.is_disposed(addr) {
            let ptr = self
                .disposed
                .iter()
                .find(|(a, _)| *a == addr)
                .map(|(_, root)| root.clone())
                .unwrap_or_else(|| addr.to_term());
            CheckError::UseAfterDispose { ptr }
        } else {
            CheckError::NotOwned {
                ptr: addr.to_term(),
            }
        }
    }
}

fn check_field(layout: &StructDef, field: &str) -> Result<(), CheckError> {
    if layout.has_field(field) {
        Ok(())
    } else {
        Err(CheckError::UnknownField {
            layout: layout.name.clone(),
            field: field.to_string(),
        })
    }
}

/// Project a field out of a cell value.
pub fn field_of(value: &Term, field: &str) -> Term {
    if let Term::Ctor { fields, .. } = value
        && let Some((_, t)) = fields.iter().find(|(f, _)| f == field)
    {
        return t.clone();
    }
    Term::field(value.clone(), field)
}

/// The cell value with one field replaced.
///
/// A symbolic value is first expanded into a constructor of its projections.
pub fn with_field(value: &Term, layout: &StructDef, field: &str, new: Term) -> Term {
    let fields = layout
        .fields
        .iter()
        .map(|f| {
            let t = if f == field {
                new.clone()
            } else {
                field_of(value, f)
            };
            (f.clone(), t)
        })
        .collect();
    Term::Ctor {
        name: layout.name.clone(),
        fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> StructDef {
        StructDef {
            name: "int_list".to_string(),
            fields: vec!["head".to_string(), "tail".to_string()],
        }
    }

    #[test]
    fn allocations_are_fresh() {
        let mut heap = Heap::new();
        let mut names = FreshNames::new();
        let mut prover = Prover::default();
        let a = heap.allocate(&node(), &mut names, &mut prover);
        let b = heap.allocate(&node(), &mut names, &mut prover);
        assert_ne!(a, b);
        assert!(!a.is_null());
        assert_eq!(heap.len(), 2);
    }

    #[test]
    fn read_write_fields() {
        let mut heap = Heap::new();
        let mut names = FreshNames::new();
        let mut prover = Prover::default();
        let layout = node();
        let a = heap.allocate(&layout, &mut names, &mut prover);
        heap.write_field(a, &layout, "head", Term::int(7)).unwrap();
        assert_eq!(heap.read_field(a, &layout, "head").unwrap(), Term::int(7));
        assert!(matches!(
            heap.read_field(a, &layout, "next"),
            Err(CheckError::UnknownField { .. })
        ));
    }

    #[test]
    fn double_dispose_is_use_after_dispose() {
        let mut heap = Heap::new();
        let mut names = FreshNames::new();
        let mut prover = Prover::default();
        let a = heap.allocate(&node(), &mut names, &mut prover);
        heap.dispose(a).unwrap();
        assert!(matches!(heap.dispose(a), Err(CheckError::UseAfterDispose { .. })));
        assert!(matches!(heap.read(a), Err(CheckError::UseAfterDispose { .. })));
    }

    #[test]
    fn unknown_address_is_not_owned() {
        let heap = Heap::new();
        assert!(matches!(
            heap.read(Address::new(9)),
            Err(CheckError::NotOwned { .. })
        ));
    }

    #[test]
    fn adopt_resolves_through_equalities() {
        let mut heap = Heap::new();
        let mut prover = Prover::default();
        let a = heap
            .adopt(Term::var("p"), "int_list", Term::var("H"), &mut prover)
            .unwrap();
        prover.assume(Term::eq(Term::var("q"), Term::var("p")));
        assert_eq!(heap.resolve(&Term::var("q"), &prover).unwrap(), a);
        assert!(prover.entails(&Term::ne(Term::var("p"), Term::Null)).is_proved());
        assert!(matches!(
            heap.resolve(&Term::var("r"), &prover),
            Err(CheckError::NotOwned { .. })
        ));
    }

    #[test]
    fn adopt_rejects_aliases() {
        let mut heap = Heap::new();
        let mut prover = Prover::default();
        heap.adopt(Term::var("p"), "int_list", Term::var("H"), &mut prover)
            .unwrap();
        prover.assume(Term::eq(Term::var("q"), Term::var("p")));
        assert!(matches!(
            heap.adopt(Term::var("q"), "int_list", Term::var("G"), &mut prover),
            Err(CheckError::AliasedOwnership { .. })
        ));
    }

    #[test]
    fn separate_cells_are_distinct() {
        let mut heap = Heap::new();
        let mut prover = Prover::default();
        heap.adopt(Term::var("p"), "int_list", Term::var("H"), &mut prover)
            .unwrap();
        heap.adopt(Term::var("q"), "int_list", Term::var("G"), &mut prover)
            .unwrap();
        assert!(prover.entails(&Term::ne(Term::var("p"), Term::var("q"))).is_proved());
    }

    #[test]
    fn resolve_disposed_pointer() {
        let mut heap = Heap::new();
        let mut prover = Prover::default();
        let a = heap
            .adopt(Term::var("p"), "int_list", Term::var("H"), &mut prover)
            .unwrap();
        heap.dispose(a).unwrap();
        assert!(matches!(
            heap.resolve(&Term::var("p"), &prover),
            Err(CheckError::UseAfterDispose { .. })
        ));
    }

    #[test]
    fn symbolic_write_expands_value() {
        let layout = node();
        let value = with_field(&Term::var("H"), &layout, "tail", Term::Null);
        assert_eq!(
            value,
            Term::ctor(
                "int_list",
                vec![
                    ("head", Term::field(Term::var("H"), "head")),
                    ("tail", Term::Null)
                ]
            )
        );
    }
}
