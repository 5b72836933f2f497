//! Tables and their derived sources and sinks.
//!
//! A table owns a canonical index over all of its fields, a mapping from
//! synthetic row ids to stored tuples, and every [`Source`] and [`Sink`]
//! registered against it. Sources are updated synchronously on every
//! mutation; there is no lazy refresh.

use std::collections::{BTreeMap, HashMap};

use aurora_foundation::{Error, Result, Row, Value};
use tracing::trace;

use crate::fieldmap::{make_fieldmap, make_sparse_fieldmap, remap};
use crate::index::SortedIndex;

/// Synthetic identifier of a stored row, stable until the row is deleted.
pub type RowId = u64;

/// A read-only index over a table with its own field order.
#[derive(Clone, Debug)]
pub struct Source {
    fields: Vec<String>,
    fieldmap: Vec<usize>,
    index: SortedIndex,
}

impl Source {
    /// Returns the field order of this source.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Returns, for each source field, the table column it reads.
    #[must_use]
    pub fn fieldmap(&self) -> &[usize] {
        &self.fieldmap
    }

    /// Returns the sorted index.
    #[must_use]
    pub const fn index(&self) -> &SortedIndex {
        &self.index
    }

    fn apply(&mut self, row: &Row, delta: i64) {
        self.index.update(&remap(&self.fieldmap, row), delta);
    }
}

/// A write-only view of a table.
///
/// Incoming tuples are laid out in the sink's field order, which may contain
/// unnamed positions; the fieldmap picks the table's fields out of them.
#[derive(Clone, Debug)]
pub struct Sink {
    fields: Vec<Option<String>>,
    fieldmap: Vec<usize>,
}

impl Sink {
    /// Returns the incoming tuple layout.
    #[must_use]
    pub fn fields(&self) -> &[Option<String>] {
        &self.fields
    }

    /// Returns, for each table column, the incoming position it is read from.
    #[must_use]
    pub fn fieldmap(&self) -> &[usize] {
        &self.fieldmap
    }

    /// Remaps an incoming tuple into table-native order.
    #[must_use]
    pub fn to_table_row(&self, tuple: &[Value]) -> Row {
        remap(&self.fieldmap, tuple)
    }
}

/// A named relation.
#[derive(Clone, Debug)]
pub struct Table {
    name: String,
    fields: Vec<String>,
    canon: SortedIndex,
    rows: BTreeMap<RowId, Row>,
    ids: HashMap<Row, RowId>,
    next_id: RowId,
    sources: Vec<Source>,
    sinks: Vec<Sink>,
}

impl Table {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: impl Into<String>, fields: Vec<String>) -> Self {
        let canon = SortedIndex::new(fields.len());
        Self {
            name: name.into(),
            fields,
            canon,
            rows: BTreeMap::new(),
            ids: HashMap::new(),
            next_id: 0,
            sources: Vec::new(),
            sinks: Vec::new(),
        }
    }

    /// Returns the table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the table-native field order.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Returns the canonical index (all fields, table order).
    #[must_use]
    pub const fn canon(&self) -> &SortedIndex {
        &self.canon
    }

    /// Returns the number of distinct stored rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if no rows are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the row stored under `id`.
    #[must_use]
    pub fn row(&self, id: RowId) -> Option<&Row> {
        self.rows.get(&id)
    }

    /// Returns the id of a stored row.
    #[must_use]
    pub fn id_of(&self, row: &[Value]) -> Option<RowId> {
        self.ids.get(row).copied()
    }

    /// Iterates stored rows in id order.
    pub fn rows(&self) -> impl Iterator<Item = (RowId, &Row)> {
        self.rows.iter().map(|(id, row)| (*id, row))
    }

    /// Returns the multiplicity of a row.
    #[must_use]
    pub fn count(&self, row: &[Value]) -> i64 {
        self.canon.count(row)
    }

    /// Returns the source registered in `slot`.
    #[must_use]
    pub fn source(&self, slot: usize) -> Option<&Source> {
        self.sources.get(slot)
    }

    /// Returns the sink registered in `slot`.
    #[must_use]
    pub fn sink(&self, slot: usize) -> Option<&Sink> {
        self.sinks.get(slot)
    }

    pub(crate) fn sources_slice(&self) -> &[Source] {
        &self.sources
    }

    pub(crate) fn sinks_slice(&self) -> &[Sink] {
        &self.sinks
    }

    /// Returns the number of registered sources.
    #[must_use]
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Finds or builds a source with the given field order.
    ///
    /// A new source is filled by replaying every stored row through its
    /// fieldmap, then kept in sync by every later mutation.
    ///
    /// # Errors
    /// Returns `FieldMismatch` if a requested field is not a table field.
    pub fn ensure_source(&mut self, fields: Vec<String>) -> Result<usize> {
        if let Some(slot) = self.sources.iter().position(|s| s.fields == fields) {
            return Ok(slot);
        }
        let fieldmap = make_fieldmap(&self.fields, &fields)?;
        let mut index = SortedIndex::new(fields.len());
        for (row, count) in self.canon.rows() {
            index.update(&remap(&fieldmap, &row), count);
        }
        trace!(table = %self.name, ?fields, rows = index.len(), "built source");
        self.sources.push(Source {
            fields,
            fieldmap,
            index,
        });
        Ok(self.sources.len() - 1)
    }

    /// Finds or registers a sink with the given incoming layout.
    ///
    /// # Errors
    /// Returns `FieldMismatch` if a table field is missing from `fields`.
    pub fn ensure_sink(&mut self, fields: Vec<Option<String>>) -> Result<usize> {
        if let Some(slot) = self.sinks.iter().position(|s| s.fields == fields) {
            return Ok(slot);
        }
        let fieldmap = make_sparse_fieldmap(&fields, &self.fields)?;
        self.sinks.push(Sink { fields, fieldmap });
        Ok(self.sinks.len() - 1)
    }

    /// Inserts tuples with set semantics.
    ///
    /// A tuple already present is absorbed and keeps its id. Every tuple is
    /// length-checked before any is committed, so a malformed batch leaves
    /// the table untouched. Returns the id of each tuple.
    ///
    /// # Errors
    /// Returns `FieldCountMismatch` if any tuple has the wrong width.
    pub fn add(&mut self, tuples: &[Row]) -> Result<Vec<RowId>> {
        self.check_widths(tuples.iter())?;
        let mut ids = Vec::with_capacity(tuples.len());
        for tuple in tuples {
            if self.canon.insert(tuple) {
                let id = self.assign_id(tuple);
                self.propagate(tuple, 1);
                ids.push(id);
            } else if let Some(id) = self.id_of(tuple) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Deletes rows by id. Ids with no live row are ignored.
    ///
    /// Returns the number of rows removed.
    pub fn del(&mut self, ids: &[RowId]) -> usize {
        let mut removed = 0;
        for id in ids {
            let Some(row) = self.rows.remove(id) else {
                continue;
            };
            self.ids.remove(&row);
            let count = self.canon.remove(&row);
            self.propagate(&row, -count);
            removed += 1;
        }
        removed
    }

    /// Applies signed multiplicity changes.
    ///
    /// A row whose count would fall to zero or below is removed entirely;
    /// removing an absent row does nothing. Widths are checked for the whole
    /// batch before anything is committed.
    ///
    /// # Errors
    /// Returns `FieldCountMismatch` if any tuple has the wrong width.
    pub fn update(&mut self, delta: &[(Row, i64)]) -> Result<()> {
        self.check_widths(delta.iter().map(|(row, _)| row))?;
        for (row, change) in delta {
            let old = self.canon.count(row);
            if old + change <= 0 {
                if old > 0 {
                    self.canon.remove(row);
                    if let Some(id) = self.ids.remove(row) {
                        self.rows.remove(&id);
                    }
                    self.propagate(row, -old);
                }
                continue;
            }
            self.canon.update(row, *change);
            if old == 0 {
                self.assign_id(row);
            }
            self.propagate(row, *change);
        }
        Ok(())
    }

    /// Removes every row, keeping source and sink registrations.
    pub fn clear(&mut self) {
        self.canon.clear();
        self.rows.clear();
        self.ids.clear();
        for source in &mut self.sources {
            source.index.clear();
        }
    }

    fn check_widths<'a>(&self, mut tuples: impl Iterator<Item = &'a Row>) -> Result<()> {
        match tuples.find(|t| t.len() != self.fields.len()) {
            Some(bad) => Err(Error::field_count(&self.name, self.fields.len(), bad.len())),
            None => Ok(()),
        }
    }

    fn assign_id(&mut self, row: &Row) -> RowId {
        let id = self.next_id;
        self.next_id += 1;
        self.rows.insert(id, row.clone());
        self.ids.insert(row.clone(), id);
        id
    }

    fn propagate(&mut self, row: &Row, delta: i64) {
        if delta == 0 {
            return;
        }
        for source in &mut self.sources {
            source.apply(row, delta);
        }
    }
}
