//! The registry of all tables.
//!
//! Compiled logic refers to sources and sinks through small copyable
//! handles, so a flow can read one table while another is being written
//! without holding borrows into `Memory`.

use std::collections::HashMap;

use aurora_foundation::{Error, ErrorKind, Result, Row};
use tracing::{debug, trace};

use crate::index::SortedIndex;
use crate::table::{RowId, Sink, Source, Table};

/// Index of a table in [`Memory`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(usize);

impl TableId {
    /// Returns the raw index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Handle to a source registered on a table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SourceId {
    table: TableId,
    slot: usize,
}

impl SourceId {
    /// Returns the table this source reads.
    #[must_use]
    pub const fn table(self) -> TableId {
        self.table
    }
}

/// Handle to a sink registered on a table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SinkId {
    table: TableId,
    slot: usize,
}

impl SinkId {
    /// Returns the table this sink writes.
    #[must_use]
    pub const fn table(self) -> TableId {
        self.table
    }
}

/// All tables known to the engine, addressable by name.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    tables: Vec<Table>,
    names: HashMap<String, TableId>,
}

fn owned<S: AsRef<str>>(fields: &[S]) -> Vec<String> {
    fields.iter().map(|f| f.as_ref().to_string()).collect()
}

impl Memory {
    /// Creates an empty memory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the table with `name`, creating it with `fields` if missing.
    ///
    /// An existing table keeps its own field order; `fields` is ignored.
    pub fn get_table<S: AsRef<str>>(&mut self, name: &str, fields: &[S]) -> TableId {
        if let Some(id) = self.names.get(name) {
            return *id;
        }
        let id = TableId(self.tables.len());
        debug!(table = name, fields = fields.len(), "created table");
        self.tables.push(Table::new(name, owned(fields)));
        self.names.insert(name.to_string(), id);
        id
    }

    /// Looks up a table id by name.
    #[must_use]
    pub fn table_id(&self, name: &str) -> Option<TableId> {
        self.names.get(name).copied()
    }

    /// Returns the table with `name`.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.table_id(name).map(|id| &self.tables[id.0])
    }

    /// Returns the table with `id`.
    #[must_use]
    pub fn table_by_id(&self, id: TableId) -> &Table {
        &self.tables[id.0]
    }

    /// Iterates all tables in creation order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter()
    }

    /// Returns a source over `name` with the given field order.
    ///
    /// A missing table is created with exactly `fields`.
    ///
    /// # Errors
    /// Returns `FieldMismatch` if the table lacks one of `fields`.
    pub fn get_source<S: AsRef<str>>(&mut self, name: &str, fields: &[S]) -> Result<SourceId> {
        let table = self.get_table(name, fields);
        let slot = self.tables[table.0]
            .ensure_source(owned(fields))
            .map_err(|e| e.in_source(name))?;
        Ok(SourceId { table, slot })
    }

    /// Returns a sink into `name` accepting tuples laid out as `fields`.
    ///
    /// Unnamed positions in `fields` are ignored when writing. A missing
    /// table is created from the named positions.
    ///
    /// # Errors
    /// Returns `FieldMismatch` if a table field is not supplied.
    pub fn get_sink<S: AsRef<str>>(&mut self, name: &str, fields: &[Option<S>]) -> Result<SinkId> {
        let named: Vec<&str> = fields.iter().flatten().map(|s| s.as_ref()).collect();
        let table = self.get_table(name, &named);
        let layout = fields
            .iter()
            .map(|f| f.as_ref().map(|s| s.as_ref().to_string()))
            .collect();
        let slot = self.tables[table.0]
            .ensure_sink(layout)
            .map_err(|e| e.in_source(name))?;
        Ok(SinkId { table, slot })
    }

    /// Returns the source behind a handle.
    ///
    /// # Panics
    /// Panics if the handle was issued by a different `Memory`.
    #[must_use]
    pub fn source(&self, id: SourceId) -> &Source {
        &self.tables[id.table.0].sources_slice()[id.slot]
    }

    /// Returns the sorted index behind a source handle.
    #[must_use]
    pub fn source_index(&self, id: SourceId) -> &SortedIndex {
        self.source(id).index()
    }

    /// Returns the sink behind a handle.
    #[must_use]
    pub fn sink(&self, id: SinkId) -> &Sink {
        &self.tables[id.table.0].sinks_slice()[id.slot]
    }

    /// Writes signed changes through a sink.
    ///
    /// Every tuple must have the sink's width; the batch is rejected whole
    /// otherwise.
    ///
    /// # Errors
    /// Returns `FieldCountMismatch` on a tuple of the wrong width.
    pub fn update(&mut self, sink: SinkId, delta: &[(Row, i64)]) -> Result<()> {
        let table = &mut self.tables[sink.table.0];
        let layout = &table.sinks_slice()[sink.slot];
        let width = layout.fields().len();
        if let Some((bad, _)) = delta.iter().find(|(row, _)| row.len() != width) {
            return Err(Error::field_count(table.name(), width, bad.len()));
        }
        let remapped: Vec<(Row, i64)> = delta
            .iter()
            .map(|(row, count)| (layout.to_table_row(row), *count))
            .collect();
        trace!(table = table.name(), changes = remapped.len(), "sink update");
        table.update(&remapped)
    }

    /// Inserts tuples in table-native order into the named table.
    ///
    /// # Errors
    /// Returns `UnknownTable` if no such table exists, or
    /// `FieldCountMismatch` on a tuple of the wrong width.
    pub fn add(&mut self, name: &str, tuples: &[Row]) -> Result<Vec<RowId>> {
        self.table_mut(name)?.add(tuples)
    }

    /// Deletes rows by id from the named table.
    ///
    /// # Errors
    /// Returns `UnknownTable` if no such table exists.
    pub fn del(&mut self, name: &str, ids: &[RowId]) -> Result<usize> {
        Ok(self.table_mut(name)?.del(ids))
    }

    /// Empties the named table, keeping its sources and sinks.
    ///
    /// # Errors
    /// Returns `UnknownTable` if no such table exists.
    pub fn clear(&mut self, name: &str) -> Result<()> {
        self.table_mut(name)?.clear();
        Ok(())
    }

    /// Empties the table behind a sink handle.
    pub fn clear_sink_table(&mut self, sink: SinkId) {
        self.tables[sink.table.0].clear();
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        let id = self
            .table_id(name)
            .ok_or_else(|| Error::new(ErrorKind::UnknownTable(name.to_string())))?;
        Ok(&mut self.tables[id.0])
    }
}
