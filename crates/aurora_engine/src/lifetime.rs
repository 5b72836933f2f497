//! Per-tick bookkeeping for transient and persistent tables.

use aurora_foundation::{Error, ErrorKind, Result, Row};
use aurora_language::meta::{delta_table, forget_table, remember_table};
use aurora_storage::{Memory, SinkId, SourceId};
use tracing::trace;

/// Copies a transient table's delta into the table, then empties the delta.
#[derive(Clone, Debug)]
pub struct Transient {
    table: String,
    know: SinkId,
    delta_source: SourceId,
    delta_sink: SinkId,
}

impl Transient {
    /// Wires up `table` and its `delta-` companion, creating the companion
    /// with the table's fields if needed.
    ///
    /// # Errors
    /// Returns `UnknownTable` if `table` does not exist.
    pub fn new(memory: &mut Memory, table: &str) -> Result<Self> {
        let fields = table_fields(memory, table)?;
        let delta = delta_table(table);
        let named: Vec<Option<&str>> = fields.iter().map(|f| Some(f.as_str())).collect();
        Ok(Self {
            table: table.to_string(),
            know: memory.get_sink(table, &named)?,
            delta_source: memory.get_source(&delta, &fields)?,
            delta_sink: memory.get_sink(&delta, &named)?,
        })
    }

    /// Returns the table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Moves the pending delta into the table.
    ///
    /// # Errors
    /// Propagates sink write errors.
    pub fn run(&self, memory: &mut Memory) -> Result<()> {
        let elems = memory.source_index(self.delta_source).elems();
        trace!(table = %self.table, changes = elems.len(), "transient tick");
        memory.update(self.know, &elems)?;
        memory.clear_sink_table(self.delta_sink);
        Ok(())
    }
}

/// Reconciles a persistent table with its remember/forget intents.
#[derive(Clone, Debug)]
pub struct Persistent {
    table: String,
    know_sink: SinkId,
    know: SourceId,
    remember: SourceId,
    forget: SourceId,
    remember_sink: SinkId,
    forget_sink: SinkId,
}

impl Persistent {
    /// Wires up `table` and its `remember-`/`forget-` companions, creating
    /// the companions with the table's fields if needed.
    ///
    /// # Errors
    /// Returns `UnknownTable` if `table` does not exist.
    pub fn new(memory: &mut Memory, table: &str) -> Result<Self> {
        let fields = table_fields(memory, table)?;
        let remember = remember_table(table);
        let forget = forget_table(table);
        let named: Vec<Option<&str>> = fields.iter().map(|f| Some(f.as_str())).collect();
        Ok(Self {
            table: table.to_string(),
            know_sink: memory.get_sink(table, &named)?,
            know: memory.get_source(table, &fields)?,
            remember: memory.get_source(&remember, &fields)?,
            forget: memory.get_source(&forget, &fields)?,
            remember_sink: memory.get_sink(&remember, &named)?,
            forget_sink: memory.get_sink(&forget, &named)?,
        })
    }

    /// Returns the table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Computes the net change without applying it.
    ///
    /// Rows remembered but neither known nor forgotten are inserted. Rows
    /// forgotten and known but not remembered are removed outright.
    #[must_use]
    pub fn delta(&self, memory: &Memory) -> Vec<(Row, i64)> {
        let know = memory.source_index(self.know);
        let remember = memory.source_index(self.remember);
        let forget = memory.source_index(self.forget);

        let inserts = remember
            .rows()
            .filter(|(row, _)| !know.contains(row) && !forget.contains(row))
            .map(|(row, _)| (row, 1));
        let removes = forget
            .rows()
            .filter(|(row, _)| !remember.contains(row))
            .filter_map(|(row, _)| {
                let known = know.count(&row);
                (known > 0).then_some((row, -known))
            });
        inserts.chain(removes).collect()
    }

    /// Applies the net change, then empties the remember and forget tables.
    ///
    /// # Errors
    /// Propagates sink write errors.
    pub fn run(&self, memory: &mut Memory) -> Result<()> {
        let delta = self.delta(memory);
        trace!(table = %self.table, changes = delta.len(), "persistent tick");
        memory.update(self.know_sink, &delta)?;
        memory.clear_sink_table(self.remember_sink);
        memory.clear_sink_table(self.forget_sink);
        Ok(())
    }
}

fn table_fields(memory: &Memory, table: &str) -> Result<Vec<String>> {
    memory
        .table(table)
        .map(|t| t.fields().to_vec())
        .ok_or_else(|| Error::new(ErrorKind::UnknownTable(table.to_string())))
}
