//! Grouped, sorted reductions with minimal output diffs.
//!
//! An [`Aggregate`] walks its input in key order, cuts it into groups by the
//! leading `group_len` columns, and appends one reduced value per aggregate
//! column to every row of the group. The previous output is retained so each
//! run yields only the signed difference from the last one.

use std::fmt;

use aurora_foundation::{Error, ErrorKind, Result, Row, Value};
use aurora_storage::{Memory, SinkId, SortedIndex, SourceId, prefix_ne};
use tracing::debug;

/// Reduces the rows of one group to a single value.
///
/// Receives the aggregated column and the group's rows with their counts.
pub type Reducer = Box<dyn Fn(usize, &[(Row, i64)]) -> Result<Value> + Send + Sync>;

/// Walk order of the input index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Direction {
    /// Smallest key first.
    #[default]
    Ascending,
    /// Largest key first.
    Descending,
}

/// Incremental grouped reduction over one input index.
pub struct Aggregate {
    group_len: usize,
    limit_ix: Option<usize>,
    direction: Direction,
    agg_ixes: Vec<usize>,
    reducers: Vec<Reducer>,
    input: SortedIndex,
    delta: SortedIndex,
    output: SortedIndex,
}

impl fmt::Debug for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aggregate")
            .field("group_len", &self.group_len)
            .field("limit_ix", &self.limit_ix)
            .field("direction", &self.direction)
            .field("agg_ixes", &self.agg_ixes)
            .field("input", &self.input.len())
            .field("output", &self.output.len())
            .finish_non_exhaustive()
    }
}

impl Aggregate {
    /// Creates an aggregate over rows of `width` columns.
    ///
    /// `aggregates` pairs each aggregated input column with its reducer.
    ///
    /// # Errors
    /// Returns `Internal` if a group, limit or aggregate column lies outside
    /// the input row.
    pub fn new(
        width: usize,
        group_len: usize,
        limit_ix: Option<usize>,
        direction: Direction,
        aggregates: Vec<(usize, Reducer)>,
    ) -> Result<Self> {
        let (agg_ixes, reducers): (Vec<usize>, Vec<Reducer>) = aggregates.into_iter().unzip();
        let out_of_range = group_len > width
            || limit_ix.is_some_and(|ix| ix >= width)
            || agg_ixes.iter().any(|&ix| ix >= width);
        if out_of_range {
            return Err(Error::internal(format!(
                "aggregate column outside a {width}-column input"
            )));
        }
        let output_width = width + agg_ixes.len();
        Ok(Self {
            group_len,
            limit_ix,
            direction,
            agg_ixes,
            reducers,
            input: SortedIndex::new(width),
            delta: SortedIndex::new(width),
            output: SortedIndex::new(output_width),
        })
    }

    /// Returns the input row width.
    #[must_use]
    pub const fn input_width(&self) -> usize {
        self.input.key_len()
    }

    /// Returns the output row width: input columns then one per reducer.
    #[must_use]
    pub const fn output_width(&self) -> usize {
        self.output.key_len()
    }

    /// Returns the current input.
    #[must_use]
    pub const fn input(&self) -> &SortedIndex {
        &self.input
    }

    /// Returns the output produced by the last [`Aggregate::elems`].
    #[must_use]
    pub const fn output(&self) -> &SortedIndex {
        &self.output
    }

    /// Queues signed changes to the input, applied by the next reset.
    pub fn update(&mut self, delta: &[(Row, i64)]) {
        for (row, count) in delta {
            self.delta.update(row, *count);
        }
    }

    /// Replaces the input wholesale, discarding queued changes.
    pub fn set_input(&mut self, input: SortedIndex) {
        self.input = input;
        self.delta.clear();
    }

    /// Merges queued changes into the input.
    pub fn reset(&mut self) {
        for (key, count) in self.delta.iter() {
            self.input.update_key(key.to_vec(), count);
        }
        self.delta.clear();
    }

    /// Recomputes the output and returns its signed difference from the
    /// previous output.
    ///
    /// # Errors
    /// Returns reducer errors, or `TypeMismatch` when a limit column does not
    /// hold a non-negative integer.
    pub fn elems(&mut self) -> Result<Vec<(Row, i64)>> {
        let mut fresh = SortedIndex::new(self.output.key_len());
        let mut group: Vec<(Row, i64)> = Vec::new();

        let rows: Box<dyn Iterator<Item = (Row, i64)> + '_> = match self.direction {
            Direction::Ascending => Box::new(self.input.rows()),
            Direction::Descending => Box::new(self.input.rows().rev()),
        };
        for (row, count) in rows {
            if group
                .first()
                .is_some_and(|(first, _)| prefix_ne(first, &row, self.group_len))
            {
                self.finish_group(&mut group, &mut fresh)?;
            }
            group.push((row, count));
        }
        self.finish_group(&mut group, &mut fresh)?;

        let mut diff = SortedIndex::new(fresh.key_len());
        for (key, count) in self.output.iter() {
            diff.update_key(key.to_vec(), -count);
        }
        for (key, count) in fresh.iter() {
            diff.update_key(key.to_vec(), count);
        }
        self.output = fresh;
        Ok(diff.elems())
    }

    fn finish_group(&self, group: &mut Vec<(Row, i64)>, out: &mut SortedIndex) -> Result<()> {
        if group.is_empty() {
            return Ok(());
        }
        if let Some(ix) = self.limit_ix {
            let limit = group_limit(&group[0].0[ix])?;
            group.truncate(limit);
        }
        let values = self
            .agg_ixes
            .iter()
            .zip(&self.reducers)
            .map(|(&ix, reduce)| reduce(ix, group))
            .collect::<Result<Vec<Value>>>()?;
        for (row, count) in group.drain(..) {
            let mut extended = row;
            extended.extend(values.iter().cloned());
            out.update(&extended, count);
        }
        Ok(())
    }
}

fn group_limit(value: &Value) -> Result<usize> {
    value
        .as_int()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| Error::type_mismatch("non-negative integer", value.type_name()))
}

// =============================================================================
// Built-in Reducers
// =============================================================================

/// Total multiplicity of the group.
#[must_use]
pub fn count() -> Reducer {
    Box::new(|_: usize, rows: &[(Row, i64)]| {
        Ok(Value::Int(rows.iter().map(|(_, count)| count).sum()))
    })
}

/// Sum of the column, weighted by multiplicity.
///
/// Integers stay integers until a float is seen.
#[must_use]
pub fn sum() -> Reducer {
    Box::new(|ix: usize, rows: &[(Row, i64)]| {
        let mut total = Value::Int(0);
        for (row, count) in rows {
            total = add(&total, &scale(&row[ix], *count)?)?;
        }
        Ok(total)
    })
}

/// Smallest value of the column.
#[must_use]
pub fn min() -> Reducer {
    Box::new(|ix: usize, rows: &[(Row, i64)]| extreme(ix, rows, std::cmp::Ordering::Less))
}

/// Largest value of the column.
#[must_use]
pub fn max() -> Reducer {
    Box::new(|ix: usize, rows: &[(Row, i64)]| extreme(ix, rows, std::cmp::Ordering::Greater))
}

fn extreme(ix: usize, rows: &[(Row, i64)], keep: std::cmp::Ordering) -> Result<Value> {
    rows.iter()
        .map(|(row, _)| &row[ix])
        .reduce(|best, v| if v.cmp(best) == keep { v } else { best })
        .cloned()
        .ok_or_else(|| Error::internal("reduced an empty group"))
}

#[allow(clippy::cast_precision_loss)]
fn scale(value: &Value, count: i64) -> Result<Value> {
    match value {
        Value::Int(x) => x
            .checked_mul(count)
            .map(Value::Int)
            .ok_or_else(|| Error::new(ErrorKind::Overflow)),
        Value::Float(x) => Ok(Value::Float(x * count as f64)),
        other => Err(Error::type_mismatch("number", other.type_name())),
    }
}

#[allow(clippy::cast_precision_loss)]
fn add(a: &Value, b: &Value) -> Result<Value> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x
            .checked_add(*y)
            .map(Value::Int)
            .ok_or_else(|| Error::new(ErrorKind::Overflow)),
        (Value::Int(x), Value::Float(y)) => Ok(Value::Float(*x as f64 + y)),
        (Value::Float(x), Value::Int(y)) => Ok(Value::Float(x + *y as f64)),
        (Value::Float(x), Value::Float(y)) => Ok(Value::Float(x + y)),
        (_, other) => Err(Error::type_mismatch("number", other.type_name())),
    }
}

// =============================================================================
// Aggregate Flow
// =============================================================================

/// Feeds a source through an aggregate into a sink.
#[derive(Debug)]
pub struct AggregateFlow {
    name: String,
    source: SourceId,
    aggregate: Aggregate,
    sink: SinkId,
}

impl AggregateFlow {
    /// Connects `source` to `sink` through `aggregate`.
    ///
    /// # Errors
    /// Returns `FieldCountMismatch` if the source width differs from the
    /// aggregate input, or the sink width from its output.
    pub fn new(
        memory: &Memory,
        name: impl Into<String>,
        source: SourceId,
        aggregate: Aggregate,
        sink: SinkId,
    ) -> Result<Self> {
        let name = name.into();
        let source_width = memory.source_index(source).key_len();
        if source_width != aggregate.input_width() {
            return Err(Error::field_count(&name, aggregate.input_width(), source_width));
        }
        let sink_width = memory.sink(sink).fields().len();
        if sink_width != aggregate.output_width() {
            return Err(Error::field_count(&name, aggregate.output_width(), sink_width));
        }
        Ok(Self {
            name,
            source,
            aggregate,
            sink,
        })
    }

    /// Returns the flow name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the aggregate.
    #[must_use]
    pub const fn aggregate(&self) -> &Aggregate {
        &self.aggregate
    }

    /// Re-aggregates the source and writes the change to the sink.
    ///
    /// Returns the number of changed output rows.
    ///
    /// # Errors
    /// Propagates aggregate and sink errors, tagged with the flow name.
    pub fn run(&mut self, memory: &mut Memory) -> Result<usize> {
        self.aggregate
            .set_input(memory.source_index(self.source).clone());
        self.aggregate.reset();
        let delta = self.aggregate.elems().map_err(|e| e.in_source(&self.name))?;
        memory
            .update(self.sink, &delta)
            .map_err(|e| e.in_source(&self.name))?;
        debug!(flow = %self.name, changes = delta.len(), "aggregate flow ran");
        Ok(delta.len())
    }
}
