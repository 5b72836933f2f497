//! The meta-schema: tables of facts that describe tables and rules.
//!
//! The rule compiler reads these tables; the rule-language parser (and any
//! other front end) writes them.

use aurora_foundation::Value;
use aurora_storage::Memory;

/// `table-ix-field[table ix field]`: the `ix`-th field of a table.
pub const TABLE_IX_FIELD: &str = "table-ix-field";
/// `table-lifetime[table lifetime]`.
pub const TABLE_LIFETIME: &str = "table-lifetime";
/// `rule-ix-clause[rule ix clause]`: the `ix`-th clause of a rule.
pub const RULE_IX_CLAUSE: &str = "rule-ix-clause";
/// `clause-table[clause table]`: the table (or primitive) a clause refers to.
pub const CLAUSE_TABLE: &str = "clause-table";
/// `clause-action[clause action]`.
pub const CLAUSE_ACTION: &str = "clause-action";
/// `clause-field-variable[clause field variable]`.
pub const CLAUSE_FIELD_VARIABLE: &str = "clause-field-variable";
/// `clause-field-constant[clause field constant]`.
pub const CLAUSE_FIELD_CONSTANT: &str = "clause-field-constant";
/// `stage-ix-rule[stage ix rule]`: the `ix`-th rule of an evaluation stage.
pub const STAGE_IX_RULE: &str = "stage-ix-rule";
/// `rule-ix-variable[rule ix variable]`: the `ix`-th variable of a rule.
pub const RULE_IX_VARIABLE: &str = "rule-ix-variable";

/// Every meta table with its fields.
pub const META_TABLES: [(&str, &[&str]); 9] = [
    (TABLE_IX_FIELD, &["table", "ix", "field"]),
    (TABLE_LIFETIME, &["table", "lifetime"]),
    (RULE_IX_CLAUSE, &["rule", "ix", "clause"]),
    (CLAUSE_TABLE, &["clause", "table"]),
    (CLAUSE_ACTION, &["clause", "action"]),
    (CLAUSE_FIELD_VARIABLE, &["clause", "field", "variable"]),
    (CLAUSE_FIELD_CONSTANT, &["clause", "field", "constant"]),
    (STAGE_IX_RULE, &["stage", "ix", "rule"]),
    (RULE_IX_VARIABLE, &["rule", "ix", "variable"]),
];

/// The stage compiled by default.
pub const FINAL_STAGE: &str = "final";

/// Clause actions.
pub mod action {
    /// A built-in constraint; the clause table names the primitive.
    pub const PRIMITIVE: &str = "primitive";
    /// Join against a table.
    pub const WHEN: &str = "when";
    /// Write solutions into a table.
    pub const KNOW: &str = "know";
    /// Ask a persistent table to start knowing solutions.
    pub const REMEMBER: &str = "remember";
    /// Ask a persistent table to stop knowing solutions.
    pub const FORGET: &str = "forget";
}

/// Primitive names and the fields they bind.
pub mod primitive {
    /// `variable = constant`
    pub const CONSTANT: &str = "=constant";
    /// `left = right`
    pub const VARIABLE: &str = "=variable";
    /// `variable = expression(...)`
    pub const FUNCTION: &str = "=function";
    /// `expression(...)` must be true
    pub const FILTER: &str = "filter";
    /// `lo <= in <= hi`, with `in` an integer
    pub const INTERVAL: &str = "interval";
}

/// Table lifetimes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifetime {
    /// Rewritten from its delta table on every tick.
    Transient,
    /// Reconciled from remember/forget intents on every tick.
    Persistent,
}

impl Lifetime {
    /// Parses a lifetime name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "transient" => Some(Self::Transient),
            "persistent" => Some(Self::Persistent),
            _ => None,
        }
    }

    /// Returns the lifetime name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::Persistent => "persistent",
        }
    }
}

/// Name of the delta table feeding a transient table.
#[must_use]
pub fn delta_table(table: &str) -> String {
    format!("delta-{table}")
}

/// Name of the remember table feeding a persistent table.
#[must_use]
pub fn remember_table(table: &str) -> String {
    format!("remember-{table}")
}

/// Name of the forget table feeding a persistent table.
#[must_use]
pub fn forget_table(table: &str) -> String {
    format!("forget-{table}")
}

/// Creates every meta table in `memory`. Existing tables are left alone.
pub fn install(memory: &mut Memory) {
    for (name, fields) in META_TABLES {
        memory.get_table(name, fields);
    }
}

/// Converts a meta-table index column to a position.
#[must_use]
pub fn ix(value: &Value) -> Option<usize> {
    value.as_int().and_then(|n| usize::try_from(n).ok())
}
