//! Rule compiler: turns meta-schema facts into [`Logic`].
//!
//! Compilation reads the meta tables (see [`aurora_language::meta`]),
//! creates every declared table with its lifetime companions, and builds one
//! [`Flow`] per rule of the configured stage:
//! - each rule variable becomes a solver column, in `rule-ix-variable` order,
//!   followed by any variable that is only bound by a clause
//! - constants in table clauses become hidden columns pinned by a `Constant`
//! - `when` clauses become `Contains` constraints over sources
//! - `know`/`remember`/`forget` clauses become sinks
//! - primitive clauses become the matching constraint

use std::collections::{BTreeMap, HashMap};

use aurora_foundation::{Error, ErrorKind, Result, Row, Value};
use aurora_language::meta::{
    self, CLAUSE_ACTION, CLAUSE_FIELD_CONSTANT, CLAUSE_FIELD_VARIABLE, CLAUSE_TABLE, Lifetime,
    RULE_IX_CLAUSE, RULE_IX_VARIABLE, STAGE_IX_RULE, TABLE_IX_FIELD, TABLE_LIFETIME, action,
    forget_table, primitive, remember_table,
};
use aurora_language::{CompiledExpr, compile_expression, parse_expression};
use aurora_storage::{Memory, SourceId};
use tracing::debug;

use crate::config::EngineConfig;
use crate::constraint::Constraint;
use crate::flow::Flow;
use crate::lifetime::{Persistent, Transient};
use crate::logic::Logic;
use crate::solver::Solver;

/// Compiles the meta-schema in `memory` into runnable logic.
///
/// Meta tables are installed if missing. Declared tables and the sources and
/// sinks of every flow are created in `memory` as a side effect.
///
/// # Errors
/// Returns `MetaSchema` for malformed facts, `UnknownAction`,
/// `UnknownPrimitive` and `UnknownVariable` for bad clauses, and
/// `FieldMismatch` when a clause names a field its table lacks. Errors
/// raised while compiling a rule carry the rule name.
pub fn compile(memory: &mut Memory, config: &EngineConfig) -> Result<Logic> {
    meta::install(memory);
    let schema = Schema::read(memory, &config.stage)?;

    for (table, fields) in &schema.table_fields {
        let fields: Vec<&str> = fields.values().map(String::as_str).collect();
        memory.get_table(table, &fields);
    }

    let mut transients = Vec::new();
    let mut persistents = Vec::new();
    for (table, lifetime) in &schema.lifetimes {
        match lifetime {
            Lifetime::Transient => transients.push(Transient::new(memory, table)?),
            Lifetime::Persistent => persistents.push(Persistent::new(memory, table)?),
        }
    }

    let mut flows = Vec::with_capacity(schema.stage_rules.len());
    for rule in schema.stage_rules.values() {
        let flow = compile_rule(memory, &schema, rule, config).map_err(|e| e.in_source(rule))?;
        flows.push(flow);
    }

    debug!(
        stage = %config.stage,
        flows = flows.len(),
        transients = transients.len(),
        persistents = persistents.len(),
        "compiled logic"
    );
    Ok(Logic::new(flows, transients, persistents, config.clone()))
}

fn compile_rule(
    memory: &mut Memory,
    schema: &Schema,
    rule: &str,
    config: &EngineConfig,
) -> Result<Flow> {
    let clauses: Vec<&String> = schema
        .rule_clauses
        .get(rule)
        .map(|c| c.values().collect())
        .unwrap_or_default();

    let mut builder = RuleBuilder::default();
    if let Some(variables) = schema.rule_variables.get(rule) {
        for name in variables.values() {
            builder.declare(name);
        }
    }
    for clause in &clauses {
        for (_, variable) in schema.variables_of(clause) {
            builder.declare(variable);
        }
    }

    for clause in &clauses {
        builder.clause(memory, schema, clause)?;
    }
    builder.finish(memory, rule, config)
}

// =============================================================================
// Rule Builder
// =============================================================================

/// A sink requested by a clause: target table and `(column, field)` pairs.
type SinkLayout = (String, Vec<(usize, String)>);

#[derive(Default)]
struct RuleBuilder {
    columns: Vec<Option<String>>,
    by_name: HashMap<String, usize>,
    constraints: Vec<Constraint>,
    sources: Vec<SourceId>,
    sinks: Vec<SinkLayout>,
}

impl RuleBuilder {
    fn declare(&mut self, name: &str) {
        if !self.by_name.contains_key(name) {
            self.by_name.insert(name.to_string(), self.columns.len());
            self.columns.push(Some(name.to_string()));
        }
    }

    fn var(&self, name: &str) -> Result<usize> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| Error::new(ErrorKind::UnknownVariable(name.to_string())))
    }

    fn hidden(&mut self) -> usize {
        self.columns.push(None);
        self.columns.len() - 1
    }

    fn constant(&mut self, value: &Value) -> usize {
        let col = self.hidden();
        self.constraints.push(Constraint::constant(col, value.clone()));
        col
    }

    fn clause(&mut self, memory: &mut Memory, schema: &Schema, clause: &str) -> Result<()> {
        let action = schema
            .clause_action
            .get(clause)
            .ok_or_else(|| Error::meta_schema(format!("clause {clause} has no action")))?;
        let table = schema
            .clause_table
            .get(clause)
            .ok_or_else(|| Error::meta_schema(format!("clause {clause} has no table")))?;
        let variables = schema.variables_of(clause);
        let constants = schema.constants_of(clause);

        match action.as_str() {
            action::PRIMITIVE => self.primitive(table, variables, constants),
            action::WHEN => self.when(memory, table, variables, constants),
            action::KNOW => self.sink(table.clone(), variables, constants),
            action::REMEMBER => self.sink(remember_table(table), variables, constants),
            action::FORGET => self.sink(forget_table(table), variables, constants),
            other => Err(Error::unknown_action(other)),
        }
    }

    fn when(
        &mut self,
        memory: &mut Memory,
        table: &str,
        variables: &[(String, String)],
        constants: &[(String, Value)],
    ) -> Result<()> {
        let mut bindings: Vec<(usize, &str)> = Vec::new();
        for (field, variable) in variables {
            bindings.push((self.var(variable)?, field.as_str()));
        }
        for (field, value) in constants {
            bindings.push((self.constant(value), field.as_str()));
        }
        bindings.sort_by_key(|(col, _)| *col);

        let fields: Vec<&str> = bindings.iter().map(|(_, field)| *field).collect();
        let source = memory.get_source(table, &fields)?;
        self.sources.push(source);
        self.constraints.push(Constraint::contains(
            source,
            bindings.iter().map(|(col, _)| *col).collect(),
        ));
        Ok(())
    }

    fn sink(
        &mut self,
        table: String,
        variables: &[(String, String)],
        constants: &[(String, Value)],
    ) -> Result<()> {
        let mut bindings: Vec<(usize, String)> = Vec::new();
        for (field, variable) in variables {
            let mut col = self.var(variable)?;
            // a sink layout names each column once
            if bindings.iter().any(|(used, _)| *used == col) {
                let copy = self.hidden();
                self.constraints.push(Constraint::equal(vec![col, copy]));
                col = copy;
            }
            bindings.push((col, field.clone()));
        }
        for (field, value) in constants {
            bindings.push((self.constant(value), field.clone()));
        }
        self.sinks.push((table, bindings));
        Ok(())
    }

    fn primitive(
        &mut self,
        name: &str,
        variables: &[(String, String)],
        constants: &[(String, Value)],
    ) -> Result<()> {
        let var = |field: &str| -> Result<usize> {
            let variable = bound(variables, field).ok_or_else(|| {
                Error::meta_schema(format!("primitive {name} needs variable field {field}"))
            })?;
            self.var(variable)
        };
        let constraint = match name {
            primitive::CONSTANT => {
                let value = bound(constants, "constant").ok_or_else(|| {
                    Error::meta_schema(format!("primitive {name} needs constant field constant"))
                })?;
                Constraint::constant(var("variable")?, value.clone())
            }
            primitive::VARIABLE => Constraint::equal(vec![var("left")?, var("right")?]),
            primitive::FUNCTION => {
                let (func, args) = self.expression(constants)?;
                Constraint::function(var("variable")?, func, args)
            }
            primitive::FILTER => {
                let (func, args) = self.expression(constants)?;
                Constraint::filter(func, args)
            }
            primitive::INTERVAL => Constraint::interval(var("lo")?, var("in")?, var("hi")?),
            other => return Err(Error::new(ErrorKind::UnknownPrimitive(other.to_string()))),
        };
        self.constraints.push(constraint);
        Ok(())
    }

    /// Compiles the clause's expression text against the columns it reads,
    /// taken in ascending column order.
    fn expression(&self, constants: &[(String, Value)]) -> Result<(CompiledExpr, Vec<usize>)> {
        let text = bound(constants, "expression")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::meta_schema("expression clause without expression text"))?;
        let expr = parse_expression(text)?;
        let mut args = expr
            .variables()
            .into_iter()
            .map(|name| Ok((self.var(name)?, name.to_string())))
            .collect::<Result<Vec<(usize, String)>>>()?;
        args.sort_by_key(|(col, _)| *col);
        let params: Vec<String> = args.iter().map(|(_, name)| name.clone()).collect();
        let func = compile_expression(&expr, &params)?;
        Ok((func, args.into_iter().map(|(col, _)| col).collect()))
    }

    fn finish(self, memory: &mut Memory, rule: &str, config: &EngineConfig) -> Result<Flow> {
        let width = self.columns.len();
        let mut sinks = Vec::with_capacity(self.sinks.len());
        for (table, bindings) in &self.sinks {
            let mut layout: Vec<Option<&str>> = vec![None; width];
            for (col, field) in bindings {
                layout[*col] = Some(field.as_str());
            }
            sinks.push(memory.get_sink(table, &layout)?);
        }
        debug!(
            rule,
            columns = width,
            constraints = self.constraints.len(),
            sources = self.sources.len(),
            sinks = sinks.len(),
            "compiled rule"
        );
        let solver = Solver::new(width, self.constraints)?.with_max_steps(config.max_search_steps);
        Ok(Flow::new(rule, self.sources, solver, sinks))
    }
}

fn bound<'a, T>(bindings: &'a [(String, T)], field: &str) -> Option<&'a T> {
    bindings
        .iter()
        .find(|(name, _)| name == field)
        .map(|(_, value)| value)
}

// =============================================================================
// Meta-Schema
// =============================================================================

/// The meta tables, indexed for compilation.
#[derive(Default)]
struct Schema {
    table_fields: BTreeMap<String, BTreeMap<usize, String>>,
    lifetimes: BTreeMap<String, Lifetime>,
    stage_rules: BTreeMap<usize, String>,
    rule_variables: HashMap<String, BTreeMap<usize, String>>,
    rule_clauses: HashMap<String, BTreeMap<usize, String>>,
    clause_table: HashMap<String, String>,
    clause_action: HashMap<String, String>,
    clause_variables: HashMap<String, Vec<(String, String)>>,
    clause_constants: HashMap<String, Vec<(String, Value)>>,
}

impl Schema {
    fn read(memory: &Memory, stage: &str) -> Result<Self> {
        let mut schema = Self::default();

        for row in rows(memory, TABLE_IX_FIELD) {
            let table = text(&row, 0, TABLE_IX_FIELD)?;
            let ix = index(&row, 1, TABLE_IX_FIELD)?;
            let field = text(&row, 2, TABLE_IX_FIELD)?;
            schema
                .table_fields
                .entry(table.to_string())
                .or_default()
                .insert(ix, field.to_string());
        }
        for row in rows(memory, TABLE_LIFETIME) {
            let table = text(&row, 0, TABLE_LIFETIME)?;
            let name = text(&row, 1, TABLE_LIFETIME)?;
            let lifetime = Lifetime::from_name(name)
                .ok_or_else(|| Error::meta_schema(format!("unknown lifetime {name} for {table}")))?;
            schema.lifetimes.insert(table.to_string(), lifetime);
        }
        for row in rows(memory, STAGE_IX_RULE) {
            if text(&row, 0, STAGE_IX_RULE)? == stage {
                let ix = index(&row, 1, STAGE_IX_RULE)?;
                let rule = text(&row, 2, STAGE_IX_RULE)?;
                schema.stage_rules.insert(ix, rule.to_string());
            }
        }
        for row in rows(memory, RULE_IX_VARIABLE) {
            let rule = text(&row, 0, RULE_IX_VARIABLE)?;
            let ix = index(&row, 1, RULE_IX_VARIABLE)?;
            let variable = text(&row, 2, RULE_IX_VARIABLE)?;
            schema
                .rule_variables
                .entry(rule.to_string())
                .or_default()
                .insert(ix, variable.to_string());
        }
        for row in rows(memory, RULE_IX_CLAUSE) {
            let rule = text(&row, 0, RULE_IX_CLAUSE)?;
            let ix = index(&row, 1, RULE_IX_CLAUSE)?;
            let clause = text(&row, 2, RULE_IX_CLAUSE)?;
            schema
                .rule_clauses
                .entry(rule.to_string())
                .or_default()
                .insert(ix, clause.to_string());
        }
        for row in rows(memory, CLAUSE_TABLE) {
            let clause = text(&row, 0, CLAUSE_TABLE)?;
            let table = text(&row, 1, CLAUSE_TABLE)?;
            schema
                .clause_table
                .insert(clause.to_string(), table.to_string());
        }
        for row in rows(memory, CLAUSE_ACTION) {
            let clause = text(&row, 0, CLAUSE_ACTION)?;
            let action = text(&row, 1, CLAUSE_ACTION)?;
            schema
                .clause_action
                .insert(clause.to_string(), action.to_string());
        }
        for row in rows(memory, CLAUSE_FIELD_VARIABLE) {
            let clause = text(&row, 0, CLAUSE_FIELD_VARIABLE)?;
            let field = text(&row, 1, CLAUSE_FIELD_VARIABLE)?;
            let variable = text(&row, 2, CLAUSE_FIELD_VARIABLE)?;
            schema
                .clause_variables
                .entry(clause.to_string())
                .or_default()
                .push((field.to_string(), variable.to_string()));
        }
        for row in rows(memory, CLAUSE_FIELD_CONSTANT) {
            let clause = text(&row, 0, CLAUSE_FIELD_CONSTANT)?;
            let field = text(&row, 1, CLAUSE_FIELD_CONSTANT)?;
            let constant = row
                .get(2)
                .cloned()
                .ok_or_else(|| Error::meta_schema(format!("{CLAUSE_FIELD_CONSTANT}: short row")))?;
            schema
                .clause_constants
                .entry(clause.to_string())
                .or_default()
                .push((field.to_string(), constant));
        }

        for bindings in schema.clause_variables.values_mut() {
            bindings.sort();
        }
        for bindings in schema.clause_constants.values_mut() {
            bindings.sort_by(|a, b| a.0.cmp(&b.0));
        }
        Ok(schema)
    }

    fn variables_of(&self, clause: &str) -> &[(String, String)] {
        self.clause_variables.get(clause).map_or(&[][..], Vec::as_slice)
    }

    fn constants_of(&self, clause: &str) -> &[(String, Value)] {
        self.clause_constants.get(clause).map_or(&[][..], Vec::as_slice)
    }
}

fn rows(memory: &Memory, table: &str) -> Vec<Row> {
    memory
        .table(table)
        .map(|t| t.rows().map(|(_, row)| row.clone()).collect())
        .unwrap_or_default()
}

fn text<'a>(row: &'a Row, col: usize, table: &str) -> Result<&'a str> {
    row.get(col)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::meta_schema(format!("{table}: column {col} must be a string")))
}

fn index(row: &Row, col: usize, table: &str) -> Result<usize> {
    row.get(col)
        .and_then(meta::ix)
        .ok_or_else(|| Error::meta_schema(format!("{table}: column {col} must be an index")))
}
