//! Parser for the compact, line-oriented rule language.
//!
//! ```text
//! table persistent edge x y
//! table transient connected x y
//! rule simple-edge xx yy
//! when edge x=xx y=yy
//! know connected x=xx y=yy
//! ```
//!
//! Besides table clauses (`when`, `know`, `remember`, `forget`) a rule may
//! contain `let v = <expr>`, `filter <expr>` and `range <lo> <in> <hi>`.
//! Parsing writes meta-schema facts; it does not compile anything.

use aurora_foundation::{Error, ErrorKind, Result, Row, Value};
use aurora_storage::Memory;
use tracing::debug;

use crate::ast::Expr;
use crate::compiler::compile_source;
use crate::meta::{self, Lifetime, action, primitive};
use crate::parser::parse_expression;

/// Counts of what a program declared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProgramSummary {
    /// Tables declared with `table`.
    pub tables: usize,
    /// Rules declared with `rule`.
    pub rules: usize,
    /// Clauses across all rules.
    pub clauses: usize,
}

/// Parses a program and writes its meta-schema facts into `memory`.
///
/// Meta tables are installed if missing, and every declared table is
/// created with its fields. Nothing is written if any line fails to parse.
///
/// # Errors
/// Returns `ParseError`, carrying the 1-based line number, for an unknown
/// keyword, a clause outside any rule, or a malformed line.
pub fn parse_program(memory: &mut Memory, program: &str) -> Result<ProgramSummary> {
    let mut state = ParseState {
        rule_base: last_rule_ix(memory),
        ..ParseState::default()
    };
    for (i, line) in strip_outer_parens(program).lines().enumerate() {
        state.line(i + 1, line)?;
    }

    meta::install(memory);
    for (name, fields) in &state.declared {
        memory.get_table(name, fields.as_slice());
    }
    for (table, row) in state.facts {
        memory.add(table, &[row])?;
    }
    debug!(
        tables = state.summary.tables,
        rules = state.summary.rules,
        clauses = state.summary.clauses,
        "parsed program"
    );
    Ok(state.summary)
}

/// Highest rule index already stored for the final stage.
fn last_rule_ix(memory: &Memory) -> usize {
    memory
        .table(meta::STAGE_IX_RULE)
        .into_iter()
        .flat_map(|table| table.rows())
        .filter(|(_, row)| row.first().and_then(Value::as_str) == Some(meta::FINAL_STAGE))
        .filter_map(|(_, row)| row.get(1).and_then(meta::ix))
        .max()
        .unwrap_or(0)
}

fn strip_outer_parens(program: &str) -> &str {
    let trimmed = program.trim();
    trimmed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(trimmed)
}

#[derive(Default)]
struct ParseState {
    facts: Vec<(&'static str, Row)>,
    declared: Vec<(String, Vec<String>)>,
    rule: Option<String>,
    rule_base: usize,
    clause_ix: usize,
    summary: ProgramSummary,
}

impl ParseState {
    fn line(&mut self, line_no: usize, text: &str) -> Result<()> {
        let words = split_words(text).map_err(|m| syntax_error(line_no, text, m))?;
        let Some(keyword) = words.first() else {
            return Ok(());
        };
        match keyword.as_str() {
            "table" => self.table(&words).map_err(|m| syntax_error(line_no, text, m)),
            "rule" => self.rule(&words).map_err(|m| syntax_error(line_no, text, m)),
            action::WHEN | action::KNOW | action::REMEMBER | action::FORGET => {
                let clause = self.clause(line_no, text)?;
                self.table_clause(&clause, &words)
                    .map_err(|m| syntax_error(line_no, text, m))
            }
            "let" => {
                let clause = self.clause(line_no, text)?;
                self.let_clause(&clause, line_no, text)
            }
            "filter" => {
                let clause = self.clause(line_no, text)?;
                self.filter_clause(&clause, line_no, text)
            }
            "range" => {
                let clause = self.clause(line_no, text)?;
                self.range_clause(&clause, &words)
                    .map_err(|m| syntax_error(line_no, text, m))
            }
            other => Err(syntax_error(
                line_no,
                text,
                format!("unknown keyword: {other}"),
            )),
        }
    }

    fn fact(&mut self, table: &'static str, row: Row) {
        self.facts.push((table, row));
    }

    fn table(&mut self, words: &[String]) -> std::result::Result<(), String> {
        let (Some(lifetime), Some(name)) = (words.get(1), words.get(2)) else {
            return Err("expected: table <lifetime> <name> <field>...".into());
        };
        if Lifetime::from_name(lifetime).is_none() {
            return Err(format!("unknown lifetime: {lifetime}"));
        }
        let fields = words[3..].to_vec();
        self.fact(
            meta::TABLE_LIFETIME,
            vec![Value::from(name.as_str()), Value::from(lifetime.as_str())],
        );
        for (ix, field) in fields.iter().enumerate() {
            self.fact(
                meta::TABLE_IX_FIELD,
                vec![
                    Value::from(name.as_str()),
                    Value::from(ix),
                    Value::from(field.as_str()),
                ],
            );
        }
        self.declared.push((name.clone(), fields));
        self.summary.tables += 1;
        Ok(())
    }

    fn rule(&mut self, words: &[String]) -> std::result::Result<(), String> {
        let Some(name) = words.get(1) else {
            return Err("expected: rule <name> <variable>...".into());
        };
        self.summary.rules += 1;
        self.fact(
            meta::STAGE_IX_RULE,
            vec![
                Value::from(meta::FINAL_STAGE),
                Value::from(self.rule_base + self.summary.rules),
                Value::from(name.as_str()),
            ],
        );
        for (ix, variable) in words[2..].iter().enumerate() {
            self.fact(
                meta::RULE_IX_VARIABLE,
                vec![
                    Value::from(name.as_str()),
                    Value::from(ix),
                    Value::from(variable.as_str()),
                ],
            );
        }
        self.rule = Some(name.clone());
        self.clause_ix = 0;
        Ok(())
    }

    /// Allocates the next clause id of the current rule.
    fn clause(&mut self, line_no: usize, text: &str) -> Result<String> {
        let Some(rule) = self.rule.clone() else {
            return Err(syntax_error(line_no, text, "clause outside of a rule"));
        };
        self.clause_ix += 1;
        self.summary.clauses += 1;
        let clause = format!("{rule}-{}", self.clause_ix);
        self.fact(
            meta::RULE_IX_CLAUSE,
            vec![
                Value::from(rule.as_str()),
                Value::from(self.clause_ix),
                Value::from(clause.as_str()),
            ],
        );
        Ok(clause)
    }

    fn head(&mut self, clause: &str, action: &str, table: &str) {
        self.fact(
            meta::CLAUSE_ACTION,
            vec![Value::from(clause), Value::from(action)],
        );
        self.fact(
            meta::CLAUSE_TABLE,
            vec![Value::from(clause), Value::from(table)],
        );
    }

    fn bind_variable(&mut self, clause: &str, field: &str, variable: &str) {
        self.fact(
            meta::CLAUSE_FIELD_VARIABLE,
            vec![Value::from(clause), Value::from(field), Value::from(variable)],
        );
    }

    fn bind_constant(&mut self, clause: &str, field: &str, constant: Value) {
        self.fact(
            meta::CLAUSE_FIELD_CONSTANT,
            vec![Value::from(clause), Value::from(field), constant],
        );
    }

    fn table_clause(&mut self, clause: &str, words: &[String]) -> std::result::Result<(), String> {
        let Some(table) = words.get(1) else {
            return Err(format!("expected: {} <table> <field>=<value>...", words[0]));
        };
        self.head(clause, &words[0], table);
        for pair in &words[2..] {
            let Some((field, value)) = pair.split_once('=') else {
                return Err(format!("expected <field>=<value>, found {pair}"));
            };
            if field.is_empty() || value.is_empty() {
                return Err(format!("expected <field>=<value>, found {pair}"));
            }
            match literal(value) {
                Some(constant) => self.bind_constant(clause, field, constant),
                None => self.bind_variable(clause, field, value),
            }
        }
        Ok(())
    }

    fn let_clause(&mut self, clause: &str, line_no: usize, text: &str) -> Result<()> {
        let body = keyword_rest(text, "let");
        let Some((variable, source)) = body.split_once('=') else {
            return Err(syntax_error(line_no, text, "expected: let <variable> = <expression>"));
        };
        let variable = variable.trim();
        let source = source.trim();
        if variable.is_empty() || variable.contains(char::is_whitespace) {
            return Err(syntax_error(line_no, text, "expected: let <variable> = <expression>"));
        }
        let expr = parse_expression(source).map_err(|e| relocate(e, line_no, text))?;

        if let Some(constant) = constant_value(&expr, source) {
            self.head(clause, action::PRIMITIVE, primitive::CONSTANT);
            self.bind_variable(clause, "variable", variable);
            self.bind_constant(clause, "constant", constant);
        } else if let Expr::Var(other, _) = &expr {
            self.head(clause, action::PRIMITIVE, primitive::VARIABLE);
            self.bind_variable(clause, "left", variable);
            self.bind_variable(clause, "right", other);
        } else {
            self.head(clause, action::PRIMITIVE, primitive::FUNCTION);
            self.bind_variable(clause, "variable", variable);
            self.bind_constant(clause, "expression", Value::from(source));
        }
        Ok(())
    }

    fn filter_clause(&mut self, clause: &str, line_no: usize, text: &str) -> Result<()> {
        let source = keyword_rest(text, "filter").trim();
        parse_expression(source).map_err(|e| relocate(e, line_no, text))?;
        self.head(clause, action::PRIMITIVE, primitive::FILTER);
        self.bind_constant(clause, "expression", Value::from(source));
        Ok(())
    }

    fn range_clause(&mut self, clause: &str, words: &[String]) -> std::result::Result<(), String> {
        let [_, lo, mid, hi] = words else {
            return Err("expected: range <lo> <in> <hi>".into());
        };
        self.head(clause, action::PRIMITIVE, primitive::INTERVAL);
        self.bind_variable(clause, "lo", lo);
        self.bind_variable(clause, "in", mid);
        self.bind_variable(clause, "hi", hi);
        Ok(())
    }
}

/// A variable-free expression that evaluates cleanly is a constant.
fn constant_value(expr: &Expr, source: &str) -> Option<Value> {
    if let Expr::Literal(value, _) = expr {
        return Some(value.clone());
    }
    if !expr.variables().is_empty() {
        return None;
    }
    compile_source(source).ok()?.call(&[]).ok()
}

/// Reads a field value written as a literal.
fn literal(text: &str) -> Option<Value> {
    let quoted = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .or_else(|| text.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')));
    if let Some(inner) = quoted {
        return Some(Value::from(inner));
    }
    match text {
        "true" => return Some(Value::Bool(true)),
        "false" => return Some(Value::Bool(false)),
        _ => {}
    }
    if let Ok(n) = text.parse::<i64>() {
        return Some(Value::Int(n));
    }
    if text.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '.') {
        return text.parse::<f64>().ok().map(Value::Float);
    }
    None
}

/// Splits on whitespace, keeping quoted runs together.
fn split_words(line: &str) -> std::result::Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quote = None;
    for c in line.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None if c.is_whitespace() => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            None => {
                if c == '"' || c == '\'' {
                    quote = Some(c);
                }
                current.push(c);
            }
        }
    }
    if quote.is_some() {
        return Err("unterminated string literal".into());
    }
    if !current.is_empty() {
        words.push(current);
    }
    Ok(words)
}

fn keyword_rest<'a>(text: &'a str, keyword: &str) -> &'a str {
    text.trim_start()
        .strip_prefix(keyword)
        .unwrap_or_default()
}

fn line_number(line_no: usize) -> u32 {
    u32::try_from(line_no).unwrap_or(u32::MAX)
}

fn syntax_error(line_no: usize, text: &str, message: impl Into<String>) -> Error {
    Error::new(ErrorKind::ParseError {
        message: message.into(),
        line: line_number(line_no),
        column: 1,
        context: text.to_string(),
    })
}

/// Moves an expression parse error onto the program line it came from.
fn relocate(error: Error, line_no: usize, text: &str) -> Error {
    match error.kind {
        ErrorKind::ParseError { message, .. } => syntax_error(line_no, text, message),
        _ => error,
    }
}
