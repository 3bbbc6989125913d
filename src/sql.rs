use sqlparser::ast::{self, Expr, FromTable, ObjectNamePart, SetExpr, Statement, TableFactor, TableObject, Value, ValueWithSpan};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

use crate::catalog;
use crate::model::*;

/// Parsed command from SQL input.
#[derive(Debug, PartialEq)]
pub enum Command {
    InsertReservation {
        day: String,
        start_time: String,
        duration: i64,
    },
    InsertMeeting(MeetingForm),
    SelectSchedule {
        week: Option<Week>,
        day: Option<Day>,
    },
    SelectReservations,
    SelectLoad,
    SelectCalendar,
    ResetSchedule,
}

pub fn parse_sql(sql: &str) -> Result<Command, SqlError> {
    let dialect = PostgreSqlDialect {};
    let stmts = Parser::parse_sql(&dialect, sql).map_err(|e| SqlError::Parse(e.to_string()))?;
    if stmts.is_empty() {
        return Err(SqlError::Empty);
    }

    match &stmts[0] {
        Statement::Insert(insert) => parse_insert(insert),
        Statement::Delete(delete) => parse_delete(delete),
        Statement::Query(query) => parse_select(query),
        other => Err(SqlError::Unsupported(format!("{other}"))),
    }
}

fn parse_insert(insert: &ast::Insert) -> Result<Command, SqlError> {
    let table = insert_table_name(insert)?;
    let values = extract_insert_values(insert)?;

    match table.as_str() {
        "reservations" => {
            if values.len() < 3 {
                return Err(SqlError::WrongArity("reservations", 3, values.len()));
            }
            Ok(Command::InsertReservation {
                day: parse_text(&values[0])?,
                start_time: parse_text(&values[1])?,
                duration: parse_i64(&values[2])?,
            })
        }
        "meetings" => {
            if values.len() < 3 {
                return Err(SqlError::WrongArity("meetings", 3, values.len()));
            }
            let optional = |i: usize| -> Result<Option<String>, SqlError> {
                match values.get(i) {
                    Some(expr) => parse_text_or_null(expr),
                    None => Ok(None),
                }
            };
            let preferred_times = optional(3)?
                .map(|list| split_time_list(&list))
                .unwrap_or_default();
            Ok(Command::InsertMeeting(MeetingForm {
                name: parse_text(&values[0])?,
                kind: parse_text(&values[1])?,
                duration_minutes: parse_i64(&values[2])?,
                preferred_times,
                fixed_day: optional(4)?,
                fixed_time: optional(5)?,
                frequency: optional(6)?.unwrap_or_else(|| "weekly".into()),
            }))
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

/// `'09:30, 10:00'` → `["09:30", "10:00"]`, dropping empty items.
fn split_time_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_delete(delete: &ast::Delete) -> Result<Command, SqlError> {
    let table = delete_table_name(delete)?;
    if delete.selection.is_some() {
        return Err(SqlError::Unsupported(
            "DELETE with WHERE; only whole-schedule reset is supported".into(),
        ));
    }

    match table.as_str() {
        "schedule" => Ok(Command::ResetSchedule),
        _ => Err(SqlError::UnknownTable(table)),
    }
}

fn parse_select(query: &ast::Query) -> Result<Command, SqlError> {
    let select = match query.body.as_ref() {
        SetExpr::Select(s) => s,
        _ => return Err(SqlError::Unsupported("non-SELECT query".into())),
    };

    if select.from.is_empty() {
        return Err(SqlError::Parse("SELECT without FROM".into()));
    }
    let table = table_factor_name(&select.from[0].relation)?;

    match table.as_str() {
        "schedule" => {
            let (mut week, mut day) = (None, None);
            if let Some(selection) = &select.selection {
                extract_schedule_filters(selection, &mut week, &mut day)?;
            }
            Ok(Command::SelectSchedule { week, day })
        }
        "reservations" => Ok(Command::SelectReservations),
        "load" => Ok(Command::SelectLoad),
        "calendar" => Ok(Command::SelectCalendar),
        _ => Err(SqlError::UnknownTable(table)),
    }
}

/// `week` is 1-based on the wire. Only `=` filters joined by AND are accepted.
fn extract_schedule_filters(
    expr: &Expr,
    week: &mut Option<Week>,
    day: &mut Option<Day>,
) -> Result<(), SqlError> {
    match expr {
        Expr::BinaryOp { left, op, right } => match op {
            ast::BinaryOperator::And => {
                extract_schedule_filters(left, week, day)?;
                extract_schedule_filters(right, week, day)?;
            }
            // NULL leaves the column unfiltered so a bound parameter can be optional.
            ast::BinaryOperator::Eq if matches!(extract_value(right), Some(Value::Null)) => {}
            ast::BinaryOperator::Eq => match expr_column_name(left).as_deref() {
                Some("week") => {
                    let n = parse_i64(right)?;
                    if !(1..=WEEKS as i64).contains(&n) {
                        return Err(SqlError::Parse(format!("week {n} out of range 1..={WEEKS}")));
                    }
                    *week = Some(n as Week - 1);
                }
                Some("day") => {
                    let name = parse_text(right)?;
                    *day = Some(
                        catalog::day_from_name(&name)
                            .ok_or_else(|| SqlError::Parse(format!("unknown day: {name}")))?,
                    );
                }
                Some(col) => return Err(SqlError::Unsupported(format!("filter on {col}"))),
                None => return Err(SqlError::Unsupported("filter expression".into())),
            },
            _ => return Err(SqlError::Unsupported(format!("operator {op}"))),
        },
        Expr::Nested(inner) => extract_schedule_filters(inner, week, day)?,
        _ => return Err(SqlError::Unsupported("filter expression".into())),
    }
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────

fn object_name_last(name: &ast::ObjectName) -> Option<String> {
    name.0.last().and_then(|part| match part {
        ObjectNamePart::Identifier(ident) => Some(ident.value.to_lowercase()),
        _ => None,
    })
}

fn insert_table_name(insert: &ast::Insert) -> Result<String, SqlError> {
    match &insert.table {
        TableObject::TableName(name) => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("unsupported table object in INSERT".into())),
    }
}

fn delete_table_name(delete: &ast::Delete) -> Result<String, SqlError> {
    let tables_with_joins = match &delete.from {
        FromTable::WithFromKeyword(t) | FromTable::WithoutKeyword(t) => t,
    };
    if let Some(first) = tables_with_joins.first() {
        table_factor_name(&first.relation)
    } else {
        Err(SqlError::Parse("DELETE without table".into()))
    }
}

fn table_factor_name(tf: &TableFactor) -> Result<String, SqlError> {
    match tf {
        TableFactor::Table { name, .. } => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("complex table expression".into())),
    }
}

fn extract_insert_values(insert: &ast::Insert) -> Result<Vec<Expr>, SqlError> {
    let body = insert
        .source
        .as_ref()
        .ok_or(SqlError::Parse("no VALUES".into()))?;
    match body.body.as_ref() {
        SetExpr::Values(values) => match values.rows.len() {
            0 => Err(SqlError::Parse("empty VALUES".into())),
            1 => Ok(values.rows[0].clone()),
            n => Err(SqlError::Unsupported(format!("{n}-row INSERT; send one row per statement"))),
        },
        _ => Err(SqlError::Parse("expected VALUES".into())),
    }
}

fn expr_column_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.to_lowercase()),
        Expr::CompoundIdentifier(parts) => parts.last().map(|i| i.value.to_lowercase()),
        _ => None,
    }
}

fn extract_value(expr: &Expr) -> Option<&Value> {
    match expr {
        Expr::Value(ValueWithSpan { value, .. }) => Some(value),
        _ => None,
    }
}

fn parse_i64(expr: &Expr) -> Result<i64, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::Number(s, _) => s
                .parse()
                .map_err(|e| SqlError::Parse(format!("bad integer: {e}"))),
            Value::SingleQuotedString(s) => s
                .trim()
                .parse()
                .map_err(|e| SqlError::Parse(format!("bad integer: {e}"))),
            _ => Err(SqlError::Parse(format!("expected number, got {value:?}"))),
        }
    } else if let Expr::UnaryOp {
        op: ast::UnaryOperator::Minus,
        expr,
    } = expr
    {
        Ok(-parse_i64(expr)?)
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr:?}")))
    }
}

fn parse_text(expr: &Expr) -> Result<String, SqlError> {
    match extract_value(expr) {
        Some(Value::SingleQuotedString(s)) => Ok(s.clone()),
        Some(value) => Err(SqlError::Parse(format!("expected string, got {value:?}"))),
        None => Err(SqlError::Parse(format!("expected value, got {expr:?}"))),
    }
}

/// NULL and the empty string both mean "not set".
fn parse_text_or_null(expr: &Expr) -> Result<Option<String>, SqlError> {
    match extract_value(expr) {
        Some(Value::Null) => Ok(None),
        _ => {
            let s = parse_text(expr)?;
            Ok(if s.trim().is_empty() { None } else { Some(s) })
        }
    }
}

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum SqlError {
    Parse(String),
    Empty,
    Unsupported(String),
    UnknownTable(String),
    WrongArity(&'static str, usize, usize),
}

impl std::fmt::Display for SqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlError::Parse(s) => write!(f, "parse error: {s}"),
            SqlError::Empty => write!(f, "empty query"),
            SqlError::Unsupported(s) => write!(f, "unsupported: {s}"),
            SqlError::UnknownTable(t) => write!(f, "unknown table: {t}"),
            SqlError::WrongArity(t, expected, got) => {
                write!(f, "{t}: expected {expected} values, got {got}")
            }
        }
    }
}

impl std::error::Error for SqlError {}
