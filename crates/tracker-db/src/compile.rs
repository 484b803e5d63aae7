//! Lowering of query-layer types into SQL fragments.
//!
//! Column names only ever come from the match arms below; client strings are
//! always bound as parameters.

use rusqlite::Connection;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Value;
use tracker_query::analytics::{Bucket, GroupKey};
use tracker_query::{Condition, Direction, Predicate, SortField, SortSpec, TextField};

use crate::models::format_ts;

/// SQLite's own `lower()` folds ASCII only.
const FOLD_FN: &str = "unicode_lower";

/// Register the SQL functions the compiled clauses rely on. Called once per
/// connection.
pub(crate) fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        FOLD_FN,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|v| v.to_lowercase()))
        },
    )
}

pub(crate) struct SqlFilter {
    pub clause: String,
    pub params: Vec<Value>,
}

pub(crate) fn where_clause(predicate: &Predicate) -> SqlFilter {
    let mut parts = vec!["user_id = ?".to_string()];
    let mut params = vec![Value::Text(predicate.owner().to_string())];

    for condition in predicate.conditions() {
        match condition {
            Condition::Status(status) => {
                parts.push("status = ?".into());
                params.push(Value::Text(status.as_str().into()));
            }
            Condition::Type(kind) => {
                parts.push("application_type = ?".into());
                params.push(Value::Text(kind.as_str().into()));
            }
            Condition::AppliedWithin(range) => {
                parts.push("application_date >= ? AND application_date <= ?".into());
                params.push(Value::Text(format_ts(range.start)));
                params.push(Value::Text(format_ts(range.end)));
            }
            Condition::Contains(field, needle) => {
                parts.push(contains(*field));
                params.push(Value::Text(needle.clone()));
            }
            Condition::AnyContains(fields, needle) => {
                let any: Vec<String> = fields.iter().map(|f| contains(*f)).collect();
                parts.push(format!("({})", any.join(" OR ")));
                params.extend(fields.iter().map(|_| Value::Text(needle.clone())));
            }
        }
    }

    SqlFilter {
        clause: parts.join(" AND "),
        params,
    }
}

fn contains(field: TextField) -> String {
    format!("instr({f}({}), {f}(?)) > 0", text_column(field), f = FOLD_FN)
}

fn text_column(field: TextField) -> &'static str {
    match field {
        TextField::CompanyName => "company_name",
        TextField::Position => "position",
        TextField::Location => "location",
        TextField::Notes => "notes",
    }
}

/// Ties fall back to insertion order so paging is deterministic.
pub(crate) fn order_by(sort: &SortSpec) -> String {
    let column = match sort.field {
        SortField::ApplicationDate => "application_date",
        SortField::CompanyName => "company_name",
        SortField::Position => "position",
        SortField::Status => "status",
        SortField::CreatedAt => "created_at",
        SortField::UpdatedAt => "updated_at",
    };
    let direction = match sort.direction {
        Direction::Ascending => "ASC",
        Direction::Descending => "DESC",
    };
    format!("{} {}, rowid ASC", column, direction)
}

pub(crate) fn group_expr(key: GroupKey) -> &'static str {
    match key {
        GroupKey::Status => "status",
        GroupKey::ApplicationType => "application_type",
        GroupKey::Company => "company_name",
        GroupKey::Period(Bucket::Day) => "substr(application_date, 1, 10)",
        GroupKey::Period(Bucket::Month) => "substr(application_date, 1, 7)",
    }
}
