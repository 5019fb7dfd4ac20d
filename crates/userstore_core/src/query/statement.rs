use std::error::Error;
use std::fmt::{Display, Formatter};

/// Typed bind argument carried next to the SQL text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlArg {
    Integer(i64),
    Text(String),
}

impl From<i64> for SqlArg {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<String> for SqlArg {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for SqlArg {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Placeholder syntax used when rendering bind positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placeholder {
    /// Anonymous `?` markers (SQLite, MySQL).
    #[default]
    Question,
    /// Numbered `$1, $2, ...` markers (PostgreSQL).
    Dollar,
}

impl Placeholder {
    /// Renders the marker for the 1-based bind position `index`.
    pub(crate) fn render(self, index: usize) -> String {
        match self {
            Self::Question => "?".to_string(),
            Self::Dollar => format!("${index}"),
        }
    }
}

/// Rendered statement: SQL text plus arguments in bind order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<SqlArg>,
}

/// Right-hand side of one column entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ColumnValue {
    /// Rendered as a placeholder; the argument is bound.
    Bound(SqlArg),
    /// Rendered verbatim. Only `'static` SQL written in this crate lands here.
    Expr(&'static str),
}

impl ColumnValue {
    /// Renders the right-hand side, moving a bound argument into `args`.
    pub(crate) fn render(self, args: &mut Vec<SqlArg>, placeholder: Placeholder) -> String {
        match self {
            Self::Bound(arg) => {
                args.push(arg);
                placeholder.render(args.len())
            }
            Self::Expr(sql) => sql.to_string(),
        }
    }
}

/// Ordered column -> value mapping.
///
/// Insertion order is preserved and becomes the column order of the rendered
/// statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnValues {
    entries: Vec<(&'static str, ColumnValue)>,
}

impl ColumnValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `column = value`.
    pub fn push(&mut self, column: &'static str, value: impl Into<SqlArg>) {
        self.entries.push((column, ColumnValue::Bound(value.into())));
    }

    /// Appends `column = <expr>` with `expr` inlined into the SQL text.
    pub fn push_expr(&mut self, column: &'static str, expr: &'static str) {
        self.entries.push((column, ColumnValue::Expr(expr)));
    }

    /// Appends `column = value` only when `value` is present.
    pub fn push_some<T: Into<SqlArg>>(&mut self, column: &'static str, value: Option<T>) {
        if let Some(value) = value {
            self.push(column, value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(column, _)| *column)
    }

    pub(crate) fn into_entries(self) -> Vec<(&'static str, ColumnValue)> {
        self.entries
    }
}

/// Errors raised while assembling a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// `INSERT` without any column.
    NoColumns { table: &'static str },
    /// `UPDATE` without any `SET` assignment.
    EmptySetClause { table: &'static str },
    /// `UPDATE`/`DELETE` without a `WHERE` predicate.
    MissingPredicate { table: &'static str },
    /// The same column was assigned twice in one clause.
    DuplicateColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for BuildError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoColumns { table } => write!(f, "insert into `{table}` has no columns"),
            Self::EmptySetClause { table } => {
                write!(f, "update of `{table}` has no columns to set")
            }
            Self::MissingPredicate { table } => {
                write!(f, "statement on `{table}` requires a where predicate")
            }
            Self::DuplicateColumn { table, column } => {
                write!(f, "column `{column}` of `{table}` assigned more than once")
            }
        }
    }
}

impl Error for BuildError {}

/// Quotes an identifier, doubling embedded quotes.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
