use super::statement::{quote_ident, BuildError, ColumnValues, Placeholder, SqlArg, Statement};
use std::collections::HashSet;

/// `INSERT INTO <table> (...) VALUES (...) [RETURNING <column>]`.
#[derive(Debug, Clone)]
pub struct InsertBuilder {
    table: &'static str,
    values: ColumnValues,
    returning: Option<&'static str>,
}

impl InsertBuilder {
    pub fn into_table(table: &'static str) -> Self {
        Self {
            table,
            values: ColumnValues::new(),
            returning: None,
        }
    }

    pub fn values(mut self, values: ColumnValues) -> Self {
        self.values = values;
        self
    }

    /// Requests `column` of the inserted row back from the store.
    pub fn returning(mut self, column: &'static str) -> Self {
        self.returning = Some(column);
        self
    }

    pub fn build(self, placeholder: Placeholder) -> Result<Statement, BuildError> {
        if self.values.is_empty() {
            return Err(BuildError::NoColumns { table: self.table });
        }
        ensure_unique_columns(self.table, &self.values)?;

        let entries = self.values.into_entries();
        let mut columns = Vec::with_capacity(entries.len());
        let mut markers = Vec::with_capacity(entries.len());
        let mut args = Vec::with_capacity(entries.len());
        for (column, value) in entries {
            columns.push(quote_ident(column));
            markers.push(value.render(&mut args, placeholder));
        }

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(self.table),
            columns.join(", "),
            markers.join(", ")
        );
        if let Some(column) = self.returning {
            sql.push_str(" RETURNING ");
            sql.push_str(&quote_ident(column));
        }

        Ok(Statement { sql, args })
    }
}

/// `UPDATE <table> SET ... WHERE ...`.
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    table: &'static str,
    assignments: ColumnValues,
    predicate: ColumnValues,
}

impl UpdateBuilder {
    pub fn table(table: &'static str) -> Self {
        Self {
            table,
            assignments: ColumnValues::new(),
            predicate: ColumnValues::new(),
        }
    }

    pub fn set(mut self, assignments: ColumnValues) -> Self {
        self.assignments = assignments;
        self
    }

    pub fn filter(mut self, predicate: ColumnValues) -> Self {
        self.predicate = predicate;
        self
    }

    /// Renders the statement.
    ///
    /// # Errors
    /// - `EmptySetClause` when no assignment was supplied.
    /// - `MissingPredicate` when no predicate was supplied.
    pub fn build(self, placeholder: Placeholder) -> Result<Statement, BuildError> {
        if self.assignments.is_empty() {
            return Err(BuildError::EmptySetClause { table: self.table });
        }
        if self.predicate.is_empty() {
            return Err(BuildError::MissingPredicate { table: self.table });
        }
        ensure_unique_columns(self.table, &self.assignments)?;

        let mut args = Vec::with_capacity(self.assignments.len() + self.predicate.len());
        let assignments = self
            .assignments
            .into_entries()
            .into_iter()
            .map(|(column, value)| {
                let rhs = value.render(&mut args, placeholder);
                format!("{} = {rhs}", quote_ident(column))
            })
            .collect::<Vec<_>>();

        let mut sql = format!(
            "UPDATE {} SET {}",
            quote_ident(self.table),
            assignments.join(", ")
        );
        push_where(&mut sql, &mut args, self.predicate, placeholder);

        Ok(Statement { sql, args })
    }
}

/// `SELECT <columns> FROM <table> [WHERE ...] [ORDER BY ...]`.
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    table: &'static str,
    columns: &'static [&'static str],
    predicate: ColumnValues,
    order_by_desc: Vec<&'static str>,
}

impl SelectBuilder {
    pub fn from(table: &'static str, columns: &'static [&'static str]) -> Self {
        Self {
            table,
            columns,
            predicate: ColumnValues::new(),
            order_by_desc: Vec::new(),
        }
    }

    /// Equality conjunction; an empty predicate selects every row.
    pub fn filter(mut self, predicate: ColumnValues) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn order_by_desc(mut self, column: &'static str) -> Self {
        self.order_by_desc.push(column);
        self
    }

    pub fn build(self, placeholder: Placeholder) -> Statement {
        let columns = self
            .columns
            .iter()
            .map(|column| quote_ident(column))
            .collect::<Vec<_>>();
        let mut sql = format!(
            "SELECT {} FROM {}",
            columns.join(", "),
            quote_ident(self.table)
        );
        let mut args = Vec::with_capacity(self.predicate.len());
        push_where(&mut sql, &mut args, self.predicate, placeholder);

        if !self.order_by_desc.is_empty() {
            let terms = self
                .order_by_desc
                .iter()
                .map(|column| format!("{} DESC", quote_ident(column)))
                .collect::<Vec<_>>();
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }

        Statement { sql, args }
    }
}

/// `DELETE FROM <table> WHERE ...`.
#[derive(Debug, Clone)]
pub struct DeleteBuilder {
    table: &'static str,
    predicate: ColumnValues,
}

impl DeleteBuilder {
    pub fn from(table: &'static str) -> Self {
        Self {
            table,
            predicate: ColumnValues::new(),
        }
    }

    pub fn filter(mut self, predicate: ColumnValues) -> Self {
        self.predicate = predicate;
        self
    }

    /// Renders the statement; a delete without predicate is rejected.
    pub fn build(self, placeholder: Placeholder) -> Result<Statement, BuildError> {
        if self.predicate.is_empty() {
            return Err(BuildError::MissingPredicate { table: self.table });
        }

        let mut sql = format!("DELETE FROM {}", quote_ident(self.table));
        let mut args = Vec::with_capacity(self.predicate.len());
        push_where(&mut sql, &mut args, self.predicate, placeholder);

        Ok(Statement { sql, args })
    }
}

fn push_where(
    sql: &mut String,
    args: &mut Vec<SqlArg>,
    predicate: ColumnValues,
    placeholder: Placeholder,
) {
    if predicate.is_empty() {
        return;
    }

    let terms = predicate
        .into_entries()
        .into_iter()
        .map(|(column, value)| {
            let rhs = value.render(args, placeholder);
            format!("{} = {rhs}", quote_ident(column))
        })
        .collect::<Vec<_>>();
    sql.push_str(" WHERE ");
    sql.push_str(&terms.join(" AND "));
}

fn ensure_unique_columns(table: &'static str, values: &ColumnValues) -> Result<(), BuildError> {
    let mut seen = HashSet::with_capacity(values.len());
    for column in values.columns() {
        if !seen.insert(column) {
            return Err(BuildError::DuplicateColumn { table, column });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{DeleteBuilder, InsertBuilder, SelectBuilder, UpdateBuilder};
    use crate::query::{BuildError, ColumnValues, Placeholder, SqlArg};

    const COLUMNS: &[&str] = &["id", "username"];

    #[test]
    fn insert_renders_columns_in_push_order_with_returning() {
        let mut values = ColumnValues::new();
        values.push("username", "alice");
        values.push("role", "user");
        values.push_some("id", Some(7_i64));
        values.push_some::<i64>("created_ts", None);

        let stmt = InsertBuilder::into_table("user")
            .values(values)
            .returning("id")
            .build(Placeholder::Question)
            .unwrap();

        assert_eq!(
            stmt.sql,
            "INSERT INTO \"user\" (\"username\", \"role\", \"id\") VALUES (?, ?, ?) RETURNING \"id\""
        );
        assert_eq!(
            stmt.args,
            vec![
                SqlArg::Text("alice".to_string()),
                SqlArg::Text("user".to_string()),
                SqlArg::Integer(7),
            ]
        );
    }

    #[test]
    fn insert_without_columns_is_rejected() {
        let err = InsertBuilder::into_table("user")
            .build(Placeholder::Question)
            .unwrap_err();
        assert_eq!(err, BuildError::NoColumns { table: "user" });
    }

    #[test]
    fn update_numbers_dollar_placeholders_across_set_and_where() {
        let mut set = ColumnValues::new();
        set.push("nickname", "Al");
        set.push("email", "al@example.com");
        let mut predicate = ColumnValues::new();
        predicate.push("id", 3_i64);

        let stmt = UpdateBuilder::table("user")
            .set(set)
            .filter(predicate)
            .build(Placeholder::Dollar)
            .unwrap();

        assert_eq!(
            stmt.sql,
            "UPDATE \"user\" SET \"nickname\" = $1, \"email\" = $2 WHERE \"id\" = $3"
        );
        assert_eq!(stmt.args.last(), Some(&SqlArg::Integer(3)));
    }

    #[test]
    fn expressions_are_inlined_and_do_not_consume_bind_positions() {
        let mut set = ColumnValues::new();
        set.push_expr("updated_ts", "EXTRACT(EPOCH FROM now())");
        set.push("nickname", "Al");
        let mut predicate = ColumnValues::new();
        predicate.push("id", 3_i64);

        let stmt = UpdateBuilder::table("user")
            .set(set)
            .filter(predicate)
            .build(Placeholder::Dollar)
            .unwrap();

        assert_eq!(
            stmt.sql,
            "UPDATE \"user\" SET \"updated_ts\" = EXTRACT(EPOCH FROM now()), \"nickname\" = $1 WHERE \"id\" = $2"
        );
        assert_eq!(
            stmt.args,
            vec![SqlArg::Text("Al".to_string()), SqlArg::Integer(3)]
        );
    }

    #[test]
    fn expression_counts_toward_duplicate_columns() {
        let mut set = ColumnValues::new();
        set.push("updated_ts", 5_i64);
        set.push_expr("updated_ts", "0");
        let mut predicate = ColumnValues::new();
        predicate.push("id", 1_i64);

        let err = UpdateBuilder::table("user")
            .set(set)
            .filter(predicate)
            .build(Placeholder::Question)
            .unwrap_err();
        assert_eq!(
            err,
            BuildError::DuplicateColumn {
                table: "user",
                column: "updated_ts"
            }
        );
    }

    #[test]
    fn update_rejects_empty_set_and_missing_predicate() {
        let mut predicate = ColumnValues::new();
        predicate.push("id", 1_i64);
        let err = UpdateBuilder::table("user")
            .filter(predicate)
            .build(Placeholder::Question)
            .unwrap_err();
        assert_eq!(err, BuildError::EmptySetClause { table: "user" });

        let mut set = ColumnValues::new();
        set.push("nickname", "x");
        let err = UpdateBuilder::table("user")
            .set(set)
            .build(Placeholder::Question)
            .unwrap_err();
        assert_eq!(err, BuildError::MissingPredicate { table: "user" });
    }

    #[test]
    fn update_rejects_duplicate_assignment() {
        let mut set = ColumnValues::new();
        set.push("nickname", "a");
        set.push("nickname", "b");
        let mut predicate = ColumnValues::new();
        predicate.push("id", 1_i64);

        let err = UpdateBuilder::table("user")
            .set(set)
            .filter(predicate)
            .build(Placeholder::Question)
            .unwrap_err();
        assert_eq!(
            err,
            BuildError::DuplicateColumn {
                table: "user",
                column: "nickname"
            }
        );
    }

    #[test]
    fn select_without_filter_has_no_where_clause() {
        let stmt = SelectBuilder::from("user", COLUMNS)
            .order_by_desc("created_ts")
            .order_by_desc("row_status")
            .build(Placeholder::Question);

        assert_eq!(
            stmt.sql,
            "SELECT \"id\", \"username\" FROM \"user\" ORDER BY \"created_ts\" DESC, \"row_status\" DESC"
        );
        assert!(stmt.args.is_empty());
    }

    #[test]
    fn select_filter_is_a_conjunction_of_bound_equalities() {
        let mut predicate = ColumnValues::new();
        predicate.push("username", "x' OR '1'='1");
        predicate.push("role", "admin");

        let stmt = SelectBuilder::from("user", COLUMNS)
            .filter(predicate)
            .build(Placeholder::Question);

        assert_eq!(
            stmt.sql,
            "SELECT \"id\", \"username\" FROM \"user\" WHERE \"username\" = ? AND \"role\" = ?"
        );
        assert!(!stmt.sql.contains("OR '1'"));
        assert_eq!(stmt.args.len(), 2);
    }

    #[test]
    fn delete_requires_predicate() {
        let err = DeleteBuilder::from("user")
            .build(Placeholder::Question)
            .unwrap_err();
        assert_eq!(err, BuildError::MissingPredicate { table: "user" });

        let mut predicate = ColumnValues::new();
        predicate.push("id", 9_i64);
        let stmt = DeleteBuilder::from("user")
            .filter(predicate)
            .build(Placeholder::Dollar)
            .unwrap();
        assert_eq!(stmt.sql, "DELETE FROM \"user\" WHERE \"id\" = $1");
        assert_eq!(stmt.args, vec![SqlArg::Integer(9)]);
    }

    #[test]
    fn identifiers_with_quotes_are_escaped() {
        let stmt = SelectBuilder::from("we\"ird", COLUMNS).build(Placeholder::Question);
        assert!(stmt.sql.ends_with("FROM \"we\"\"ird\""));
    }
}
