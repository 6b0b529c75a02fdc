use serde::Serialize;

use crate::ac::value::Value;
use super::{IdFilter, Predicate};

/// A `WHERE` fragment with positional (`?`) placeholders.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SqlFragment {
    pub sql: String,
    pub binds: Vec<Value>,
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn column(table: &str, column: &str) -> String {
    format!("{}.{}", quote(table), quote(column))
}

impl SqlFragment {
    fn push(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    fn bind(&mut self, value: &Value) {
        self.sql.push('?');
        self.binds.push(value.clone());
    }

    fn render(&mut self, predicate: &Predicate, table: &str) {
        match predicate {
            Predicate::True => self.push("(1 = 1)"),
            Predicate::False => self.push("(1 = 0)"),
            Predicate::Eq { column: name, value } => {
                self.push(&column(table, name));
                self.push(" = ");
                self.bind(value);
            }
            Predicate::AnyOf { values, .. } if values.is_empty() => self.push("(1 = 0)"),
            Predicate::AnyOf { column: name, values } => {
                self.push(&column(table, name));
                self.push(" IN (");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.bind(value);
                }
                self.push(")");
            }
            Predicate::IsNull { column: name } => {
                self.push(&column(table, name));
                self.push(" IS NULL");
            }
            Predicate::In { column: name, filter, .. } => {
                self.push(&column(table, name));
                self.push(" IN (");
                self.render_select(filter);
                self.push(")");
            }
            Predicate::And(items) => self.render_list(items, " AND ", "(1 = 1)", table),
            Predicate::Or(items) => self.render_list(items, " OR ", "(1 = 0)", table),
        }
    }

    fn render_list(&mut self, items: &[Predicate], op: &str, empty: &str, table: &str) {
        if items.is_empty() {
            return self.push(empty);
        }
        self.push("(");
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.push(op);
            }
            self.render(item, table);
        }
        self.push(")");
    }

    fn render_select(&mut self, filter: &IdFilter) {
        self.push("SELECT ");
        self.push(&column(&filter.table, "id"));
        self.push(" FROM ");
        self.push(&quote(&filter.table));
        self.push(" WHERE ");
        self.render(&filter.predicate, &filter.table);
    }
}

impl Predicate {
    /// Renders this predicate as a condition over rows of `table`.
    pub fn to_sql(&self, table: &str) -> SqlFragment {
        let mut fragment = SqlFragment::default();
        fragment.render(self, table);
        fragment
    }
}

impl IdFilter {
    /// Renders a complete `SELECT id ...` statement.
    pub fn to_sql(&self) -> SqlFragment {
        let mut fragment = SqlFragment::default();
        fragment.render_select(self);
        fragment
    }
}

#[cfg(test)]
mod test {
    use crate::ac::{
        predicate::{IdFilter, Predicate},
        value::Value,
    };

    #[test]
    fn render() {
        let predicate = Predicate::or([
            Predicate::and([
                Predicate::eq("owner_firm_id", 2),
                Predicate::eq("owner_id", 5),
            ]),
            Predicate::eq("id", 9),
        ]);
        let fragment = predicate.to_sql("blog");
        assert_eq!(
            fragment.sql,
            r#"(("blog"."owner_firm_id" = ? AND "blog"."owner_id" = ?) OR "blog"."id" = ?)"#,
        );
        assert_eq!(fragment.binds, vec![
            Value::Integer(2),
            Value::Integer(5),
            Value::Integer(9),
        ]);
        assert_eq!(Predicate::True.to_sql("blog").sql, "(1 = 1)");
        assert_eq!(Predicate::is_null("owner_id").to_sql("blog").sql, r#""blog"."owner_id" IS NULL"#);
        assert_eq!(Predicate::False.to_sql("blog").sql, "(1 = 0)");
    }

    #[test]
    fn render_nested() {
        let filter = IdFilter::new("blog_entry", Predicate::In {
            column: "blog_id".to_string(),
            association: "blog".to_string(),
            filter: Box::new(IdFilter::new("blog", Predicate::any_of(
                "owner_id",
                [Value::Integer(1), Value::Integer(2)],
            ))),
        });
        let fragment = filter.to_sql();
        assert_eq!(
            fragment.sql,
            concat!(
                r#"SELECT "blog_entry"."id" FROM "blog_entry" WHERE "blog_entry"."blog_id" IN "#,
                r#"(SELECT "blog"."id" FROM "blog" WHERE "blog"."owner_id" IN (?, ?))"#,
            ),
        );
        assert_eq!(fragment.binds.len(), 2);
    }
}
