use super::{Clauses, Statement};
use crate::connection::Connection;
use crate::error::{DbError, Result};
use crate::record::{Record, RowView};

#[derive(Debug, Clone)]
pub struct SelectStatement<'a> {
    con: &'a Connection,
    clauses: Clauses,
}

impl<'a> Statement<'a> for SelectStatement<'a> {
    fn connection(&self) -> &'a Connection {
        self.con
    }

    fn clauses(&self) -> &Clauses {
        &self.clauses
    }

    fn clauses_mut(&mut self) -> &mut Clauses {
        &mut self.clauses
    }
}

impl<'a> SelectStatement<'a> {
    pub fn new(con: &'a Connection) -> Self {
        SelectStatement {
            con,
            clauses: Clauses::default(),
        }
    }

    /// Render without executing.
    pub fn statement(&self) -> Result<String> {
        let c = &self.clauses;
        let Some((first, others)) = c.from.split_first() else {
            return Err(DbError::Validation(
                "SELECT statement has no FROM source".to_string(),
            ));
        };

        let mut sql = String::from("SELECT ");
        if c.distinct {
            sql.push_str("DISTINCT ");
        }
        if c.columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&c.columns.join(", "));
        }
        sql.push_str(" FROM ");
        sql.push_str(first);
        for join in &c.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        for other in others {
            sql.push_str(", ");
            sql.push_str(other);
        }
        sql.push(' ');
        sql.push_str(&c.predicate());
        if !c.group.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&c.group.join(", "));
        }
        if !c.having.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&c.having.join(" AND "));
        }
        if !c.order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&c.order.join(", "));
        }
        if let Some(limit) = self.con.driver().limit_clause(c.limit, c.offset) {
            sql.push(' ');
            sql.push_str(&limit);
        }
        Ok(sql)
    }

    pub fn select(&self) -> Result<Record> {
        self.con.select(&self.statement()?)
    }

    /// Sibling query counting the rows this one would return without its window.
    ///
    /// Order, limit, offset and grouping are dropped. A `DISTINCT` select is
    /// counted through a sub-select so duplicates stay collapsed.
    pub fn count_query(&self) -> Result<SelectStatement<'a>> {
        let mut inner = self.clone();
        inner.clauses.order.clear();
        inner.clauses.group.clear();
        inner.clauses.having.clear();
        inner.clauses.limit = None;
        inner.clauses.offset = None;

        if inner.clauses.distinct {
            let mut outer = SelectStatement::new(self.con);
            outer
                .column("COUNT(*)")
                .from(format!("({}) counted", inner.statement()?));
            return Ok(outer);
        }
        inner.clauses.columns = vec!["COUNT(*)".to_string()];
        Ok(inner)
    }

    /// Run [`SelectStatement::count_query`] and read its scalar.
    pub fn count(&self) -> Result<i64> {
        let rs = self.count_query()?.select()?;
        Ok(rs
            .current()
            .and_then(|row| row.first())
            .map(|v| v.to_integer())
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::super::JoinStatement;
    use super::*;
    use crate::order::OrderSpec;
    use crate::record::MetaRecord;
    use pretty_assertions::assert_eq;
    use crate::driver::Driver;
    use crate::test_support::assert_parses;

    fn fixture(rows: i64) -> Connection {
        let con = Connection::open_memory().unwrap();
        con.execute("CREATE TABLE item (id integer, name varchar(32), grp integer)")
            .unwrap();
        for i in 1..=rows {
            con.execute(&format!(
                "INSERT INTO item VALUES ({i}, 'item{i}', {})",
                i % 3
            ))
            .unwrap();
        }
        con
    }

    fn ids(mut rs: Record) -> Vec<i64> {
        let mut out = Vec::new();
        while rs.fetch() {
            out.push(rs.integer("id"));
        }
        out
    }

    #[test]
    fn test_default_predicate() {
        let con = Connection::open_memory().unwrap();
        let mut sql = con.select_statement();
        sql.from("item");
        assert_eq!(sql.statement().unwrap(), "SELECT * FROM item WHERE NULL IS NULL");
        sql.and("id > 1").or("id = 0");
        assert_eq!(
            sql.statement().unwrap(),
            "SELECT * FROM item WHERE NULL IS NULL AND id > 1 OR id = 0"
        );
    }

    #[test]
    fn test_full_render() {
        let con = Connection::open_memory().unwrap();
        let mut sql = con.select_statement();
        sql.distinct()
            .columns(["P.post_id", "U.user_name"])
            .from_as("dc_post", "P")
            .join(
                &JoinStatement::left()
                    .from("dc_user U")
                    .on("U.user_id = P.user_id"),
            )
            .where_("P.blog_id = 'b'")
            .and("P.post_status = 1")
            .group(["P.post_id", "U.user_name"])
            .having("COUNT(*) > 0")
            .order_by(&[OrderSpec::desc("P.post_dt")])
            .limit((20u64, 10u64));
        let rendered = sql.statement().unwrap();
        assert_eq!(
            rendered,
            "SELECT DISTINCT P.post_id, U.user_name FROM dc_post P \
             LEFT JOIN dc_user U ON U.user_id = P.user_id \
             WHERE P.blog_id = 'b' AND P.post_status = 1 \
             GROUP BY P.post_id, U.user_name HAVING COUNT(*) > 0 \
             ORDER BY P.post_dt DESC LIMIT 10 OFFSET 20"
        );
        assert_parses(Driver::Sqlite, &rendered);
    }

    #[test]
    fn test_no_source() {
        let con = Connection::open_memory().unwrap();
        assert!(matches!(
            con.select_statement().statement(),
            Err(DbError::Validation(_))
        ));
    }

    #[test]
    fn test_quoted_lookup_on_empty_table() {
        let con = Connection::open_memory().unwrap();
        con.execute("CREATE TABLE user (user_id varchar(32))").unwrap();
        let mut sql = con.select_statement();
        let predicate = format!("user_id = {}", sql.quote("jdoe"));
        let rs = sql.from("user").where_(predicate).limit(1u64).select().unwrap();
        assert!(rs.is_empty());
    }

    #[test]
    fn test_limit_window() {
        let n = 5u64;
        let con = fixture(n as i64);
        for offset in 0..=n {
            for count in 0..=n + 1 {
                let mut sql = con.select_statement();
                sql.from("item").order("id").limit((offset, count));
                let got = ids(sql.select().unwrap());
                let expected: Vec<i64> = (offset + 1..=n)
                    .take(count as usize)
                    .map(|i| i as i64)
                    .collect();
                assert_eq!(got, expected, "offset {offset} count {count}");
            }
        }
    }

    #[test]
    fn test_offset_past_end_is_empty() {
        let con = fixture(3);
        let mut sql = con.select_statement();
        sql.from("item").offset(10);
        assert!(sql.select().unwrap().is_empty());
    }

    #[test]
    fn test_or_group_semantics() {
        let con = fixture(6);
        let preds = ["id = 1", "id = 4", "name = 'item5'", "grp = 0", "id > 100"];
        for k in [0usize, 1, 2, 5] {
            let mut sql = con.select_statement();
            let group = sql.or_group(preds[..k].iter().copied());
            sql.from("item").where_(group).order("id");
            let got = ids(sql.select().unwrap());

            let expected: Vec<i64> = (1..=6i64)
                .filter(|id| {
                    preds[..k].iter().any(|p| match *p {
                        "id = 1" => *id == 1,
                        "id = 4" => *id == 4,
                        "name = 'item5'" => *id == 5,
                        "grp = 0" => id % 3 == 0,
                        _ => false,
                    })
                })
                .collect();
            assert_eq!(got, expected, "k = {k}");
        }
    }

    #[test]
    fn test_and_group() {
        let con = fixture(6);
        let mut sql = con.select_statement();
        let group = sql.and_group(["id > 2", "grp = 1"]);
        sql.from("item").where_(group);
        assert_eq!(ids(sql.select().unwrap()), vec![4]);

        let mut sql = con.select_statement();
        let group = sql.and_group(Vec::<String>::new());
        sql.from("item").where_(group);
        assert_eq!(ids(sql.select().unwrap()).len(), 6);
    }

    #[test]
    fn test_count_query_matches_unlimited_select() {
        let con = fixture(10);
        for predicate in ["id > 3", "grp = 1", "name LIKE 'item1%'", "id < 0"] {
            let mut sql = con.select_statement();
            sql.from("item")
                .where_(predicate)
                .order("id DESC")
                .limit((2u64, 3u64));

            let mut unlimited = con.select_statement();
            unlimited.from("item").where_(predicate);
            let total = unlimited.select().unwrap().count() as i64;

            assert_eq!(sql.count().unwrap(), total, "{predicate}");
            let count_sql = sql.count_query().unwrap().statement().unwrap();
            assert!(!count_sql.contains("ORDER BY"));
            assert!(!count_sql.contains("LIMIT"));
        }
    }

    #[test]
    fn test_count_query_distinct() {
        let con = fixture(9);
        let mut sql = con.select_statement();
        sql.distinct().column("grp").from("item").limit(1u64);
        assert_eq!(
            sql.count_query().unwrap().statement().unwrap(),
            "SELECT COUNT(*) FROM (SELECT DISTINCT grp FROM item WHERE NULL IS NULL) counted \
             WHERE NULL IS NULL"
        );
        assert_eq!(sql.count().unwrap(), 3);
    }

    #[test]
    fn test_clone_keeps_original() {
        let con = fixture(4);
        let mut sql = con.select_statement();
        sql.from("item").where_("id > 1").order("id");
        let sibling = sql.count_query().unwrap();
        assert_eq!(sibling.count().unwrap(), 3);
        assert_eq!(ids(sql.select().unwrap()), vec![2, 3, 4]);
    }

    #[test]
    fn test_in_list_and_like_helpers() {
        let con = fixture(5);
        let mut sql = con.select_statement();
        let ids_in = format!("id{}", sql.in_list([2i64, 4]));
        let like = sql.like("name", "item%");
        sql.from("item").where_(ids_in).and(like).order("id");
        assert_eq!(ids(sql.select().unwrap()), vec![2, 4]);
    }
}
