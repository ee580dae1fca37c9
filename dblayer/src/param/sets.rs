use super::Param;
use crate::order::OrderSpec;
use crate::statement::{Limit, SelectStatement, Statement};

/// A query's accepted filter surface. Keys outside `ACCEPTED` are dropped on construction.
pub trait ParamSet: Sized {
    const ACCEPTED: &'static [&'static str];

    fn from_param(param: Param) -> Self;

    fn param(&self) -> &Param;

    fn accept(mut param: Param) -> Self {
        param.retain(Self::ACCEPTED);
        Self::from_param(param)
    }
}

fn and_in_text(sql: &mut SelectStatement<'_>, column: &str, values: Vec<String>) {
    if !values.is_empty() {
        let predicate = format!("{column}{}", sql.in_list(values));
        sql.and(predicate);
    }
}

fn and_in_integer(sql: &mut SelectStatement<'_>, column: &str, values: Vec<i64>) {
    if !values.is_empty() {
        let predicate = format!("{column}{}", sql.in_list(values));
        sql.and(predicate);
    }
}

fn and_words(sql: &mut SelectStatement<'_>, column: &str, words: Vec<String>) {
    for word in words {
        let predicate = sql.like(column, &format!("%{word}%"));
        sql.and(predicate);
    }
}

fn window(sql: &mut SelectStatement<'_>, limit: Option<Limit>, order: &[OrderSpec]) {
    sql.order_by(order);
    if let Some(limit) = limit {
        sql.limit(limit);
    }
}

/// Filters accepted by post listings.
#[derive(Debug, Clone)]
pub struct PostParams {
    param: Param,
}

impl ParamSet for PostParams {
    const ACCEPTED: &'static [&'static str] = &[
        "q",
        "blog_id",
        "post_id",
        "post_type",
        "post_status",
        "user_id",
        "limit",
        "order",
    ];

    fn from_param(param: Param) -> Self {
        PostParams { param }
    }

    fn param(&self) -> &Param {
        &self.param
    }
}

impl PostParams {
    pub const ORDER_FIELDS: &'static [&'static str] =
        &["post_dt", "post_upddt", "post_title", "post_id", "post_status"];

    /// Search text.
    pub fn q(&self) -> Option<String> {
        self.param.text("q")
    }

    pub fn words(&self) -> Vec<String> {
        self.param.words("q")
    }

    pub fn blog_id(&self) -> Vec<String> {
        self.param.texts("blog_id")
    }

    pub fn post_id(&self) -> Vec<i64> {
        self.param.integers("post_id")
    }

    pub fn post_type(&self) -> Vec<String> {
        self.param.texts("post_type")
    }

    pub fn post_status(&self) -> Vec<i64> {
        self.param.integers("post_status")
    }

    pub fn user_id(&self) -> Vec<String> {
        self.param.texts("user_id")
    }

    pub fn limit(&self) -> Option<Limit> {
        self.param.limit("limit")
    }

    /// Requested order, `post_dt DESC` when none survives validation.
    pub fn order(&self) -> Vec<OrderSpec> {
        let specs = self.param.order("order", Self::ORDER_FIELDS);
        if specs.is_empty() {
            vec![OrderSpec::desc("post_dt")]
        } else {
            specs
        }
    }

    /// Add the predicates, order and window these filters describe.
    pub fn apply(&self, sql: &mut SelectStatement<'_>) {
        and_in_text(sql, "blog_id", self.blog_id());
        and_in_integer(sql, "post_id", self.post_id());
        and_in_text(sql, "post_type", self.post_type());
        and_in_integer(sql, "post_status", self.post_status());
        and_in_text(sql, "user_id", self.user_id());
        and_words(sql, "post_words", self.words());
        window(sql, self.limit(), &self.order());
    }
}

/// Filters accepted by comment listings.
#[derive(Debug, Clone)]
pub struct CommentParams {
    param: Param,
}

impl ParamSet for CommentParams {
    const ACCEPTED: &'static [&'static str] = &[
        "q",
        "post_id",
        "comment_id",
        "comment_status",
        "comment_trackback",
        "limit",
        "order",
    ];

    fn from_param(param: Param) -> Self {
        CommentParams { param }
    }

    fn param(&self) -> &Param {
        &self.param
    }
}

impl CommentParams {
    pub const ORDER_FIELDS: &'static [&'static str] =
        &["comment_dt", "comment_id", "comment_author", "comment_status"];

    pub fn q(&self) -> Option<String> {
        self.param.text("q")
    }

    pub fn post_id(&self) -> Vec<i64> {
        self.param.integers("post_id")
    }

    pub fn comment_id(&self) -> Vec<i64> {
        self.param.integers("comment_id")
    }

    pub fn comment_status(&self) -> Vec<i64> {
        self.param.integers("comment_status")
    }

    /// `Some(true)` for trackbacks only, `Some(false)` for plain comments.
    pub fn comment_trackback(&self) -> Option<bool> {
        self.param.flag("comment_trackback")
    }

    pub fn limit(&self) -> Option<Limit> {
        self.param.limit("limit")
    }

    pub fn order(&self) -> Vec<OrderSpec> {
        let specs = self.param.order("order", Self::ORDER_FIELDS);
        if specs.is_empty() {
            vec![OrderSpec::asc("comment_dt")]
        } else {
            specs
        }
    }

    pub fn apply(&self, sql: &mut SelectStatement<'_>) {
        and_in_integer(sql, "post_id", self.post_id());
        and_in_integer(sql, "comment_id", self.comment_id());
        and_in_integer(sql, "comment_status", self.comment_status());
        if let Some(trackback) = self.comment_trackback() {
            let predicate = format!("comment_trackback = {}", sql.quote(trackback));
            sql.and(predicate);
        }
        and_words(sql, "comment_content", self.param.words("q"));
        window(sql, self.limit(), &self.order());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;
    use crate::record::{MetaRecord, RowView};
    use pretty_assertions::assert_eq;

    fn posts() -> Connection {
        let con = Connection::open_memory().unwrap();
        con.execute(
            "CREATE TABLE post (post_id integer, blog_id varchar(32), post_type varchar(32), \
             post_status integer, user_id varchar(32), post_dt timestamp, post_title varchar(255), \
             post_words text)",
        )
        .unwrap();
        con.execute(
            "INSERT INTO post VALUES \
             (1, 'main', 'post', 1, 'ann', '2024-01-01 10:00:00', 'Rust ownership', 'rust ownership borrow'), \
             (2, 'main', 'page', 1, 'bob', '2024-01-02 10:00:00', 'About', 'about page'), \
             (3, 'main', 'post', 0, 'ann', '2024-01-03 10:00:00', 'Draft', 'rust draft'), \
             (4, 'side', 'post', 1, 'cid', '2024-01-04 10:00:00', 'SQL dialects', 'sql mysql sqlite')",
        )
        .unwrap();
        con
    }

    fn ids(con: &Connection, params: &PostParams) -> (String, Vec<i64>) {
        let mut sql = con.select_statement();
        sql.column("post_id").from("post");
        params.apply(&mut sql);
        let rendered = sql.statement().unwrap();
        let mut rs = sql.select().unwrap();
        let mut out = Vec::new();
        while rs.fetch() {
            out.push(rs.integer("post_id"));
        }
        (rendered, out)
    }

    #[test]
    fn test_post_filters() {
        let con = posts();
        let params = PostParams::accept(Param::from_pairs([
            ("blog_id", "main"),
            ("post_type", "post"),
            ("q", "rust"),
        ]));
        let (_, found) = ids(&con, &params);
        assert_eq!(found, vec![3, 1]);
    }

    #[test]
    fn test_hostile_values_stay_literal() {
        let con = posts();
        let params = PostParams::accept(Param::from_pairs([
            ("blog_id", "main' OR '1'='1"),
            ("post_id[]", "1 OR 1=1"),
        ]));
        let (rendered, found) = ids(&con, &params);
        assert!(rendered.contains("blog_id IN ('main'' OR ''1''=''1') "));
        assert!(!rendered.contains("post_id IN"));
        assert!(found.is_empty());
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let con = posts();
        let params = PostParams::accept(Param::from_pairs([
            ("post_status", "1"),
            ("sort_by_evil", "1; DROP TABLE post"),
        ]));
        assert!(!params.param().contains("sort_by_evil"));
        let (_, found) = ids(&con, &params);
        assert_eq!(found, vec![4, 2, 1]);
    }

    #[test]
    fn test_order_and_limit() {
        let con = posts();
        let params = PostParams::accept(Param::from_pairs([
            ("order", "post_title asc"),
            ("limit", "1,2"),
        ]));
        let (rendered, found) = ids(&con, &params);
        assert!(rendered.ends_with("ORDER BY post_title ASC LIMIT 2 OFFSET 1"));
        assert_eq!(found, vec![3, 1]);
    }

    #[test]
    fn test_comment_params() {
        let con = Connection::open_memory().unwrap();
        let params = CommentParams::accept(Param::from_pairs([
            ("post_id[]", "4"),
            ("post_id[]", "5"),
            ("comment_trackback", "no"),
            ("blog_id", "ignored"),
        ]));
        let mut sql = con.select_statement();
        sql.from("comment");
        params.apply(&mut sql);
        assert_eq!(
            sql.statement().unwrap(),
            "SELECT * FROM comment WHERE NULL IS NULL AND post_id IN (4,5)  \
             AND comment_trackback = 0 ORDER BY comment_dt ASC"
        );
    }
}
