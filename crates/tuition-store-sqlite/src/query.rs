//! Composition of the faceted centre search into SQL.
//!
//! The offering filter becomes one correlated `EXISTS` over `offerings`,
//! so level and subject are tested against the same row:
//!
//! ```sql
//! EXISTS (SELECT 1 FROM offerings o
//!         JOIN levels l   ON l.level_id   = o.level_id
//!         JOIN subjects s ON s.subject_id = o.subject_id
//!         WHERE o.centre_id = c.centre_id
//!           AND l.name IN (?, ?) AND s.name IN (?))
//! ```

use rusqlite::types::Value;
use tuition_core::filter::{CentreQuery, OfferingFilter};

use crate::encode::CENTRE_COLUMNS;

/// SQL text plus positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
  pub sql:    String,
  pub params: Vec<Value>,
}

/// The `WHERE` clause (possibly empty) and its parameters for `centres c`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereClause {
  pub sql:    String,
  pub params: Vec<Value>,
}

fn placeholders(n: usize) -> String { vec!["?"; n].join(", ") }

/// Escape `LIKE` wildcards so the search term matches literally.
fn like_pattern(term: &str) -> String {
  let mut escaped = String::with_capacity(term.len() + 2);
  escaped.push('%');
  for ch in term.chars() {
    if matches!(ch, '%' | '_' | '\\') {
      escaped.push('\\');
    }
    escaped.push(ch);
  }
  escaped.push('%');
  escaped
}

fn offering_exists(filter: &OfferingFilter, params: &mut Vec<Value>) -> String {
  let mut sql = String::from(
    "EXISTS (SELECT 1 FROM offerings o \
     JOIN levels l ON l.level_id = o.level_id \
     JOIN subjects s ON s.subject_id = o.subject_id \
     WHERE o.centre_id = c.centre_id",
  );
  if let Some(levels) = &filter.levels {
    sql.push_str(&format!(" AND l.name IN ({})", placeholders(levels.len())));
    params.extend(levels.iter().cloned().map(Value::Text));
  }
  if let Some(subjects) = &filter.subjects {
    sql.push_str(&format!(" AND s.name IN ({})", placeholders(subjects.len())));
    params.extend(subjects.iter().cloned().map(Value::Text));
  }
  sql.push(')');
  sql
}

/// Build the shared `WHERE` clause for count and page queries.
pub fn where_clause(query: &CentreQuery) -> WhereClause {
  let mut conds = Vec::new();
  let mut params = Vec::new();

  if let Some(term) = query.search_term() {
    conds.push(
      "(c.name LIKE ? ESCAPE '\\' OR c.location LIKE ? ESCAPE '\\')".to_owned(),
    );
    let pattern = like_pattern(term);
    params.push(Value::Text(pattern.clone()));
    params.push(Value::Text(pattern));
  }
  if let Some(filter) = &query.filter {
    conds.push(offering_exists(filter, &mut params));
  }

  let sql = if conds.is_empty() {
    String::new()
  } else {
    format!("WHERE {}", conds.join(" AND "))
  };
  WhereClause { sql, params }
}

/// `SELECT COUNT(*)` over the matching centres.
pub fn count_statement(query: &CentreQuery) -> Statement {
  let clause = where_clause(query);
  Statement {
    sql:    format!("SELECT COUNT(*) FROM centres c {}", clause.sql),
    params: clause.params,
  }
}

/// One page of matching centres, ordered by name then location.
pub fn page_statement(query: &CentreQuery) -> Statement {
  let WhereClause { sql, mut params } = where_clause(query);
  params.push(Value::Integer(i64::from(query.limit)));
  params.push(Value::Integer(
    i64::try_from(query.offset()).unwrap_or(i64::MAX),
  ));
  Statement {
    sql: format!(
      "SELECT {CENTRE_COLUMNS} FROM centres c {sql} \
       ORDER BY c.name, c.location LIMIT ? OFFSET ?"
    ),
    params,
  }
}

#[cfg(test)]
mod tests {
  use tuition_core::filter::build_filter;

  use super::*;

  #[test]
  fn unfiltered_query_has_no_where() {
    let clause = where_clause(&CentreQuery::default());
    assert_eq!(clause, WhereClause::default());
  }

  #[test]
  fn filter_is_a_single_exists() {
    let query = CentreQuery {
      filter: build_filter(["JC"], ["Physics"]),
      ..Default::default()
    };
    let clause = where_clause(&query);
    assert_eq!(clause.sql.matches("EXISTS").count(), 1);
    assert!(clause.sql.contains("l.name IN (?, ?)"));
    assert!(clause.sql.contains("s.name IN (?)"));
    assert_eq!(clause.params, [
      Value::Text("JC 1".into()),
      Value::Text("JC 2".into()),
      Value::Text("Physics".into()),
    ]);
  }

  #[test]
  fn unselected_axis_is_omitted() {
    let query = CentreQuery {
      filter: build_filter(Vec::<&str>::new(), ["Physics"]),
      ..Default::default()
    };
    let clause = where_clause(&query);
    assert!(!clause.sql.contains("l.name"));
  }

  #[test]
  fn search_term_is_escaped() {
    assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    let query = CentreQuery {
      search: Some("  marine ".into()),
      filter: build_filter(["Primary 1"], Vec::<&str>::new()),
      ..Default::default()
    };
    let clause = where_clause(&query);
    assert!(clause.sql.starts_with("WHERE (c.name LIKE ?"));
    assert_eq!(clause.params[0], Value::Text("%marine%".into()));
    assert_eq!(clause.params.len(), 3);
  }

  #[test]
  fn page_binds_limit_and_offset_last() {
    let query = CentreQuery { page: 3, limit: 10, ..Default::default() };
    let statement = page_statement(&query);
    assert!(statement.sql.ends_with("LIMIT ? OFFSET ?"));
    assert_eq!(statement.params, [Value::Integer(10), Value::Integer(20)]);
  }
}
