use std::collections::HashMap;

use regex::Regex;

use crate::value::{Param, Value};

/// Pattern matching `${ alias }` markup in a template.
pub const ALIAS_MARKUP_PATTERN: &str = r"\$\{\s*\w+\s*\}";

/// Quoted literals and identifiers are matched first so that colons inside
/// them (`'10:30'`) are not taken for placeholders.
const PLACEHOLDER_PATTERN: &str =
    r#"'(?:[^'\\]|\\.)*'|"(?:[^"\\]|\\.)*"|`[^`]*`|:[a-zA-Z0-9_]+"#;

/// Removes `${alias}` markup, which is not executable SQL.
///
/// Surrounding whitespace is left as it is.
///
/// # Examples
///
/// ```
/// use sqlx_alias_appender::builder::strip_alias_markup;
///
/// let sql = strip_alias_markup("select a ${x} from t")?;
/// assert_eq!(sql, "select a  from t");
/// # Ok::<(), sqlx_alias_appender::Error>(())
/// ```
pub fn strip_alias_markup(sql: &str) -> crate::Result<String> {
    let regex = Regex::new(ALIAS_MARKUP_PATTERN)?;
    Ok(regex.replace_all(sql, "").into_owned())
}

/// Converts named placeholders (`:name`) to positional placeholders (`?`) for
/// MySQL and collects the bound values in placeholder order.
///
/// Text inside quotes or backticks is copied through untouched.
///
/// A [`Param::List`] expands to one `?` per element, wrapped in parentheses
/// unless the placeholder already follows an opening one.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use sqlx_alias_appender::builder::build_query;
/// use sqlx_alias_appender::{Param, Value};
///
/// let mut params = HashMap::new();
/// params.insert("id".to_string(), Param::from(42));
/// params.insert("tags".to_string(), Param::from(vec!["a", "b"]));
///
/// let (sql, values) = build_query("SELECT * FROM t WHERE id = :id AND tag IN (:tags)", &params)?;
/// assert_eq!(sql, "SELECT * FROM t WHERE id = ? AND tag IN (?, ?)");
/// assert_eq!(values.len(), 3);
/// # Ok::<(), sqlx_alias_appender::Error>(())
/// ```
///
/// # Errors
///
/// Returns [`Error::UnboundPlaceholder`](crate::Error::UnboundPlaceholder) when
/// a placeholder has no entry in `params`.
pub fn build_query(
    template: &str,
    params: &HashMap<String, Param>,
) -> crate::Result<(String, Vec<Value>)> {
    let regex = Regex::new(PLACEHOLDER_PATTERN)?;
    let mut sql = String::with_capacity(template.len());
    let mut values = Vec::new();
    let mut last = 0;

    for m in regex.find_iter(template) {
        sql.push_str(&template[last..m.start()]);
        last = m.end();

        if !m.as_str().starts_with(':') {
            sql.push_str(m.as_str());
            continue;
        }

        let name = &m.as_str()[1..];
        match params.get(name) {
            Some(Param::Value(value)) => {
                sql.push('?');
                values.push(value.clone());
            }
            Some(Param::List(items)) => {
                let placeholders = vec!["?"; items.len()].join(", ");
                if sql.trim_end().ends_with('(') {
                    sql.push_str(&placeholders);
                } else {
                    sql.push_str(&format!("({placeholders})"));
                }
                values.extend(items.iter().cloned());
            }
            None => return Err(crate::Error::UnboundPlaceholder(m.as_str().to_owned())),
        }
    }
    sql.push_str(&template[last..]);

    Ok((sql, values))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, Param)]) -> HashMap<String, Param> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_strip_alias_markup() {
        assert_eq!(strip_alias_markup("select a ${x} from t").unwrap(), "select a  from t");
        assert_eq!(
            strip_alias_markup("select a ${ x_1 }, b${y} from t").unwrap(),
            "select a , b from t"
        );
    }

    #[test]
    fn test_strip_leaves_invalid_markup() {
        assert_eq!(
            strip_alias_markup("select a ${x y} from t").unwrap(),
            "select a ${x y} from t"
        );
    }

    #[test]
    fn test_build_query_single_param() {
        let (sql, values) = build_query(
            "SELECT * FROM users WHERE id = :id",
            &params(&[("id", Param::from(1))]),
        )
        .unwrap();
        assert_eq!(sql, "SELECT * FROM users WHERE id = ?");
        assert_eq!(values, vec![Value::Int(1)]);
    }

    #[test]
    fn test_build_query_repeated_params() {
        let (sql, values) = build_query(
            "SELECT * FROM users WHERE id = :id OR user_id = :id",
            &params(&[("id", Param::from(3))]),
        )
        .unwrap();
        assert_eq!(sql, "SELECT * FROM users WHERE id = ? OR user_id = ?");
        assert_eq!(values, vec![Value::Int(3), Value::Int(3)]);
    }

    #[test]
    fn test_build_query_list_param() {
        let (sql, values) = build_query(
            "SELECT * FROM users WHERE status in (:status) AND user_id = :user_id",
            &params(&[
                ("status", Param::from(vec!["A", "B"])),
                ("user_id", Param::from(9)),
            ]),
        )
        .unwrap();
        assert_eq!(sql, "SELECT * FROM users WHERE status in (?, ?) AND user_id = ?");
        assert_eq!(
            values,
            vec![Value::Text("A".into()), Value::Text("B".into()), Value::Int(9)]
        );
    }

    #[test]
    fn test_build_query_list_param_without_parens() {
        let (sql, values) = build_query(
            "SELECT * FROM users WHERE id in :ids",
            &params(&[("ids", Param::from(vec![1, 2]))]),
        )
        .unwrap();
        assert_eq!(sql, "SELECT * FROM users WHERE id in (?, ?)");
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_build_query_ignores_quoted_colons() {
        let (sql, values) = build_query(
            "select a from t where t.at > '10:30' and t.created_at > \"2024-01-01 00:00:00\" \
             and t.note <> 'it\\'s :not_a_param' and `odd:col` = :id",
            &params(&[("id", Param::from(5))]),
        )
        .unwrap();
        assert_eq!(
            sql,
            "select a from t where t.at > '10:30' and t.created_at > \"2024-01-01 00:00:00\" \
             and t.note <> 'it\\'s :not_a_param' and `odd:col` = ?"
        );
        assert_eq!(values, vec![Value::Int(5)]);
    }

    #[test]
    fn test_build_query_time_literal_without_params() {
        let (sql, values) =
            build_query("select a from t where t.at > '10:30'", &HashMap::new()).unwrap();
        assert_eq!(sql, "select a from t where t.at > '10:30'");
        assert!(values.is_empty());
    }

    #[test]
    fn test_build_query_no_params() {
        let (sql, values) = build_query("SELECT * FROM users", &HashMap::new()).unwrap();
        assert_eq!(sql, "SELECT * FROM users");
        assert!(values.is_empty());
    }

    #[test]
    fn test_build_query_unbound() {
        let err = build_query("SELECT * FROM users WHERE id = :id", &HashMap::new()).unwrap_err();
        assert!(matches!(err, crate::Error::UnboundPlaceholder(ref p) if p == ":id"));
    }
}
