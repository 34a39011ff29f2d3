//! Extraction of column aliases from the select list of a SQL template.
//!
//! This is a textual scan, not a SQL parser. It locates the first `select`
//! and the first following `from` (lowercase first, then uppercase), splits
//! the text between them on `,`, and derives one [`ColumnAlias`] per
//! fragment. Column expressions containing commas (function calls with
//! several arguments, literals) are therefore not supported.
//!
//! Each fragment is resolved with the first matching rule:
//!
//! 1. `expr as alias` (case-insensitive `as`); when the right-hand side
//!    carries `${name}` markup, `name` is the alias.
//! 2. `expr ${name}` or `expr sql_alias ${name}`: the alias is `name`, the
//!    column is `expr`.
//! 3. `expr alias`: two whitespace separated tokens.
//! 4. `t.some_column`: the qualifier is dropped and the alias is the camelCase
//!    form `someColumn`.

use regex::Regex;

pub(crate) const ALIAS_PREFIX: &str = "${";
pub(crate) const ALIAS_SUFFIX: &str = "}";

/// One entry of a select list: the column expression as written in SQL and
/// the logical name the value is exposed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnAlias {
    pub original: String,
    pub alias: String,
}

/// Parses the select list of `sql` into one [`ColumnAlias`] per column, in
/// column order.
///
/// # Errors
///
/// Returns [`Error::MalformedTemplate`](crate::Error::MalformedTemplate) if
/// no `select`/`from` keyword is found or a fragment yields an empty alias
/// or an empty column expression.
///
/// # Examples
///
/// ```
/// use sqlx_alias_appender::alias::parse_select_aliases;
///
/// let columns = parse_select_aliases("select u.id, u.last_login_at from users u")?;
/// assert_eq!(columns[1].original, "last_login_at");
/// assert_eq!(columns[1].alias, "lastLoginAt");
/// # Ok::<(), sqlx_alias_appender::Error>(())
/// ```
pub fn parse_select_aliases(sql: &str) -> crate::Result<Vec<ColumnAlias>> {
    let select_list = select_list(sql)?;
    let as_keyword = Regex::new(r"(?i)\s+as\s+")?;

    select_list
        .split(',')
        .map(|fragment| -> crate::Result<ColumnAlias> {
            let entry = column_alias(fragment, &as_keyword)?;
            if entry.alias.is_empty() {
                log::error!(
                    "column alias can not be parsed, original column '{}'",
                    entry.original
                );
                return Err(crate::Error::MalformedTemplate(format!(
                    "column alias can not be parsed from '{}'",
                    fragment.trim()
                )));
            }
            if entry.original.is_empty() {
                log::error!("column expression missing for alias '{}'", entry.alias);
                return Err(crate::Error::MalformedTemplate(format!(
                    "column expression can not be parsed from '{}'",
                    fragment.trim()
                )));
            }
            Ok(entry)
        })
        .collect()
}

/// Returns the text strictly between the select and from keywords.
fn select_list(sql: &str) -> crate::Result<&str> {
    let (start, keyword_len) = find_keyword(sql, "select")
        .map(|i| (i, "select".len()))
        .ok_or_else(|| missing_keyword("select"))?;
    let columns_start = start + keyword_len;
    let end = find_keyword(&sql[columns_start..], "from")
        .map(|i| columns_start + i)
        .ok_or_else(|| missing_keyword("from"))?;
    Ok(&sql[columns_start..end])
}

fn find_keyword(haystack: &str, lowercase: &str) -> Option<usize> {
    haystack
        .find(lowercase)
        .or_else(|| haystack.find(&lowercase.to_uppercase()))
}

fn missing_keyword(keyword: &str) -> crate::Error {
    crate::Error::MalformedTemplate(format!("can not find '{keyword}' key word in sql"))
}

fn column_alias(fragment: &str, as_keyword: &Regex) -> crate::Result<ColumnAlias> {
    let fragment = fragment.trim();

    if let Some(m) = as_keyword.find(fragment) {
        let original = fragment[..m.start()].trim();
        let rhs = fragment[m.end()..].trim();
        let alias = match rhs.find(ALIAS_PREFIX) {
            Some(start) => bracket_alias(rhs, start)?,
            None => rhs,
        };
        return Ok(ColumnAlias {
            original: original.to_owned(),
            alias: alias.to_owned(),
        });
    }

    if let Some(start) = fragment.find(ALIAS_PREFIX) {
        let head = fragment[..start].trim();
        // `expr sql_alias ${name}`: the SQL-level alias is ignored
        let original = head.split_whitespace().next().unwrap_or_default();
        return Ok(ColumnAlias {
            original: original.to_owned(),
            alias: bracket_alias(fragment, start)?.to_owned(),
        });
    }

    let mut tokens = fragment.split_whitespace();
    if let (Some(original), Some(alias)) = (tokens.next(), tokens.next()) {
        return Ok(ColumnAlias {
            original: original.to_owned(),
            alias: alias.to_owned(),
        });
    }

    let column = fragment.rsplit('.').next().unwrap_or_default();
    let alias = if column.contains('_') {
        to_camel_case(column)
    } else {
        column.to_owned()
    };
    Ok(ColumnAlias {
        original: column.to_owned(),
        alias,
    })
}

/// Text between `${` (at byte `start`) and the next `}`, trimmed.
fn bracket_alias(text: &str, start: usize) -> crate::Result<&str> {
    let inner = &text[start + ALIAS_PREFIX.len()..];
    inner
        .find(ALIAS_SUFFIX)
        .map(|end| inner[..end].trim())
        .ok_or_else(|| {
            crate::Error::MalformedTemplate(format!("unterminated alias markup in '{text}'"))
        })
}

/// `last_login_at` -> `lastLoginAt`
pub fn to_camel_case(snake: &str) -> String {
    let mut segments = snake.split('_');
    let mut out = segments.next().unwrap_or_default().to_lowercase();
    for segment in segments {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}
