use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::builder::{build_query, strip_alias_markup};
use crate::cache::AliasCache;
use crate::source::RowSource;
use crate::value::{Param, Record, Value};

/// A sort key expressed with a logical column alias.
pub trait Sorter {
    fn sort_field(&self) -> &str;
    fn is_desc(&self) -> bool;
}

/// Plain [`Sorter`], e.g. deserialized from a request body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Sort {
    pub field: String,
    #[serde(default)]
    pub desc: bool,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Sort {
            field: field.into(),
            desc: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Sort {
            field: field.into(),
            desc: true,
        }
    }
}

impl Sorter for Sort {
    fn sort_field(&self) -> &str {
        &self.field
    }

    fn is_desc(&self) -> bool {
        self.desc
    }
}

/// Appends optional filters, ordering and paging to a SQL template, then runs
/// it and returns rows keyed by the column aliases declared in the template.
///
/// Column aliases come from the select list of the template (see
/// [`alias`](crate::alias)); `${name}` markup is removed before execution.
/// Filters whose value is null or an empty list are skipped, so a search
/// form with optional fields maps onto one chain of calls.
///
/// An appender is single use: [`count`](Self::count) and
/// [`fetch`](Self::fetch) consume it. It is not meant to be shared between
/// threads.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use sqlx::MySqlPool;
/// use sqlx_alias_appender::{AliasCache, SqlAppender};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut pool = MySqlPool::connect("mysql://localhost/test").await?;
/// let cache = Arc::new(AliasCache::default());
/// let status: Option<&str> = Some("ACTIVE");
///
/// let mut query = SqlAppender::new(
///     "select c.id ${clientId}, c.name ${clientName} from client c where 1 = 1",
///     Arc::clone(&cache),
/// );
/// query
///     .and("c.status", "status", status)
///     .order_by("clientName", false)?
///     .limit(0, 10);
///
/// for row in query.fetch(&mut pool).await? {
///     println!("{:?} {:?}", row["clientId"], row["clientName"]);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SqlAppender {
    template: String,
    sql: String,
    params: HashMap<String, Param>,
    cache: Arc<AliasCache>,
}

impl SqlAppender {
    /// Starts a statement from `template`. The template is parsed lazily, on
    /// the first `order_by` or `fetch`.
    pub fn new<T>(template: T, cache: Arc<AliasCache>) -> Self
    where
        T: Into<String>,
    {
        let template = template.into();
        SqlAppender {
            sql: template.clone(),
            template,
            params: HashMap::new(),
            cache,
        }
    }

    /// Appends ` and <column> = :<param>` unless `value` is null or empty.
    pub fn and<V: Into<Param>>(&mut self, column: &str, param: &str, value: V) -> &mut Self {
        self.logic_op("and", column, "=", param, value.into())
    }

    /// Appends ` and <column> <op> :<param>` unless `value` is null or empty.
    pub fn and_op<V: Into<Param>>(
        &mut self,
        column: &str,
        op: &str,
        param: &str,
        value: V,
    ) -> &mut Self {
        self.logic_op("and", column, op, param, value.into())
    }

    /// Appends ` or <column> = :<param>` unless `value` is null or empty.
    pub fn or<V: Into<Param>>(&mut self, column: &str, param: &str, value: V) -> &mut Self {
        self.logic_op("or", column, "=", param, value.into())
    }

    /// Appends ` or <column> <op> :<param>` unless `value` is null or empty.
    pub fn or_op<V: Into<Param>>(
        &mut self,
        column: &str,
        op: &str,
        param: &str,
        value: V,
    ) -> &mut Self {
        self.logic_op("or", column, op, param, value.into())
    }

    /// Binds a placeholder written directly in the template.
    pub fn bind<V: Into<Param>>(&mut self, param: &str, value: V) -> &mut Self {
        self.params.insert(param.to_owned(), value.into());
        self
    }

    fn logic_op(
        &mut self,
        logic: &str,
        column: &str,
        op: &str,
        param: &str,
        value: Param,
    ) -> &mut Self {
        if value.is_absent() {
            return self;
        }
        self.sql.push_str(&format!(" {logic} {column} {op} :{param}"));
        self.params.insert(param.to_owned(), value);
        self
    }

    /// Orders by the column behind the logical alias `alias`.
    ///
    /// The first call opens an `order by` clause; later calls add
    /// comma-separated terms. An empty alias is ignored.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownAlias`](crate::Error::UnknownAlias) if the template
    /// does not declare `alias`; the statement is left unchanged.
    pub fn order_by(&mut self, alias: &str, desc: bool) -> crate::Result<&mut Self> {
        if alias.is_empty() {
            return Ok(self);
        }
        let column = self.column_for(alias)?;
        self.push_order_term(&column, desc);
        Ok(self)
    }

    /// Applies [`order_by`](Self::order_by) for each sorter in turn. Every
    /// alias is checked before anything is appended.
    pub fn order_by_all<S: Sorter>(&mut self, sorters: &[S]) -> crate::Result<&mut Self> {
        let mut terms = Vec::with_capacity(sorters.len());
        for sorter in sorters.iter().filter(|s| !s.sort_field().is_empty()) {
            terms.push((self.column_for(sorter.sort_field())?, sorter.is_desc()));
        }
        for (column, desc) in terms {
            self.push_order_term(&column, desc);
        }
        Ok(self)
    }

    fn column_for(&self, alias: &str) -> crate::Result<String> {
        let index = self.cache.resolve(&self.template)?;
        index
            .column(alias)
            .map(str::to_owned)
            .ok_or_else(|| crate::Error::UnknownAlias(alias.to_owned()))
    }

    fn push_order_term(&mut self, column: &str, desc: bool) {
        if self.sql.to_lowercase().contains("order by ") {
            self.sql.push_str(" , ");
        } else {
            self.sql.push_str(" order by ");
        }
        self.sql.push_str(column);
        self.sql.push_str(if desc { " desc " } else { " asc " });
    }

    /// Appends ` limit <offset> , <page_size>` (MySQL syntax).
    pub fn limit(&mut self, offset: u64, page_size: u64) -> &mut Self {
        self.sql.push_str(&format!(" limit {offset} , {page_size}"));
        self
    }

    /// The statement built so far, still with `:name` placeholders and markup.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn params(&self) -> &HashMap<String, Param> {
        &self.params
    }

    /// Runs the statement as is and returns its single scalar as an integer.
    ///
    /// The statement must not contain `${...}` markup.
    pub async fn count<S>(self, source: &mut S) -> crate::Result<i64>
    where
        S: RowSource,
    {
        let (sql, values) = build_query(&self.sql, &self.params)?;
        log::debug!("\n{sql}");

        let rows = source.fetch_rows(&sql, &values).await?;
        let scalar = rows
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .ok_or(crate::Error::ResultShapeMismatch {
                expected: 1,
                actual: 0,
            })?;
        to_count(scalar)
    }

    /// Runs the statement and maps each row onto the template's aliases.
    ///
    /// # Errors
    ///
    /// [`Error::ResultShapeMismatch`](crate::Error::ResultShapeMismatch) if
    /// a row does not have exactly one value per alias, plus any parse or
    /// database error.
    pub async fn fetch<S>(self, source: &mut S) -> crate::Result<Vec<Record>>
    where
        S: RowSource,
    {
        let index = self.cache.resolve(&self.template)?;
        let stripped = strip_alias_markup(&self.sql)?;
        let (sql, values) = build_query(&stripped, &self.params)?;
        log::debug!("\n{sql}");

        let rows = source.fetch_rows(&sql, &values).await?;
        rows.into_iter()
            .map(|row| -> crate::Result<Record> {
                if row.len() != index.len() {
                    return Err(crate::Error::ResultShapeMismatch {
                        expected: index.len(),
                        actual: row.len(),
                    });
                }
                Ok(index.aliases().iter().cloned().zip(row).collect())
            })
            .collect()
    }
}

fn to_count(value: Value) -> crate::Result<i64> {
    match value {
        Value::Int(v) => Ok(v),
        Value::Text(ref s) => s
            .trim()
            .parse()
            .map_err(|_| crate::Error::NonIntegerCount(value.clone())),
        other => Err(crate::Error::NonIntegerCount(other)),
    }
}
