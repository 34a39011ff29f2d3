//! # sqlx-alias-appender
//!
//! A SQLx extension that appends optional filters, ordering and paging to a
//! hand-written SELECT, and returns rows keyed by the column aliases written
//! in the template.
//!
//! ## Features
//!
//! - **Optional filters**: `and`/`or` skip themselves when the value is `None` or an empty list
//! - **Alias markup**: annotate columns with `${name}`; the markup is stripped before execution
//! - **Logical ordering**: `order_by("clientName", ..)` is translated to the real column expression
//! - **Named placeholders**: `:param` in the statement, list values expand to `(?, ?, ...)`
//! - **Shared parse cache**: each distinct template is parsed once per TTL window
//!
//! ## Quick Start
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! sqlx = { version = "0.8", features = ["mysql", "runtime-tokio"] }
//! sqlx-alias-appender = "0.1"
//! ```
//!
//! ## Column aliases
//!
//! Each column of the select list gets a logical name:
//!
//! | Column                        | Column expression | Logical name |
//! |-------------------------------|-------------------|--------------|
//! | `c.id as client_id`           | `c.id`            | `client_id`  |
//! | `c.id as id ${clientId}`      | `c.id`            | `clientId`   |
//! | `c.name ${clientName}`        | `c.name`          | `clientName` |
//! | `c.name n`                    | `c.name`          | `n`          |
//! | `c.created_at`                | `created_at`      | `createdAt`  |
//!
//! ## Examples
//!
//! ### Searching with optional filters
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sqlx::MySqlPool;
//! use sqlx_alias_appender::{AliasCache, Sort, SqlAppender};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut pool = MySqlPool::connect("mysql://localhost/test").await?;
//! let cache = Arc::new(AliasCache::default());
//!
//! let name: Option<String> = None;
//! let statuses = vec!["ACTIVE", "TRIAL"];
//! let sorts = vec![Sort::desc("createdAt")];
//!
//! let mut query = SqlAppender::new(
//!     "select c.id ${clientId}, c.name ${clientName}, c.created_at from client c where 1 = 1",
//!     Arc::clone(&cache),
//! );
//! query
//!     .and_op("c.name", "like", "name", name)
//!     .and_op("c.status", "in", "statuses", statuses)
//!     .order_by_all(&sorts)?
//!     .limit(0, 20);
//!
//! for row in query.fetch(&mut pool).await? {
//!     println!("{:?}", row);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Counting
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sqlx::MySqlPool;
//! use sqlx_alias_appender::{AliasCache, SqlAppender};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! # let mut pool = MySqlPool::connect("mysql://localhost/test").await?;
//! let cache = Arc::new(AliasCache::default());
//!
//! let mut query = SqlAppender::new("select count(1) from client c where 1 = 1", cache);
//! query.and("c.status", "status", "ACTIVE");
//!
//! let total = query.count(&mut pool).await?;
//! println!("{total} active clients");
//! # Ok(())
//! # }
//! ```
//!
//! ## Limitations
//!
//! - Only MySQL is supported (`limit offset , size` and `?` placeholders)
//! - The select list is split on `,`, so column expressions must not contain commas
//! - Only the first `select ... from` is inspected; subqueries are not understood
//! - Placeholder names must match `[a-zA-Z0-9_]+`
//!
//! ## License
//!
//! Licensed under either of Apache License, Version 2.0 or MIT license at your option.

pub mod alias;
pub mod appender;
pub mod builder;
pub mod cache;
pub mod error;
pub mod source;
pub mod value;

pub use appender::{Sort, Sorter, SqlAppender};
pub use cache::{AliasCache, AliasCacheConfig, AliasIndex};
pub use error::{Error, Result};
pub use source::RowSource;
pub use value::{Param, Record, Value};

/// Convenience re-exports for common use cases
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::{AliasCache, AliasCacheConfig, Param, Sort, SqlAppender, Value};
}
