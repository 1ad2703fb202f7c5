//! # WowMySQL Client SDK
//!
//! A client SDK for WowMySQL projects: MySQL-backed tables behind a
//! fluent query API, S3-compatible file storage and end-user auth.
//!
//! ## Features
//!
//! - **Fluent queries**: chain filters, projection, ordering and paging,
//!   then run one request per terminal call
//! - **Typed errors**: status codes map to authentication, not-found,
//!   rate-limit and storage-limit errors
//! - **Quota-aware storage**: uploads check the remaining quota first
//! - **Project auth**: sign-up, sign-in, OAuth and password reset flows
//!
//! ## Example
//!
//! ```rust,ignore
//! use wowmysql_client::{Config, SortDirection, WowMySqlClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = WowMySqlClient::new(Config::new(
//!         "https://myproj.wowmysql.com",
//!         "your-api-key",
//!     ))?;
//!
//!     let adults = client
//!         .table("users")
//!         .select(["id", "name"])
//!         .gte("age", 18)
//!         .order_by("name", SortDirection::Asc)
//!         .limit(10)
//!         .execute()
//!         .await?;
//!     println!("{} rows", adults.count);
//!
//!     Ok(())
//! }
//! ```

mod auth;
mod client;
mod config;
mod error;
mod query;
mod storage;
mod table;
mod transport;
mod types;

pub use auth::{build_auth_base_url, AuthClient, SignUpOptions};
pub use client::WowMySqlClient;
pub use config::{AuthConfig, Config, StorageConfig};
pub use error::{format_bytes, ClientError, Result};
pub use query::{FilterExpression, FilterOperator, QueryBody, QueryBuilder, SortDirection};
pub use storage::{ListFilesOptions, StorageClient, UploadOptions};
pub use table::Table;
pub use types::*;
