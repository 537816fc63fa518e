//! Tenant resolution and schema routing.
//!
//! Each tenant owns one PostgreSQL schema inside the shared database. A
//! request is bound to a schema by [`resolver::resolve_tenant`], the binding
//! is held in the request-scoped [`TenantContext`], and
//! [`crate::db::ConnectionProvider`] applies it to every connection checkout.

pub mod context;
pub mod provisioner;
pub mod resolver;
pub mod schema;

pub use context::TenantContext;
pub use provisioner::SchemaProvisioner;
pub use resolver::{PgTenantDirectory, TenantDirectory, TenantResolver, TokenValidator};
pub use schema::{SchemaName, SchemaNameError};
