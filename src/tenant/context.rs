use std::cell::RefCell;
use std::future::Future;

use super::SchemaName;

tokio::task_local! {
    static ACTIVE_SCHEMA: RefCell<Option<SchemaName>>;
}

/// Handle to the request-scoped tenant slot.
///
/// The slot itself lives in task-local storage and only exists while a
/// future runs inside [`TenantContext::scope`] or [`TenantContext::pin`].
/// Two requests never share a slot, even when polled on the same worker
/// thread, and the slot disappears when the scoped future completes or is
/// dropped.
#[derive(Debug, Clone)]
pub struct TenantContext {
    default_schema: SchemaName,
}

impl TenantContext {
    pub fn new(default_schema: SchemaName) -> Self {
        Self { default_schema }
    }

    pub fn default_schema(&self) -> &SchemaName {
        &self.default_schema
    }

    /// Run `fut` with a fresh, unset tenant slot.
    pub async fn scope<F: Future>(&self, fut: F) -> F::Output {
        ACTIVE_SCHEMA.scope(RefCell::new(None), fut).await
    }

    /// Run `fut` with the slot pinned to `schema`. The caller's slot is
    /// shadowed, not overwritten, so it is back in place once `fut`
    /// finishes, fails or is dropped.
    pub async fn pin<F: Future>(&self, schema: SchemaName, fut: F) -> F::Output {
        ACTIVE_SCHEMA.scope(RefCell::new(Some(schema)), fut).await
    }

    pub fn set(&self, schema: SchemaName) {
        let outcome = ACTIVE_SCHEMA.try_with(|slot| {
            slot.borrow_mut().replace(schema);
        });
        if outcome.is_err() {
            tracing::warn!("Tenant context set outside of a request scope, ignoring");
        }
    }

    /// The schema bound to the running request, or the default schema.
    pub fn current(&self) -> SchemaName {
        self.bound().unwrap_or_else(|| self.default_schema.clone())
    }

    /// The explicitly bound schema, if any.
    pub fn bound(&self) -> Option<SchemaName> {
        ACTIVE_SCHEMA
            .try_with(|slot| slot.borrow().clone())
            .ok()
            .flatten()
    }

    pub fn clear(&self) {
        let _ = ACTIVE_SCHEMA.try_with(|slot| slot.borrow_mut().take());
    }
}
