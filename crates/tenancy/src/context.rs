//! Execution-scoped tenant binding.
//!
//! The binding lives in tokio task-local storage, established by entering a
//! scope that owns it. When the scope's future (or closure) finishes — by
//! returning, by error, or by being dropped on cancellation — the binding
//! goes with it. There is nothing to forget to clean up and no process-wide
//! mutable state for concurrent requests to trample.

use std::cell::Cell;
use std::future::Future;

use docuvault_core::{DomainError, DomainResult, TenantId};

tokio::task_local! {
    static CURRENT_TENANT: Cell<Option<TenantId>>;
}

/// Namespace for the current-tenant binding.
///
/// `scope`/`enter` establish a binding for one logical operation; `set` and
/// `clear` rebind within an already-established scope (used by callers that
/// walk several tenants inside one unit of work, like the expiry sweep).
pub struct TenantContext;

impl TenantContext {
    /// Run `fut` with the given tenant bound for its entire execution.
    pub async fn scope<F>(tenant: Option<TenantId>, fut: F) -> F::Output
    where
        F: Future,
    {
        CURRENT_TENANT.scope(Cell::new(tenant), fut).await
    }

    /// Synchronous version of [`TenantContext::scope`].
    pub fn enter<R>(tenant: Option<TenantId>, f: impl FnOnce() -> R) -> R {
        CURRENT_TENANT.sync_scope(Cell::new(tenant), f)
    }

    /// The tenant bound to the calling task, if any.
    ///
    /// `None` both when no scope is active and when the active scope holds
    /// no tenant; callers are expected to fail closed on either.
    pub fn current() -> Option<TenantId> {
        CURRENT_TENANT.try_with(|cell| cell.get()).unwrap_or(None)
    }

    /// The bound tenant, or `NoTenantContext` when there is none. For call
    /// sites that are about to touch tenant data and must not proceed
    /// unbound.
    pub fn require() -> DomainResult<TenantId> {
        Self::current().ok_or(DomainError::NoTenantContext)
    }

    /// Rebind the current scope. Returns `false` when no scope is active
    /// (the call then has no effect).
    pub fn set(tenant: Option<TenantId>) -> bool {
        CURRENT_TENANT.try_with(|cell| cell.set(tenant)).is_ok()
    }

    /// Reset the current scope's binding to "no tenant".
    pub fn clear() {
        let _ = CURRENT_TENANT.try_with(|cell| cell.set(None));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbound_outside_any_scope() {
        assert_eq!(TenantContext::current(), None);
        assert!(!TenantContext::set(Some(TenantId::new())));
        assert_eq!(
            TenantContext::require(),
            Err(docuvault_core::DomainError::NoTenantContext)
        );
    }

    #[test]
    fn enter_binds_and_unbinds() {
        let tenant = TenantId::new();
        TenantContext::enter(Some(tenant), || {
            assert_eq!(TenantContext::current(), Some(tenant));
        });
        assert_eq!(TenantContext::current(), None);
    }

    #[test]
    fn nested_scope_shadows_and_restores() {
        let outer = TenantId::new();
        let inner = TenantId::new();
        TenantContext::enter(Some(outer), || {
            TenantContext::enter(Some(inner), || {
                assert_eq!(TenantContext::current(), Some(inner));
            });
            assert_eq!(TenantContext::current(), Some(outer));
        });
    }

    #[test]
    fn set_rebinds_within_the_scope_only() {
        let first = TenantId::new();
        let second = TenantId::new();
        TenantContext::enter(Some(first), || {
            assert!(TenantContext::set(Some(second)));
            assert_eq!(TenantContext::current(), Some(second));
            TenantContext::clear();
            assert_eq!(TenantContext::current(), None);
        });
        assert_eq!(TenantContext::current(), None);
    }

    #[test]
    fn unwinding_out_of_a_scope_still_unbinds() {
        let tenant = TenantId::new();
        let result = std::panic::catch_unwind(|| {
            TenantContext::enter(Some(tenant), || panic!("boom"));
        });
        assert!(result.is_err());
        assert_eq!(TenantContext::current(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_tasks_see_only_their_own_binding() {
        let a = TenantId::new();
        let b = TenantId::new();

        let task_a = tokio::spawn(TenantContext::scope(Some(a), async move {
            for _ in 0..100 {
                assert_eq!(TenantContext::current(), Some(a));
                tokio::task::yield_now().await;
            }
        }));
        let task_b = tokio::spawn(TenantContext::scope(Some(b), async move {
            for _ in 0..100 {
                assert_eq!(TenantContext::current(), Some(b));
                tokio::task::yield_now().await;
            }
        }));

        task_a.await.unwrap();
        task_b.await.unwrap();
        assert_eq!(TenantContext::current(), None);
    }

    #[tokio::test]
    async fn cancelled_operation_releases_the_binding() {
        let tenant = TenantId::new();
        let scoped = TenantContext::scope(Some(tenant), async {
            std::future::pending::<()>().await;
        });
        // The timeout polls the scoped future (binding it) and then drops
        // it mid-flight; the binding must not survive the cancellation.
        let result = tokio::time::timeout(std::time::Duration::from_millis(10), scoped).await;
        assert!(result.is_err());
        assert_eq!(TenantContext::current(), None);
    }
}
