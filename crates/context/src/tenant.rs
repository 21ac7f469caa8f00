//! Tenant propagation for the message pipeline.
//!
//! The tenant id is carried in a tokio task-local rather than a global:
//! `with_tenant` scopes a future, nested scopes shadow and restore the
//! outer value on exit (normal or panic), and nothing leaks across
//! pooled worker tasks.

use std::future::Future;

use sb_domain::error::{Error, Result};

tokio::task_local! {
    static CURRENT_TENANT: String;
}

/// Run `fut` with `tenant_id` available to every nested call via
/// [`current_tenant`]. Scopes nest: the inner tenant shadows the outer
/// one and the outer value is restored when the inner future completes.
pub async fn with_tenant<F, T>(tenant_id: &str, fut: F) -> T
where
    F: Future<Output = T>,
{
    CURRENT_TENANT.scope(tenant_id.to_owned(), fut).await
}

/// The tenant id of the current scope.
///
/// Fails with [`Error::NoTenantInScope`] when called outside any
/// [`with_tenant`] scope — a programming error, not a runtime condition
/// to retry.
pub fn current_tenant() -> Result<String> {
    CURRENT_TENANT
        .try_with(|t| t.clone())
        .map_err(|_| Error::NoTenantInScope)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tenant_visible_inside_scope() {
        let seen = with_tenant("acme", async { current_tenant().unwrap() }).await;
        assert_eq!(seen, "acme");
    }

    #[tokio::test]
    async fn no_tenant_outside_scope() {
        assert!(matches!(current_tenant(), Err(Error::NoTenantInScope)));
    }

    #[tokio::test]
    async fn nested_scopes_shadow_and_restore() {
        with_tenant("outer", async {
            assert_eq!(current_tenant().unwrap(), "outer");
            with_tenant("inner", async {
                assert_eq!(current_tenant().unwrap(), "inner");
            })
            .await;
            // Outer value restored after the inner scope ends.
            assert_eq!(current_tenant().unwrap(), "outer");
        })
        .await;
    }

    #[tokio::test]
    async fn scope_does_not_leak_to_sibling_tasks() {
        with_tenant("acme", async {
            let sibling = tokio::spawn(async { current_tenant().is_err() });
            assert!(sibling.await.unwrap());
        })
        .await;
    }
}
