use std::{
    future::Future,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use entity::employees::Role;
use tracing::{Instrument, Span, debug, error, info_span, warn};

use crate::{
    error::{HrError, HrResult},
    model::{CreateEmployee, Employee, PermissionPatch},
    service::EmployeeApi,
};

/// Wraps any [`EmployeeApi`] with one span per call plus a uniform outcome event.
pub struct Traced<S> {
    inner: S,
}

impl<S> Traced<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

/// Saturates instead of wrapping for durations past `u64::MAX` milliseconds.
fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

async fn observe<T, F>(span: Span, call: F) -> HrResult<T>
where
    F: Future<Output = HrResult<T>>,
{
    let started = Instant::now();
    let result = call.instrument(span.clone()).await;
    let elapsed_ms = millis(started.elapsed());
    span.in_scope(|| match &result {
        Ok(_) => debug!(elapsed_ms, "completed"),
        Err(err @ HrError::Store(_)) => error!(elapsed_ms, error = %err, "store failure"),
        Err(err) => warn!(elapsed_ms, error = %err, "rejected"),
    });
    result
}

#[async_trait]
impl<S: EmployeeApi> EmployeeApi for Traced<S> {
    async fn create_employee(&self, request: CreateEmployee) -> HrResult<i32> {
        let span = info_span!(
            "employee.create",
            organization_id = request.organization_id,
            account_id = request.account_id,
            inviter = request.invited_from_account_id,
            role = %request.role,
        );
        observe(span, self.inner.create_employee(request)).await
    }

    async fn get_employee(&self, account_id: i64) -> HrResult<Employee> {
        let span = info_span!("employee.get", account_id);
        observe(span, self.inner.get_employee(account_id)).await
    }

    async fn get_employees_by_organization(
        &self,
        organization_id: i64,
    ) -> HrResult<Vec<Employee>> {
        let span = info_span!("employee.list_by_organization", organization_id);
        observe(span, self.inner.get_employees_by_organization(organization_id)).await
    }

    async fn update_employee_permissions(
        &self,
        account_id: i64,
        patch: PermissionPatch,
    ) -> HrResult<()> {
        let span = info_span!(
            "employee.update_permissions",
            account_id,
            fields = patch.entries().count()
        );
        observe(span, self.inner.update_employee_permissions(account_id, patch)).await
    }

    async fn update_employee_role(&self, account_id: i64, role: Role) -> HrResult<()> {
        let span = info_span!("employee.update_role", account_id, role = %role);
        observe(span, self.inner.update_employee_role(account_id, role)).await
    }

    async fn delete_employee(&self, account_id: i64) -> HrResult<()> {
        let span = info_span!("employee.delete", account_id);
        observe(span, self.inner.delete_employee(account_id)).await
    }

    async fn has_permission(&self, account_id: i64, permission: &str) -> HrResult<bool> {
        let span = info_span!("employee.has_permission", account_id, permission);
        observe(span, self.inner.has_permission(account_id, permission)).await
    }

    async fn require_permission(&self, account_id: i64, permission: &str) -> HrResult<()> {
        let span = info_span!("employee.require_permission", account_id, permission);
        observe(span, self.inner.require_permission(account_id, permission)).await
    }
}
