use std::sync::Arc;

use async_trait::async_trait;
use entity::employees::Role;
use tracing::{info, warn};

use crate::{
    error::{HrError, HrResult},
    model::{CreateEmployee, Employee, NewEmployee, Permission, PermissionFlags, PermissionPatch},
    notify::{EmployeeAdded, EmployeeNotifier},
    store::EmployeeStore,
};

/// Inviter id used to seed the first admin of an organization; skips the permission check.
pub const BOOTSTRAP_INVITER: i64 = 0;

/// Operations the endpoint layer consumes. Every key is an `account_id`.
#[async_trait]
pub trait EmployeeApi: Send + Sync {
    async fn create_employee(&self, request: CreateEmployee) -> HrResult<i32>;

    async fn get_employee(&self, account_id: i64) -> HrResult<Employee>;

    async fn get_employees_by_organization(&self, organization_id: i64)
    -> HrResult<Vec<Employee>>;

    async fn update_employee_permissions(
        &self,
        account_id: i64,
        patch: PermissionPatch,
    ) -> HrResult<()>;

    async fn update_employee_role(&self, account_id: i64, role: Role) -> HrResult<()>;

    async fn delete_employee(&self, account_id: i64) -> HrResult<()>;

    /// Pure query: only fails when the employee does not exist.
    async fn has_permission(&self, account_id: i64, permission: &str) -> HrResult<bool>;

    /// Gate: fails with `InsufficientPermissions` when the capability is not granted.
    async fn require_permission(&self, account_id: i64, permission: &str) -> HrResult<()>;

    /// Enforcing check that reports `true` once the gate passes.
    async fn check_employee_permission(&self, account_id: i64, permission: &str) -> HrResult<bool> {
        self.require_permission(account_id, permission)
            .await
            .map(|()| true)
    }
}

pub struct EmployeeService {
    store: Arc<dyn EmployeeStore>,
    notifier: Arc<dyn EmployeeNotifier>,
}

impl EmployeeService {
    pub fn new(store: Arc<dyn EmployeeStore>, notifier: Arc<dyn EmployeeNotifier>) -> Self {
        Self { store, notifier }
    }

    async fn find(&self, account_id: i64) -> HrResult<Employee> {
        match self.store.select_by_account(account_id).await?.into_iter().next() {
            Some(employee) => Ok(employee),
            None => {
                warn!(account_id, "employee not found");
                Err(HrError::EmployeeNotFound { account_id })
            }
        }
    }

    /// Admins pass every check; unknown names resolve to "not granted".
    async fn resolve(&self, account_id: i64, permission: &str) -> HrResult<bool> {
        let employee = self.find(account_id).await?;
        if employee.role.is_admin() {
            return Ok(true);
        }
        Ok(permission
            .parse::<Permission>()
            .map(|p| employee.permissions.get(p))
            .unwrap_or(false))
    }
}

#[async_trait]
impl EmployeeApi for EmployeeService {
    async fn create_employee(&self, request: CreateEmployee) -> HrResult<i32> {
        if request.invited_from_account_id != BOOTSTRAP_INVITER {
            self.require_permission(
                request.invited_from_account_id,
                Permission::AddEmployee.as_str(),
            )
            .await?;
        }

        let permissions = PermissionFlags::defaults_for(request.role);
        let id = self
            .store
            .create(NewEmployee {
                organization_id: request.organization_id,
                invited_from_account_id: request.invited_from_account_id,
                account_id: request.account_id,
                name: request.name.clone(),
                role: request.role,
                permissions,
            })
            .await?;
        info!(
            id,
            account_id = request.account_id,
            organization_id = request.organization_id,
            role = %request.role,
            "employee created"
        );

        // Creation is committed at this point; a failed hook must not undo it.
        let event = EmployeeAdded {
            account_id: request.account_id,
            organization_id: request.organization_id,
            employee_name: request.name,
            role: request.role,
        };
        if let Err(err) = self.notifier.notify_employee_added(&event).await {
            warn!(
                account_id = event.account_id,
                error = %err,
                "employee-added notification failed"
            );
        }

        Ok(id)
    }

    async fn get_employee(&self, account_id: i64) -> HrResult<Employee> {
        self.find(account_id).await
    }

    async fn get_employees_by_organization(
        &self,
        organization_id: i64,
    ) -> HrResult<Vec<Employee>> {
        Ok(self.store.select_by_organization(organization_id).await?)
    }

    async fn update_employee_permissions(
        &self,
        account_id: i64,
        patch: PermissionPatch,
    ) -> HrResult<()> {
        self.find(account_id).await?;
        if patch.is_empty() {
            return Ok(());
        }
        self.store.update_permissions(account_id, &patch).await?;
        Ok(())
    }

    async fn update_employee_role(&self, account_id: i64, role: Role) -> HrResult<()> {
        self.find(account_id).await?;
        self.store.update_role(account_id, role).await?;
        Ok(())
    }

    async fn delete_employee(&self, account_id: i64) -> HrResult<()> {
        self.find(account_id).await?;
        self.store.delete(account_id).await?;
        Ok(())
    }

    async fn has_permission(&self, account_id: i64, permission: &str) -> HrResult<bool> {
        self.resolve(account_id, permission).await
    }

    async fn require_permission(&self, account_id: i64, permission: &str) -> HrResult<()> {
        if self.resolve(account_id, permission).await? {
            return Ok(());
        }
        warn!(account_id, permission, "insufficient permissions");
        Err(HrError::InsufficientPermissions {
            account_id,
            permission: permission.to_string(),
        })
    }
}
