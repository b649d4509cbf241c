use async_trait::async_trait;
use entity::employees::{self, Role};
use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    sea_query::Expr,
};

use crate::model::{Employee, NewEmployee, Permission, PermissionPatch};

/// Persistence boundary for employee rows. No business rules live here.
#[async_trait]
pub trait EmployeeStore: Send + Sync {
    /// Inserts a fully-populated row and returns the generated id.
    async fn create(&self, params: NewEmployee) -> Result<i32, DbErr>;

    async fn select_by_account(&self, account_id: i64) -> Result<Vec<Employee>, DbErr>;

    /// Newest first.
    async fn select_by_organization(&self, organization_id: i64) -> Result<Vec<Employee>, DbErr>;

    async fn update_permissions(
        &self,
        account_id: i64,
        patch: &PermissionPatch,
    ) -> Result<(), DbErr>;

    async fn update_role(&self, account_id: i64, role: Role) -> Result<(), DbErr>;

    async fn delete(&self, account_id: i64) -> Result<(), DbErr>;
}

#[derive(Clone, Debug)]
pub struct SeaOrmEmployeeStore {
    db: DatabaseConnection,
}

impl SeaOrmEmployeeStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn column_for(permission: Permission) -> employees::Column {
    match permission {
        Permission::RequiredModeration => employees::Column::RequiredModeration,
        Permission::Autoposting => employees::Column::AutopostingPermission,
        Permission::AddEmployee => employees::Column::AddEmployeePermission,
        Permission::EditEmployeePerm => employees::Column::EditEmployeePermPermission,
        Permission::TopUpBalance => employees::Column::TopUpBalancePermission,
        Permission::SignUpSocialNet => employees::Column::SignUpSocialNetPermission,
    }
}

#[async_trait]
impl EmployeeStore for SeaOrmEmployeeStore {
    async fn create(&self, params: NewEmployee) -> Result<i32, DbErr> {
        let flags = params.permissions;
        let model = employees::ActiveModel {
            id: NotSet,
            organization_id: Set(params.organization_id),
            invited_from_account_id: Set(params.invited_from_account_id),
            account_id: Set(params.account_id),
            required_moderation: Set(flags.required_moderation),
            autoposting_permission: Set(flags.autoposting_permission),
            add_employee_permission: Set(flags.add_employee_permission),
            edit_employee_perm_permission: Set(flags.edit_employee_perm_permission),
            top_up_balance_permission: Set(flags.top_up_balance_permission),
            sign_up_social_net_permission: Set(flags.sign_up_social_net_permission),
            name: Set(params.name),
            role: Set(params.role),
            created_at: NotSet,
        };
        let inserted = employees::Entity::insert(model).exec(&self.db).await?;
        Ok(inserted.last_insert_id)
    }

    async fn select_by_account(&self, account_id: i64) -> Result<Vec<Employee>, DbErr> {
        let rows = employees::Entity::find()
            .filter(employees::Column::AccountId.eq(account_id))
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Employee::from).collect())
    }

    async fn select_by_organization(&self, organization_id: i64) -> Result<Vec<Employee>, DbErr> {
        let rows = employees::Entity::find()
            .filter(employees::Column::OrganizationId.eq(organization_id))
            .order_by_desc(employees::Column::CreatedAt)
            .order_by_desc(employees::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Employee::from).collect())
    }

    async fn update_permissions(
        &self,
        account_id: i64,
        patch: &PermissionPatch,
    ) -> Result<(), DbErr> {
        if patch.is_empty() {
            return Ok(());
        }
        let update = patch.entries().fold(
            employees::Entity::update_many()
                .filter(employees::Column::AccountId.eq(account_id)),
            |update, (permission, value)| {
                update.col_expr(column_for(permission), Expr::value(value))
            },
        );
        update.exec(&self.db).await?;
        Ok(())
    }

    async fn update_role(&self, account_id: i64, role: Role) -> Result<(), DbErr> {
        employees::Entity::update_many()
            .col_expr(employees::Column::Role, Expr::value(role.as_str()))
            .filter(employees::Column::AccountId.eq(account_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn delete(&self, account_id: i64) -> Result<(), DbErr> {
        employees::Entity::delete_many()
            .filter(employees::Column::AccountId.eq(account_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
