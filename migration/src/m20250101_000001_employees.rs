use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Employees {
    Table,
    Id,
    OrganizationId,
    InvitedFromAccountId,
    AccountId,
    RequiredModeration,
    AutopostingPermission,
    AddEmployeePermission,
    EditEmployeePermPermission,
    TopUpBalancePermission,
    SignUpSocialNetPermission,
    Name,
    Role,
    CreatedAt,
}

const ORGANIZATION_INDEX: &str = "idx_employees_organization_id";
const ACCOUNT_INDEX: &str = "ux_employees_account_id";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Employees::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Employees::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Employees::OrganizationId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Employees::InvitedFromAccountId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Employees::AccountId).big_integer().not_null())
                    .col(&mut flag(Employees::RequiredModeration))
                    .col(&mut flag(Employees::AutopostingPermission))
                    .col(&mut flag(Employees::AddEmployeePermission))
                    .col(&mut flag(Employees::EditEmployeePermPermission))
                    .col(&mut flag(Employees::TopUpBalancePermission))
                    .col(&mut flag(Employees::SignUpSocialNetPermission))
                    .col(ColumnDef::new(Employees::Name).text().not_null())
                    .col(ColumnDef::new(Employees::Role).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Employees::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(ACCOUNT_INDEX)
                    .table(Employees::Table)
                    .col(Employees::AccountId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(ORGANIZATION_INDEX)
                    .table(Employees::Table)
                    .col(Employees::OrganizationId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(Employees::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}

fn flag(column: Employees) -> ColumnDef {
    ColumnDef::new(column)
        .boolean()
        .not_null()
        .default(false)
        .to_owned()
}
