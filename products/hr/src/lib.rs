//! Employee lifecycle for an organization: who may invite whom, which capability flags a
//! member carries, and how role and flags interact on checks.

pub mod error;
pub mod model;
pub mod notify;
pub mod service;
pub mod store;
pub mod traced;

pub use entity::employees::Role;
pub use error::{HrError, HrResult};
pub use model::{CreateEmployee, Employee, NewEmployee, Permission, PermissionFlags, PermissionPatch};
pub use notify::{DisabledNotifier, EmployeeAdded, EmployeeNotifier, NotifyError, TgBotClient};
pub use service::{BOOTSTRAP_INVITER, EmployeeApi, EmployeeService};
pub use store::{EmployeeStore, SeaOrmEmployeeStore};
pub use traced::Traced;
