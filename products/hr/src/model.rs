use std::{fmt, str::FromStr};

use chrono::{DateTime, FixedOffset};
use entity::employees::{self, Role};
use serde::{Deserialize, Serialize};

/// The six capability flags an employee can carry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Permission {
    RequiredModeration,
    Autoposting,
    AddEmployee,
    EditEmployeePerm,
    TopUpBalance,
    SignUpSocialNet,
}

impl Permission {
    pub const ALL: [Permission; 6] = [
        Permission::RequiredModeration,
        Permission::Autoposting,
        Permission::AddEmployee,
        Permission::EditEmployeePerm,
        Permission::TopUpBalance,
        Permission::SignUpSocialNet,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Permission::RequiredModeration => "required_moderation",
            Permission::Autoposting => "autoposting_permission",
            Permission::AddEmployee => "add_employee_permission",
            Permission::EditEmployeePerm => "edit_employee_perm_permission",
            Permission::TopUpBalance => "top_up_balance_permission",
            Permission::SignUpSocialNet => "sign_up_social_net_permission",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPermission(pub String);

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPermission(s.to_string()))
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionFlags {
    pub required_moderation: bool,
    pub autoposting_permission: bool,
    pub add_employee_permission: bool,
    pub edit_employee_perm_permission: bool,
    pub top_up_balance_permission: bool,
    pub sign_up_social_net_permission: bool,
}

impl PermissionFlags {
    /// Flags a freshly created employee starts with. Admins get everything except moderation.
    pub fn defaults_for(role: Role) -> Self {
        match role {
            Role::Admin => Self {
                required_moderation: false,
                autoposting_permission: true,
                add_employee_permission: true,
                edit_employee_perm_permission: true,
                top_up_balance_permission: true,
                sign_up_social_net_permission: true,
            },
            Role::Moderator | Role::Employee => Self::default(),
        }
    }

    pub fn get(&self, permission: Permission) -> bool {
        match permission {
            Permission::RequiredModeration => self.required_moderation,
            Permission::Autoposting => self.autoposting_permission,
            Permission::AddEmployee => self.add_employee_permission,
            Permission::EditEmployeePerm => self.edit_employee_perm_permission,
            Permission::TopUpBalance => self.top_up_balance_permission,
            Permission::SignUpSocialNet => self.sign_up_social_net_permission,
        }
    }

    fn slot(&mut self, permission: Permission) -> &mut bool {
        match permission {
            Permission::RequiredModeration => &mut self.required_moderation,
            Permission::Autoposting => &mut self.autoposting_permission,
            Permission::AddEmployee => &mut self.add_employee_permission,
            Permission::EditEmployeePerm => &mut self.edit_employee_perm_permission,
            Permission::TopUpBalance => &mut self.top_up_balance_permission,
            Permission::SignUpSocialNet => &mut self.sign_up_social_net_permission,
        }
    }

    pub fn apply(&mut self, patch: &PermissionPatch) {
        for (permission, value) in patch.entries() {
            *self.slot(permission) = value;
        }
    }
}

/// Sparse flag update: only `Some` fields are written.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionPatch {
    #[serde(default)]
    pub required_moderation: Option<bool>,
    #[serde(default)]
    pub autoposting_permission: Option<bool>,
    #[serde(default)]
    pub add_employee_permission: Option<bool>,
    #[serde(default)]
    pub edit_employee_perm_permission: Option<bool>,
    #[serde(default)]
    pub top_up_balance_permission: Option<bool>,
    #[serde(default)]
    pub sign_up_social_net_permission: Option<bool>,
}

impl PermissionPatch {
    pub fn set(mut self, permission: Permission, value: bool) -> Self {
        let slot = match permission {
            Permission::RequiredModeration => &mut self.required_moderation,
            Permission::Autoposting => &mut self.autoposting_permission,
            Permission::AddEmployee => &mut self.add_employee_permission,
            Permission::EditEmployeePerm => &mut self.edit_employee_perm_permission,
            Permission::TopUpBalance => &mut self.top_up_balance_permission,
            Permission::SignUpSocialNet => &mut self.sign_up_social_net_permission,
        };
        *slot = Some(value);
        self
    }

    pub fn get(&self, permission: Permission) -> Option<bool> {
        match permission {
            Permission::RequiredModeration => self.required_moderation,
            Permission::Autoposting => self.autoposting_permission,
            Permission::AddEmployee => self.add_employee_permission,
            Permission::EditEmployeePerm => self.edit_employee_perm_permission,
            Permission::TopUpBalance => self.top_up_balance_permission,
            Permission::SignUpSocialNet => self.sign_up_social_net_permission,
        }
    }

    /// Present fields only, in declaration order.
    pub fn entries(&self) -> impl Iterator<Item = (Permission, bool)> + '_ {
        Permission::ALL
            .into_iter()
            .filter_map(|p| self.get(p).map(|value| (p, value)))
    }

    pub fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Employee {
    pub id: i32,
    pub organization_id: i64,
    pub invited_from_account_id: i64,
    pub account_id: i64,
    #[serde(flatten)]
    pub permissions: PermissionFlags,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<FixedOffset>,
}

impl From<employees::Model> for Employee {
    fn from(row: employees::Model) -> Self {
        Self {
            id: row.id,
            organization_id: row.organization_id,
            invited_from_account_id: row.invited_from_account_id,
            account_id: row.account_id,
            permissions: PermissionFlags {
                required_moderation: row.required_moderation,
                autoposting_permission: row.autoposting_permission,
                add_employee_permission: row.add_employee_permission,
                edit_employee_perm_permission: row.edit_employee_perm_permission,
                top_up_balance_permission: row.top_up_balance_permission,
                sign_up_social_net_permission: row.sign_up_social_net_permission,
            },
            name: row.name,
            role: row.role,
            created_at: row.created_at,
        }
    }
}

/// Inbound request to add an employee. `invited_from_account_id == 0` means bootstrap.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CreateEmployee {
    pub organization_id: i64,
    pub invited_from_account_id: i64,
    pub account_id: i64,
    pub name: String,
    pub role: Role,
}

/// Fully-formed row parameters handed to the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewEmployee {
    pub organization_id: i64,
    pub invited_from_account_id: i64,
    pub account_id: i64,
    pub name: String,
    pub role: Role,
    pub permissions: PermissionFlags,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_defaults_skip_moderation_only() {
        let flags = PermissionFlags::defaults_for(Role::Admin);
        assert!(!flags.required_moderation);
        for p in Permission::ALL
            .into_iter()
            .filter(|p| *p != Permission::RequiredModeration)
        {
            assert!(flags.get(p), "{p} should default on for admins");
        }
    }

    #[test]
    fn non_admin_defaults_are_all_off() {
        for role in [Role::Moderator, Role::Employee] {
            assert_eq!(PermissionFlags::defaults_for(role), PermissionFlags::default());
        }
    }

    #[test]
    fn permission_names_parse_back() {
        for p in Permission::ALL {
            assert_eq!(p.as_str().parse::<Permission>(), Ok(p));
        }
        assert!("delete_everything".parse::<Permission>().is_err());
    }

    #[test]
    fn patch_touches_only_present_fields() {
        let mut flags = PermissionFlags {
            top_up_balance_permission: true,
            ..PermissionFlags::default()
        };
        let patch = PermissionPatch::default().set(Permission::Autoposting, true);
        flags.apply(&patch);
        assert!(flags.autoposting_permission);
        assert!(flags.top_up_balance_permission);
        assert!(!flags.add_employee_permission);
        assert_eq!(patch.entries().count(), 1);
    }

    #[test]
    fn empty_patch_deserializes_from_empty_object() {
        let patch: PermissionPatch = serde_json::from_str("{}").unwrap();
        assert!(patch.is_empty());
        let patch: PermissionPatch =
            serde_json::from_str(r#"{"add_employee_permission": false}"#).unwrap();
        assert_eq!(patch.get(Permission::AddEmployee), Some(false));
    }
}
