// security/src/roles.rs

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use serde::Deserialize;
use serde_yaml2 as serde_yaml;

use models::medical::Role;

use crate::AuthError;

/// Permission names checked by the REST layer.
pub mod permissions {
    pub const PRESCRIPTIONS_CREATE: &str = "prescriptions:create";
    pub const PRESCRIPTIONS_REVIEW: &str = "prescriptions:review";
    pub const PRESCRIPTIONS_READ: &str = "prescriptions:read";
    pub const LAB_REPORTS_READ: &str = "lab_reports:read";
    pub const LAB_REPORTS_UPDATE: &str = "lab_reports:update";
    pub const MEDICINES_READ: &str = "medicines:read";
    pub const MEDICINES_MANAGE: &str = "medicines:manage";
    pub const MEDICINES_ISSUE: &str = "medicines:issue";
    pub const STUDENTS_READ: &str = "students:read";
    pub const AUDIT_READ: &str = "audit:read";
    /// System-wide counters. Staff only.
    pub const DASHBOARD_READ: &str = "dashboard:read";
    /// Grants everything.
    pub const SUPERUSER: &str = "superuser";
}

#[derive(Debug, Deserialize, Clone)]
pub struct RoleConfig {
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RolesFile {
    #[serde(default)]
    roles: HashMap<String, RoleConfig>,
}

/// Role to permission map.
#[derive(Debug, Clone)]
pub struct RolesConfig {
    roles: HashMap<Role, HashSet<String>>,
}

impl Default for RolesConfig {
    fn default() -> Self {
        use permissions::*;
        let table: [(Role, &[&str]); 6] = [
            (
                Role::Doctor,
                &[
                    PRESCRIPTIONS_READ,
                    PRESCRIPTIONS_REVIEW,
                    LAB_REPORTS_READ,
                    MEDICINES_READ,
                    STUDENTS_READ,
                    AUDIT_READ,
                    DASHBOARD_READ,
                ],
            ),
            (Role::Nurse, &[PRESCRIPTIONS_CREATE, PRESCRIPTIONS_READ, MEDICINES_READ, STUDENTS_READ, DASHBOARD_READ]),
            (
                Role::LabTechnician,
                &[LAB_REPORTS_READ, LAB_REPORTS_UPDATE, PRESCRIPTIONS_READ, STUDENTS_READ, DASHBOARD_READ],
            ),
            (
                Role::Pharmacist,
                &[PRESCRIPTIONS_READ, MEDICINES_READ, MEDICINES_MANAGE, MEDICINES_ISSUE, STUDENTS_READ, DASHBOARD_READ],
            ),
            (Role::Student, &[PRESCRIPTIONS_READ, LAB_REPORTS_READ, STUDENTS_READ]),
            (Role::Admin, &[SUPERUSER]),
        ];
        let roles = table
            .iter()
            .map(|(role, perms)| (*role, perms.iter().map(|p| p.to_string()).collect()))
            .collect();
        RolesConfig { roles }
    }
}

impl RolesConfig {
    /// Parses a `roles:` document. Roles it names replace the built-in
    /// entries; roles it omits keep them.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let mut config = RolesConfig::default();
        if content.trim().is_empty() {
            return Ok(config);
        }
        let file: RolesFile =
            serde_yaml::from_str(content).map_err(|e| anyhow::anyhow!("Invalid roles YAML: {}", e))?;
        for (name, role_config) in file.roles {
            let role = name.parse::<Role>().map_err(|e| anyhow::anyhow!("{}", e))?;
            config.roles.insert(role, role_config.permissions.into_iter().collect());
        }
        Ok(config)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).with_context(|| format!("Failed to read roles file {:?}", path))?;
        let config = Self::from_yaml_str(&content).with_context(|| format!("Failed to parse roles file {:?}", path))?;
        info!("Loaded role permissions from {:?}", path);
        Ok(config)
    }

    /// The built-in table, or the file's overrides when a path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_yaml_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn has_permission(&self, role: Role, permission: &str) -> bool {
        self.roles.get(&role).is_some_and(|perms| {
            perms.contains(permission) || perms.contains(permissions::SUPERUSER)
        })
    }

    pub fn require(&self, role: Role, permission: &str) -> Result<(), AuthError> {
        if self.has_permission(role, permission) {
            Ok(())
        } else {
            Err(AuthError::Forbidden { role, permission: permission.to_string() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::permissions::*;
    use super::*;

    #[test]
    fn default_table() {
        let roles = RolesConfig::default();
        assert!(roles.has_permission(Role::Nurse, PRESCRIPTIONS_CREATE));
        assert!(!roles.has_permission(Role::Nurse, PRESCRIPTIONS_REVIEW));
        assert!(roles.has_permission(Role::Pharmacist, MEDICINES_ISSUE));
        assert!(!roles.has_permission(Role::Doctor, MEDICINES_ISSUE));
        assert!(roles.has_permission(Role::LabTechnician, LAB_REPORTS_UPDATE));
        assert!(!roles.has_permission(Role::Student, MEDICINES_READ));
    }

    #[test]
    fn dashboard_is_staff_only() {
        let roles = RolesConfig::default();
        for role in [Role::Doctor, Role::Nurse, Role::LabTechnician, Role::Pharmacist, Role::Admin] {
            assert!(roles.has_permission(role, DASHBOARD_READ), "{:?}", role);
        }
        assert!(matches!(roles.require(Role::Student, DASHBOARD_READ), Err(AuthError::Forbidden { .. })));
    }

    #[test]
    fn superuser_grants_everything() {
        let roles = RolesConfig::default();
        assert!(roles.has_permission(Role::Admin, AUDIT_READ));
        assert!(roles.require(Role::Admin, "anything:else").is_ok());
    }

    #[test]
    fn yaml_overrides_named_roles_only() {
        let yaml = "roles:\n  nurse:\n    permissions:\n      - \"prescriptions:read\"\n";
        let roles = RolesConfig::from_yaml_str(yaml).unwrap();
        assert!(!roles.has_permission(Role::Nurse, PRESCRIPTIONS_CREATE));
        assert!(roles.has_permission(Role::Nurse, PRESCRIPTIONS_READ));
        assert!(roles.has_permission(Role::Doctor, PRESCRIPTIONS_REVIEW));
    }

    #[test]
    fn unknown_role_in_file_is_an_error() {
        assert!(RolesConfig::from_yaml_str("roles:\n  janitor:\n    permissions: []\n").is_err());
    }

    #[test]
    fn forbidden_names_role_and_permission() {
        let err = RolesConfig::default().require(Role::Student, MEDICINES_MANAGE).unwrap_err();
        assert_eq!(err, AuthError::Forbidden { role: Role::Student, permission: MEDICINES_MANAGE.into() });
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roles.yaml");
        fs::write(&path, "roles:\n  student:\n    permissions: [\"students:read\"]\n").unwrap();
        let roles = RolesConfig::load(Some(&path)).unwrap();
        assert!(!roles.has_permission(Role::Student, PRESCRIPTIONS_READ));
        assert!(RolesConfig::load(None).unwrap().has_permission(Role::Student, PRESCRIPTIONS_READ));
    }
}
