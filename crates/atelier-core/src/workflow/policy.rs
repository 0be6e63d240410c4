//! Operator-editable authorization tables.
//!
//! A policy file overrides the built-in defaults key by key:
//!
//! ```toml
//! [roles]
//! editor = ["manage_own_content", "edit_others_content", "submit_for_approval"]
//!
//! [scopes]
//! manage_own_content = "own"
//!
//! [[approval_rules]]
//! content_type = "service"
//! action = "create"
//! permissions = ["manage_services"]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AtelierError;
use crate::workflow::content::ContentType;
use crate::workflow::gateway::ApprovalRules;
use crate::workflow::permissions::{PermissionModel, Role, Scope};
use crate::workflow::submission::Action;

/// Effective role table, scope table and approval rules.
#[derive(Debug, Clone, Default)]
pub struct Policy {
    pub permissions: PermissionModel,
    pub approvals: ApprovalRules,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct PolicyFile {
    #[serde(default)]
    roles: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    scopes: BTreeMap<String, Scope>,
    #[serde(default)]
    approval_rules: Vec<ApprovalRuleEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ApprovalRuleEntry {
    content_type: ContentType,
    action: Action,
    permissions: Vec<String>,
}

impl Policy {
    /// Defaults with the overrides of a TOML document applied.
    pub fn from_toml_str(source: &str) -> Result<Self, AtelierError> {
        let file: PolicyFile = toml::from_str(source)
            .map_err(|e| AtelierError::Configuration(format!("Invalid policy file: {}", e)))?;

        let mut policy = Policy::default();
        for (name, permissions) in file.roles {
            let role: Role = name.parse().map_err(|_| {
                AtelierError::Configuration(format!("Unknown role '{}' in policy file", name))
            })?;
            policy.permissions.set_role_permissions(role, permissions);
        }
        for (permission, scope) in file.scopes {
            policy.permissions.set_scope(permission, scope);
        }
        for role in Role::ALL {
            for permission in policy.permissions.role_permissions(role) {
                if !policy.permissions.has_scope_entry(&permission) {
                    tracing::warn!(%role, %permission, "permission has no [scopes] entry; treating it as own-scope");
                }
            }
        }
        for rule in file.approval_rules {
            policy
                .approvals
                .set(rule.content_type, rule.action, rule.permissions);
        }
        Ok(policy)
    }

    /// Read and apply a policy file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AtelierError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            AtelierError::Configuration(format!("Cannot read policy file {}: {}", path.display(), e))
        })?;
        let policy = Self::from_toml_str(&source)?;
        tracing::info!(path = %path.display(), "policy file loaded");
        Ok(policy)
    }

    /// Render every effective entry as a policy file.
    pub fn to_toml(&self) -> Result<String, AtelierError> {
        let roles = Role::ALL
            .into_iter()
            .map(|role| {
                let perms = self.permissions.role_permissions(role).into_iter().collect();
                (role.to_string(), perms)
            })
            .collect();
        let scopes = self
            .permissions
            .scopes()
            .map(|(name, scope)| (name.to_string(), scope))
            .collect();
        let mut approval_rules = Vec::new();
        for content_type in ContentType::ALL {
            for action in Action::ALL {
                approval_rules.push(ApprovalRuleEntry {
                    content_type,
                    action,
                    permissions: self
                        .approvals
                        .direct_grants(content_type, action)
                        .into_iter()
                        .collect(),
                });
            }
        }

        toml::to_string_pretty(&PolicyFile {
            roles,
            scopes,
            approval_rules,
        })
        .map_err(|e| AtelierError::Internal(format!("Failed to render policy: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::permissions::names::*;

    #[test]
    fn test_empty_file_is_defaults() {
        let policy = Policy::from_toml_str("").unwrap();
        assert!(policy.permissions.has_permission(&[Role::Admin], MANAGE_ALL_CONTENT));
        assert_eq!(policy.approvals, ApprovalRules::default());
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let err = Policy::from_toml_str(
            r#"
            [[approval_rules]]
            content_type = "article"
            action = "publish"
            permissions = []
            "#,
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_rendered_policy_reloads_unchanged() {
        let mut policy = Policy::default();
        policy
            .approvals
            .set(ContentType::Team, Action::Delete, ["manage_team"]);
        let rendered = policy.to_toml().unwrap();
        let reloaded = Policy::from_toml_str(&rendered).unwrap();
        assert_eq!(reloaded.approvals, policy.approvals);
        for role in Role::ALL {
            assert_eq!(
                reloaded.permissions.role_permissions(role),
                policy.permissions.role_permissions(role)
            );
        }
    }
}
