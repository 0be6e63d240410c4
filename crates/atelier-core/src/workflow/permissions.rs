//! Roles, permission strings, and the role → permission table.
//!
//! Every authorization question in the workflow goes through
//! [`PermissionModel`]. Checks are pure: they read the table and the actor's
//! role set and never touch storage.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AtelierError;
use crate::workflow::content::ContentItem;

/// Permission names understood by the workflow.
pub mod names {
    pub const MANAGE_ALL_CONTENT: &str = "manage_all_content";
    pub const PUBLISH_CONTENT: &str = "publish_content";
    pub const APPROVE_CONTENT: &str = "approve_content";
    pub const DELETE_CONTENT: &str = "delete_content";
    pub const EDIT_OTHERS_CONTENT: &str = "edit_others_content";
    pub const SUBMIT_FOR_APPROVAL: &str = "submit_for_approval";
    pub const MANAGE_OWN_CONTENT: &str = "manage_own_content";
    pub const MANAGE_SERVICES: &str = "manage_services";
    pub const MANAGE_PORTFOLIO: &str = "manage_portfolio";
    pub const MANAGE_TESTIMONIALS: &str = "manage_testimonials";
    pub const MANAGE_TEAM: &str = "manage_team";
    pub const MANAGE_PRODUCTS: &str = "manage_products";
    pub const MANAGE_USERS: &str = "manage_users";
    pub const MANAGE_SETTINGS: &str = "manage_settings";
    pub const MODERATE_COMMENTS: &str = "moderate_comments";
    pub const VIEW_DASHBOARD: &str = "view_dashboard";

    /// Every permission the built-in table knows about.
    pub const ALL: &[&str] = &[
        MANAGE_ALL_CONTENT,
        PUBLISH_CONTENT,
        APPROVE_CONTENT,
        DELETE_CONTENT,
        EDIT_OTHERS_CONTENT,
        SUBMIT_FOR_APPROVAL,
        MANAGE_OWN_CONTENT,
        MANAGE_SERVICES,
        MANAGE_PORTFOLIO,
        MANAGE_TESTIMONIALS,
        MANAGE_TEAM,
        MANAGE_PRODUCTS,
        MANAGE_USERS,
        MANAGE_SETTINGS,
        MODERATE_COMMENTS,
        VIEW_DASHBOARD,
    ];
}

use names::*;

/// A capability tier held by a user.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Admin,
    Editor,
    Author,
    Moderator,
    Viewer,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Owner,
        Role::Admin,
        Role::Editor,
        Role::Author,
        Role::Moderator,
        Role::Viewer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Author => "author",
            Role::Moderator => "moderator",
            Role::Viewer => "viewer",
        }
    }

    /// Built-in permission list for this role.
    pub fn default_permissions(&self) -> Vec<&'static str> {
        match self {
            Role::Owner => ALL.to_vec(),
            Role::Admin => ALL
                .iter()
                .copied()
                .filter(|p| *p != MANAGE_SETTINGS)
                .collect(),
            Role::Editor => vec![
                EDIT_OTHERS_CONTENT,
                MANAGE_OWN_CONTENT,
                SUBMIT_FOR_APPROVAL,
                VIEW_DASHBOARD,
            ],
            Role::Author => vec![MANAGE_OWN_CONTENT, SUBMIT_FOR_APPROVAL, VIEW_DASHBOARD],
            Role::Moderator => vec![
                APPROVE_CONTENT,
                MODERATE_COMMENTS,
                MANAGE_TESTIMONIALS,
                VIEW_DASHBOARD,
            ],
            Role::Viewer => vec![VIEW_DASHBOARD],
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AtelierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| AtelierError::Validation(format!("unknown role '{s}'")))
    }
}

/// Whether a permission applies to any item or only to the actor's own items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Any,
    Own,
}

/// Built-in scope of a permission name. Names outside the built-in table are
/// own-scope until a policy file says otherwise.
pub fn default_scope(permission: &str) -> Scope {
    match permission {
        MANAGE_OWN_CONTENT | SUBMIT_FOR_APPROVAL => Scope::Own,
        p if ALL.contains(&p) => Scope::Any,
        _ => Scope::Own,
    }
}

/// The authenticated user an action is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub email: String,
    pub roles: Vec<Role>,
}

impl Actor {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        roles: Vec<Role>,
    ) -> Self {
        Actor {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            roles,
        }
    }
}

/// Role → permission and permission → scope tables.
#[derive(Debug, Clone)]
pub struct PermissionModel {
    role_permissions: HashMap<Role, BTreeSet<String>>,
    scopes: HashMap<String, Scope>,
}

impl Default for PermissionModel {
    fn default() -> Self {
        let role_permissions = Role::ALL
            .into_iter()
            .map(|role| {
                let perms = role
                    .default_permissions()
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                (role, perms)
            })
            .collect();
        let scopes = ALL
            .iter()
            .map(|p| (p.to_string(), default_scope(p)))
            .collect();
        PermissionModel {
            role_permissions,
            scopes,
        }
    }
}

impl PermissionModel {
    /// Replace the permission list of one role.
    pub fn set_role_permissions<I, S>(&mut self, role: Role, permissions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.role_permissions
            .insert(role, permissions.into_iter().map(Into::into).collect());
    }

    /// Override the scope of one permission.
    pub fn set_scope(&mut self, permission: impl Into<String>, scope: Scope) {
        self.scopes.insert(permission.into(), scope);
    }

    /// Permission list configured for a single role.
    pub fn role_permissions(&self, role: Role) -> BTreeSet<String> {
        self.role_permissions.get(&role).cloned().unwrap_or_default()
    }

    /// Entries of the scope table.
    pub fn scopes(&self) -> impl Iterator<Item = (&str, Scope)> {
        self.scopes.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Union of the permission lists of every held role.
    pub fn permissions_for_roles(&self, roles: &[Role]) -> BTreeSet<String> {
        roles
            .iter()
            .filter_map(|role| self.role_permissions.get(role))
            .flat_map(|perms| perms.iter().cloned())
            .collect()
    }

    /// Membership test on [`permissions_for_roles`](Self::permissions_for_roles).
    ///
    /// Unknown permission names are never granted.
    pub fn has_permission(&self, roles: &[Role], permission: &str) -> bool {
        roles.iter().any(|role| {
            self.role_permissions
                .get(role)
                .is_some_and(|perms| perms.contains(permission))
        })
    }

    pub fn has_scope_entry(&self, permission: &str) -> bool {
        self.scopes.contains_key(permission)
    }

    /// Scope of a permission. Names missing from the scope table fall back to
    /// [`default_scope`].
    pub fn scope_of(&self, permission: &str) -> Scope {
        self.scopes
            .get(permission)
            .copied()
            .unwrap_or_else(|| default_scope(permission))
    }

    /// True if the actor holds `permission` and either the permission is
    /// any-scope or the actor authored `item`.
    pub fn can_act_on_own_content(
        &self,
        actor: &Actor,
        item: &ContentItem,
        permission: &str,
    ) -> bool {
        if !self.has_permission(&actor.roles, permission) {
            return false;
        }
        match self.scope_of(permission) {
            Scope::Any => true,
            Scope::Own => item.author_id == actor.id,
        }
    }

    /// True if any of `permissions` lets the actor act on `item`.
    pub fn can_act_with_any(&self, actor: &Actor, item: &ContentItem, permissions: &[&str]) -> bool {
        permissions
            .iter()
            .any(|p| self.can_act_on_own_content(actor, item, p))
    }

    /// Check a permission or return `Unauthorized`.
    pub fn require(&self, actor: &Actor, permission: &str) -> Result<(), AtelierError> {
        if self.has_permission(&actor.roles, permission) {
            Ok(())
        } else {
            Err(AtelierError::Unauthorized(format!(
                "Permission '{}' required",
                permission
            )))
        }
    }

    /// Check that the actor holds at least one of the permissions.
    pub fn require_any(&self, actor: &Actor, permissions: &[&str]) -> Result<(), AtelierError> {
        if permissions
            .iter()
            .any(|p| self.has_permission(&actor.roles, p))
        {
            Ok(())
        } else {
            Err(AtelierError::Unauthorized(format!(
                "One of permissions {:?} required",
                permissions
            )))
        }
    }
}
