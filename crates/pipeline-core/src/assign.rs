//! Assignee resolution for tasks created on a component.
//!
//! An explicit assignee must be a member of the component's account; without
//! one, the first member holding a role from the precedence list wins.

use crate::account::{Account, AccountUser};
use crate::error::{EngineError, Entity, Result};
use crate::paths::validate_id;
use crate::store::Store;
use crate::types::{Role, UserCommon};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentPolicy {
    /// Only this user id is acceptable; no fallback.
    Explicit(String),
    /// Roles tried in order; first member holding a role wins.
    RolePrecedence(Vec<Role>),
}

impl AssignmentPolicy {
    pub fn from_request(explicit: Option<&str>, precedence: &[Role]) -> Self {
        match explicit {
            Some(id) => AssignmentPolicy::Explicit(id.to_string()),
            None => AssignmentPolicy::RolePrecedence(precedence.to_vec()),
        }
    }

    pub fn select<'a>(&self, account: &'a Account) -> Result<&'a AccountUser> {
        match self {
            AssignmentPolicy::Explicit(id) => {
                account
                    .find_user(id)
                    .ok_or_else(|| EngineError::AssigneeNotFound {
                        account_id: account.id.clone(),
                        assignee_id: id.clone(),
                    })
            }
            AssignmentPolicy::RolePrecedence(roles) => roles
                .iter()
                .find_map(|&role| account.first_with_role(role))
                .ok_or_else(|| EngineError::NoAssigneeFound {
                    account_id: account.id.clone(),
                }),
        }
    }
}

/// Load the account owning `component_id`.
pub fn owning_account(store: &dyn Store, component_id: &str) -> Result<Account> {
    store
        .find_account_owning_component(component_id)?
        .ok_or_else(|| EngineError::not_found(Entity::Account, component_id))
}

pub fn resolve_assignee(
    store: &dyn Store,
    component_id: &str,
    explicit: Option<&str>,
    precedence: &[Role],
) -> Result<UserCommon> {
    validate_id("component", component_id)?;
    if let Some(id) = explicit {
        validate_id("assignee", id)?;
    }
    let account = owning_account(store, component_id)?;
    let policy = AssignmentPolicy::from_request(explicit, precedence);
    let user = policy.select(&account)?;
    tracing::debug!(component_id, account_id = %account.id, assignee = %user.id, "resolved assignee");
    Ok(user.to_common())
}
