use crate::types::{Role, UserCommon, UserKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountUser {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl AccountUser {
    pub fn new(id: impl Into<String>, name: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            roles,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn to_common(&self) -> UserCommon {
        UserCommon {
            id: self.id.clone(),
            name: self.name.clone(),
            kind: UserKind::User,
        }
    }
}

/// A customer account. Users are members, not owned; components are
/// referenced by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub users: Vec<AccountUser>,
    #[serde(default)]
    pub component_ids: Vec<String>,
}

impl Account {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            users: Vec::new(),
            component_ids: Vec::new(),
        }
    }

    pub fn owns(&self, component_id: &str) -> bool {
        self.component_ids.iter().any(|c| c == component_id)
    }

    pub fn find_user(&self, user_id: &str) -> Option<&AccountUser> {
        self.users.iter().find(|u| u.id == user_id)
    }

    /// First member holding `role`, in roster order.
    pub fn first_with_role(&self, role: Role) -> Option<&AccountUser> {
        self.users.iter().find(|u| u.has_role(role))
    }

    pub fn roster(&self) -> Vec<UserCommon> {
        self.users.iter().map(AccountUser::to_common).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> Account {
        let mut a = Account::new("acc-1", "Acme");
        a.users.push(AccountUser::new("u1", "Ann", vec![Role::Sales]));
        a.users.push(AccountUser::new("u2", "Bob", vec![Role::Client]));
        a.users
            .push(AccountUser::new("u3", "Cid", vec![Role::Client, Role::Assistant]));
        a.component_ids.push("c1".into());
        a
    }

    #[test]
    fn first_with_role_uses_roster_order() {
        let a = account();
        assert_eq!(a.first_with_role(Role::Client).unwrap().id, "u2");
        assert_eq!(a.first_with_role(Role::Assistant).unwrap().id, "u3");
        assert!(a.first_with_role(Role::Admin).is_none());
    }

    #[test]
    fn owns_checks_component_back_references() {
        let a = account();
        assert!(a.owns("c1"));
        assert!(!a.owns("c2"));
    }

    #[test]
    fn roster_projects_users() {
        let roster = account().roster();
        assert_eq!(roster.len(), 3);
        assert!(roster.iter().all(|u| u.kind == UserKind::User));
    }
}
