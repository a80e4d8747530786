//! Requester identity and the access predicate.
//!
//! The predicate lives here, in one place, so the security trimmer and the
//! index filter push-down can never disagree about what "allowed" means.

use serde::{Deserialize, Serialize};

use crate::fragment::{FragmentMetadata, Sensitivity};

/// Coarse clearance tier carried on the profile. Not consulted by the ACL
/// predicate; reserved for the auth layer's own checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Clearance {
    #[default]
    Standard,
    Elevated,
}

/// Requester identity, supplied per request by the auth layer.
/// Never persisted by this core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AccessProfile {
    pub user_id: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub clearance: Clearance,
}

impl AccessProfile {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    pub fn with_groups(mut self, groups: Vec<String>) -> Self {
        self.groups = groups;
        self
    }

    /// Derive the filter pushed down to the vector/sparse indexes.
    pub fn filter(&self) -> AccessFilter {
        AccessFilter {
            user_id: self.user_id.clone(),
            roles: self.roles.clone(),
            groups: self.groups.clone(),
        }
    }
}

/// The predicate pushed down to index searches as a pre-filter, and
/// re-applied by the trimmer afterwards (defense in depth — push-down is an
/// optimization, never a substitute).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AccessFilter {
    pub user_id: String,
    pub roles: Vec<String>,
    pub groups: Vec<String>,
}

impl AccessFilter {
    /// The access rule: public fragments are always visible; restricted
    /// fragments require an explicit grant on at least one ACL dimension.
    /// Empty ACL lists on the fragment grant nothing (fail-closed).
    pub fn allows(&self, metadata: &FragmentMetadata) -> bool {
        if metadata.sensitivity == Sensitivity::Public {
            return true;
        }
        if metadata.acl_users.iter().any(|u| u == &self.user_id) {
            return true;
        }
        if self
            .roles
            .iter()
            .any(|r| metadata.acl_roles.iter().any(|ar| ar == r))
        {
            return true;
        }
        self.groups
            .iter()
            .any(|g| metadata.acl_groups.iter().any(|ag| ag == g))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn restricted(roles: &[&str], groups: &[&str], users: &[&str]) -> FragmentMetadata {
        FragmentMetadata {
            sensitivity: Sensitivity::Restricted,
            acl_roles: roles.iter().map(|s| s.to_string()).collect(),
            acl_groups: groups.iter().map(|s| s.to_string()).collect(),
            acl_users: users.iter().map(|s| s.to_string()).collect(),
            extra: Default::default(),
        }
    }

    #[test]
    fn public_is_always_allowed() {
        let filter = AccessProfile::new("nobody").filter();
        assert!(filter.allows(&FragmentMetadata::default()));
    }

    #[test]
    fn restricted_with_empty_acls_denies_everyone() {
        let filter = AccessProfile::new("admin")
            .with_roles(vec!["admin".into()])
            .filter();
        assert!(!filter.allows(&restricted(&[], &[], &[])));
    }

    #[test]
    fn role_intersection_grants() {
        let meta = restricted(&["eng"], &[], &[]);
        let eng = AccessProfile::new("u1").with_roles(vec!["eng".into()]);
        let sales = AccessProfile::new("u2").with_roles(vec!["sales".into()]);
        assert!(eng.filter().allows(&meta));
        assert!(!sales.filter().allows(&meta));
    }

    #[test]
    fn user_grant_wins_without_roles() {
        let meta = restricted(&["eng"], &[], &["u7"]);
        let filter = AccessProfile::new("u7").filter();
        assert!(filter.allows(&meta));
    }

    #[test]
    fn group_intersection_grants() {
        let meta = restricted(&[], &["platform"], &[]);
        let filter = AccessProfile::new("u1")
            .with_groups(vec!["platform".into()])
            .filter();
        assert!(filter.allows(&meta));
    }
}
