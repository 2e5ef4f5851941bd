use serde::{Deserialize, Serialize};

use abibridge_core::sha256_hex;

pub const ACTIVE_PERMISSION: &str = "active";
pub const OWNER_PERMISSION: &str = "owner";

/// One entry of an action's `authorization` list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorPermission {
    pub actor: String,
    pub permission: String,
}

impl ActorPermission {
    pub fn new(actor: impl Into<String>, permission: impl Into<String>) -> Self {
        ActorPermission {
            actor: actor.into(),
            permission: permission.into(),
        }
    }
}

/// A chain account the caller can act as. Key material stays with the
/// transport; the public key is only carried so a signer can be registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

impl Account {
    pub fn new(name: impl Into<String>) -> Self {
        Account {
            name: name.into(),
            public_key: None,
        }
    }

    pub fn with_public_key(mut self, public_key: impl Into<String>) -> Self {
        self.public_key = Some(public_key.into());
        self
    }

    /// Named after the public key, the way test accounts are created.
    pub fn from_public_key(public_key: impl Into<String>) -> Self {
        let public_key = public_key.into();
        Account {
            name: account_name_from_public_key(&public_key),
            public_key: Some(public_key),
        }
    }

    pub fn active(&self) -> Vec<ActorPermission> {
        vec![ActorPermission::new(&self.name, ACTIVE_PERMISSION)]
    }

    pub fn owner(&self) -> Vec<ActorPermission> {
        vec![ActorPermission::new(&self.name, OWNER_PERMISSION)]
    }
}

/// `l` followed by the first 11 hex digits of sha256(public_key), with the
/// digits that are not valid in account names (0, 6-9) mapped onto 1-5.
pub fn account_name_from_public_key(public_key: &str) -> String {
    let digest = sha256_hex(public_key.as_bytes());
    let mut name = String::with_capacity(12);
    name.push('l');
    for c in digest.chars().take(11) {
        name.push(match c {
            '0' => '1',
            '6' => '2',
            '7' => '3',
            '8' => '4',
            '9' => '5',
            other => other,
        });
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_names_are_valid_account_names() {
        let name = account_name_from_public_key("EOS6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5GDW5CV");
        assert_eq!(name.len(), 12);
        assert!(name.starts_with('l'));
        assert!(name
            .chars()
            .all(|c| c.is_ascii_lowercase() || ('1'..='5').contains(&c)));
        assert_eq!(
            name,
            account_name_from_public_key("EOS6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5GDW5CV")
        );
    }

    #[test]
    fn derived_name_matches_the_digest_prefix() {
        // sha256("") = e3b0c44298fc1c14...
        assert_eq!(account_name_from_public_key(""), "le3b1c44254f");
    }

    #[test]
    fn accounts_carry_the_key_they_were_derived_from() {
        let key = "EOS6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5GDW5CV";
        let derived = Account::from_public_key(key);
        assert_eq!(derived.name, account_name_from_public_key(key));
        assert_eq!(derived.public_key.as_deref(), Some(key));

        let named = Account::new("alice").with_public_key(key);
        assert_eq!(named.name, "alice");
        assert_eq!(named.public_key.as_deref(), Some(key));
        assert_eq!(
            serde_json::to_value(&Account::new("bob")).unwrap(),
            serde_json::json!({"name": "bob"})
        );
    }

    #[test]
    fn active_authorization_uses_the_account_name() {
        let acct = Account::new("alice");
        assert_eq!(acct.active(), vec![ActorPermission::new("alice", "active")]);
        assert_eq!(acct.owner()[0].permission, "owner");
    }
}
