//! Fleet accounts, role names and the account list file

use crate::error::ConfigError;
use garde::Validate;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Identifier of a fleet member account
///
/// Opaque to the fan-out; only checked for characters that would corrupt a
/// role ARN.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, derive_more::Display, derive_more::Deref,
)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Parse an account ID
    pub fn parse(s: impl Into<String>) -> Result<Self, ConfigError> {
        let s = s.into();
        if s.is_empty() || s.chars().any(|c| c.is_whitespace() || c == ':' || c == '/') {
            return Err(ConfigError::InvalidAccountId(s));
        }
        Ok(Self(s))
    }

    /// Get the account ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Name of the role assumed in every account
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display, derive_more::Deref)]
pub struct RoleName(String);

impl RoleName {
    /// Parse a role name (IAM allows `[\w+=,.@-]`, up to 64 characters)
    pub fn parse(s: impl Into<String>) -> Result<Self, ConfigError> {
        let s = s.into();
        let valid_char = |c: char| c.is_ascii_alphanumeric() || "_+=,.@-".contains(c);
        if s.is_empty() || s.len() > 64 || !s.chars().all(valid_char) {
            return Err(ConfigError::InvalidRoleName(s));
        }
        Ok(Self(s))
    }

    /// Get the role name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Build the ARN of `role` in `account`
pub fn role_arn(partition: &str, account: &AccountId, role: &RoleName) -> String {
    format!("arn:{partition}:iam::{account}:role/{role}")
}

/// On-disk shape of the account list
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
struct AccountsFile {
    #[garde(inner(length(min = 1)))]
    accounts: Vec<String>,
}

/// Ordered list of accounts to sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountList(Vec<AccountId>);

impl AccountList {
    /// Create an account list from already parsed IDs
    pub fn new(accounts: Vec<AccountId>) -> Self {
        Self(accounts)
    }

    /// Load the account list from a JSON file of the form
    /// `{"accounts": ["111111111111", ...]}`
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::io(path.display().to_string(), e))?;
        let list = Self::from_json(&contents)?;
        debug!(path = %path.display(), accounts = list.len(), "Loaded account list");
        Ok(list)
    }

    /// Parse the account list from a JSON document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let file: AccountsFile = serde_json::from_str(json)?;
        file.validate()?;

        file.accounts
            .into_iter()
            .map(AccountId::parse)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AccountId> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a AccountList {
    type Item = &'a AccountId;
    type IntoIter = std::slice::Iter<'a, AccountId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_id_display() {
        let account = AccountId::parse("123456789012").unwrap();
        assert_eq!(account.to_string(), "123456789012");
        assert_eq!(account.as_str(), "123456789012");
    }

    #[test]
    fn test_account_id_rejects_arn_breaking_chars() {
        for bad in ["", "1234 5678", "123:456", "123/456", "\t"] {
            assert!(
                matches!(AccountId::parse(bad), Err(ConfigError::InvalidAccountId(_))),
                "expected rejection of {bad:?}"
            );
        }
    }

    #[test]
    fn test_role_name_validation() {
        assert!(RoleName::parse("ebs_default_encryptioner").is_ok());
        assert!(RoleName::parse("OrgAccess+Role=,.@-").is_ok());
        assert!(RoleName::parse("").is_err());
        assert!(RoleName::parse("has space").is_err());
        assert!(RoleName::parse("path/role").is_err());
        assert!(RoleName::parse("r".repeat(65)).is_err());
    }

    #[test]
    fn test_role_arn() {
        let account = AccountId::parse("111111111111").unwrap();
        let role = RoleName::parse("ebs_default_encryptioner").unwrap();
        assert_eq!(
            role_arn("aws", &account, &role),
            "arn:aws:iam::111111111111:role/ebs_default_encryptioner"
        );
        assert_eq!(
            role_arn("aws-us-gov", &account, &role),
            "arn:aws-us-gov:iam::111111111111:role/ebs_default_encryptioner"
        );
    }

    #[test]
    fn test_from_json_preserves_order() {
        let list =
            AccountList::from_json(r#"{"accounts": ["222222222222", "111111111111"]}"#).unwrap();
        let ids: Vec<&str> = list.iter().map(AccountId::as_str).collect();
        assert_eq!(ids, vec!["222222222222", "111111111111"]);
    }

    #[test]
    fn test_from_json_empty_list() {
        let list = AccountList::from_json(r#"{"accounts": []}"#).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_from_json_malformed() {
        assert!(matches!(
            AccountList::from_json("{}"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            AccountList::from_json(r#"{"accounts": "111111111111"}"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            AccountList::from_json(r#"{"accounts": [], "extra": 1}"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            AccountList::from_json(r#"{"accounts": [""]}"#),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            AccountList::from_json(r#"{"accounts": ["111 111"]}"#),
            Err(ConfigError::InvalidAccountId(_))
        ));
    }
}
