//! Item attributes and lookup queries

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::Accessibility;

/// Attributes of a stored generic-credential item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemAttributes {
    pub service: String,
    pub access_group: Option<String>,
    pub account: Vec<u8>,
    pub generic: Vec<u8>,
    pub accessible: Accessibility,
    pub synchronizable: bool,
}

impl ItemAttributes {
    /// Whether two items occupy the same slot in the store.
    ///
    /// Adding an item whose identity already exists is a duplicate.
    pub fn same_identity(&self, other: &ItemAttributes) -> bool {
        self.service == other.service
            && self.access_group == other.access_group
            && self.account == other.account
            && self.synchronizable == other.synchronizable
    }
}

/// A stored item with its payload
#[derive(Clone)]
pub struct Item {
    pub attributes: ItemAttributes,
    pub data: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Item")
            .field("attributes", &self.attributes)
            .field("data", &"[REDACTED]")
            .finish()
    }
}

/// How many items a lookup returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchLimit {
    One,
    All,
}

/// Attribute predicate; unset fields match anything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemQuery {
    pub service: Option<String>,
    pub access_group: Option<String>,
    pub account: Option<Vec<u8>>,
    pub generic: Option<Vec<u8>>,
    pub accessible: Option<Accessibility>,
    pub synchronizable: Option<bool>,
}

impl ItemQuery {
    /// Query every item of a service, optionally within one access group
    pub fn service(service: impl Into<String>, access_group: Option<String>) -> Self {
        Self {
            service: Some(service.into()),
            access_group,
            ..Self::default()
        }
    }

    /// Whether an item's attributes satisfy this query
    pub fn matches(&self, attributes: &ItemAttributes) -> bool {
        fn field<T: PartialEq + ?Sized>(wanted: Option<&T>, actual: &T) -> bool {
            wanted.map_or(true, |wanted| wanted == actual)
        }

        field(self.service.as_deref(), attributes.service.as_str())
            && self
                .access_group
                .as_ref()
                .map_or(true, |group| attributes.access_group.as_ref() == Some(group))
            && field(self.account.as_deref(), attributes.account.as_slice())
            && field(self.generic.as_deref(), attributes.generic.as_slice())
            && field(self.accessible.as_ref(), &attributes.accessible)
            && field(self.synchronizable.as_ref(), &attributes.synchronizable)
    }
}

impl From<&ItemAttributes> for ItemQuery {
    fn from(attributes: &ItemAttributes) -> Self {
        Self {
            service: Some(attributes.service.clone()),
            access_group: attributes.access_group.clone(),
            account: Some(attributes.account.clone()),
            generic: Some(attributes.generic.clone()),
            accessible: Some(attributes.accessible),
            synchronizable: Some(attributes.synchronizable),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attributes(account: &str) -> ItemAttributes {
        ItemAttributes {
            service: "svc".to_string(),
            access_group: None,
            account: account.as_bytes().to_vec(),
            generic: account.as_bytes().to_vec(),
            accessible: Accessibility::AfterFirstUnlock,
            synchronizable: false,
        }
    }

    #[test]
    fn test_exact_query_matches_own_item() {
        let item = attributes("foo");
        let query = ItemQuery::from(&item);

        assert!(query.matches(&item));
        assert!(!query.matches(&attributes("bar")));
    }

    #[test]
    fn test_service_query_matches_all_accounts() {
        let query = ItemQuery::service("svc", None);

        assert!(query.matches(&attributes("foo")));
        assert!(query.matches(&attributes("bar")));
        assert!(!ItemQuery::service("other", None).matches(&attributes("foo")));
    }

    #[test]
    fn test_access_group_narrows_match() {
        let mut grouped = attributes("foo");
        grouped.access_group = Some("group".to_string());

        assert!(ItemQuery::service("svc", Some("group".to_string())).matches(&grouped));
        assert!(!ItemQuery::service("svc", Some("group".to_string())).matches(&attributes("foo")));
        assert!(ItemQuery::service("svc", None).matches(&grouped));
    }

    #[test]
    fn test_accessibility_is_part_of_exact_query() {
        let item = attributes("foo");
        let mut other_tier = item.clone();
        other_tier.accessible = Accessibility::WhenUnlocked;

        assert!(!ItemQuery::from(&other_tier).matches(&item));
        assert!(item.same_identity(&other_tier));
    }

    #[test]
    fn test_item_debug_redacts_data() {
        let item = Item {
            attributes: attributes("foo"),
            data: Zeroizing::new(b"secret".to_vec()),
        };
        let debug = format!("{:?}", item);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("secret"));
    }
}
