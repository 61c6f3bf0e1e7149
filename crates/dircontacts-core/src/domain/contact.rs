//! Contact records and groups in a target account's contact store

use super::classifier::Classifier;
use super::markers::Markers;
use super::newtypes::ResourceName;

/// Resource name of the built-in default contacts group.
pub const MY_CONTACTS_GROUP: &str = "contactGroups/myContacts";

/// Composite identity of a multivalued field entry: its value identity
/// together with its classifier.
pub type FieldKey = (String, Classifier);

/// Common view over every classified multivalued field.
///
/// Merge logic is written once against this trait and reused for emails,
/// phones, external IDs, addresses and IMs.
pub trait ClassifiedField: Clone {
    fn classifier(&self) -> &Classifier;

    /// The value part of the entry's identity.
    fn identity(&self) -> String;

    fn is_primary(&self) -> bool {
        false
    }

    fn set_primary(&mut self, _primary: bool) {}

    fn key(&self) -> FieldKey {
        (self.identity(), self.classifier().clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonName {
    pub given: Option<String>,
    pub family: Option<String>,
    pub full: Option<String>,
    pub suffix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress {
    pub address: String,
    pub classifier: Classifier,
    pub primary: bool,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNumber {
    pub number: String,
    pub classifier: Classifier,
    pub primary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalId {
    pub value: String,
    pub classifier: Classifier,
}

/// Postal address kept as a single formatted blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostalAddress {
    pub formatted: String,
    pub classifier: Classifier,
    pub primary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstantMessenger {
    pub address: String,
    pub protocol: Option<String>,
    pub classifier: Classifier,
    pub primary: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Organization {
    pub name: Option<String>,
    pub title: Option<String>,
    pub department: Option<String>,
    pub symbol: Option<String>,
    pub classifier: Option<Classifier>,
    pub primary: bool,
}

impl ClassifiedField for EmailAddress {
    fn classifier(&self) -> &Classifier {
        &self.classifier
    }
    fn identity(&self) -> String {
        self.address.clone()
    }
    fn is_primary(&self) -> bool {
        self.primary
    }
    fn set_primary(&mut self, primary: bool) {
        self.primary = primary;
    }
}

impl ClassifiedField for PhoneNumber {
    fn classifier(&self) -> &Classifier {
        &self.classifier
    }
    fn identity(&self) -> String {
        self.number.clone()
    }
    fn is_primary(&self) -> bool {
        self.primary
    }
    fn set_primary(&mut self, primary: bool) {
        self.primary = primary;
    }
}

impl ClassifiedField for ExternalId {
    fn classifier(&self) -> &Classifier {
        &self.classifier
    }
    fn identity(&self) -> String {
        self.value.clone()
    }
}

impl ClassifiedField for PostalAddress {
    fn classifier(&self) -> &Classifier {
        &self.classifier
    }
    fn identity(&self) -> String {
        self.formatted.clone()
    }
    fn is_primary(&self) -> bool {
        self.primary
    }
    fn set_primary(&mut self, primary: bool) {
        self.primary = primary;
    }
}

impl ClassifiedField for InstantMessenger {
    fn classifier(&self) -> &Classifier {
        &self.classifier
    }
    /// `protocol://address`
    fn identity(&self) -> String {
        format!(
            "{}://{}",
            self.protocol.as_deref().unwrap_or_default(),
            self.address
        )
    }
    fn is_primary(&self) -> bool {
        self.primary
    }
    fn set_primary(&mut self, primary: bool) {
        self.primary = primary;
    }
}

/// A contact in a target account's store, managed or not
///
/// `resource_name` and `etag` are `None` for drafts that have not been
/// written yet. Fields the system does not model (birthdays, photos and
/// the like) are never sent back on update, so they are preserved by the
/// store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactRecord {
    pub resource_name: Option<ResourceName>,
    pub etag: Option<String>,
    pub name: PersonName,
    pub notes: Option<String>,
    pub organization: Option<Organization>,
    /// Organizations beyond the first, carried through updates untouched.
    pub other_organizations: Vec<Organization>,
    pub emails: Vec<EmailAddress>,
    pub phones: Vec<PhoneNumber>,
    pub external_ids: Vec<ExternalId>,
    pub addresses: Vec<PostalAddress>,
    pub ims: Vec<InstantMessenger>,
    pub memberships: Vec<ResourceName>,
    pub markers: Markers,
}

impl ContactRecord {
    /// Full name for log lines.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.full.as_deref().unwrap_or("name unknown")
    }

    /// Store identifier for log lines.
    #[must_use]
    pub fn display_id(&self) -> &str {
        self.resource_name
            .as_ref()
            .map_or("(unsaved)", ResourceName::as_str)
    }

    #[must_use]
    pub fn is_member_of(&self, group: &ResourceName) -> bool {
        self.memberships.contains(group)
    }

    pub fn add_membership(&mut self, group: &ResourceName) {
        if !self.is_member_of(group) {
            self.memberships.push(group.clone());
        }
    }

    /// Append `suffix` to the name suffix and the full name.
    pub fn apply_rename_suffix(&mut self, suffix: &str) {
        self.name.suffix = Some(match self.name.suffix.as_deref() {
            Some(old) if !old.is_empty() => format!("{old} {suffix}"),
            _ => suffix.to_string(),
        });
        self.name.full = Some(match self.name.full.as_deref() {
            Some(full) if !full.is_empty() => format!("{full} {suffix}"),
            _ => suffix.to_string(),
        });
    }

    /// Clear the name suffix and rebuild the full name from given and
    /// family names.
    pub fn strip_rename_suffix(&mut self) {
        self.name.suffix = None;
        let rebuilt = [self.name.given.as_deref(), self.name.family.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !rebuilt.is_empty() {
            self.name.full = Some(rebuilt);
        }
    }
}

/// A contact group in a target account's store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactGroup {
    pub resource_name: ResourceName,
    pub title: String,
    pub markers: Markers,
}

impl ContactGroup {
    /// The built-in default contacts group.
    #[must_use]
    pub fn is_my_contacts(&self) -> bool {
        self.resource_name.as_str() == MY_CONTACTS_GROUP
    }
}
