//! Directory user records
//!
//! [`DirectoryRecord`] mirrors the user resource returned by the
//! organizational directory. Every nested collection defaults to empty and
//! every scalar is optional, so records with partial data deserialize
//! cleanly. Callers read through the accessor methods, which treat an empty
//! string the same as an absent value.

use serde::{Deserialize, Serialize};

use super::classifier::EMPLOYEE_ID_LABEL;

/// One directory user, as listed by the directory source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DirectoryRecord {
    pub primary_email: Option<String>,
    pub name: Option<DirectoryName>,
    pub aliases: Vec<String>,
    pub non_editable_aliases: Vec<String>,
    pub emails: Vec<DirectoryEmail>,
    pub organizations: Vec<DirectoryOrganization>,
    pub phones: Vec<DirectoryPhone>,
    pub addresses: Vec<DirectoryAddress>,
    pub ims: Vec<DirectoryIm>,
    pub external_ids: Vec<DirectoryExternalId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DirectoryName {
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DirectoryEmail {
    pub address: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub custom_type: Option<String>,
    pub primary: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DirectoryOrganization {
    pub name: Option<String>,
    pub title: Option<String>,
    pub department: Option<String>,
    pub symbol: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub custom_type: Option<String>,
    pub primary: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DirectoryPhone {
    pub value: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub custom_type: Option<String>,
    pub primary: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DirectoryAddress {
    /// Unstructured address blob; structured parts are not carried
    pub formatted: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub custom_type: Option<String>,
    pub primary: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DirectoryIm {
    pub im: Option<String>,
    pub protocol: Option<String>,
    pub custom_protocol: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub custom_type: Option<String>,
    pub primary: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DirectoryExternalId {
    pub value: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub custom_type: Option<String>,
}

/// Returns the string when present and non-empty.
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl DirectoryRecord {
    #[must_use]
    pub fn primary_email(&self) -> Option<&str> {
        non_empty(&self.primary_email)
    }

    #[must_use]
    pub fn given_name(&self) -> Option<&str> {
        self.name.as_ref().and_then(|n| non_empty(&n.given_name))
    }

    #[must_use]
    pub fn family_name(&self) -> Option<&str> {
        self.name.as_ref().and_then(|n| non_empty(&n.family_name))
    }

    #[must_use]
    pub fn full_name(&self) -> Option<&str> {
        self.name.as_ref().and_then(|n| non_empty(&n.full_name))
    }

    /// The employee identifier: the first external ID whose custom type
    /// is `Employee ID` and whose value is non-empty.
    #[must_use]
    pub fn employee_id(&self) -> Option<&str> {
        self.external_ids
            .iter()
            .filter(|ext| ext.custom_type.as_deref() == Some(EMPLOYEE_ID_LABEL))
            .find_map(|ext| non_empty(&ext.value))
    }

    /// True when at least one phone carries a non-empty value.
    #[must_use]
    pub fn has_phone(&self) -> bool {
        self.phones.iter().any(|p| non_empty(&p.value).is_some())
    }

    /// The organization to copy: the first flagged primary, else the first.
    #[must_use]
    pub fn selected_organization(&self) -> Option<&DirectoryOrganization> {
        self.organizations
            .iter()
            .find(|org| org.primary)
            .or_else(|| self.organizations.first())
    }
}
