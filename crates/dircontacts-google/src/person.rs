//! People API wire types
//!
//! [`Person`] and [`ContactGroupResource`] mirror the JSON resources of the
//! People API. The conversions to and from the domain types live here so
//! the store adapter only deals with requests.
//!
//! Field types travel as the wire strings of [`Classifier`]; an entry
//! without a type reads as an empty label and is written back without one.
//! Primary flags are read from `metadata.primary` and written as
//! `metadata.sourcePrimary`, the writable counterpart.

use serde::{Deserialize, Serialize};

use dircontacts_core::domain::{
    Classifier, ContactGroup, ContactRecord, EmailAddress, ExternalId, InstantMessenger, Markers,
    Organization, PersonName, PhoneNumber, PostalAddress, ResourceName,
};

/// Person fields read on every fetch
pub const PERSON_FIELDS: &str = "names,biographies,organizations,emailAddresses,phoneNumbers,\
externalIds,addresses,imClients,memberships,clientData";

/// Person fields written by updates; memberships are left alone
pub const UPDATE_PERSON_FIELDS: &str = "names,biographies,organizations,emailAddresses,\
phoneNumbers,externalIds,addresses,imClients,clientData";

/// Group fields read on every fetch
pub const GROUP_FIELDS: &str = "name,groupType,clientData";

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMetadata {
    /// Output only
    #[serde(default, skip_serializing)]
    pub primary: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub source_primary: bool,
}

impl FieldMetadata {
    fn is_primary(metadata: &Option<Self>) -> bool {
        metadata
            .as_ref()
            .is_some_and(|m| m.primary || m.source_primary)
    }

    fn for_primary(primary: bool) -> Option<Self> {
        primary.then(|| Self {
            primary: false,
            source_primary: true,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Name {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub honorific_suffix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unstructured_name: Option<String>,
    /// Output only
    #[serde(skip_serializing)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Biography {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonOrganization {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<FieldMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonEmail {
    pub value: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<FieldMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonPhone {
    pub value: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<FieldMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonExternalId {
    pub value: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonAddress {
    pub formatted_value: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<FieldMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImClient {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<FieldMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Membership {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_group_membership: Option<ContactGroupMembership>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactGroupMembership {
    pub contact_group_resource_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientData {
    pub key: String,
    pub value: String,
}

/// A People API person resource (the subset this crate reads and writes)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Person {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<Name>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub biographies: Vec<Biography>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub organizations: Vec<PersonOrganization>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub email_addresses: Vec<PersonEmail>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub phone_numbers: Vec<PersonPhone>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub external_ids: Vec<PersonExternalId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<PersonAddress>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub im_clients: Vec<ImClient>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub memberships: Vec<Membership>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub client_data: Vec<ClientData>,
}

/// A People API contact group resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactGroupResource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_type: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub client_data: Vec<ClientData>,
}

// ============================================================================
// Wire -> domain
// ============================================================================

fn classifier(kind: Option<&str>) -> Classifier {
    Classifier::from_wire(kind.unwrap_or_default())
}

fn wire_type(classifier: &Classifier) -> Option<String> {
    Some(classifier.wire_value())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn markers(client_data: Vec<ClientData>) -> Markers {
    client_data.into_iter().map(|d| (d.key, d.value)).collect()
}

fn client_data(markers: &Markers) -> Vec<ClientData> {
    markers
        .iter()
        .map(|(key, value)| ClientData {
            key: key.to_string(),
            value: value.to_string(),
        })
        .collect()
}

fn organization(org: PersonOrganization) -> Organization {
    Organization {
        primary: FieldMetadata::is_primary(&org.metadata),
        classifier: org.kind.as_deref().map(|k| classifier(Some(k))),
        name: org.name,
        title: org.title,
        department: org.department,
        symbol: org.symbol,
    }
}

impl From<Person> for ContactRecord {
    fn from(person: Person) -> Self {
        let name = person
            .names
            .into_iter()
            .next()
            .map(|n| PersonName {
                given: n.given_name,
                family: n.family_name,
                full: n.unstructured_name.or(n.display_name),
                suffix: n.honorific_suffix,
            })
            .unwrap_or_default();

        let mut organizations: Vec<Organization> =
            person.organizations.into_iter().map(organization).collect();
        let selected = organizations
            .iter()
            .position(|o| o.primary)
            .unwrap_or(0);
        let organization = (!organizations.is_empty()).then(|| organizations.remove(selected));

        Self {
            resource_name: person.resource_name.and_then(|r| ResourceName::new(r).ok()),
            etag: person.etag,
            name,
            notes: person
                .biographies
                .into_iter()
                .next()
                .map(|b| b.value)
                .filter(|v| !v.is_empty()),
            organization,
            other_organizations: organizations,
            emails: person
                .email_addresses
                .into_iter()
                .map(|e| EmailAddress {
                    classifier: classifier(e.kind.as_deref()),
                    primary: FieldMetadata::is_primary(&e.metadata),
                    address: e.value,
                    display_name: e.display_name,
                })
                .collect(),
            phones: person
                .phone_numbers
                .into_iter()
                .map(|p| PhoneNumber {
                    classifier: classifier(p.kind.as_deref()),
                    primary: FieldMetadata::is_primary(&p.metadata),
                    number: p.value,
                })
                .collect(),
            external_ids: person
                .external_ids
                .into_iter()
                .map(|x| ExternalId {
                    classifier: classifier(x.kind.as_deref()),
                    value: x.value,
                })
                .collect(),
            addresses: person
                .addresses
                .into_iter()
                .map(|a| PostalAddress {
                    classifier: classifier(a.kind.as_deref()),
                    primary: FieldMetadata::is_primary(&a.metadata),
                    formatted: a.formatted_value,
                })
                .collect(),
            ims: person
                .im_clients
                .into_iter()
                .map(|im| InstantMessenger {
                    classifier: classifier(im.kind.as_deref()),
                    primary: FieldMetadata::is_primary(&im.metadata),
                    address: im.username,
                    protocol: im.protocol,
                })
                .collect(),
            memberships: person
                .memberships
                .into_iter()
                .filter_map(|m| m.contact_group_membership)
                .filter_map(|m| ResourceName::new(m.contact_group_resource_name).ok())
                .collect(),
            markers: markers(person.client_data),
        }
    }
}

impl ContactGroupResource {
    /// `None` for groups without a resource name
    pub fn into_group(self) -> Option<ContactGroup> {
        Some(ContactGroup {
            resource_name: ResourceName::new(self.resource_name?).ok()?,
            title: self.name,
            markers: markers(self.client_data),
        })
    }
}

// ============================================================================
// Domain -> wire
// ============================================================================

fn person_organization(org: &Organization) -> PersonOrganization {
    PersonOrganization {
        name: org.name.clone(),
        title: org.title.clone(),
        department: org.department.clone(),
        symbol: org.symbol.clone(),
        kind: org.classifier.as_ref().and_then(wire_type),
        metadata: FieldMetadata::for_primary(org.primary),
    }
}

impl From<&ContactRecord> for Person {
    fn from(contact: &ContactRecord) -> Self {
        let name = &contact.name;
        let has_name = [&name.given, &name.family, &name.full, &name.suffix]
            .iter()
            .any(|part| part.is_some());

        Self {
            resource_name: contact
                .resource_name
                .as_ref()
                .map(|r| r.as_str().to_string()),
            etag: contact.etag.clone(),
            names: has_name
                .then(|| Name {
                    given_name: name.given.clone(),
                    family_name: name.family.clone(),
                    honorific_suffix: name.suffix.clone(),
                    unstructured_name: name.full.clone(),
                    display_name: None,
                })
                .into_iter()
                .collect(),
            biographies: contact
                .notes
                .iter()
                .map(|notes| Biography {
                    value: notes.clone(),
                    content_type: Some("TEXT_PLAIN".into()),
                })
                .collect(),
            organizations: contact
                .organization
                .iter()
                .chain(&contact.other_organizations)
                .map(person_organization)
                .collect(),
            email_addresses: contact
                .emails
                .iter()
                .map(|e| PersonEmail {
                    value: e.address.clone(),
                    kind: wire_type(&e.classifier),
                    display_name: e.display_name.clone(),
                    metadata: FieldMetadata::for_primary(e.primary),
                })
                .collect(),
            phone_numbers: contact
                .phones
                .iter()
                .map(|p| PersonPhone {
                    value: p.number.clone(),
                    kind: wire_type(&p.classifier),
                    metadata: FieldMetadata::for_primary(p.primary),
                })
                .collect(),
            external_ids: contact
                .external_ids
                .iter()
                .map(|x| PersonExternalId {
                    value: x.value.clone(),
                    kind: wire_type(&x.classifier),
                })
                .collect(),
            addresses: contact
                .addresses
                .iter()
                .map(|a| PersonAddress {
                    formatted_value: a.formatted.clone(),
                    kind: wire_type(&a.classifier),
                    metadata: FieldMetadata::for_primary(a.primary),
                })
                .collect(),
            im_clients: contact
                .ims
                .iter()
                .map(|im| ImClient {
                    username: im.address.clone(),
                    protocol: im.protocol.clone(),
                    kind: wire_type(&im.classifier),
                    metadata: FieldMetadata::for_primary(im.primary),
                })
                .collect(),
            memberships: contact
                .memberships
                .iter()
                .map(|group| Membership {
                    contact_group_membership: Some(ContactGroupMembership {
                        contact_group_resource_name: group.as_str().to_string(),
                    }),
                })
                .collect(),
            client_data: client_data(&contact.markers),
        }
    }
}

impl ContactGroupResource {
    pub fn new(title: &str, markers: &Markers) -> Self {
        Self {
            resource_name: None,
            name: title.to_string(),
            group_type: None,
            client_data: client_data(markers),
        }
    }
}
