//! Directory record to contact draft conversion
//!
//! [`ContactBuilder::build`] is a pure function of the record and the
//! builder options. The draft has no resource name, memberships or markers;
//! the reconciler attaches those.

use std::collections::HashSet;

use super::classifier::{im_protocol, Classifier, ClassifierMapper};
use super::contact::{
    ClassifiedField, ContactRecord, EmailAddress, ExternalId, InstantMessenger, Organization, PersonName,
    PhoneNumber, PostalAddress,
};
use super::directory::{non_empty, DirectoryOrganization, DirectoryRecord};
use super::errors::DomainError;

/// Options shaping the contact draft
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactBuilder {
    mapper: ClassifierMapper,
    add_aliases: bool,
    add_other_emails: bool,
    fallback_organization: Option<String>,
}

impl ContactBuilder {
    #[must_use]
    pub fn new(mapper: ClassifierMapper) -> Self {
        Self {
            mapper,
            add_aliases: false,
            add_other_emails: false,
            fallback_organization: None,
        }
    }

    #[must_use]
    pub fn with_aliases(mut self, enabled: bool) -> Self {
        self.add_aliases = enabled;
        self
    }

    #[must_use]
    pub fn with_other_emails(mut self, enabled: bool) -> Self {
        self.add_other_emails = enabled;
        self
    }

    /// Organization name used when the directory has none.
    #[must_use]
    pub fn with_fallback_organization(mut self, name: Option<String>) -> Self {
        self.fallback_organization = name.filter(|n| !n.is_empty());
        self
    }

    /// Build the contact draft for one directory record.
    ///
    /// # Errors
    /// Returns [`DomainError::MissingPrimaryEmail`] or
    /// [`DomainError::MissingFullName`] when the record lacks either.
    pub fn build(&self, record: &DirectoryRecord) -> Result<ContactRecord, DomainError> {
        let primary_email = record
            .primary_email()
            .ok_or(DomainError::MissingPrimaryEmail)?;
        let full_name = record
            .full_name()
            .ok_or_else(|| DomainError::MissingFullName(primary_email.to_string()))?;

        let mut contact = ContactRecord {
            name: PersonName {
                given: record.given_name().map(str::to_string),
                family: record.family_name().map(str::to_string),
                full: Some(full_name.to_string()),
                suffix: None,
            },
            emails: self.emails(record, primary_email, full_name),
            organization: self.organization(record),
            ..Default::default()
        };

        contact.phones = record
            .phones
            .iter()
            .filter_map(|phone| {
                Some(PhoneNumber {
                    number: non_empty(&phone.value)?.to_string(),
                    classifier: self
                        .mapper
                        .classify(phone.kind.as_deref(), phone.custom_type.as_deref()),
                    primary: phone.primary,
                })
            })
            .collect();

        contact.external_ids = record
            .external_ids
            .iter()
            .filter_map(|ext| {
                Some(ExternalId {
                    value: non_empty(&ext.value)?.to_string(),
                    classifier: self
                        .mapper
                        .classify_external_id(ext.kind.as_deref(), ext.custom_type.as_deref()),
                })
            })
            .collect();

        contact.addresses = record
            .addresses
            .iter()
            .filter_map(|address| {
                Some(PostalAddress {
                    formatted: non_empty(&address.formatted)?.to_string(),
                    classifier: self
                        .mapper
                        .classify(address.kind.as_deref(), address.custom_type.as_deref()),
                    primary: address.primary,
                })
            })
            .collect();

        contact.ims = record
            .ims
            .iter()
            .filter_map(|im| {
                Some(InstantMessenger {
                    address: non_empty(&im.im)?.to_string(),
                    protocol: im_protocol(im.protocol.as_deref(), im.custom_protocol.as_deref()),
                    classifier: self
                        .mapper
                        .classify(im.kind.as_deref(), im.custom_type.as_deref()),
                    primary: im.primary,
                })
            })
            .collect();

        dedup_by_key(&mut contact.emails);
        dedup_by_key(&mut contact.phones);
        dedup_by_key(&mut contact.external_ids);
        dedup_by_key(&mut contact.addresses);
        dedup_by_key(&mut contact.ims);

        Ok(contact)
    }

    fn emails(&self, record: &DirectoryRecord, primary: &str, full_name: &str) -> Vec<EmailAddress> {
        let default_rel = Classifier::Rel(self.mapper.default_relation());
        let entry = |address: &str, classifier: Classifier, primary: bool| EmailAddress {
            address: address.to_string(),
            classifier,
            primary,
            display_name: Some(full_name.to_string()),
        };

        let mut emails = vec![entry(primary, default_rel.clone(), true)];

        if self.add_aliases {
            emails.extend(
                record
                    .aliases
                    .iter()
                    .chain(&record.non_editable_aliases)
                    .filter(|alias| !alias.is_empty())
                    .map(|alias| entry(alias, default_rel.clone(), false)),
            );
        }

        if self.add_other_emails {
            emails.extend(record.emails.iter().filter_map(|email| {
                let address = non_empty(&email.address)?;
                let classifier = self
                    .mapper
                    .classify(email.kind.as_deref(), email.custom_type.as_deref());
                Some(entry(address, classifier, false))
            }));
        }

        emails
    }

    fn organization(&self, record: &DirectoryRecord) -> Option<Organization> {
        match record.selected_organization() {
            Some(org) => Some(self.convert_organization(org)),
            None => self.fallback_organization.as_ref().map(|name| Organization {
                name: Some(name.clone()),
                classifier: Some(Classifier::Rel(self.mapper.default_relation())),
                primary: true,
                ..Default::default()
            }),
        }
    }

    fn convert_organization(&self, org: &DirectoryOrganization) -> Organization {
        Organization {
            name: non_empty(&org.name)
                .map(str::to_string)
                .or_else(|| self.fallback_organization.clone()),
            title: non_empty(&org.title).map(str::to_string),
            department: non_empty(&org.department).map(str::to_string),
            symbol: non_empty(&org.symbol).map(str::to_string),
            classifier: Some(
                self.mapper
                    .classify(org.kind.as_deref(), org.custom_type.as_deref()),
            ),
            primary: true,
        }
    }
}

/// Keep the first entry of every `(identity, classifier)` key.
///
/// The directory repeats the primary address in its email list, so the
/// primary entry built first is the one kept.
fn dedup_by_key<F: ClassifiedField>(fields: &mut Vec<F>) {
    let mut seen = HashSet::new();
    fields.retain(|field| seen.insert(field.key()));
}
