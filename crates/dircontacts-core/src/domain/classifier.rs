//! Relation-or-label classification of multivalued contact fields
//!
//! Every email, phone, address, IM, external ID and organization on a
//! contact carries a [`Classifier`]: either one of the well-known
//! [`Relation`] values or a free-text label. Directory type strings are
//! mapped through static tables by [`ClassifierMapper`]; the mapping is
//! total, so every input classifies.
//!
//! Only entries whose classifier satisfies [`is_sync_owned`] are ever
//! added, replaced or removed by reconciliation.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use super::errors::DomainError;

/// Label carried by the external ID holding the employee identifier.
pub const EMPLOYEE_ID_LABEL: &str = "Employee ID";

/// Relations owned by the sync.
pub const SYNC_RELATIONS: &[Relation] = &[Relation::Work, Relation::Mobile];

/// Labels owned by the sync.
pub const SYNC_LABELS: &[&str] = &[EMPLOYEE_ID_LABEL];

/// Well-known relation values understood by the contact store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Relation {
    Work,
    Home,
    Other,
    WorkFax,
    HomeFax,
    OtherFax,
    Mobile,
    WorkMobile,
    Pager,
    WorkPager,
    CompanyMain,
    Assistant,
    Car,
    Radio,
    Isdn,
    Callback,
    Telex,
    TtyTdd,
    Main,
    // External ID relations
    Account,
    Customer,
    Network,
    Organization,
}

/// Store wire names, one per relation.
const WIRE_NAMES: &[(Relation, &str)] = &[
    (Relation::Work, "work"),
    (Relation::Home, "home"),
    (Relation::Other, "other"),
    (Relation::WorkFax, "workFax"),
    (Relation::HomeFax, "homeFax"),
    (Relation::OtherFax, "otherFax"),
    (Relation::Mobile, "mobile"),
    (Relation::WorkMobile, "workMobile"),
    (Relation::Pager, "pager"),
    (Relation::WorkPager, "workPager"),
    (Relation::CompanyMain, "companyMain"),
    (Relation::Assistant, "assistant"),
    (Relation::Car, "car"),
    (Relation::Radio, "radio"),
    (Relation::Isdn, "isdn"),
    (Relation::Callback, "callback"),
    (Relation::Telex, "telex"),
    (Relation::TtyTdd, "ttyTdd"),
    (Relation::Main, "main"),
    (Relation::Account, "account"),
    (Relation::Customer, "customer"),
    (Relation::Network, "network"),
    (Relation::Organization, "organization"),
];

/// Directory type strings for emails, phones, addresses, IMs and
/// organizations. The misspelled entries occur in real directory data.
const DIRECTORY_TYPES: &[(&str, Relation)] = &[
    ("work", Relation::Work),
    ("home", Relation::Home),
    ("other", Relation::Other),
    ("work_fax", Relation::WorkFax),
    ("home_fax", Relation::HomeFax),
    ("other_fax", Relation::OtherFax),
    ("mobile", Relation::Mobile),
    ("work_mobile", Relation::WorkMobile),
    ("pager", Relation::Pager),
    ("work_pager", Relation::WorkPager),
    ("company_main", Relation::CompanyMain),
    ("compain_main", Relation::CompanyMain),
    ("assistant", Relation::Assistant),
    ("car", Relation::Car),
    ("radio", Relation::Radio),
    ("isdn", Relation::Isdn),
    ("callback", Relation::Callback),
    ("telex", Relation::Telex),
    ("tty_tdd", Relation::TtyTdd),
    ("ttl_tdd", Relation::TtyTdd),
    ("main", Relation::Main),
];

/// Directory type strings for external IDs.
const EXTERNAL_ID_TYPES: &[(&str, Relation)] = &[
    ("account", Relation::Account),
    ("customer", Relation::Customer),
    ("network", Relation::Network),
    ("organization", Relation::Organization),
];

/// Directory IM protocols and their store names.
const IM_PROTOCOLS: &[(&str, &str)] = &[
    ("aim", "aim"),
    ("gtalk", "googleTalk"),
    ("icq", "icq"),
    ("jabber", "jabber"),
    ("msn", "msn"),
    ("net_meeting", "netMeeting"),
    ("qq", "qq"),
    ("skype", "skype"),
    ("yahoo", "yahoo"),
];

const CUSTOM_TYPE: &str = "custom";
const CUSTOM_PROTOCOL: &str = "custom_protocol";

impl Relation {
    /// The name used for this relation on the wire
    #[must_use]
    pub fn wire_name(self) -> &'static str {
        WIRE_NAMES
            .iter()
            .find(|(rel, _)| *rel == self)
            .map_or("other", |(_, name)| *name)
    }

    /// Parse a store wire name
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        WIRE_NAMES
            .iter()
            .find(|(_, wire)| *wire == name)
            .map(|(rel, _)| *rel)
    }

    /// Whether this relation is owned by the sync
    #[must_use]
    pub fn is_sync_owned(self) -> bool {
        SYNC_RELATIONS.contains(&self)
    }
}

impl Display for Relation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for Relation {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_wire(s).ok_or_else(|| DomainError::InvalidRelation(s.to_string()))
    }
}

/// A relation or a free-text label
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Classifier {
    Rel(Relation),
    Label(String),
}

impl Classifier {
    /// Interpret a wire type string. Known relation names become
    /// relations, anything else is a label.
    #[must_use]
    pub fn from_wire(value: &str) -> Self {
        match Relation::from_wire(value) {
            Some(rel) => Self::Rel(rel),
            None => Self::Label(value.to_string()),
        }
    }

    #[must_use]
    pub fn wire_value(&self) -> &str {
        match self {
            Self::Rel(rel) => rel.wire_name(),
            Self::Label(label) => label,
        }
    }
}

impl Display for Classifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_value())
    }
}

impl From<Relation> for Classifier {
    fn from(rel: Relation) -> Self {
        Self::Rel(rel)
    }
}

/// The single ownership predicate shared by every field category.
#[must_use]
pub fn is_sync_owned(classifier: &Classifier) -> bool {
    match classifier {
        Classifier::Rel(rel) => rel.is_sync_owned(),
        Classifier::Label(label) => SYNC_LABELS.contains(&label.as_str()),
    }
}

/// Maps directory type strings to classifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifierMapper {
    default_relation: Relation,
}

impl ClassifierMapper {
    #[must_use]
    pub fn new(default_relation: Relation) -> Self {
        Self { default_relation }
    }

    #[must_use]
    pub fn default_relation(&self) -> Relation {
        self.default_relation
    }

    /// Classify an email, phone, address, IM or organization.
    ///
    /// No type yields the default relation; `custom` yields its custom
    /// type as a label (or `other` without one); unknown types yield `other`.
    #[must_use]
    pub fn classify(&self, kind: Option<&str>, custom_type: Option<&str>) -> Classifier {
        match kind.filter(|k| !k.is_empty()) {
            None => Classifier::Rel(self.default_relation),
            Some(CUSTOM_TYPE) => custom_label(custom_type)
                .unwrap_or(Classifier::Rel(Relation::Other)),
            Some(kind) => Classifier::Rel(
                lookup(DIRECTORY_TYPES, kind).unwrap_or(Relation::Other),
            ),
        }
    }

    /// Classify an external ID.
    ///
    /// No type, or `custom` without a custom type, yields `organization`.
    /// Types outside the external ID table are kept verbatim as labels.
    #[must_use]
    pub fn classify_external_id(&self, kind: Option<&str>, custom_type: Option<&str>) -> Classifier {
        match kind.filter(|k| !k.is_empty()) {
            None => Classifier::Rel(Relation::Organization),
            Some(CUSTOM_TYPE) => custom_label(custom_type)
                .unwrap_or(Classifier::Rel(Relation::Organization)),
            Some(kind) => lookup(EXTERNAL_ID_TYPES, kind)
                .map_or_else(|| Classifier::Label(kind.to_string()), Classifier::Rel),
        }
    }
}

/// Map a directory IM protocol to the store's protocol name.
///
/// `custom_protocol` uses the custom protocol string; unknown protocols
/// pass through unchanged.
#[must_use]
pub fn im_protocol(protocol: Option<&str>, custom_protocol: Option<&str>) -> Option<String> {
    match protocol.filter(|p| !p.is_empty())? {
        CUSTOM_PROTOCOL => custom_protocol
            .filter(|p| !p.is_empty())
            .map(str::to_string),
        protocol => Some(
            IM_PROTOCOLS
                .iter()
                .find(|(dir, _)| *dir == protocol)
                .map_or(protocol, |(_, store)| *store)
                .to_string(),
        ),
    }
}

fn lookup(table: &[(&str, Relation)], kind: &str) -> Option<Relation> {
    table
        .iter()
        .find(|(name, _)| *name == kind)
        .map(|(_, rel)| *rel)
}

fn custom_label(custom_type: Option<&str>) -> Option<Classifier> {
    custom_type
        .filter(|c| !c.is_empty())
        .map(|c| Classifier::Label(c.to_string()))
}
