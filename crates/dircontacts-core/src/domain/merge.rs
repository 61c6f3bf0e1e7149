//! Field-level merge of a fresh contact draft into an existing contact
//!
//! Scalar fields (notes, name parts, organization sub-fields) are copied
//! whenever the source has a value that differs from the target. Each
//! multivalued category is reconciled only on its sync-owned subset:
//! entries whose classifier is not sync-owned are never touched.

use std::collections::HashSet;

use super::classifier::is_sync_owned;
use super::contact::{ClassifiedField, ContactRecord, FieldKey, Organization};

/// Merge `source` into `target`, returning whether `target` changed.
///
/// Merging the same source twice returns `false` the second time.
pub fn merge_fields(source: &ContactRecord, target: &mut ContactRecord) -> bool {
    let mut modified = false;

    modified |= copy_if_differs(&source.notes, &mut target.notes);
    modified |= copy_if_differs(&source.name.given, &mut target.name.given);
    modified |= copy_if_differs(&source.name.family, &mut target.name.family);
    modified |= copy_if_differs(&source.name.full, &mut target.name.full);

    if let Some(source_org) = &source.organization {
        modified |= merge_organization(source_org, &mut target.organization);
    }

    modified |= reconcile_owned(&source.emails, &mut target.emails);
    modified |= reconcile_owned(&source.phones, &mut target.phones);
    modified |= reconcile_owned(&source.external_ids, &mut target.external_ids);
    modified |= reconcile_owned(&source.addresses, &mut target.addresses);
    modified |= reconcile_owned(&source.ims, &mut target.ims);

    modified
}

fn copy_if_differs<T: Clone + PartialEq>(source: &Option<T>, target: &mut Option<T>) -> bool {
    match source {
        Some(value) if target.as_ref() != Some(value) => {
            *target = Some(value.clone());
            true
        }
        _ => false,
    }
}

fn merge_organization(source: &Organization, target: &mut Option<Organization>) -> bool {
    let Some(existing) = target.as_mut() else {
        *target = Some(source.clone());
        return true;
    };

    let mut modified = false;
    modified |= copy_if_differs(&source.name, &mut existing.name);
    modified |= copy_if_differs(&source.title, &mut existing.title);
    modified |= copy_if_differs(&source.department, &mut existing.department);
    modified |= copy_if_differs(&source.symbol, &mut existing.symbol);
    modified |= copy_if_differs(&source.classifier, &mut existing.classifier);
    modified
}

fn owned_keys<F: ClassifiedField>(fields: &[F]) -> HashSet<FieldKey> {
    fields
        .iter()
        .filter(|f| is_sync_owned(f.classifier()))
        .map(ClassifiedField::key)
        .collect()
}

/// Replace the sync-owned entries of `target` with those of `source` when
/// their key sets differ.
///
/// Re-added entries are de-duplicated by key. A primary flag survives only
/// if no remaining entry of `target` is already primary, so a primary the
/// user chose is never displaced.
fn reconcile_owned<F: ClassifiedField>(source: &[F], target: &mut Vec<F>) -> bool {
    if owned_keys(source) == owned_keys(target) {
        return false;
    }

    target.retain(|f| !is_sync_owned(f.classifier()));
    let mut primary_taken = target.iter().any(ClassifiedField::is_primary);

    let mut seen = HashSet::new();
    for field in source.iter().filter(|f| is_sync_owned(f.classifier())) {
        if !seen.insert(field.key()) {
            continue;
        }
        let mut field = field.clone();
        if field.is_primary() {
            if primary_taken {
                field.set_primary(false);
            }
            primary_taken = true;
        }
        target.push(field);
    }

    true
}
