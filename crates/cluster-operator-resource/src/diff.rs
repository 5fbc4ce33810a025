//! Patch builders shared by the concrete resources
//!
//! Objects are matched by name. Whether a matched pair differs is decided by
//! a per resource comparison over the fields the operator owns, never over
//! server populated metadata.

use kube::ResourceExt;

use crate::resource::Patch;

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}

fn find<'a, T: ResourceExt>(items: &'a [T], name: &str) -> Option<&'a T> {
    items.iter().find(|item| item.name_any() == name)
}

/// Update patch for a list of named objects
///
/// Desired objects missing from `current` are created, matched objects for
/// which `differs` holds are updated and current objects no longer desired
/// are deleted.
pub fn list_update_patch<T>(
    current: &[T],
    desired: &[T],
    differs: impl Fn(&T, &T) -> bool,
) -> Patch<Vec<T>>
where
    T: ResourceExt + Clone,
{
    let mut create = Vec::new();
    let mut update = Vec::new();
    for want in desired {
        match find(current, &want.name_any()) {
            None => create.push(want.clone()),
            Some(have) if differs(have, want) => update.push(want.clone()),
            Some(_) => {}
        }
    }
    let delete = current
        .iter()
        .filter(|have| find(desired, &have.name_any()).is_none())
        .cloned()
        .collect();

    Patch {
        create: non_empty(create),
        update: non_empty(update),
        delete: non_empty(delete),
    }
}

/// Delete patch for a list of named objects: desired objects that still exist
pub fn list_delete_patch<T>(current: &[T], desired: &[T]) -> Patch<Vec<T>>
where
    T: ResourceExt + Clone,
{
    let delete = current
        .iter()
        .filter(|have| find(desired, &have.name_any()).is_some())
        .cloned()
        .collect();
    Patch {
        delete: non_empty(delete),
        ..Patch::default()
    }
}

/// Update patch for a single object
///
/// A missing object is created; an existing one is updated when `differs`
/// holds. Nothing is ever deleted while the cluster object is live.
pub fn single_update_patch<T: Clone>(
    current: &Option<T>,
    desired: &Option<T>,
    differs: impl Fn(&T, &T) -> bool,
) -> Patch<Option<T>> {
    match (current, desired) {
        (None, Some(want)) => Patch {
            create: Some(Some(want.clone())),
            ..Patch::default()
        },
        (Some(have), Some(want)) if differs(have, want) => Patch {
            update: Some(Some(want.clone())),
            ..Patch::default()
        },
        _ => Patch::default(),
    }
}

/// Delete patch for a single object: delete it if it exists and is desired
pub fn single_delete_patch<T: Clone>(current: &Option<T>, desired: &Option<T>) -> Patch<Option<T>> {
    match (current, desired) {
        (Some(have), Some(_)) => Patch {
            delete: Some(Some(have.clone())),
            ..Patch::default()
        },
        _ => Patch::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::ConfigMap;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;

    fn cm(name: &str, value: &str) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                resource_version: Some("42".to_string()),
                ..Default::default()
            },
            data: Some(BTreeMap::from([("values.json".to_string(), value.to_string())])),
            ..Default::default()
        }
    }

    fn data_differs(a: &ConfigMap, b: &ConfigMap) -> bool {
        a.data != b.data
    }

    #[test]
    fn identical_lists_produce_empty_patches() {
        let state = vec![cm("a", "1"), cm("b", "2")];
        assert!(list_update_patch(&state, &state, data_differs).is_empty());
        assert!(list_update_patch::<ConfigMap>(&[], &[], data_differs).is_empty());
        assert!(list_delete_patch::<ConfigMap>(&[], &[]).is_empty());
    }

    #[test]
    fn list_update_patch_partitions_by_name() {
        let current = vec![cm("keep", "1"), cm("change", "old"), cm("gone", "1")];
        let desired = vec![cm("keep", "1"), cm("change", "new"), cm("new", "1")];

        let patch = list_update_patch(&current, &desired, data_differs);
        let names = |items: &Option<Vec<ConfigMap>>| -> Vec<String> {
            items
                .iter()
                .flatten()
                .map(|c| c.name_any())
                .collect()
        };
        assert_eq!(names(&patch.create), vec!["new"]);
        assert_eq!(names(&patch.update), vec!["change"]);
        assert_eq!(names(&patch.delete), vec!["gone"]);
    }

    #[test]
    fn list_delete_patch_only_deletes_desired_objects() {
        let current = vec![cm("a", "1"), cm("foreign", "1")];
        let desired = vec![cm("a", "1"), cm("b", "1")];

        let patch = list_delete_patch(&current, &desired);
        assert!(patch.create.is_none());
        assert!(patch.update.is_none());
        let deleted: Vec<_> = patch.delete.unwrap().iter().map(|c| c.name_any()).collect();
        assert_eq!(deleted, vec!["a"]);
    }

    #[test]
    fn single_patches() {
        let want = Some(cm("a", "1"));
        let patch = single_update_patch(&None, &want, data_differs);
        assert_eq!(patch.create, Some(want.clone()));

        assert!(single_update_patch(&want, &want, data_differs).is_empty());

        let patch = single_update_patch(&Some(cm("a", "0")), &want, data_differs);
        assert_eq!(patch.update, Some(want.clone()));
        assert!(patch.create.is_none());

        assert!(single_delete_patch::<ConfigMap>(&None, &want).is_empty());
        assert_eq!(single_delete_patch(&want, &want).delete, Some(want));
    }
}
