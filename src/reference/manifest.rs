use super::Reference;
use crate::jvm::BinaryName;
use std::collections::{btree_map, BTreeMap, BTreeSet};

/// Reference, along with the module classes that make it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestEntry {
    pub reference: Reference,
    pub sources: BTreeSet<BinaryName>,
}

/// Every external reference made by an instrumentation module (or by several merged modules)
///
/// Entries are ordered by [`Reference::key`], so two manifests built from the same bytecode
/// iterate in the same order and compare equal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReferenceManifest {
    entries: BTreeMap<String, ManifestEntry>,
}

impl ReferenceManifest {
    pub fn new() -> ReferenceManifest {
        ReferenceManifest::default()
    }

    /// Record a reference made from `source`
    ///
    /// If the same thing was already referenced, the two are merged and the more demanding
    /// visibility is kept.
    pub fn add(&mut self, reference: Reference, source: &BinaryName) {
        self.add_entry(reference, std::iter::once(source));
    }

    fn add_entry<'a>(
        &mut self,
        reference: Reference,
        sources: impl IntoIterator<Item = &'a BinaryName>,
    ) {
        let entry = match self.entries.entry(reference.key()) {
            btree_map::Entry::Vacant(vacant) => vacant.insert(ManifestEntry {
                reference,
                sources: BTreeSet::new(),
            }),
            btree_map::Entry::Occupied(occupied) => {
                let entry = occupied.into_mut();
                entry.reference.merge(&reference);
                entry
            }
        };
        entry.sources.extend(sources.into_iter().cloned());
    }

    /// Fold all of another manifest's entries into this one
    pub fn merge(&mut self, other: &ReferenceManifest) {
        for entry in other.entries.values() {
            self.add_entry(entry.reference.clone(), &entry.sources);
        }
    }

    pub fn get(&self, key: &str) -> Option<&ManifestEntry> {
        self.entries.get(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ManifestEntry> + '_ {
        self.entries.values()
    }

    pub fn references(&self) -> impl Iterator<Item = &Reference> + '_ {
        self.entries.values().map(|entry| &entry.reference)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::{Name, Visibility};
    use crate::reference::ClassRef;

    fn name(name: &str) -> BinaryName {
        BinaryName::from_string(name.to_owned()).unwrap()
    }

    fn class_ref(class: &str, visibility: Visibility) -> Reference {
        Reference::Class(ClassRef {
            name: name(class),
            minimum_visibility: visibility,
        })
    }

    #[test]
    fn repeated_references_merge() {
        let mut manifest = ReferenceManifest::new();
        manifest.add(class_ref("lib/Foo", Visibility::Private), &name("agent/A"));
        manifest.add(class_ref("lib/Foo", Visibility::Public), &name("agent/B"));
        manifest.add(class_ref("lib/Bar", Visibility::Private), &name("agent/A"));

        assert_eq!(manifest.len(), 2);
        let entry = manifest.get("lib/Foo").unwrap();
        assert_eq!(entry.reference.minimum_visibility(), Visibility::Public);
        assert_eq!(entry.sources.len(), 2);

        let keys: Vec<String> = manifest.references().map(Reference::key).collect();
        assert_eq!(keys, vec!["lib/Bar", "lib/Foo"]);
    }

    #[test]
    fn merging_manifests() {
        let mut first = ReferenceManifest::new();
        first.add(class_ref("lib/Foo", Visibility::PackagePrivate), &name("agent/A"));
        let mut second = ReferenceManifest::new();
        second.add(class_ref("lib/Foo", Visibility::Private), &name("other/B"));
        second.add(class_ref("lib/Baz", Visibility::Public), &name("other/B"));

        first.merge(&second);
        assert_eq!(first.len(), 2);
        let entry = first.get("lib/Foo").unwrap();
        assert_eq!(entry.reference.minimum_visibility(), Visibility::PackagePrivate);
        assert_eq!(
            entry.sources.iter().map(Name::as_str).collect::<Vec<_>>(),
            vec!["agent/A", "other/B"]
        );
    }
}
