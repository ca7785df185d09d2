//! Identification of chemical species stored in a field.

use std::{collections::BTreeMap, fmt};

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// Two-level identifier of a species entry in a field.
///
/// The group names the molecule type, while the instance distinguishes
/// separate contributors of the same molecule type.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct SpeciesKey {
    group: String,
    instance: String,
}

impl SpeciesKey {
    /// Creates a new key from a group and instance name.
    pub fn new<G: Into<String>, I: Into<String>>(group: G, instance: I) -> Self {
        Self {
            group: group.into(),
            instance: instance.into(),
        }
    }

    /// Returns the species group name.
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Returns the species instance name.
    pub fn instance(&self) -> &str {
        &self.instance
    }
}

impl fmt::Display for SpeciesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.instance)
    }
}

/// Values keyed first by species group and then by species instance.
pub type SpeciesMap<T> = BTreeMap<String, BTreeMap<String, T>>;

/// Inserts the given value under the group and instance of the key.
pub fn insert_into_species_map<T>(map: &mut SpeciesMap<T>, key: &SpeciesKey, value: T) {
    map.entry(key.group.clone())
        .or_default()
        .insert(key.instance.clone(), value);
}

/// Looks up the value stored under the group and instance of the key.
pub fn lookup_in_species_map<'a, T>(map: &'a SpeciesMap<T>, key: &SpeciesKey) -> Option<&'a T> {
    map.get(key.group()).and_then(|instances| instances.get(key.instance()))
}
