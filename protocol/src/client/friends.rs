//! Named public keys a client can send to, use as decoys or credit fees to.

use std::collections::BTreeMap;

use ark_bn254::Fr;

use super::ClientError;
use crate::crypto::curve::{generator, point_to_hex, Point};

#[derive(Clone, Debug, Default)]
pub struct Friends {
    entries: BTreeMap<String, Point>,
}

impl Friends {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace `name`. Returns the key it replaced.
    pub fn add(&mut self, name: impl Into<String>, key: Point) -> Option<Point> {
        self.entries.insert(name.into(), key)
    }

    pub fn remove(&mut self, name: &str) -> Result<Point, ClientError> {
        self.entries
            .remove(name)
            .ok_or_else(|| ClientError::UnknownFriend {
                name: name.to_string(),
            })
    }

    pub fn get(&self, name: &str) -> Option<Point> {
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names and hex-encoded keys, sorted by name.
    pub fn show(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(name, key)| (name.clone(), point_to_hex(key)))
            .collect()
    }

    /// Follow a rekey by `delta` of every friend that was in `parties`.
    pub(crate) fn rotate(&mut self, parties: &[Point], delta: u64) {
        let shift = generator() * Fr::from(delta);
        for key in self.entries.values_mut() {
            if parties.contains(key) {
                *key += shift;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_replace_remove() {
        let g = generator();
        let mut friends = Friends::new();
        assert!(friends.add("bob", g).is_none());
        assert_eq!(friends.add("bob", g + g), Some(g));
        friends.add("alice", g);
        let names: Vec<String> = friends.show().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["alice", "bob"]);

        assert_eq!(friends.remove("bob").unwrap(), g + g);
        assert!(matches!(
            friends.remove("bob"),
            Err(ClientError::UnknownFriend { .. })
        ));
        assert_eq!(friends.len(), 1);
    }

    #[test]
    fn rotation_touches_only_parties() {
        let g = generator();
        let mut friends = Friends::new();
        friends.add("in", g);
        friends.add("out", g + g + g);
        friends.rotate(&[g], 2);
        assert_eq!(friends.get("in"), Some(g * Fr::from(3u64)));
        assert_eq!(friends.get("out"), Some(g * Fr::from(3u64)));
    }
}
