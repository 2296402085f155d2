//! Input units for a pack generation run: the materialized object (`Entry`)
//! backing stores hand around, and the lightweight `CountedObject` record the
//! graph traversal feeds into the writer's counting phase.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::{hash::ObjectHash, internal::object::types::ObjectType};

/// One fully materialized object: type, content, id.
#[derive(Eq, Clone, Debug, Serialize, Deserialize)]
pub struct Entry {
    pub obj_type: ObjectType,
    pub data: Vec<u8>,
    pub hash: ObjectHash,
}

impl Entry {
    /// Build an entry from type and content, deriving the id from the
    /// canonical preimage.
    pub fn new(obj_type: ObjectType, data: Vec<u8>) -> Self {
        let hash = ObjectHash::from_type_and_data(obj_type, &data);
        Self {
            obj_type,
            data,
            hash,
        }
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        // hash is enough to compare, right?
        self.obj_type == other.obj_type && self.hash == other.hash
    }
}

impl Hash for Entry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.obj_type.hash(state);
        self.hash.hash(state);
    }
}

/// One object as enumerated by the graph traversal, in the order the writer
/// must preserve.
///
/// `edge` objects mark the boundary of the requested set: they are never
/// written to the output body, only usable as delta bases (thin packs
/// reference them by id). `path_hash` clusters objects whose most recent
/// path's final component matched, which is where delta bases tend to hide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountedObject {
    pub id: ObjectHash,
    pub obj_type: ObjectType,
    pub path_hash: u32,
    pub edge: bool,
}

impl CountedObject {
    pub fn new(id: ObjectHash, obj_type: ObjectType) -> Self {
        Self {
            id,
            obj_type,
            path_hash: 0,
            edge: false,
        }
    }

    pub fn with_path_hash(mut self, path_hash: u32) -> Self {
        self.path_hash = path_hash;
        self
    }

    pub fn edge(mut self) -> Self {
        self.edge = true;
        self
    }
}

/// Hash of the last component of a path, for [`CountedObject::path_hash`].
///
/// The hash restarts at every separator so only the final component counts;
/// renames across directories keep clustering with their history.
pub fn path_hash(path: &[u8]) -> u32 {
    let mut h: u32 = 0;
    for &b in path {
        if b == b'/' {
            h = 0;
            continue;
        }
        h = (h << 5).wrapping_add(h).wrapping_add(b as u32);
    }
    h
}

#[cfg(test)]
mod tests {
    use super::{CountedObject, Entry, path_hash};
    use crate::hash::{HashKind, set_hash_kind_for_test};
    use crate::internal::object::types::ObjectType;

    #[test]
    fn entry_id_matches_canonical_preimage() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let e = Entry::new(ObjectType::Blob, b"what is up, doc?".to_vec());
        assert_eq!(
            e.hash.to_string(),
            "bd9dbf5aae1a3862dd1526723246b20206e5fc37"
        );
    }

    #[test]
    fn entry_equality_ignores_data() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let a = Entry::new(ObjectType::Blob, b"same".to_vec());
        let mut b = a.clone();
        b.data = b"same".to_vec();
        assert_eq!(a, b);
    }

    #[test]
    fn path_hash_uses_last_component_only() {
        assert_eq!(path_hash(b"src/main.rs"), path_hash(b"other/dir/main.rs"));
        assert_ne!(path_hash(b"main.rs"), path_hash(b"lib.rs"));
        assert_eq!(path_hash(b"main.rs"), path_hash(b"main.rs"));
    }

    #[test]
    fn counted_object_builder() {
        let _guard = set_hash_kind_for_test(HashKind::Sha1);
        let id = crate::hash::ObjectHash::new(b"x");
        let c = CountedObject::new(id, ObjectType::Tree)
            .with_path_hash(7)
            .edge();
        assert!(c.edge);
        assert_eq!(c.path_hash, 7);
        assert_eq!(c.obj_type, ObjectType::Tree);
    }
}
