//! Object type enumeration.
//!
//! Each object type carries a unique integer value used to identify it in a
//! pack entry header.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::errors::PackError;

/// In the pack format, each object type is assigned a unique integer value
/// carried in the entry header's 3 type bits.
///
/// * `Commit` (1): a recorded snapshot of the project with authorship and
///   parent links.
/// * `Tree` (2): a directory listing mapping names to other objects.
/// * `Blob` (3): raw file content.
/// * `Tag` (4): an annotated pointer to another object.
/// * `OffsetDelta` (6): a delta whose base is referenced by a negative byte
///   offset within the same pack.
/// * `HashDelta` (7): a delta whose base is referenced by its full object id;
///   the base may live outside the pack (thin packs).
///
/// Value 5 is reserved by the format and never written.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Commit = 1,
    Tree,
    Blob,
    Tag,
    OffsetDelta = 6,
    HashDelta = 7,
}

const COMMIT_OBJECT_TYPE: &[u8] = b"commit";
const TREE_OBJECT_TYPE: &[u8] = b"tree";
const BLOB_OBJECT_TYPE: &[u8] = b"blob";
const TAG_OBJECT_TYPE: &[u8] = b"tag";

impl Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ObjectType::Blob => write!(f, "blob"),
            ObjectType::Tree => write!(f, "tree"),
            ObjectType::Commit => write!(f, "commit"),
            ObjectType::Tag => write!(f, "tag"),
            ObjectType::OffsetDelta => write!(f, "OffsetDelta"),
            ObjectType::HashDelta => write!(f, "HashDelta"),
        }
    }
}

impl ObjectType {
    /// The canonical ASCII name used in the object id preimage. Delta kinds
    /// are storage encodings, not objects, and have no name.
    pub fn to_bytes(&self) -> &[u8] {
        match self {
            ObjectType::Commit => COMMIT_OBJECT_TYPE,
            ObjectType::Tree => TREE_OBJECT_TYPE,
            ObjectType::Blob => BLOB_OBJECT_TYPE,
            ObjectType::Tag => TAG_OBJECT_TYPE,
            _ => panic!("delta encodings have no canonical object name"),
        }
    }

    /// Parses a string representation of an object type.
    pub fn from_string(s: &str) -> Result<ObjectType, PackError> {
        match s {
            "blob" => Ok(ObjectType::Blob),
            "tree" => Ok(ObjectType::Tree),
            "commit" => Ok(ObjectType::Commit),
            "tag" => Ok(ObjectType::Tag),
            _ => Err(PackError::InvalidObjectType(s.to_string())),
        }
    }

    /// Convert an object type to its 3-bit pack header value.
    pub fn to_u8(&self) -> u8 {
        match self {
            ObjectType::Commit => 1,
            ObjectType::Tree => 2,
            ObjectType::Blob => 3,
            ObjectType::Tag => 4,
            ObjectType::OffsetDelta => 6,
            ObjectType::HashDelta => 7,
        }
    }

    /// Convert a 3-bit pack header value to an object type.
    pub fn from_u8(number: u8) -> Result<ObjectType, PackError> {
        match number {
            1 => Ok(ObjectType::Commit),
            2 => Ok(ObjectType::Tree),
            3 => Ok(ObjectType::Blob),
            4 => Ok(ObjectType::Tag),
            6 => Ok(ObjectType::OffsetDelta),
            7 => Ok(ObjectType::HashDelta),
            _ => Err(PackError::InvalidObjectType(format!(
                "Invalid object type number: {number}"
            ))),
        }
    }

    /// Whether this is a whole object (not a delta encoding).
    pub fn is_base(&self) -> bool {
        matches!(
            self,
            ObjectType::Commit | ObjectType::Tree | ObjectType::Blob | ObjectType::Tag
        )
    }

    /// Whether objects of this type take part in delta search. Commits and
    /// tags are small and mostly unique; trees and blobs share content across
    /// revisions.
    pub fn is_delta_friendly(&self) -> bool {
        matches!(self, ObjectType::Tree | ObjectType::Blob)
    }
}

#[cfg(test)]
mod tests {
    use super::ObjectType;

    #[test]
    fn test_object_type_round_trip_u8() {
        for t in [
            ObjectType::Commit,
            ObjectType::Tree,
            ObjectType::Blob,
            ObjectType::Tag,
            ObjectType::OffsetDelta,
            ObjectType::HashDelta,
        ] {
            assert_eq!(ObjectType::from_u8(t.to_u8()).unwrap(), t);
        }
        assert!(ObjectType::from_u8(5).is_err());
        assert!(ObjectType::from_u8(0).is_err());
    }

    #[test]
    fn test_object_type_from_string() {
        assert_eq!(ObjectType::from_string("blob").unwrap(), ObjectType::Blob);
        assert_eq!(ObjectType::from_string("tree").unwrap(), ObjectType::Tree);
        assert_eq!(
            ObjectType::from_string("commit").unwrap(),
            ObjectType::Commit
        );
        assert_eq!(ObjectType::from_string("tag").unwrap(), ObjectType::Tag);
        assert!(ObjectType::from_string("invalid_type").is_err());
    }

    #[test]
    fn test_delta_friendliness() {
        assert!(ObjectType::Blob.is_delta_friendly());
        assert!(ObjectType::Tree.is_delta_friendly());
        assert!(!ObjectType::Commit.is_delta_friendly());
        assert!(!ObjectType::Tag.is_delta_friendly());
    }
}
