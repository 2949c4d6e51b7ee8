//! Transaction tags: ordered name/value byte pairs.

use serde::{Deserialize, Serialize};

use crate::deep_hash::DeepHashItem;
use crate::error::TagError;

/// Maximum number of tags on a single transaction.
pub const MAX_TAG_COUNT: usize = 128;

/// Maximum encoded size of a tag name, in bytes.
pub const MAX_NAME_LEN: usize = 1024;

/// Maximum encoded size of a tag value, in bytes.
pub const MAX_VALUE_LEN: usize = 3072;

/// An ordered name/value pair attached to a transaction.
///
/// Tags preserve insertion order; order is part of the signed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: Vec<u8>,
    pub value: Vec<u8>,
}

impl Tag {
    /// Create a tag from name and value bytes.
    pub fn new(name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// The deep-hash encoding of one tag: a two-blob list `[name, value]`.
    pub fn to_deep_hash_item(&self) -> DeepHashItem {
        DeepHashItem::list(vec![
            DeepHashItem::blob(&self.name),
            DeepHashItem::blob(&self.value),
        ])
    }
}

/// The deep-hash encoding of a tag set: a list of `[name, value]` lists,
/// in insertion order.
pub fn tags_to_deep_hash_item(tags: &[Tag]) -> DeepHashItem {
    DeepHashItem::list(tags.iter().map(Tag::to_deep_hash_item).collect())
}

/// Validate a tag set against network limits. Must pass before signing.
pub fn validate_tags(tags: &[Tag]) -> Result<(), TagError> {
    if tags.len() > MAX_TAG_COUNT {
        return Err(TagError::TooMany {
            count: tags.len(),
            max: MAX_TAG_COUNT,
        });
    }
    for tag in tags {
        if tag.name.len() > MAX_NAME_LEN {
            return Err(TagError::NameTooLong {
                len: tag.name.len(),
                max: MAX_NAME_LEN,
            });
        }
        if tag.value.len() > MAX_VALUE_LEN {
            return Err(TagError::ValueTooLong {
                len: tag.value.len(),
                max: MAX_VALUE_LEN,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deep_hash::deep_hash;

    #[test]
    fn test_validate_ok() {
        let tags = vec![
            Tag::new("Content-Type", "text/plain"),
            Tag::new("App-Name", "permaweave"),
        ];
        assert!(validate_tags(&tags).is_ok());
    }

    #[test]
    fn test_validate_empty_set() {
        assert!(validate_tags(&[]).is_ok());
    }

    #[test]
    fn test_too_many_tags() {
        let tags: Vec<Tag> = (0..MAX_TAG_COUNT + 1)
            .map(|i| Tag::new(format!("k{i}"), "v"))
            .collect();
        assert!(matches!(
            validate_tags(&tags),
            Err(TagError::TooMany { count, .. }) if count == MAX_TAG_COUNT + 1
        ));
    }

    #[test]
    fn test_name_too_long() {
        let tags = vec![Tag::new(vec![0u8; MAX_NAME_LEN + 1], "v")];
        assert!(matches!(validate_tags(&tags), Err(TagError::NameTooLong { .. })));
    }

    #[test]
    fn test_value_too_long() {
        let tags = vec![Tag::new("k", vec![0u8; MAX_VALUE_LEN + 1])];
        assert!(matches!(validate_tags(&tags), Err(TagError::ValueTooLong { .. })));
    }

    #[test]
    fn test_tag_order_is_signed() {
        let ab = vec![Tag::new("a", "1"), Tag::new("b", "2")];
        let ba = vec![Tag::new("b", "2"), Tag::new("a", "1")];
        assert_ne!(
            deep_hash(&tags_to_deep_hash_item(&ab)),
            deep_hash(&tags_to_deep_hash_item(&ba))
        );
    }
}
