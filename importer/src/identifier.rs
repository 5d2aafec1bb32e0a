use catalogue::MetadataField;

use crate::error::Result;
use crate::tree::{DocumentTree, NodeId};

/// Makes sure `node` carries a prefixed identifier in `field`.
///
/// Only the first existing value is rewritten; when there is none,
/// `prefix + fallback` is added.
pub fn normalize_identifier(
    tree: &mut DocumentTree,
    node: NodeId,
    field: MetadataField,
    fallback: &str,
    prefix: &str,
) -> Result<()> {
    match tree.first_metadata_mut(node, field) {
        Some(md) => {
            if !md.value.starts_with(prefix) {
                md.value = format!("{prefix}{}", md.value);
            }
            Ok(())
        }
        None => tree.add_metadata(node, field, &format!("{prefix}{fallback}")),
    }
}
