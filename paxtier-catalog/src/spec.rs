use crate::{ColumnGroupID, ColumnID};
use semistr::SemiStr;

/// Input description of a relation's column-group layout, as supplied
/// by the catalog layer before finalization.
#[derive(Debug, Clone)]
pub struct RelationSpec {
    pub relation_name: SemiStr,
    pub column_groups: Vec<ColumnGroupSpec>,
}

impl RelationSpec {
    #[inline]
    pub fn new(relation_name: &str, column_groups: Vec<ColumnGroupSpec>) -> Self {
        RelationSpec {
            relation_name: SemiStr::new(relation_name),
            column_groups,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ColumnGroupSpec {
    pub group_id: ColumnGroupID,
    /// Byte size of one tuple's portion stored in this group.
    pub tuple_size: usize,
    /// Columns stored in this group, in storage order.
    pub column_ids: Vec<ColumnID>,
}

impl ColumnGroupSpec {
    #[inline]
    pub fn new(group_id: ColumnGroupID, tuple_size: usize, column_ids: Vec<ColumnID>) -> Self {
        ColumnGroupSpec {
            group_id,
            tuple_size,
            column_ids,
        }
    }
}
