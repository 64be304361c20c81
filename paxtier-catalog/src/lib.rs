pub mod error;
pub mod spec;

use crate::error::{Result, SchemaError};
use semistr::SemiStr;

pub use spec::*;

pub type ObjID = u64;
pub type RelationID = ObjID;
pub type ColumnID = u16;
pub type ColumnGroupID = u16;

/// A finalized column group: a subset of a relation's columns stored
/// contiguously, one unit per tuple slot.
/// Immutable after schema finalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnGroup {
    pub id: ColumnGroupID,
    /// Byte size of one tuple's portion stored in this group.
    pub tuple_size: usize,
    pub column_ids: Vec<ColumnID>,
}

/// Ordered, finalized column-group layout of one relation.
///
/// Group order is significant: it fixes the order in which a block's
/// per-group segments are created and indexed. Fixed before any block
/// is created for the relation; schema changes afterwards are not
/// supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnGroupSchema {
    relation_name: SemiStr,
    groups: Box<[ColumnGroup]>,
}

impl ColumnGroupSchema {
    /// Validate and finalize a relation spec into an immutable schema.
    #[inline]
    pub fn finalize(spec: RelationSpec) -> Result<Self> {
        if spec.column_groups.is_empty() {
            return Err(SchemaError::NoColumnGroup);
        }
        let mut seen_groups = Vec::with_capacity(spec.column_groups.len());
        let mut seen_columns: Vec<ColumnID> = vec![];
        for cg in &spec.column_groups {
            if seen_groups.contains(&cg.group_id) {
                return Err(SchemaError::DuplicateColumnGroup(cg.group_id));
            }
            seen_groups.push(cg.group_id);
            if cg.tuple_size == 0 {
                return Err(SchemaError::ZeroTupleSize(cg.group_id));
            }
            if cg.column_ids.is_empty() {
                return Err(SchemaError::EmptyColumnGroup(cg.group_id));
            }
            for col_id in &cg.column_ids {
                if seen_columns.contains(col_id) {
                    return Err(SchemaError::DuplicateColumn(*col_id));
                }
                seen_columns.push(*col_id);
            }
        }
        let groups: Vec<ColumnGroup> = spec
            .column_groups
            .into_iter()
            .map(|cg| ColumnGroup {
                id: cg.group_id,
                tuple_size: cg.tuple_size,
                column_ids: cg.column_ids,
            })
            .collect();
        Ok(ColumnGroupSchema {
            relation_name: spec.relation_name,
            groups: groups.into_boxed_slice(),
        })
    }

    #[inline]
    pub fn relation_name(&self) -> &str {
        self.relation_name.as_str()
    }

    #[inline]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    #[inline]
    pub fn groups(&self) -> &[ColumnGroup] {
        &self.groups
    }

    /// Returns group at given position in schema order.
    #[inline]
    pub fn group(&self, group_idx: usize) -> &ColumnGroup {
        &self.groups[group_idx]
    }

    #[inline]
    pub fn group_by_id(&self, group_id: ColumnGroupID) -> Option<(usize, &ColumnGroup)> {
        self.groups
            .iter()
            .enumerate()
            .find(|(_, cg)| cg.id == group_id)
    }

    /// Byte size of one tuple's portion in group at given position.
    #[inline]
    pub fn tuple_size(&self, group_idx: usize) -> usize {
        self.groups[group_idx].tuple_size
    }

    /// Total byte size of one tuple across all groups.
    #[inline]
    pub fn row_size(&self) -> usize {
        self.groups.iter().map(|cg| cg.tuple_size).sum()
    }
}
