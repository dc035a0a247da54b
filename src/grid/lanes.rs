//! Lane assignment between generators
//!
//! Each row and each column belongs to at most one specific generator. The
//! default generator serves every lane no specific generator has claimed, on
//! both axes, so registering a specific generator shrinks the default's set.

use crate::core::error::{Result, TrafficError};
use crate::core::types::{GeneratorId, LaneAxis};
use ahash::AHashMap;
use std::ops::Range;

/// Check a `[from, to)` lane range against an axis extent
pub fn validate_lane_range(
    axis: LaneAxis,
    from: usize,
    to: usize,
    limit: usize,
) -> Result<Range<usize>> {
    if from >= to {
        return Err(TrafficError::EmptyLaneRange { axis, from, to });
    }
    if to > limit {
        return Err(TrafficError::LaneOutOfBounds {
            axis,
            from,
            to,
            limit,
        });
    }
    Ok(from..to)
}

/// Lanes a single generator may spawn onto
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaneSet {
    /// Unclaimed rows and columns; the axis is picked per spawn
    Default { rows: Vec<usize>, columns: Vec<usize> },
    Horizontal(Vec<usize>),
    Vertical(Vec<usize>),
}

impl LaneSet {
    /// Lanes available on one axis
    pub fn lanes(&self, axis: LaneAxis) -> &[usize] {
        match (self, axis) {
            (LaneSet::Default { rows, .. }, LaneAxis::Horizontal) => rows,
            (LaneSet::Default { columns, .. }, LaneAxis::Vertical) => columns,
            (LaneSet::Horizontal(rows), LaneAxis::Horizontal) => rows,
            (LaneSet::Vertical(columns), LaneAxis::Vertical) => columns,
            _ => &[],
        }
    }

    /// Axes this set can spawn on, skipping axes with no lanes
    pub fn axes(&self) -> Vec<LaneAxis> {
        [LaneAxis::Horizontal, LaneAxis::Vertical]
            .into_iter()
            .filter(|axis| !self.lanes(*axis).is_empty())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.axes().is_empty()
    }
}

/// Registration-time partition of lanes among generators
#[derive(Debug, Clone)]
pub struct LaneRegistry {
    row_owners: Vec<Option<GeneratorId>>,
    column_owners: Vec<Option<GeneratorId>>,
    default: Option<GeneratorId>,
    specific: AHashMap<GeneratorId, LaneAxis>,
    next_id: u32,
}

impl LaneRegistry {
    pub fn new(rows: usize, columns: usize) -> Result<Self> {
        if rows == 0 || columns == 0 {
            return Err(TrafficError::InvalidDimensions { rows, columns });
        }
        Ok(Self {
            row_owners: vec![None; rows],
            column_owners: vec![None; columns],
            default: None,
            specific: AHashMap::new(),
            next_id: 0,
        })
    }

    fn owners(&self, axis: LaneAxis) -> &[Option<GeneratorId>] {
        match axis {
            LaneAxis::Horizontal => &self.row_owners,
            LaneAxis::Vertical => &self.column_owners,
        }
    }

    fn owners_mut(&mut self, axis: LaneAxis) -> &mut [Option<GeneratorId>] {
        match axis {
            LaneAxis::Horizontal => &mut self.row_owners,
            LaneAxis::Vertical => &mut self.column_owners,
        }
    }

    fn allocate_id(&mut self) -> GeneratorId {
        let id = GeneratorId(self.next_id);
        self.next_id += 1;
        id
    }

    fn unclaimed(&self, axis: LaneAxis) -> Vec<usize> {
        self.owners(axis)
            .iter()
            .enumerate()
            .filter(|(_, owner)| owner.is_none())
            .map(|(lane, _)| lane)
            .collect()
    }

    /// Register the generator that serves every unclaimed lane
    pub fn register_default(&mut self) -> Result<GeneratorId> {
        if self.default.is_some() {
            return Err(TrafficError::DuplicateDefaultGenerator);
        }
        if self.unclaimed(LaneAxis::Horizontal).is_empty()
            && self.unclaimed(LaneAxis::Vertical).is_empty()
        {
            return Err(TrafficError::NoEligibleLanes);
        }

        let id = self.allocate_id();
        self.default = Some(id);
        Ok(id)
    }

    /// Register a generator owning rows `[from, to)`
    pub fn register_horizontal(&mut self, from: usize, to: usize) -> Result<GeneratorId> {
        self.register_specific(LaneAxis::Horizontal, from, to)
    }

    /// Register a generator owning columns `[from, to)`
    pub fn register_vertical(&mut self, from: usize, to: usize) -> Result<GeneratorId> {
        self.register_specific(LaneAxis::Vertical, from, to)
    }

    fn register_specific(&mut self, axis: LaneAxis, from: usize, to: usize) -> Result<GeneratorId> {
        let range = validate_lane_range(axis, from, to, self.owners(axis).len())?;

        if let Some(lane) = range.clone().find(|lane| self.owners(axis)[*lane].is_some()) {
            return Err(TrafficError::OverlappingLanes { axis, lane });
        }

        if self.default.is_some() {
            let remaining_here = self.unclaimed(axis).len() - range.len();
            let other = match axis {
                LaneAxis::Horizontal => LaneAxis::Vertical,
                LaneAxis::Vertical => LaneAxis::Horizontal,
            };
            if remaining_here == 0 && self.unclaimed(other).is_empty() {
                return Err(TrafficError::NoEligibleLanes);
            }
        }

        let id = self.allocate_id();
        for owner in &mut self.owners_mut(axis)[range] {
            *owner = Some(id);
        }
        self.specific.insert(id, axis);
        Ok(id)
    }

    pub fn default_generator(&self) -> Option<GeneratorId> {
        self.default
    }

    /// Rows the default generator may still use
    pub fn default_rows(&self) -> Vec<usize> {
        self.unclaimed(LaneAxis::Horizontal)
    }

    /// Columns the default generator may still use
    pub fn default_columns(&self) -> Vec<usize> {
        self.unclaimed(LaneAxis::Vertical)
    }

    /// Current lane set of a registered generator
    pub fn lane_set(&self, id: GeneratorId) -> Option<LaneSet> {
        if self.default == Some(id) {
            return Some(LaneSet::Default {
                rows: self.default_rows(),
                columns: self.default_columns(),
            });
        }

        let axis = *self.specific.get(&id)?;
        let lanes: Vec<usize> = self
            .owners(axis)
            .iter()
            .enumerate()
            .filter(|(_, owner)| **owner == Some(id))
            .map(|(lane, _)| lane)
            .collect();

        Some(match axis {
            LaneAxis::Horizontal => LaneSet::Horizontal(lanes),
            LaneAxis::Vertical => LaneSet::Vertical(lanes),
        })
    }

    /// Every registered generator, in registration order
    pub fn generators(&self) -> Vec<GeneratorId> {
        let mut ids: Vec<GeneratorId> = self.specific.keys().copied().collect();
        ids.extend(self.default);
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_then_specific_partition() {
        let mut registry = LaneRegistry::new(20, 40).unwrap();
        let default = registry.register_default().unwrap();
        let rows = registry.register_horizontal(5, 10).unwrap();
        let columns = registry.register_vertical(10, 20).unwrap();

        let default_rows = registry.default_rows();
        let default_columns = registry.default_columns();
        assert_eq!(default_rows.len(), 15);
        assert_eq!(default_columns.len(), 30);
        assert!(default_rows.iter().all(|r| !(5..10).contains(r)));
        assert!(default_columns.iter().all(|c| !(10..20).contains(c)));

        assert_eq!(
            registry.lane_set(rows),
            Some(LaneSet::Horizontal((5..10).collect()))
        );
        assert_eq!(
            registry.lane_set(columns),
            Some(LaneSet::Vertical((10..20).collect()))
        );
        match registry.lane_set(default) {
            Some(LaneSet::Default { rows, columns }) => {
                assert_eq!(rows, default_rows);
                assert_eq!(columns, default_columns);
            }
            other => panic!("unexpected lane set {:?}", other),
        }
    }

    #[test]
    fn test_specific_before_default_is_excluded_too() {
        let mut registry = LaneRegistry::new(10, 10).unwrap();
        registry.register_horizontal(0, 3).unwrap();
        registry.register_default().unwrap();
        assert_eq!(registry.default_rows(), (3..10).collect::<Vec<_>>());
        assert_eq!(registry.default_columns().len(), 10);
    }

    #[test]
    fn test_overlap_rejected() {
        let mut registry = LaneRegistry::new(10, 10).unwrap();
        registry.register_horizontal(2, 6).unwrap();
        assert!(matches!(
            registry.register_horizontal(5, 8),
            Err(TrafficError::OverlappingLanes {
                axis: LaneAxis::Horizontal,
                lane: 5
            })
        ));
        // Same indices on the other axis are a different lane family
        assert!(registry.register_vertical(2, 6).is_ok());
    }

    #[test]
    fn test_empty_and_out_of_bounds_ranges_rejected() {
        let mut registry = LaneRegistry::new(10, 10).unwrap();
        assert!(matches!(
            registry.register_vertical(3, 3),
            Err(TrafficError::EmptyLaneRange { .. })
        ));
        assert!(matches!(
            registry.register_vertical(8, 11),
            Err(TrafficError::LaneOutOfBounds { limit: 10, .. })
        ));
    }

    #[test]
    fn test_single_default_generator() {
        let mut registry = LaneRegistry::new(4, 4).unwrap();
        registry.register_default().unwrap();
        assert!(matches!(
            registry.register_default(),
            Err(TrafficError::DuplicateDefaultGenerator)
        ));
    }

    #[test]
    fn test_default_keeps_at_least_one_lane() {
        let mut registry = LaneRegistry::new(2, 2).unwrap();
        registry.register_default().unwrap();
        registry.register_horizontal(0, 2).unwrap();
        assert!(matches!(
            registry.register_vertical(0, 2),
            Err(TrafficError::NoEligibleLanes)
        ));

        let lanes = registry.lane_set(registry.default_generator().unwrap()).unwrap();
        assert_eq!(lanes.axes(), vec![LaneAxis::Vertical]);
    }

    #[test]
    fn test_generator_ids_in_registration_order() {
        let mut registry = LaneRegistry::new(6, 6).unwrap();
        let a = registry.register_default().unwrap();
        let b = registry.register_vertical(0, 1).unwrap();
        let c = registry.register_horizontal(4, 6).unwrap();
        assert_eq!(registry.generators(), vec![a, b, c]);
        assert_eq!(registry.lane_set(GeneratorId(99)), None);
    }
}
