//! Property tests for lane partitioning and grid occupancy bookkeeping

use proptest::prelude::*;
use traffic_grid::core::types::{Direction, LaneAxis, Position, VehicleId};
use traffic_grid::grid::{GridState, LaneRegistry, LaneSet};

const ROWS: usize = 12;
const COLUMNS: usize = 16;

fn axis_strategy() -> impl Strategy<Value = LaneAxis> {
    prop_oneof![Just(LaneAxis::Horizontal), Just(LaneAxis::Vertical)]
}

fn direction_strategy() -> impl Strategy<Value = Direction> {
    prop_oneof![
        Just(Direction::West),
        Just(Direction::South),
        Just(Direction::East),
        Just(Direction::North),
    ]
}

#[derive(Debug, Clone)]
enum GridOp {
    Place { row: usize, column: usize, direction: Direction },
    Advance { pick: usize },
    Remove { pick: usize },
}

fn grid_op_strategy() -> impl Strategy<Value = GridOp> {
    prop_oneof![
        (0..ROWS, 0..COLUMNS, direction_strategy())
            .prop_map(|(row, column, direction)| GridOp::Place { row, column, direction }),
        any::<usize>().prop_map(|pick| GridOp::Advance { pick }),
        any::<usize>().prop_map(|pick| GridOp::Remove { pick }),
    ]
}

proptest! {
    #[test]
    fn prop_registered_lanes_are_disjoint(
        requests in prop::collection::vec((axis_strategy(), 0..COLUMNS, 1..6usize), 0..12),
        default_first in any::<bool>(),
    ) {
        let mut registry = LaneRegistry::new(ROWS, COLUMNS).unwrap();
        if default_first {
            registry.register_default().unwrap();
        }
        for (axis, from, len) in requests {
            // Rejections are fine; only accepted registrations are checked
            let _ = match axis {
                LaneAxis::Horizontal => registry.register_horizontal(from, from + len),
                LaneAxis::Vertical => registry.register_vertical(from, from + len),
            };
        }
        if !default_first {
            let _ = registry.register_default();
        }

        let mut row_claims = vec![0u32; ROWS];
        let mut column_claims = vec![0u32; COLUMNS];
        for id in registry.generators() {
            let lanes = registry.lane_set(id).unwrap();
            prop_assert!(!lanes.is_empty());
            for &row in lanes.lanes(LaneAxis::Horizontal) {
                row_claims[row] += 1;
            }
            for &column in lanes.lanes(LaneAxis::Vertical) {
                column_claims[column] += 1;
            }
        }

        // With a default generator every lane has exactly one owner
        let expected = u32::from(registry.default_generator().is_some());
        for claims in row_claims.iter().chain(column_claims.iter()) {
            prop_assert!(*claims <= 1);
            if expected == 1 {
                prop_assert_eq!(*claims, 1);
            }
        }
    }

    #[test]
    fn prop_default_lanes_are_the_complement(
        row_range in (0..ROWS, 1..4usize),
        column_range in (0..COLUMNS, 1..4usize),
    ) {
        let mut registry = LaneRegistry::new(ROWS, COLUMNS).unwrap();
        let default = registry.register_default().unwrap();
        let (row_from, row_len) = row_range;
        let (column_from, column_len) = column_range;
        let rows_taken = registry.register_horizontal(row_from, row_from + row_len).is_ok();
        let columns_taken = registry
            .register_vertical(column_from, column_from + column_len)
            .is_ok();

        match registry.lane_set(default).unwrap() {
            LaneSet::Default { rows, columns } => {
                for row in 0..ROWS {
                    let claimed = rows_taken && (row_from..row_from + row_len).contains(&row);
                    prop_assert_eq!(rows.contains(&row), !claimed);
                }
                for column in 0..COLUMNS {
                    let claimed = columns_taken
                        && (column_from..column_from + column_len).contains(&column);
                    prop_assert_eq!(columns.contains(&column), !claimed);
                }
            }
            other => prop_assert!(false, "default generator got {:?}", other),
        }
    }

    #[test]
    fn prop_reversal_twice_restores_directions(
        axis in axis_strategy(),
        from in 0..COLUMNS,
        len in 1..5usize,
    ) {
        let mut grid = GridState::new(ROWS, COLUMNS).unwrap();
        let before = grid.clone();
        let limit = grid.lane_count(axis);
        prop_assume!(from + len <= limit);

        grid.reverse_lanes(axis, from, from + len).unwrap();
        for lane in from..from + len {
            prop_assert_eq!(
                grid.lane_direction(axis, lane),
                before.lane_direction(axis, lane).map(Direction::reversed)
            );
        }
        grid.reverse_lanes(axis, from, from + len).unwrap();
        for lane in 0..limit {
            prop_assert_eq!(grid.lane_direction(axis, lane), before.lane_direction(axis, lane));
        }
    }

    #[test]
    fn prop_occupancy_bookkeeping_survives_any_sequence(
        ops in prop::collection::vec(grid_op_strategy(), 1..200),
    ) {
        let mut grid = GridState::new(ROWS, COLUMNS).unwrap();
        let mut vehicles: Vec<(VehicleId, Direction)> = Vec::new();

        for op in ops {
            match op {
                GridOp::Place { row, column, direction } => {
                    let id = VehicleId::new();
                    let pos = Position::new(row, column);
                    let was_free = !grid.is_occupied(pos);
                    let placed = grid.place(id, pos, direction).is_ok();
                    prop_assert_eq!(placed, was_free);
                    if placed {
                        vehicles.push((id, direction));
                    }
                }
                GridOp::Advance { pick } => {
                    if vehicles.is_empty() {
                        continue;
                    }
                    let (id, direction) = vehicles[pick % vehicles.len()];
                    let from = grid.position_of(id).unwrap();
                    if let Some(to) = grid.next_position(from, direction) {
                        let was_free = !grid.is_occupied(to);
                        let moved = grid.move_vehicle(id, from, to).is_ok();
                        prop_assert_eq!(moved, was_free);
                        let expected = if moved { to } else { from };
                        prop_assert_eq!(grid.position_of(id), Some(expected));
                    } else {
                        prop_assert!(grid.is_boundary(from, direction));
                    }
                }
                GridOp::Remove { pick } => {
                    if vehicles.is_empty() {
                        continue;
                    }
                    let (id, _) = vehicles.swap_remove(pick % vehicles.len());
                    let pos = grid.remove(id).unwrap();
                    prop_assert!(!grid.is_occupied(pos));
                }
            }

            grid.check_invariants().unwrap();
            prop_assert_eq!(grid.vehicle_count(), vehicles.len());
            prop_assert_eq!(grid.snapshot().occupied_count(), vehicles.len());
        }
    }
}
