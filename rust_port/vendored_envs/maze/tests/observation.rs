use maze_rs::{encode, Pos, AGENT_VALUE, GOAL_VALUE};
use proptest::prelude::*;

fn cell(size: usize) -> impl Strategy<Value = Pos> {
    (0..size, 0..size).prop_map(|(x, y)| Pos::new(x, y))
}

fn scene() -> impl Strategy<Value = (usize, Pos, Pos)> {
    (1usize..=16).prop_flat_map(|n| (Just(n), cell(n), cell(n)))
}

proptest! {
    #[test]
    fn decode_recovers_positions((size, agent, goal) in scene()) {
        let obs = encode(size, agent, goal);
        prop_assert_eq!(obs.shape(), (size, size));
        prop_assert_eq!(obs.get(agent), AGENT_VALUE);

        let (a, g) = obs.decode();
        prop_assert_eq!(a, Some(agent));
        if agent == goal {
            prop_assert_eq!(g, None);
        } else {
            prop_assert_eq!(g, Some(goal));
            prop_assert_eq!(obs.get(goal), GOAL_VALUE);
        }
    }

    #[test]
    fn everything_else_is_zero((size, agent, goal) in scene()) {
        let obs = encode(size, agent, goal);
        let marked = if agent == goal { 1 } else { 2 };
        prop_assert_eq!(obs.values().iter().filter(|&&v| v != 0.0).count(), marked);
        prop_assert_eq!(obs.values().len(), size * size);
    }
}

#[test]
fn rows_index_by_y_then_x() {
    let obs = encode(5, Pos::new(4, 0), Pos::new(0, 3));
    let rows = obs.rows();
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0][4], AGENT_VALUE);
    assert_eq!(rows[3][0], GOAL_VALUE);
}
