use std::collections::VecDeque;

use maze_rs::{generate, seeded, Cell, Grid, Pos, StartPolicy};
use proptest::prelude::*;

fn neighbors(grid: &Grid, p: Pos) -> Vec<Pos> {
    let mut out = Vec::new();
    for (dx, dy) in [(0isize, 1isize), (0, -1), (1, 0), (-1, 0)] {
        let (nx, ny) = (p.x as isize + dx, p.y as isize + dy);
        if grid.in_bounds(nx, ny) {
            let q = Pos::new(nx as usize, ny as usize);
            if grid.get(q) == Cell::Passage { out.push(q); }
        }
    }
    out
}

fn reachable_from(grid: &Grid, start: Pos) -> usize {
    let mut seen = vec![false; grid.size() * grid.size()];
    let mut queue = VecDeque::from([start]);
    seen[grid.index(start)] = true;
    let mut count = 0;
    while let Some(p) = queue.pop_front() {
        count += 1;
        for q in neighbors(grid, p) {
            if !seen[grid.index(q)] {
                seen[grid.index(q)] = true;
                queue.push_back(q);
            }
        }
    }
    count
}

/// Undirected passage-to-passage adjacencies, each counted once.
fn edge_count(grid: &Grid) -> usize {
    grid.passages()
        .into_iter()
        .map(|p| neighbors(grid, p).into_iter().filter(|q| (q.y, q.x) > (p.y, p.x)).count())
        .sum()
}

fn policy() -> impl Strategy<Value = StartPolicy> {
    prop_oneof![Just(StartPolicy::OddLattice), Just(StartPolicy::AnyCell)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn carved_maze_is_a_tree(seed in any::<u64>(), size in 1usize..=25, policy in policy()) {
        let grid = generate(size, policy, &mut seeded(seed));
        prop_assert_eq!(grid.size() % 2, 1);

        let open = grid.passages();
        prop_assert!(!open.is_empty());
        // connected
        prop_assert_eq!(reachable_from(&grid, open[0]), open.len());
        // acyclic
        prop_assert_eq!(edge_count(&grid), open.len() - 1);
    }

    #[test]
    fn odd_lattice_border_stays_solid(seed in any::<u64>(), size in 3usize..=21) {
        let grid = generate(size, StartPolicy::OddLattice, &mut seeded(seed));
        let n = grid.size();
        for i in 0..n {
            prop_assert!(!grid.is_passage(Pos::new(i, 0)));
            prop_assert!(!grid.is_passage(Pos::new(i, n - 1)));
            prop_assert!(!grid.is_passage(Pos::new(0, i)));
            prop_assert!(!grid.is_passage(Pos::new(n - 1, i)));
        }
    }

    #[test]
    fn same_seed_same_maze(seed in any::<u64>(), size in 1usize..=19) {
        let a = generate(size, StartPolicy::OddLattice, &mut seeded(seed));
        let b = generate(size, StartPolicy::OddLattice, &mut seeded(seed));
        prop_assert_eq!(a, b);
    }
}

#[test]
fn requested_sizes_round_to_odd() {
    let mut rng = seeded(42);
    assert_eq!(generate(10, StartPolicy::OddLattice, &mut rng).size(), 11);
    assert_eq!(generate(15, StartPolicy::OddLattice, &mut rng).size(), 15);
    assert_eq!(generate(2, StartPolicy::AnyCell, &mut rng).size(), 3);
}

#[test]
fn different_seeds_usually_differ() {
    let layouts: std::collections::HashSet<Vec<u8>> =
        (0..8u64).map(|s| generate(15, StartPolicy::OddLattice, &mut seeded(s)).cells().to_vec()).collect();
    assert!(layouts.len() > 1);
}
