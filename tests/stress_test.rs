//! S9 "Rehash / GC stress" from `spec.md` §8: build a large number of random
//! BDDs over a shared manager, check invariants periodically, then force a
//! GC pass and confirm every still-live handle evaluates exactly as before.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use teddy_mdd::{Diagram, Manager, Op};

const VAR_COUNT: usize = 8;
const ROUNDS: usize = 10_000;
const CHECK_EVERY: usize = 100;
const SAMPLE_POINTS: usize = 16;

const BINARY_OPS: [Op; 4] = [Op::And, Op::Or, Op::Xor, Op::Not];

fn random_point(rng: &mut SmallRng) -> Vec<u32> {
    (0..VAR_COUNT).map(|_| rng.gen_range(0..2)).collect()
}

fn assert_invariants(manager: &Manager, live: &[Diagram]) {
    for f in live {
        let nodes = manager.node_count(f).expect("node_count on a live handle must succeed");
        assert!(nodes >= 1, "every diagram has at least a terminal node");
        let deps = manager.dependency_set(f).expect("dependency_set must succeed");
        assert!(deps.iter().all(|&v| v < VAR_COUNT), "dependency set must stay within declared variables");
    }
}

#[test]
fn rehash_and_gc_stress() {
    let manager = Manager::new_bdd(VAR_COUNT, None).unwrap();
    let mut rng = SmallRng::seed_from_u64(0xC0FFEE_D00D);

    let mut variables: Vec<Diagram> = (0..VAR_COUNT).map(|i| manager.variable(i).unwrap()).collect();
    let mut live: Vec<Diagram> = variables.clone();

    for round in 0..ROUNDS {
        let op = BINARY_OPS[rng.gen_range(0..BINARY_OPS.len())];
        let a = &live[rng.gen_range(0..live.len())];
        let b = &live[rng.gen_range(0..live.len())];
        let f = manager.apply(op, a, b).unwrap();
        live.push(f);

        // Keep the live set from growing without bound: periodically drop
        // everything except the original variables and the most recent
        // handful of results, so GC actually has something to reclaim.
        if live.len() > 256 {
            let tail: Vec<Diagram> = live.split_off(live.len() - 32);
            live = variables.clone();
            live.extend(tail);
        }

        if round % CHECK_EVERY == 0 {
            assert_invariants(&manager, &live);
        }
    }

    // Snapshot every live handle's behaviour on a sample of random points
    // before forcing collection.
    let points: Vec<Vec<u32>> = (0..SAMPLE_POINTS).map(|_| random_point(&mut rng)).collect();
    let before: Vec<Vec<_>> = live
        .iter()
        .map(|f| points.iter().map(|p| manager.evaluate(f, p).unwrap()).collect())
        .collect();
    let nodes_before = manager.total_node_count();

    let reclaimed = manager.force_gc();
    let nodes_after = manager.total_node_count();
    assert!(nodes_after <= nodes_before, "GC must never grow the pool");
    assert!(reclaimed == 0 || nodes_after < nodes_before, "a nonzero reclaim count must shrink the pool");

    for (f, expected) in live.iter().zip(before.iter()) {
        let after: Vec<_> = points.iter().map(|p| manager.evaluate(f, p).unwrap()).collect();
        assert_eq!(&after, expected, "GC must not change the function any live handle evaluates to");
    }

    assert_invariants(&manager, &live);

    // The original variable handles must have survived unconditionally.
    for (i, v) in variables.drain(..).enumerate() {
        assert_eq!(manager.dependency_set(&v).unwrap(), vec![i]);
    }
}
