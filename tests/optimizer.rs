use rustyblocks::{
    BlockId, Budget, CancelToken, Diagram, OptimizerSettings, Point, StopReason, Strategy,
};

/// Two sources and two sinks wired in an X, plus a diagram input feeding one
/// sink's second port.
fn crossed() -> Diagram {
    let mut d = Diagram::new();
    let none = Vec::<String>::new;
    let a = d.create_block_at("A", none(), ["o"], 0.0, 0.0).unwrap();
    let b = d.create_block_at("B", none(), ["o"], 0.0, 200.0).unwrap();
    let c = d.create_block_at("C", ["i", "j"], none(), 400.0, 0.0).unwrap();
    let e = d.create_block_at("D", ["i"], none(), 400.0, 200.0).unwrap();
    let input = d.create_diagram_input("In").unwrap();
    let pin = |d: &Diagram, block: BlockId, name: &str| d.pin_by_name(block, name).unwrap();
    d.create_wire(pin(&d, a, "o"), pin(&d, e, "i")).unwrap();
    d.create_wire(pin(&d, b, "o"), pin(&d, c, "i")).unwrap();
    d.create_wire(input, pin(&d, c, "j")).unwrap();
    d
}

fn positions(d: &Diagram) -> Vec<(String, Point)> {
    d.blocks().map(|b| (b.name.clone(), b.position)).collect()
}

#[test]
fn optimizer_reduces_cost_and_keeps_grid() {
    let mut d = crossed();
    let before = d.cost().unwrap();
    assert!(before.crossings >= 1);

    let report = d.optimize_placement(Budget::iterations(500)).unwrap();
    assert!((report.cost_before - before.total).abs() < 1e-9);
    assert!(report.cost_after < report.cost_before);
    assert!((d.cost().unwrap().total - report.cost_after).abs() < 1e-9);
    assert_eq!(d.store().wire_count(), 3);
    for block in d.blocks() {
        assert!(d.grid().is_aligned(block.position), "{} off grid", block.name);
    }
}

#[test]
fn locked_block_never_moves() {
    for strategy in [Strategy::HillClimbing, Strategy::annealing()] {
        let mut d = crossed();
        let a = d.block_by_name("A").unwrap().id;
        d.set_locked(a, true).unwrap();
        let pinned = d.block(a).unwrap().position;
        let settings = OptimizerSettings {
            strategy,
            budget: Budget::iterations(600),
            seed: 7,
            ..OptimizerSettings::default()
        };
        d.optimize_placement_with(&settings, &CancelToken::new()).unwrap();
        assert_eq!(d.block(a).unwrap().position, pinned);
    }
}

#[test]
fn same_seed_same_layout() {
    let settings = OptimizerSettings {
        strategy: Strategy::annealing(),
        budget: Budget::iterations(300),
        seed: 1234,
        ..OptimizerSettings::default()
    };
    let mut first = crossed();
    let mut second = crossed();
    let r1 = first.optimize_placement_with(&settings, &CancelToken::new()).unwrap();
    let r2 = second.optimize_placement_with(&settings, &CancelToken::new()).unwrap();
    assert_eq!(positions(&first), positions(&second));
    assert_eq!(r1, r2);
}

#[test]
fn second_run_does_not_increase_cost() {
    let mut d = crossed();
    let first = d.optimize_placement(Budget::iterations(400)).unwrap();
    let second = d.optimize_placement(Budget::iterations(400)).unwrap();
    assert!((second.cost_before - first.cost_after).abs() < 1e-9);
    assert!(second.cost_after <= second.cost_before);
}

#[test]
fn all_locked_is_a_noop() {
    let mut d = crossed();
    let ids: Vec<_> = d.blocks().map(|b| b.id).collect();
    for id in ids {
        d.set_locked(id, true).unwrap();
    }
    let before = positions(&d);
    let report = d.optimize_placement(Budget::iterations(100)).unwrap();
    assert_eq!(report.stop_reason, StopReason::NothingToOptimize);
    assert_eq!(report.moved_count, 0);
    assert_eq!(positions(&d), before);
}

#[test]
fn disconnected_and_empty_graphs_are_fine() {
    let mut empty = Diagram::new();
    let report = empty.optimize_placement(Budget::iterations(10)).unwrap();
    assert_eq!(report.stop_reason, StopReason::NothingToOptimize);

    let mut loose = Diagram::new();
    loose.create_block("X", ["a"], ["b"]).unwrap();
    loose.create_block("Y", ["a"], ["b"]).unwrap();
    let report = loose.optimize_placement(Budget::iterations(50)).unwrap();
    assert_eq!(report.cost_before, 0.0);
    assert_eq!(report.cost_after, 0.0);
}

#[test]
fn cycles_are_tolerated() {
    let mut d = Diagram::new();
    let x = d.create_block("X", ["in"], ["out"]).unwrap();
    let y = d.create_block("Y", ["in"], ["out"]).unwrap();
    let pin = |d: &Diagram, block: BlockId, name: &str| d.pin_by_name(block, name).unwrap();
    d.create_wire(pin(&d, x, "out"), pin(&d, y, "in")).unwrap();
    d.create_wire(pin(&d, y, "out"), pin(&d, x, "in")).unwrap();
    let report = d.optimize_placement(Budget::iterations(200)).unwrap();
    assert!(report.cost_after <= report.cost_before);
    assert_eq!(d.store().wire_count(), 2);
}

#[test]
fn time_budget_stops_the_run() {
    let mut d = crossed();
    let settings = OptimizerSettings {
        budget: Budget::time(std::time::Duration::from_millis(30)),
        stall_sweeps: 0,
        ..OptimizerSettings::default()
    };
    let report = d.optimize_placement_with(&settings, &CancelToken::new()).unwrap();
    assert_eq!(report.stop_reason, StopReason::TimeLimit);
}

/// Twelve blocks wired head to tail but laid out out of order, so most wires
/// run through other blocks.
fn scrambled_chain() -> Diagram {
    let mut d = Diagram::new();
    let mut blocks = Vec::new();
    for i in 0..12 {
        let x = ((i * 5) % 12) as f64 * 200.0;
        let y = ((i * 7) % 3) as f64 * 120.0;
        blocks.push(d.create_block_at(&format!("S{i}"), ["in"], ["out"], x, y).unwrap());
    }
    for pair in blocks.windows(2) {
        let out = d.pin_by_name(pair[0], "out").unwrap();
        let inp = d.pin_by_name(pair[1], "in").unwrap();
        d.create_wire(out, inp).unwrap();
    }
    d
}

#[test]
fn cancelling_mid_run_applies_best_layout_so_far() {
    let mut d = scrambled_chain();
    let settings = OptimizerSettings {
        budget: Budget::iterations(usize::MAX),
        stall_sweeps: 0,
        ..OptimizerSettings::default()
    };
    let cancel = CancelToken::new();
    let trigger = {
        let cancel = cancel.clone();
        std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(50));
            cancel.cancel();
        })
    };
    let report = d.optimize_placement_with(&settings, &cancel).unwrap();
    trigger.join().unwrap();

    assert_eq!(report.stop_reason, StopReason::Cancelled);
    assert!(report.iterations > 0);
    assert!(report.cost_after < report.cost_before);
    assert!((d.cost().unwrap().total - report.cost_after).abs() < 1e-9);
    for block in d.blocks() {
        assert!(d.grid().is_aligned(block.position), "{} off grid", block.name);
    }
}
