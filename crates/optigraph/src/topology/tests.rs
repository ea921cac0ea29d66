//! Unit and property tests for the topology stages.

use super::*;
use crate::error::TopologyError;
use nalgebra::DMatrix;
use num_complex::Complex64;
use proptest::prelude::*;

const SQRT_HALF: f64 = std::f64::consts::FRAC_1_SQRT_2;

fn close(a: Complex64, b: Complex64) -> bool {
    (a - b).norm() < 1e-12
}

/// Six ports, five beamsplitters.
fn scenario_a() -> Topology {
    let edges = vec![10, 15, 4, 6, 8, 11, 9, 14, 12, 13, 0, 5, 2, 3, 7, 1];
    Topology::new(6, ElementCounts::new(5, 0, 0), edges).unwrap()
}

#[test]
fn scenario_a_trajectories() {
    let mut t = scenario_a();
    let map = t.trajectories().unwrap().clone();
    assert_eq!(map.total(), 22);
    assert!(map.get(0, 0).contains(&vec![10, 0, 0, 10]));
    assert!(map.get(0, 5).contains(&vec![10, 0, 1, 15]));
    assert!(map.get(5, 5).contains(&vec![15, 1, 1, 15]));
    assert_eq!(map.get(2, 2).len(), 2);
    assert_eq!(map.get(2, 3).len(), 2);
    assert!(map.get(2, 2).contains(&vec![12, 2, 3, 6, 6, 9, 8, 12]));
    assert!(!map.has_path(0, 1));
    assert!(!map.has_path(4, 0));
}

#[test]
fn scenario_a_amplitudes() {
    let mut t = scenario_a();
    let a = t.amplitude_matrix().unwrap();
    let s = Complex64::new(SQRT_HALF, 0.0);
    assert!(close(a[(0, 0)], s));
    assert!(close(a[(0, 5)], s));
    assert!(close(a[(5, 0)], s));
    assert!(close(a[(5, 5)], -s));
    // Two three-element paths of √½³ each.
    assert!(close(a[(2, 2)], s));
    // The same two paths with opposite sign at the last element.
    assert!(close(a[(2, 3)], Complex64::new(0.0, 0.0)));
    let map = t.trajectories().unwrap().clone();
    for (i, j, set) in map.iter() {
        let z = a[(i, j)];
        assert!(z.re.is_finite() && z.im.is_finite());
        assert!(z.norm() <= set.len() as f64 + 1e-12);
    }
    assert!(close(t.amplitude(5, 0).unwrap(), s));
}

#[test]
fn scenario_a_fails_sift() {
    let mut t = scenario_a();
    assert!(!t.sift());
    assert_eq!(t.deviation(), f64::MAX);
    let none = SiftMask::from_cells([[false; LOGICAL_LINES]; LOGICAL_LINES]);
    assert!(t.sift_masked(&none));
}

#[test]
fn empty_trajectory_set_gives_exact_zero() {
    let mut t = scenario_a();
    for (i, j) in [(0, 1), (4, 0), (5, 1), (1, 0)] {
        assert_eq!(t.amplitude(i, j).unwrap(), Complex64::new(0.0, 0.0));
    }
}

#[test]
fn beamsplitter_transfer_at_half() {
    let p = [0.5];
    let bs = ElementKind::Beamsplitter;
    assert!(close(transfer(bs, &p, 0, 0), Complex64::new(SQRT_HALF, 0.0)));
    assert!(close(transfer(bs, &p, 0, 1), Complex64::new(SQRT_HALF, 0.0)));
    assert!(close(transfer(bs, &p, 1, 0), Complex64::new(SQRT_HALF, 0.0)));
    assert!(close(transfer(bs, &p, 1, 1), Complex64::new(-SQRT_HALF, 0.0)));
}

#[test]
fn coupler_and_waveplate_transfer() {
    let dc = ElementKind::DirectionalCoupler;
    assert!(close(transfer(dc, &[0.25], 0, 0), Complex64::new(0.5, 0.0)));
    assert!(close(transfer(dc, &[0.25], 1, 0), Complex64::new(0.0, 0.75f64.sqrt())));
    let wp = ElementKind::Waveplate;
    // φ = 0: identity for any α.
    assert!(close(transfer(wp, &[0.0, 0.3], 0, 0), Complex64::new(1.0, 0.0)));
    assert!(close(transfer(wp, &[0.0, 0.3], 0, 1), Complex64::new(0.0, 0.0)));
    // φ = ½, α = ⅛: full swap with sign flip.
    assert!(close(transfer(wp, &[0.5, 0.125], 0, 0), Complex64::new(0.0, 0.0)));
    assert!(close(transfer(wp, &[0.5, 0.125], 1, 0), Complex64::new(-1.0, 0.0)));
}

#[test]
fn transfer_clamps_out_of_range_parameters() {
    let bs = ElementKind::Beamsplitter;
    assert_eq!(transfer(bs, &[1.7], 0, 1), Complex64::new(0.0, 0.0));
    assert_eq!(transfer(bs, &[-0.2], 0, 0), Complex64::new(0.0, 0.0));
    assert!(!transfer(bs, &[-0.2], 1, 0).re.is_nan());
}

#[test]
fn identity_amplitudes_give_identity_truth() {
    let id = DMatrix::<Complex64>::identity(4, 4);
    let truth = truth_from_amplitudes(&id).unwrap();
    for i in 0..4 {
        for j in 0..4 {
            let want = if i == j { 1.0 } else { 0.0 };
            assert_eq!(truth[(i, j)], Complex64::new(want, 0.0), "cell ({i},{j})");
        }
    }
    let small = DMatrix::<Complex64>::identity(3, 3);
    assert_eq!(
        truth_from_amplitudes(&small),
        Err(TopologyError::TooFewPorts { ports: 3 })
    );
}

#[test]
fn truth_cell_combines_two_products() {
    let a = DMatrix::from_fn(4, 4, |i, j| Complex64::new((i * 4 + j + 1) as f64, 0.0));
    let truth = truth_from_amplitudes(&a).unwrap();
    // Cell (0,3) uses [0,1,2,3]: A01·A23 + A03·A21.
    let want = a[(0, 1)] * a[(2, 3)] + a[(0, 3)] * a[(2, 1)];
    assert_eq!(truth[(0, 3)], want);
}

#[test]
fn forward_routed_circuit_passes_sift() {
    let mut t = Topology::new(
        4,
        ElementCounts::new(3, 0, 0),
        vec![2, 4, 6, 7, 8, 9, 0, 1, 3, 5],
    )
    .unwrap();
    assert!(t.sift());
    assert!(t.deviation().is_finite());
    let truth = t.truth_matrix().unwrap();
    assert!(truth.iter().all(|z| z.re.is_finite() && z.im.is_finite()));
}

#[test]
fn too_few_ports_never_pass_sift() {
    let mut t = Topology::new(3, ElementCounts::new(1, 0, 0), vec![2, 3, 0, 1, 4]).unwrap();
    assert!(!t.sift());
    assert!(t.truth_matrix().is_err());
}

#[test]
fn routing_cycle_is_detected() {
    // Element 0 exits on port 0 straight back into its own port 1.
    let mut t = Topology::new(4, ElementCounts::new(1, 0, 0), vec![1, 2, 0, 3, 4, 5]).unwrap();
    assert_eq!(
        enumerate_trajectories(&t),
        Err(TopologyError::RoutingCycle { element: 0 })
    );
    assert!(!t.sift());
    assert_eq!(t.deviation(), f64::MAX);
    assert!(t.amplitude_matrix().is_err());
}

#[test]
fn edge_validation() {
    let c = ElementCounts::new(1, 0, 0);
    assert_eq!(Topology::new(0, c, vec![0, 1]).unwrap_err(), TopologyError::NoPorts);
    assert_eq!(
        Topology::new(2, c, vec![0, 1, 2]).unwrap_err(),
        TopologyError::EdgeCount {
            expected: 4,
            got: 3
        }
    );
    assert_eq!(
        Topology::new(2, c, vec![2, 3, 0, 4]).unwrap_err(),
        TopologyError::EdgeOutOfRange {
            node: 3,
            dest: 4,
            nodes: 4
        }
    );
    assert_eq!(
        Topology::new(2, c, vec![2, 3, 2, 1]).unwrap_err(),
        TopologyError::EdgeCollision {
            dest: 2,
            first: 0,
            second: 2
        }
    );
}

#[test]
fn overflowing_counts_are_rejected() {
    let huge = ElementCounts::new(usize::MAX / 2, 1, 0);
    assert_eq!(huge.checked_node_count(4), None);
    assert_eq!(
        Topology::new(4, huge, vec![0, 1, 2, 3]).unwrap_err(),
        TopologyError::SizeOverflow
    );
    let doubled = ElementCounts::new(0, 0, usize::MAX / 2 + 1);
    assert_eq!(doubled.checked_node_count(0), None);
    assert_eq!(ElementCounts::new(3, 1, 2).checked_node_count(4), Some(16));
}

#[test]
fn kinds_and_parameter_slots() {
    let mut t = Topology::new(2, ElementCounts::new(1, 0, 1), vec![2, 3, 4, 5, 0, 1]).unwrap();
    assert_eq!(t.kinds(), &[ElementKind::Beamsplitter, ElementKind::Waveplate]);
    assert_eq!(t.params().len(), 3);
    assert_eq!(t.slot(1), ParamSlot { start: 1, width: 2 });
    t.set_kinds(&[ElementKind::Waveplate, ElementKind::Beamsplitter])
        .unwrap();
    assert_eq!(t.slot(0).range(), 0..2);
    assert_eq!(t.slot(1).range(), 2..3);
    t.set_params(&[0.1, 0.2, 0.3]).unwrap();
    assert_eq!(t.element_params(1), &[0.3]);
    assert_eq!(
        t.set_kinds(&[ElementKind::Waveplate, ElementKind::Waveplate]),
        Err(TopologyError::KindMismatch)
    );
    assert_eq!(
        t.set_params(&[0.5]),
        Err(TopologyError::ParamCount {
            expected: 3,
            got: 1
        })
    );
    t.reset_params();
    assert!(t.params().iter().all(|&p| p == 0.5));
}

#[test]
fn set_edges_drops_cached_trajectories() {
    let mut t = Topology::new(4, ElementCounts::new(1, 0, 0), vec![2, 3, 0, 1, 4, 5]).unwrap();
    t.trajectories().unwrap();
    assert!(t.cached_trajectories().is_some());
    t.set_edges(vec![3, 2, 0, 1, 4, 5]).unwrap();
    assert!(t.cached_trajectories().is_none());
    assert!(t.set_edges(vec![0, 0, 1, 2, 3, 4]).is_err());
    assert_eq!(t.port_of(3), Some(1));
    assert_eq!(t.port_of(1), None);
    assert_eq!(t.port_of(6), None);
}

#[test]
fn display_lists_edges_then_kind_tags() {
    let t = Topology::new(2, ElementCounts::new(1, 1, 0), vec![2, 4, 3, 5, 0, 1]).unwrap();
    assert_eq!(t.to_string(), "2 4 3 5 0 1 \nbs dc ");
}

fn permuted(nodes: usize) -> impl Strategy<Value = Vec<usize>> {
    Just((0..nodes).collect::<Vec<_>>()).prop_shuffle()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn trajectories_are_deterministic(edges in permuted(10)) {
        let t = Topology::new(4, ElementCounts::new(3, 0, 0), edges).unwrap();
        prop_assert_eq!(enumerate_trajectories(&t), enumerate_trajectories(&t));
    }

    #[test]
    fn amplitudes_are_finite_and_bounded(
        edges in permuted(10),
        params in proptest::collection::vec(0.0f64..=1.0, 4),
    ) {
        let mut t = Topology::new(4, ElementCounts::new(1, 1, 1), edges).unwrap();
        t.set_params(&params).unwrap();
        if let Ok(a) = t.amplitude_matrix() {
            let map = t.trajectories().unwrap().clone();
            for (i, j, set) in map.iter() {
                let z = a[(i, j)];
                prop_assert!(z.re.is_finite() && z.im.is_finite());
                prop_assert!(z.norm() <= set.len() as f64 + 1e-9);
            }
        }
    }
}
