use super::*;

/// Σ (x_k − c_k)², counting evaluations.
struct Bowl {
    center: Vec<f64>,
    calls: usize,
    last: Vec<f64>,
}

impl Bowl {
    fn new(center: &[f64]) -> Self {
        Self {
            center: center.to_vec(),
            calls: 0,
            last: Vec::new(),
        }
    }
}

impl Objective for Bowl {
    fn dim(&self) -> usize {
        self.center.len()
    }

    fn value(&mut self, x: &[f64]) -> f64 {
        self.calls += 1;
        self.last = x.to_vec();
        x.iter()
            .zip(&self.center)
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }
}

fn generous() -> OptCfg {
    OptCfg {
        xtol: 1e-6,
        max_time_ms: 5_000,
        ..OptCfg::default()
    }
}

#[test]
fn finds_interior_minimum() {
    let opt = GlobalLocal::new(generous());
    let mut bowl = Bowl::new(&[0.2, 0.7, 0.4]);
    let out = opt.minimize(&mut bowl, &Bounds::unit(3), &[0.5; 3]);
    assert!(out.converged);
    for (x, c) in out.x.iter().zip([0.2, 0.7, 0.4]) {
        assert!((x - c).abs() < 1e-3, "x={x} c={c}");
    }
    assert!(out.value < 1e-5);
    // The objective was evaluated last at the returned point.
    assert_eq!(bowl.last, out.x);
    assert_eq!(bowl.calls, out.evaluations);
}

#[test]
fn respects_bounds_when_minimum_is_outside() {
    let opt = GlobalLocal::new(generous());
    let mut bowl = Bowl::new(&[1.5, -0.5]);
    let out = opt.minimize(&mut bowl, &Bounds::unit(2), &[0.5, 0.5]);
    assert!(out.x.iter().all(|v| (0.0..=1.0).contains(v)));
    assert!((out.x[0] - 1.0).abs() < 1e-3);
    assert!(out.x[1].abs() < 1e-3);
}

#[test]
fn evaluation_cap_returns_best_so_far_unconverged() {
    let cfg = OptCfg {
        xtol: 1e-12,
        max_evaluations: 10,
        global_samples: 4,
        ..generous()
    };
    let mut bowl = Bowl::new(&[0.3, 0.3]);
    let out = GlobalLocal::new(cfg).minimize(&mut bowl, &Bounds::unit(2), &[0.9, 0.9]);
    assert!(!out.converged);
    // Never worse than the starting point.
    assert!(out.value <= 0.72 + 1e-12);
}

#[test]
fn zero_dimensional_problem_is_trivially_converged() {
    let mut bowl = Bowl::new(&[]);
    let out = GlobalLocal::default().minimize(&mut bowl, &Bounds::unit(0), &[]);
    assert!(out.converged);
    assert_eq!(out.value, 0.0);
    assert!(out.x.is_empty());
}

/// Minimize x + y subject to x − y = 0.25.
struct Line;

impl Objective for Line {
    fn dim(&self) -> usize {
        2
    }

    fn value(&mut self, x: &[f64]) -> f64 {
        x[0] + x[1]
    }

    fn equality_residuals(&mut self, x: &[f64], out: &mut Vec<f64>) {
        out.push(x[0] - x[1] - 0.25);
    }
}

#[test]
fn penalty_pulls_towards_equality_constraint() {
    let cfg = OptCfg {
        penalty: 1e2,
        ..generous()
    };
    let out = GlobalLocal::new(cfg).minimize(&mut Line, &Bounds::unit(2), &[0.5, 0.5]);
    assert!((out.x[0] - out.x[1] - 0.25).abs() < 5e-2);
    assert!(out.value < 0.4);
}

#[test]
fn same_seed_same_result() {
    let opt = GlobalLocal::new(generous());
    let a = opt.minimize(&mut Bowl::new(&[0.1, 0.9]), &Bounds::unit(2), &[0.5, 0.5]);
    let b = opt.minimize(&mut Bowl::new(&[0.1, 0.9]), &Bounds::unit(2), &[0.5, 0.5]);
    assert_eq!(a.x, b.x);
}
