//! Cutback retry test for the adaptive stepper.

use th_evolve::{EvolveError, EvolveOptions, OdeSystem, evolve};

#[derive(Debug)]
enum FlakyError {
    Transient,
    Fatal,
    Evolve(EvolveError),
}

impl From<EvolveError> for FlakyError {
    fn from(e: EvolveError) -> Self {
        FlakyError::Evolve(e)
    }
}

/// Constant growth that fails on chosen calls.
struct FlakySystem {
    calls: usize,
    fail_on: Vec<usize>,
    fatal: bool,
    failures: usize,
}

impl OdeSystem for FlakySystem {
    type Error = FlakyError;

    fn dim(&self) -> usize {
        1
    }

    fn rhs(&mut self, _t: f64, _y: &[f64], dydt: &mut [f64]) -> Result<(), FlakyError> {
        self.calls += 1;
        if self.fail_on.contains(&self.calls) {
            self.failures += 1;
            return Err(if self.fatal {
                FlakyError::Fatal
            } else {
                FlakyError::Transient
            });
        }
        dydt[0] = 1.0;
        Ok(())
    }

    fn is_retryable(&self, err: &FlakyError) -> bool {
        matches!(err, FlakyError::Transient)
    }
}

fn opts() -> EvolveOptions {
    EvolveOptions {
        h_init: Some(0.1),
        h_min: 1e-4,
        max_retries: 4,
        cutback_factor: 0.5,
        ..EvolveOptions::default()
    }
}

#[test]
fn transient_failure_is_consumed_by_cutback() {
    // call 1: f(t0); calls 2-3: linearization; call 4: first stage
    let mut sys = FlakySystem {
        calls: 0,
        fail_on: vec![4],
        fatal: false,
        failures: 0,
    };
    let mut y = [0.0];
    let stats = evolve(&mut sys, &mut y, 0.0, &[1.0], &opts(), |_, _| Ok(()))
        .expect("cutback retry should succeed");

    assert_eq!(sys.failures, 1);
    assert_eq!(stats.retries, 1);
    assert!((y[0] - 1.0).abs() < 1e-9);
}

#[test]
fn jacobian_failure_is_consumed_by_cutback() {
    // call 2 is the first Jacobian column
    let mut sys = FlakySystem {
        calls: 0,
        fail_on: vec![2],
        fatal: false,
        failures: 0,
    };
    let mut y = [0.0];
    let stats = evolve(&mut sys, &mut y, 0.0, &[1.0], &opts(), |_, _| Ok(()))
        .expect("cutback retry should cover linearization");

    assert_eq!(sys.failures, 1);
    assert_eq!(stats.retries, 1);
    assert!((y[0] - 1.0).abs() < 1e-9);
}

#[test]
fn fatal_jacobian_failure_propagates() {
    let mut sys = FlakySystem {
        calls: 0,
        fail_on: vec![3],
        fatal: true,
        failures: 0,
    };
    let mut y = [0.0];
    let res = evolve(&mut sys, &mut y, 0.0, &[1.0], &opts(), |_, _| Ok(()));
    assert!(matches!(res, Err(FlakyError::Fatal)));
}

#[test]
fn fatal_failure_propagates() {
    let mut sys = FlakySystem {
        calls: 0,
        fail_on: vec![4],
        fatal: true,
        failures: 0,
    };
    let mut y = [0.0];
    let res = evolve(&mut sys, &mut y, 0.0, &[1.0], &opts(), |_, _| Ok(()));
    assert!(matches!(res, Err(FlakyError::Fatal)));
}

#[test]
fn retry_budget_is_bounded() {
    let mut sys = FlakySystem {
        calls: 0,
        fail_on: (4..100).collect(),
        fatal: false,
        failures: 0,
    };
    let mut y = [0.0];
    let res = evolve(&mut sys, &mut y, 0.0, &[1.0], &opts(), |_, _| Ok(()));
    assert!(matches!(res, Err(FlakyError::Transient)));
    assert_eq!(sys.failures, 5);
}
