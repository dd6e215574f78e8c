//! Configuration, resolution and integration failures

use chainsim::config::ChainConfig;
use chainsim::integrate;
use chainsim::prelude::*;
use chainsim::IntegrationFailure;

fn single() -> Chain {
    ChainBuilder::new()
        .spring(Spring::new(1, 0.5, 100.0, SpringBehavior::Linear))
        .mass(Mass::point(1, 2.0).at([0.0, -0.7], [0.0, 0.0]))
        .build()
        .unwrap()
}

#[test]
fn test_empty_chain() {
    assert_eq!(ChainBuilder::new().build().unwrap_err(), ChainError::Empty);
}

#[test]
fn test_invalid_physical_constants() {
    let err = ChainBuilder::new()
        .spring(Spring::new(1, 0.5, -3.0, SpringBehavior::Linear))
        .mass(Mass::point(1, 2.0))
        .build()
        .unwrap_err();
    assert!(matches!(err, ChainError::InvalidParameter { ref name, .. } if name == "k1"));

    let err = ChainBuilder::new()
        .spring(Spring::new(1, 0.5, 100.0, SpringBehavior::Linear))
        .mass(Mass::point(1, f64::NAN))
        .build()
        .unwrap_err();
    assert!(matches!(err, ChainError::InvalidParameter { ref name, .. } if name == "m1"));
}

#[test]
fn test_duplicate_indices() {
    let err = ChainBuilder::new()
        .spring(Spring::new(1, 0.5, 100.0, SpringBehavior::Linear))
        .mass(Mass::point(1, 2.0))
        .spring(Spring::new(2, 0.5, 100.0, SpringBehavior::Linear))
        .mass(Mass::point(1, 2.0))
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        ChainError::DuplicateIndex {
            element: "mass",
            index: 1
        }
    );
}

#[test]
fn test_unknown_tags_in_chain_file() {
    let text = r#"{
        "springs": [{ "index": 1, "rest_length": 0.5, "stiffness": 100.0, "behavior": "quadratic" }],
        "masses": [{ "type": "masspoint", "index": 1, "mass": 2.0, "position": [0.0, -0.7] }]
    }"#;
    let err = ChainConfig::from_json_str(text).unwrap_err();
    assert!(err.to_string().contains("quadratic"));

    let text = r#"{
        "springs": [{ "index": 1, "rest_length": 0.5, "stiffness": 100.0 }],
        "masses": [{ "type": "balloon", "index": 1, "mass": 2.0, "position": [0.0, -0.7] }]
    }"#;
    let err = ChainConfig::from_json_str(text).unwrap_err();
    assert!(err.to_string().contains("balloon"));
}

#[test]
fn test_block_missing_dimension() {
    let text = r#"{
        "springs": [{ "index": 1, "rest_length": 0.5, "stiffness": 100.0 }],
        "masses": [{ "type": "steady body", "index": 1, "x_dim": 0.2, "y_dim": 0.1,
                     "density": 500.0, "position": [0.0, -0.7] }]
    }"#;
    let config = ChainConfig::from_json_str(text).unwrap();
    let err = config.build_chain().unwrap_err();
    assert!(matches!(err, ChainError::MissingParameter { name: "z_dim", .. }));
}

#[test]
fn test_missing_parameter_is_a_resolution_error() {
    let mut mechanics = chainsim::build_mechanics(&single(), 9.81).unwrap();
    let mut values = ParamValues::new();
    for (name, value) in mechanics.param_values().iter() {
        if name != "l0_1" {
            values.insert(name, value);
        }
    }
    mechanics.set_param_values(values);

    let err = mechanics.resolved_rhs().unwrap_err();
    assert_eq!(
        err,
        ResolutionError::UnresolvedSymbol {
            equation: 1,
            symbol: "l0_1".to_string()
        }
    );

    let settings = SimulationSettings::default();
    let err = mechanics
        .simulate(&single().initial_state(), settings.t_span(), 11, &settings)
        .unwrap_err();
    assert!(matches!(err, Error::Resolution(_)));
}

#[test]
fn test_nan_state_is_an_integration_error() {
    let mechanics = chainsim::build_mechanics(&single(), 9.81).unwrap();
    let compiled = mechanics.compile().unwrap();
    let settings = SimulationSettings::default();

    let err = integrate(&compiled, &[0.0, f64::NAN, 0.0, 0.0], (0.0, 1.0), 11, &settings)
        .unwrap_err();
    assert_eq!(err.kind, IntegrationFailure::NonFinite);
    assert!(!err.partial.success);

    let simulation = Simulation::new(single(), settings);
    let err = simulation.run_from(&[0.0, 0.7, f64::NAN, 0.0]).unwrap_err();
    assert!(matches!(
        err,
        Error::Integration(IntegrationError {
            kind: IntegrationFailure::NonFinite,
            ..
        })
    ));
}

#[test]
fn test_state_blowing_up_mid_run_is_an_integration_error() {
    // stiffness large enough that the first stage evaluations overflow
    let chain = ChainBuilder::new()
        .spring(Spring::new(1, 0.5, 1e100, SpringBehavior::Cubic))
        .mass(Mass::point(1, 2.0).at([0.0, -1.5], [0.0, 0.0]))
        .build()
        .unwrap();
    let initial_state = chain.initial_state();
    assert!(initial_state.iter().all(|v| v.is_finite()));

    for solver in [SolverKind::Dopri54, SolverKind::Rkf45] {
        let settings = SimulationSettings {
            solver,
            t_end: 1.0,
            num_points: 11,
            ..SimulationSettings::default()
        };
        let err = Simulation::new(chain.clone(), settings).run().unwrap_err();
        match err {
            Error::Integration(err) => {
                assert_eq!(err.kind, IntegrationFailure::NonFinite);
                assert_eq!(err.time, 0.0);
                assert!(!err.partial.success);
                assert_eq!(err.partial.len(), 1);
            }
            other => panic!("unexpected error {other}"),
        }
    }
}

#[test]
fn test_wrong_state_length() {
    let simulation = Simulation::new(single(), SimulationSettings::default());
    let err = simulation.run_from(&[0.0, 0.7]).unwrap_err();
    match err {
        Error::Integration(err) => {
            assert_eq!(err.kind, IntegrationFailure::DimensionMismatch);
            assert_eq!(err.time, 0.0);
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_step_underflow_reports_partial_trajectory() {
    // dt_min above any step the controller would accept
    let settings = SimulationSettings {
        t_end: 1.0,
        num_points: 11,
        rtol: 1e-14,
        atol: 1e-14,
        dt_initial: 0.05,
        dt_min: 0.04,
        ..SimulationSettings::default()
    };
    let chain = ChainBuilder::new()
        .spring(Spring::new(1, 0.5, 100.0, SpringBehavior::Linear))
        .mass(Mass::point(1, 2.0).at([0.0, -0.9], [0.0, 0.0]))
        .build()
        .unwrap();
    let err = Simulation::new(chain, settings).run().unwrap_err();
    match err {
        Error::Integration(err) => {
            assert_eq!(err.kind, IntegrationFailure::StepSizeUnderflow);
            assert!(!err.partial.success);
            assert!(!err.partial.is_empty());
        }
        other => panic!("unexpected error {other}"),
    }
}
