//! Force assembly and equation generation over multi-element chains

use approx::assert_relative_eq;
use chainsim::prelude::*;
use chainsim::{assemble, assemble_forces, build_mechanics};

/// point mass, rigid block, point mass
fn triple_chain() -> Chain {
    ChainBuilder::new()
        .spring(Spring::new(1, 0.5, 100.0, SpringBehavior::Linear))
        .mass(Mass::point(1, 2.0).at([0.0, -0.7], [0.0, 0.0]))
        .spring(Spring::new(2, 0.4, 80.0, SpringBehavior::Linear))
        .mass(Mass::block(2, 0.2, 0.1, 0.2, 500.0).at([0.0, -1.3], [0.0, 0.0]))
        .spring(Spring::new(3, 0.3, 60.0, SpringBehavior::Linear))
        .mass(
            Mass::point(3, 1.0)
                .with_external_force(2.0)
                .at([0.0, -1.8], [0.0, 0.0]),
        )
        .build()
        .unwrap()
}

/// Evaluate with integration-frame y positions and zero x
fn eval_at(rhs: &Expr, ys: [f64; 3]) -> f64 {
    rhs.eval(&|symbol: &Symbol| {
        symbol.as_state().map(|var| match var.axis {
            Axis::X => 0.0,
            Axis::Y => ys[var.index - 1],
        })
    })
    .unwrap()
}

#[test]
fn test_equation_count() {
    let chain = triple_chain();
    let mechanics = build_mechanics(&chain, 9.81).unwrap();
    assert_eq!(mechanics.generate_equations().len(), 2 * chain.len());
    assert_eq!(mechanics.state_symbols().len(), 4 * chain.len());
}

#[test]
fn test_force_terms_per_mass() {
    let forces = assemble_forces(&triple_chain()).unwrap();
    assert_eq!(forces.len(), 3);
    assert_eq!(forces[0].mass_name, "m1");
    // gravity, external load, spring above, spring below
    assert_eq!(forces[0].y.len(), 4);
    assert_eq!(forces[1].y.len(), 4);
    // the last mass has nothing below it
    assert_eq!(forces[2].y.len(), 3);
    assert_eq!(forces[2].x.len(), 1);
}

#[test]
fn test_block_half_height_offsets() {
    let mechanics = build_mechanics(&triple_chain(), 9.81).unwrap();
    let rhs = mechanics.resolved_rhs().unwrap();
    let ys = [0.7, 1.3, 1.8];
    let h = 0.1;

    // spring 2 spans from mass 1 to the top face of the block
    let spring2 = 80.0 * ((ys[1] - h / 2.0) - ys[0] - 0.4);
    // spring 3 spans from the bottom face of the block to mass 3
    let spring3 = 60.0 * (ys[2] - (ys[1] + h / 2.0) - 0.3);
    let spring1 = 100.0 * (ys[0] - 0.5);

    assert_relative_eq!(
        eval_at(&rhs[1], ys),
        (2.0 * 9.81 - spring1 + spring2) / 2.0,
        epsilon = 1e-12
    );
    assert_relative_eq!(
        eval_at(&rhs[3], ys),
        (2.0 * 9.81 - spring2 + spring3) / 2.0,
        epsilon = 1e-12
    );
    assert_relative_eq!(
        eval_at(&rhs[5], ys),
        (9.81 + 2.0 - spring3) / 1.0,
        epsilon = 1e-12
    );
}

#[test]
fn test_single_block_uses_origin_branch() {
    let chain = ChainBuilder::new()
        .spring(Spring::new(1, 0.5, 100.0, SpringBehavior::Linear))
        .mass(Mass::block(1, 0.2, 0.2, 0.2, 250.0).at([0.0, -0.8], [0.0, 0.0]))
        .build()
        .unwrap();
    assert_relative_eq!(chain.springs()[0].end()[1], -0.7, epsilon = 1e-12);
    assert_relative_eq!(chain.springs()[0].length(), 0.7, epsilon = 1e-12);

    let rhs = build_mechanics(&chain, 9.81).unwrap().resolved_rhs().unwrap();
    let y = 0.8;
    let expected = 9.81 - 100.0 * ((y - 0.1) - 0.5) / 2.0;
    let value = rhs[1]
        .eval(&|symbol: &Symbol| symbol.as_state().map(|var| if var.axis == Axis::Y { y } else { 0.0 }))
        .unwrap();
    assert_relative_eq!(value, expected, epsilon = 1e-12);
}

#[test]
fn test_equations_are_symbolic_before_substitution() {
    let mechanics = build_mechanics(&triple_chain(), 9.81).unwrap();
    let equations = mechanics.generate_equations();
    let params = equations[1].rhs.params();
    for name in ["m1", "g", "F1", "k1", "l0_1", "k2", "l0_2", "h2"] {
        assert!(params.contains(name), "missing {name}");
    }
    let resolved = Mechanics::substitute_parameters(&equations, mechanics.param_values());
    assert!(resolved.iter().all(|eq| eq.rhs.params().is_empty()));
}

#[test]
fn test_count_mismatch_is_rejected() {
    let err = ChainBuilder::new()
        .spring(Spring::new(1, 0.5, 100.0, SpringBehavior::Linear))
        .spring(Spring::new(2, 0.5, 100.0, SpringBehavior::Linear))
        .mass(Mass::point(1, 2.0))
        .build()
        .unwrap_err();
    assert_eq!(err, ChainError::CountMismatch { springs: 2, masses: 1 });

    let chain = triple_chain();
    let err = assemble(chain.springs(), &chain.masses()[..2]).unwrap_err();
    assert_eq!(err, ChainError::CountMismatch { springs: 3, masses: 2 });
}

#[test]
fn test_detached_geometry_is_rejected() {
    let chain = triple_chain();
    let mut masses = chain.masses().to_vec();
    masses[1].move_to(0.0, -1.6);
    let err = assemble(chain.springs(), &masses).unwrap_err();
    assert_eq!(err, ChainError::DetachedSpring { spring: 2, mass: 2 });
}

#[test]
fn test_apply_sample_drives_the_chain() {
    let mut chain = triple_chain();
    let settings = SimulationSettings {
        t_end: 0.5,
        num_points: 6,
        ..SimulationSettings::default()
    };
    let result = Simulation::new(chain.clone(), settings).run().unwrap();
    chain.apply_sample(&result.trajectory, 5).unwrap();

    let expected = result.trajectory.presentation_positions(5).unwrap();
    for (mass, point) in chain.masses().iter().zip(&expected) {
        assert_eq!(mass.position(), *point);
    }
    assert_eq!(chain.springs()[1].start(), chain.masses()[0].bottom_attachment());
    assert_eq!(chain.springs()[1].end(), chain.masses()[1].top_attachment());
}
