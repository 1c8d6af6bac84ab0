//! Tests for the scoring model, the solver's train/inference passes and checkpoints.
mod common;
use common::*;
use graph_heuristic::model::sigmoid;
use graph_heuristic::prelude::*;
use graph_heuristic::solver::{AutosaveSolver, header_path};
use candle_core::Tensor;
use std::path::PathBuf;

fn scores(output: ForwardOutput) -> Vec<Vec<f32>> {
    match output {
        ForwardOutput::Scores(scores) => scores,
        other => panic!("expected scores, got {:?}", other),
    }
}

fn loss(output: ForwardOutput) -> f32 {
    match output {
        ForwardOutput::Loss(loss) => loss,
        other => panic!("expected a loss, got {:?}", other),
    }
}

fn mixed_batch() -> (Vec<Graph>, Vec<Graph>) {
    let problems = vec![
        small_problem(),
        build_graph(&[[0, 0, 0, 0]], &[]),
        build_graph(&[[1, 1, 1, 1], [2, 2, 2, 2], [3, 3, 3, 3]], &[]),
    ];
    let solutions = vec![
        arithmetic_solution(),
        build_graph(&[[1, 2, 3, 4]], &[([0, 0, 0, 0], 1.0), ([0, 0, 0, 1], 0.0)]),
        build_graph(&[], &[([4, 3, 2, 1], 0.5)]),
    ];
    (problems, solutions)
}

#[test]
fn test_sigmoid_stays_in_open_interval() {
    let x = Tensor::new(&[-15f32, -3.0, 0.0, 3.0, 15.0], &Device::Cpu).unwrap();
    let y = sigmoid(&x).unwrap().to_vec1::<f32>().unwrap();
    assert!(y.iter().all(|&v| v > 0.0 && v < 1.0));
    assert!((y[2] - 0.5).abs() < 1e-6);
    assert!(y.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_inference_scores_one_value_per_candidate() {
    let mut solver = Solver::new(small_config(), &Device::Cpu).unwrap();
    let (problems, solutions) = mixed_batch();

    let rows = scores(solver.forward(&problems, &solutions, false).unwrap());
    let lengths: Vec<usize> = rows.iter().map(|r| r.len()).collect();
    assert_eq!(lengths, vec![3, 2, 1]);
    assert!(rows.iter().flatten().all(|&s| s > 0.0 && s < 1.0));
}

#[test]
fn test_inference_is_repeatable() {
    let config = HeuristicConfig {
        dropout: 0.5,
        ..small_config()
    };
    let mut solver = Solver::new(config, &Device::Cpu).unwrap();
    let (problems, solutions) = mixed_batch();

    let first = scores(solver.forward(&problems, &solutions, false).unwrap());
    let second = scores(solver.forward(&problems, &solutions, false).unwrap());
    assert_eq!(first, second);
}

#[test]
fn test_scores_do_not_depend_on_batch_neighbours() {
    let mut solver = Solver::new(small_config(), &Device::Cpu).unwrap();
    let (problems, solutions) = mixed_batch();

    let batched = scores(solver.forward(&problems, &solutions, false).unwrap());
    let alone = scores(
        solver
            .forward(&problems[1..2], &solutions[1..2], false)
            .unwrap(),
    );
    for (a, b) in batched[1].iter().zip(&alone[0]) {
        assert!((a - b).abs() < 1e-4, "{a} vs {b}");
    }
}

#[test]
fn test_training_returns_loss_and_updates_parameters() {
    let mut solver = Solver::new(small_config(), &Device::Cpu).unwrap();
    let (problems, solutions) = mixed_batch();

    let before = scores(solver.forward(&problems, &solutions, false).unwrap());
    let first_loss = loss(solver.forward(&problems, &solutions, true).unwrap());
    assert!(first_loss.is_finite());
    assert!(first_loss >= 0.0);

    let after = scores(solver.forward(&problems, &solutions, false).unwrap());
    assert_ne!(before, after);
}

#[test]
fn test_repeated_training_reduces_loss() {
    let mut solver = Solver::new(small_config(), &Device::Cpu).unwrap();
    let problems = vec![small_problem()];
    let solutions = vec![build_graph(
        &[[1, 1, 1, 0], [2, 2, 0, 0]],
        &[([3, 3, 0, 0], 1.0), ([0, 0, 0, 0], 1.0)],
    )];

    let first = loss(solver.forward(&problems, &solutions, true).unwrap());
    let mut last = first;
    for _ in 0..50 {
        last = loss(solver.forward(&problems, &solutions, true).unwrap());
    }
    assert!(last < first, "loss went from {first} to {last}");
}

#[test]
fn test_training_without_candidates_is_a_no_op() {
    let mut solver = Solver::new(small_config(), &Device::Cpu).unwrap();
    let problems = vec![small_problem()];
    let solutions = vec![build_graph(&[[1, 1, 1, 1]], &[])];
    assert_eq!(
        solver.forward(&problems, &solutions, true).unwrap(),
        ForwardOutput::Loss(0.0)
    );
}

#[test]
fn test_empty_batch() {
    let mut solver = Solver::new(small_config(), &Device::Cpu).unwrap();
    assert_eq!(
        solver.forward(&[], &[], false).unwrap(),
        ForwardOutput::Scores(vec![])
    );
    assert_eq!(
        solver.forward(&[], &[], true).unwrap(),
        ForwardOutput::Loss(0.0)
    );
}

#[test]
fn test_forward_rejects_mismatched_batches() {
    let mut solver = Solver::new(small_config(), &Device::Cpu).unwrap();
    let err = solver
        .forward(&[small_problem()], &[], false)
        .unwrap_err();
    assert!(matches!(err, SolverError::BatchMismatch { .. }));
}

#[test]
fn test_forward_rejects_out_of_range_candidates() {
    let mut solver = Solver::new(small_config(), &Device::Cpu).unwrap();
    let bad = build_graph(&[[0, 0, 0, 0]], &[([0, 0, 8, 0], 0.0)]);
    let err = solver
        .forward(&[small_problem()], &[bad], false)
        .unwrap_err();
    assert!(matches!(
        err,
        SolverError::Graph(GraphError::IndexOutOfRange {
            field: "plug_index",
            ..
        })
    ));
}

#[test]
fn test_solver_rejects_invalid_config() {
    let config = HeuristicConfig {
        n_heads: 3,
        ..small_config()
    };
    assert!(matches!(
        Solver::new(config, &Device::Cpu),
        Err(SolverError::Config(ConfigError::InvalidField { .. }))
    ));
}

#[test]
fn test_estimator_interface_matches_forward() {
    let mut solver = Solver::new(small_config(), &Device::Cpu).unwrap();
    let (problems, solutions) = mixed_batch();
    let batch = Batch::new(problems.clone(), solutions.clone()).unwrap();

    let via_trait = solver.estimate(&batch).unwrap();
    let via_forward = scores(solver.forward(&problems, &solutions, false).unwrap());
    assert_eq!(via_trait, via_forward);
    assert_eq!(solver.bounds(), small_config().bounds());
}

fn checkpoint_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "graph-heuristic-{}-{}.safetensors",
        name,
        std::process::id()
    ))
}

#[test]
fn test_checkpoint_round_trip() {
    let path = checkpoint_path("round-trip");
    let (problems, solutions) = mixed_batch();

    let mut trained = Solver::new(small_config(), &Device::Cpu).unwrap();
    trained.forward(&problems, &solutions, true).unwrap();
    let expected = scores(trained.forward(&problems, &solutions, false).unwrap());
    Checkpoint.save(&trained, &path).unwrap();

    let mut restored = Solver::new(small_config(), &Device::Cpu).unwrap();
    Checkpoint.load(&mut restored, &path).unwrap();
    let observed = scores(restored.forward(&problems, &solutions, false).unwrap());

    for (a, b) in expected.iter().flatten().zip(observed.iter().flatten()) {
        assert!((a - b).abs() < 1e-6);
    }
}

#[test]
fn test_checkpoint_shape_mismatch() {
    let path = checkpoint_path("mismatch");
    let saved = Solver::new(small_config(), &Device::Cpu).unwrap();
    Checkpoint.save(&saved, &path).unwrap();

    let config = HeuristicConfig {
        dim_fc: 32,
        ..small_config()
    };
    let mut other = Solver::new(config, &Device::Cpu).unwrap();
    let err = Checkpoint.load(&mut other, &path).unwrap_err();
    assert!(matches!(
        err,
        SolverError::Config(ConfigError::ShapeMismatch {
            field: "dim_fc",
            expected: 32,
            found: 16,
        })
    ));
}

#[test]
fn test_invalid_label_is_rejected_before_training() {
    let mut solver = Solver::new(small_config(), &Device::Cpu).unwrap();
    let (problems, solutions) = mixed_batch();
    let before = scores(solver.forward(&problems, &solutions, false).unwrap());

    for label in [f32::NAN, f32::INFINITY, 2.0] {
        let poisoned = build_graph(&[[0, 0, 0, 0]], &[([1, 1, 1, 1], label)]);
        let err = solver
            .forward(&[small_problem()], &[poisoned], true)
            .unwrap_err();
        assert!(matches!(
            err,
            SolverError::Graph(GraphError::InvalidLabel { .. })
        ));
    }

    let after = scores(solver.forward(&problems, &solutions, false).unwrap());
    assert_eq!(before, after);
    assert!(after.iter().flatten().all(|&s| s > 0.0 && s < 1.0));
}

#[test]
fn test_autosave_writes_checkpoint_after_training() {
    let path = checkpoint_path("autosave");
    let (problems, solutions) = mixed_batch();
    let batch = Batch::new(problems.clone(), solutions.clone()).unwrap();

    let solver = Solver::new(small_config(), &Device::Cpu).unwrap();
    let mut autosave = AutosaveSolver::new(solver, &path);
    autosave.train(&batch).unwrap();
    let expected = autosave.estimate(&batch).unwrap();
    assert!(path.exists());
    assert!(header_path(&path).exists());

    let mut restored = Solver::new(small_config(), &Device::Cpu).unwrap();
    Checkpoint.load(&mut restored, &path).unwrap();
    let observed = scores(restored.forward(&problems, &solutions, false).unwrap());
    for (a, b) in expected.iter().flatten().zip(observed.iter().flatten()) {
        assert!((a - b).abs() < 1e-6);
    }

    let mut trained = autosave.into_inner();
    let direct = scores(trained.forward(&problems, &solutions, false).unwrap());
    assert_eq!(direct, expected);
}

#[test]
fn test_failed_save_leaves_no_header() {
    let solver = Solver::new(small_config(), &Device::Cpu).unwrap();
    let missing = std::env::temp_dir()
        .join(format!("graph-heuristic-missing-{}", std::process::id()))
        .join("weights.safetensors");
    assert!(Checkpoint.save(&solver, &missing).is_err());
    assert!(!header_path(&missing).exists());

    let path = checkpoint_path("staged");
    Checkpoint.save(&solver, &path).unwrap();
    let mut staged = path.clone().into_os_string();
    staged.push(".tmp");
    assert!(!std::path::Path::new(&staged).exists());
    assert!(path.exists());
    assert!(header_path(&path).exists());
}
