use super::Graph;
use crate::error::SolverError;
use itertools::Itertools;

/// Problem/solution graph pairs processed together in one pass.
///
/// `problems[i]` is the target structure for `solutions[i]`. All graphs share the same
/// bounds but may differ in body length and candidate count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    problems: Vec<Graph>,
    solutions: Vec<Graph>,
}

impl Batch {
    pub fn new(problems: Vec<Graph>, solutions: Vec<Graph>) -> Result<Self, SolverError> {
        if problems.len() != solutions.len() {
            return Err(SolverError::BatchMismatch {
                problems: problems.len(),
                solutions: solutions.len(),
            });
        }
        Ok(Self {
            problems,
            solutions,
        })
    }

    pub fn push(&mut self, problem: Graph, solution: Graph) {
        self.problems.push(problem);
        self.solutions.push(solution);
    }

    pub fn problems(&self) -> &[Graph] {
        &self.problems
    }

    pub fn solutions(&self) -> &[Graph] {
        &self.solutions
    }

    /// Iterates `(problem, solution)` pairs in batch order.
    pub fn pairs(&self) -> impl Iterator<Item = (&Graph, &Graph)> {
        self.problems.iter().zip_eq(self.solutions.iter())
    }

    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }
}
