//! Dependency-ordered middleware pipeline.
//!
//! A [`Pipeline`] is built from an unordered set of [`Stage`]s, each
//! declaring `before`/`after`/`requires` constraints against other stage
//! ids. Construction builds a directed graph, rejects cycles with a
//! three-colour depth-first search over every component, and orders the
//! stages with Kahn's algorithm (ready stages drain in insertion order, so
//! identical input always yields identical order).
//!
//! Execution is strictly sequential. Each stage receives the context by
//! value and returns a [`StageFlow`]: `Continue` hands the (possibly
//! replaced) context to the next stage, `Halt` stops the pipeline silently.
//! The executor always adopts the returned context; in-place mutation of
//! shared state is not part of the contract. Because a stage returns
//! exactly one flow value, advancing the pipeline twice from one stage
//! invocation is impossible by construction.

use std::collections::{HashMap, VecDeque};
use std::future::Future;

use futures::future::BoxFuture;
use tracing::debug;

use crate::error::SetupError;

/// Tracing target for pipeline execution.
pub(crate) const PIPELINE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::pipeline");

/// Flow decision returned by a stage.
#[derive(Debug)]
pub enum StageFlow<C> {
    /// Advance to the next stage with this context.
    Continue(C),
    /// Stop the pipeline. No further stages run and no error is raised;
    /// the context is handed back to the pipeline's caller.
    Halt(C),
}

type StageRun<C> = Box<dyn Fn(C) -> BoxFuture<'static, StageFlow<C>> + Send + Sync>;

/// One ordered unit of the pipeline.
pub struct Stage<C> {
    id: String,
    before: Option<String>,
    after: Option<String>,
    requires: Vec<String>,
    run: StageRun<C>,
}

impl<C> Stage<C> {
    /// Creates a stage from an id and an async run function.
    pub fn new<F, Fut>(id: impl Into<String>, run: F) -> Self
    where
        F: Fn(C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StageFlow<C>> + Send + 'static,
    {
        Self {
            id: id.into(),
            before: None,
            after: None,
            requires: Vec::new(),
            run: Box::new(move |ctx| Box::pin(run(ctx))),
        }
    }

    /// Declares that this stage must run before `id`.
    #[must_use]
    pub fn before(mut self, id: impl Into<String>) -> Self {
        self.before = Some(id.into());
        self
    }

    /// Declares that this stage must run after `id`.
    #[must_use]
    pub fn after(mut self, id: impl Into<String>) -> Self {
        self.after = Some(id.into());
        self
    }

    /// Declares a hard dependency: `id` must run before this stage.
    ///
    /// Produces the same ordering edge as [`Stage::after`]; the distinction
    /// is documentary — the stage reads context fields `id` produces.
    #[must_use]
    pub fn requires(mut self, id: impl Into<String>) -> Self {
        self.requires.push(id.into());
        self
    }

    /// The stage id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl<C> std::fmt::Debug for Stage<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("id", &self.id)
            .field("before", &self.before)
            .field("after", &self.after)
            .field("requires", &self.requires)
            .finish_non_exhaustive()
    }
}

/// Result of executing a pipeline to completion or early halt.
#[derive(Debug)]
pub struct PipelineRun<C> {
    /// The context as the last executed stage returned it.
    pub context: C,
    /// Id of the halting stage, or `None` when every stage ran.
    pub halted_at: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Colour {
    Unvisited,
    Visiting,
    Visited,
}

/// A dependency-ordered stage executor.
pub struct Pipeline<C> {
    stages: Vec<Stage<C>>,
    order: Vec<usize>,
}

impl<C: Send + 'static> Pipeline<C> {
    /// Builds a pipeline from an unordered stage set.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::DuplicateStage`] for repeated ids,
    /// [`SetupError::UnknownStage`] for constraints naming absent ids, and
    /// [`SetupError::CircularDependency`] when the constraint graph
    /// contains a cycle.
    pub fn build(stages: Vec<Stage<C>>) -> Result<Self, SetupError> {
        let mut index_of: HashMap<&str, usize> = HashMap::new();
        for (index, stage) in stages.iter().enumerate() {
            if index_of.insert(stage.id.as_str(), index).is_some() {
                return Err(SetupError::duplicate_stage(&stage.id));
            }
        }

        let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); stages.len()];
        let mut incoming: Vec<usize> = vec![0; stages.len()];
        let mut add_edge = |from: usize, to: usize| {
            outgoing[from].push(to);
            incoming[to] += 1;
        };
        for (index, stage) in stages.iter().enumerate() {
            let lookup = |id: &str| -> Result<usize, SetupError> {
                index_of
                    .get(id)
                    .copied()
                    .ok_or_else(|| SetupError::unknown_stage(&stage.id, id))
            };
            if let Some(id) = &stage.before {
                add_edge(index, lookup(id)?);
            }
            if let Some(id) = &stage.after {
                add_edge(lookup(id)?, index);
            }
            for id in &stage.requires {
                add_edge(lookup(id)?, index);
            }
        }

        // Cycle detection must cover every component before any ordering
        // is attempted.
        let mut colours = vec![Colour::Unvisited; stages.len()];
        for index in 0..stages.len() {
            if colours[index] == Colour::Unvisited
                && let Some(on_cycle) = find_cycle(&outgoing, &mut colours, index)
            {
                return Err(SetupError::circular_dependency(&stages[on_cycle].id));
            }
        }

        // Kahn's algorithm; the ready queue is seeded and drained in
        // insertion order for a deterministic tie-break.
        let mut queue: VecDeque<usize> = (0..stages.len())
            .filter(|&index| incoming[index] == 0)
            .collect();
        let mut order = Vec::with_capacity(stages.len());
        while let Some(index) = queue.pop_front() {
            order.push(index);
            for &next in &outgoing[index] {
                incoming[next] -= 1;
                if incoming[next] == 0 {
                    queue.push_back(next);
                }
            }
        }
        debug_assert_eq!(order.len(), stages.len());

        Ok(Self { stages, order })
    }

    /// Stage ids in execution order.
    #[must_use]
    pub fn order(&self) -> Vec<&str> {
        self.order
            .iter()
            .map(|&index| self.stages[index].id.as_str())
            .collect()
    }

    /// Runs the stages in order, threading the context through each.
    pub async fn execute(&self, mut context: C) -> PipelineRun<C> {
        for &index in &self.order {
            let stage = &self.stages[index];
            debug!(target: PIPELINE_TARGET, stage = %stage.id, "running stage");
            match (stage.run)(context).await {
                StageFlow::Continue(next) => context = next,
                StageFlow::Halt(next) => {
                    debug!(target: PIPELINE_TARGET, stage = %stage.id, "pipeline halted");
                    return PipelineRun {
                        context: next,
                        halted_at: Some(stage.id.clone()),
                    };
                }
            }
        }
        PipelineRun {
            context,
            halted_at: None,
        }
    }
}

impl<C> std::fmt::Debug for Pipeline<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages.len())
            .finish_non_exhaustive()
    }
}

/// Three-colour depth-first search; returns a node on a cycle, if any.
fn find_cycle(outgoing: &[Vec<usize>], colours: &mut [Colour], node: usize) -> Option<usize> {
    if colours[node] == Colour::Visiting {
        return Some(node);
    }
    if colours[node] == Colour::Visited {
        return None;
    }

    colours[node] = Colour::Visiting;
    for &next in &outgoing[node] {
        if let Some(on_cycle) = find_cycle(outgoing, colours, next) {
            return Some(on_cycle);
        }
    }
    colours[node] = Colour::Visited;
    None
}
