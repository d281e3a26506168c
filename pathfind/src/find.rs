use std::{
    cmp::Ordering,
    collections::BinaryHeap,
    fmt::{Debug, Display},
};

use log::{debug, trace};

/// Cost of a path, counted in moves between adjacent nodes
pub type Cost = usize;

/// Score of a node that has not been reached yet
pub const UNREACHABLE: Cost = Cost::MAX;

/// Supertrait that collects all the requirements on the NodeReference values
/// Must be copy, comparable and not references (hence 'static)
pub trait NodeReference: Copy + Eq + Debug + 'static {}

pub trait MapTrait {
    /// The type that can be used to reference nodes in the map
    type Reference: NodeReference;

    /// The type that the map uses for storage
    type Storage<T: Default + Copy + Clone + 'static>: MapStorage<T, Reference = Self::Reference>;

    /// Check if the provided node reference is valid
    fn is_valid(&self, node: Self::Reference) -> bool;

    /// Return an iterator over the walkable neighbors of the provided node.
    /// Every move to a neighbor costs exactly one.
    fn neighbors_of(&self, node: Self::Reference) -> impl Iterator<Item = Self::Reference>;

    /// Estimate of the remaining cost between two nodes. Must never overestimate.
    fn heuristic(&self, from: Self::Reference, to: Self::Reference) -> Cost;

    /// Create a storage for values of type T
    fn create_storage<T: Default + Copy + Clone + 'static>(&self) -> Self::Storage<T>;
}

pub trait MapStorage<T> {
    type Reference: NodeReference;

    fn is_valid(&self, node: Self::Reference) -> bool;
    fn get(&self, node: Self::Reference) -> T;
    fn get_mut(&mut self, node: Self::Reference) -> &mut T;
}

/// Receives the transitions of a running search, one call per change.
///
/// This is how the search projects its progress onto something that can be
/// displayed. The decision state (scores and predecessors) stays inside the
/// [`PathFinder`]; use `()` to run without any projection.
pub trait SearchObserver<R> {
    /// `node` was pushed onto the frontier
    fn entered_frontier(&mut self, _node: R) {}
    /// `node` was popped from the frontier
    fn left_frontier(&mut self, _node: R) {}
    /// `node` was expanded (never called for the start node)
    fn closed(&mut self, _node: R) {}
    /// `node` lies on the final path (never called for the start or the goal)
    fn on_path(&mut self, _node: R) {}
}

impl<R> SearchObserver<R> for () {}

/// The objects that we store in the prioirty queue
#[derive(Debug)]
struct ToVisit<R: Eq> {
    f_score: Cost,
    sequence: u64,
    point: R,
}

impl<R: Eq> Ord for ToVisit<R> {
    fn cmp(&self, other: &Self) -> Ordering {
        // reverse for BinaryHeap to be a min-heap, equal scores leave in insertion order
        self.f_score
            .cmp(&other.f_score)
            .then_with(|| self.sequence.cmp(&other.sequence))
            .reverse()
    }
}

impl<R: Eq> PartialOrd for ToVisit<R> {
    fn partial_cmp(&self, other: &ToVisit<R>) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<R: Eq> PartialEq for ToVisit<R> {
    fn eq(&self, other: &ToVisit<R>) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<R: Eq> Eq for ToVisit<R> {}

/// Per-node bookkeeping of one search
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeScore<R> {
    pub g_score: Cost,
    pub f_score: Cost,
    pub from: Option<R>,
    /// mirrors the frontier so membership is a lookup instead of a heap scan
    pub queued: bool,
}

impl<R> Default for NodeScore<R> {
    fn default() -> Self {
        NodeScore {
            g_score: UNREACHABLE,
            f_score: UNREACHABLE,
            from: None,
            queued: false,
        }
    }
}

impl<R> Display for NodeScore<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.g_score == UNREACHABLE {
            write!(f, "{:>3} ", "")
        } else {
            write!(f, "{:03} ", self.g_score)
        }
    }
}

#[derive(Debug, PartialEq, Clone, Eq)]
pub struct PathResult<R> {
    /// every node from start to goal, both included
    pub path: Vec<R>,
    pub start: R,
    pub goal: R,
    pub total_cost: Cost,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathFinderState<R> {
    Computing,
    NoPathFound,
    PathFound(PathResult<R>),
}

impl<R> PathFinderState<R> {
    pub fn is_done(&self) -> bool {
        !matches!(self, PathFinderState::Computing)
    }

    pub fn is_found(&self) -> bool {
        matches!(self, PathFinderState::PathFound(_))
    }
}

/// Walks the predecessor chain back from `goal` and reports every node
/// strictly between `start` and `goal` to the observer.
///
/// Returns `None` without reporting anything when the chain does not lead
/// back to `start`.
pub fn reconstruct_path<R, S>(
    scores: &S,
    start: R,
    goal: R,
    observer: &mut impl SearchObserver<R>,
) -> Option<PathResult<R>>
where
    R: NodeReference,
    S: MapStorage<NodeScore<R>, Reference = R>,
{
    let mut path = vec![goal];
    let mut current = goal;

    while current != start {
        match scores.get(current).from {
            Some(from) => {
                path.push(from);
                current = from;
            }
            None => return None,
        }
    }

    path.reverse();

    for &node in path.iter().filter(|&&n| n != start && n != goal) {
        observer.on_path(node);
    }

    Some(PathResult {
        total_cost: scores.get(goal).g_score,
        path,
        start,
        goal,
    })
}

/// A* search that advances one frontier pop per [`PathFinder::step`].
///
/// The frontier is ordered by `(f_score, insertion sequence)`, so among
/// equally promising nodes the one queued first is expanded first. Nodes
/// already in the frontier are not queued again when their score improves.
#[derive(Debug)]
pub struct PathFinder<
    R: NodeReference,
    S: MapStorage<NodeScore<R>, Reference = R>,
    M: MapTrait<Reference = R, Storage<NodeScore<R>> = S>,
> {
    start: R,
    goal: R,
    scores: S,
    visit_list: BinaryHeap<ToVisit<R>>,
    sequence: u64,
    steps: usize,
    state: PathFinderState<R>,
    _map: std::marker::PhantomData<M>,
}

impl<
        R: NodeReference,
        S: MapStorage<NodeScore<R>, Reference = R>,
        M: MapTrait<Reference = R, Storage<NodeScore<R>> = S>,
    > PathFinder<R, S, M>
{
    /// Queues `start` for expansion. Both endpoints must lie on `map`.
    pub fn new(start: R, goal: R, map: &M) -> Self {
        debug_assert!(map.is_valid(start) && map.is_valid(goal));
        let mut scores: S = map.create_storage::<NodeScore<R>>();
        let start_f = map.heuristic(start, goal);

        *scores.get_mut(start) = NodeScore {
            g_score: 0,
            f_score: start_f,
            from: None,
            queued: true,
        };

        Self {
            start,
            goal,
            scores,
            visit_list: BinaryHeap::from([ToVisit {
                f_score: start_f,
                sequence: 0,
                point: start,
            }]),
            sequence: 0,
            steps: 0,
            state: PathFinderState::Computing,
            _map: std::marker::PhantomData,
        }
    }

    pub fn finish(
        mut self,
        map: &M,
        observer: &mut impl SearchObserver<R>,
    ) -> (PathFinderState<R>, S) {
        loop {
            match self.step(map, observer) {
                PathFinderState::Computing => {}
                s => return (s, self.scores),
            }
        }
    }

    pub fn step(&mut self, map: &M, observer: &mut impl SearchObserver<R>) -> PathFinderState<R> {
        if self.state.is_done() {
            return self.state.clone();
        }

        let Some(visit) = self.visit_list.pop() else {
            debug!(
                "frontier exhausted after {} steps, no path from {:?} to {:?}",
                self.steps, self.start, self.goal
            );
            self.state = PathFinderState::NoPathFound;
            return self.state.clone();
        };

        self.steps += 1;
        let current = visit.point;
        self.scores.get_mut(current).queued = false;
        observer.left_frontier(current);
        trace!("step {}: expanding {:?} (f={})", self.steps, current, visit.f_score);

        if current == self.goal {
            self.state = match reconstruct_path(&self.scores, self.start, self.goal, observer) {
                Some(result) => {
                    debug!(
                        "path found after {} steps, cost {}",
                        self.steps, result.total_cost
                    );
                    PathFinderState::PathFound(result)
                }
                None => PathFinderState::NoPathFound,
            };
            return self.state.clone();
        }

        if current != self.start {
            observer.closed(current);
        }

        let tentative_g = self.scores.get(current).g_score + 1;

        for neighbor in map.neighbors_of(current) {
            let score = self.scores.get_mut(neighbor);
            if tentative_g >= score.g_score {
                continue;
            }

            score.g_score = tentative_g;
            score.f_score = tentative_g + map.heuristic(neighbor, self.goal);
            score.from = Some(current);

            if !score.queued {
                score.queued = true;
                self.sequence += 1;
                self.visit_list.push(ToVisit {
                    f_score: score.f_score,
                    sequence: self.sequence,
                    point: neighbor,
                });
                observer.entered_frontier(neighbor);
            }
        }

        self.state.clone()
    }

    pub fn state(&self) -> &PathFinderState<R> {
        &self.state
    }

    pub fn scores(&self) -> &S {
        &self.scores
    }

    /// Best known cost from the start, `None` while unreached
    pub fn g_score(&self, node: R) -> Option<Cost> {
        Some(self.scores.get(node).g_score).filter(|&g| g != UNREACHABLE)
    }

    pub fn f_score(&self, node: R) -> Option<Cost> {
        Some(self.scores.get(node).f_score).filter(|&f| f != UNREACHABLE)
    }

    pub fn predecessor(&self, node: R) -> Option<R> {
        self.scores.get(node).from
    }

    pub fn in_frontier(&self, node: R) -> bool {
        self.scores.get(node).queued
    }

    pub fn frontier_len(&self) -> usize {
        self.visit_list.len()
    }

    /// Number of frontier pops so far
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn start(&self) -> R {
        self.start
    }

    pub fn goal(&self) -> R {
        self.goal
    }
}
