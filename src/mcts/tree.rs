use rand::seq::SliceRandom;
use rand::Rng;

use crate::engine::Move;
use crate::game::GameState;

pub(crate) type NodeId = usize;

pub(crate) const ROOT: NodeId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    /// The player picks a move from here.
    Decision,
    /// A tile spawns from here.
    Chance,
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub state: GameState,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub visits: u64,
    pub reward: f64,
    /// Move on the edge from the parent (Chance nodes only).
    pub action: Option<Move>,
    pub kind: NodeKind,
}

impl Node {
    fn new(state: GameState, parent: Option<NodeId>, action: Option<Move>, kind: NodeKind) -> Self {
        Self { state, parent, children: Vec::new(), visits: 0, reward: 0.0, action, kind }
    }

    #[inline]
    pub fn mean_reward(&self) -> Option<f64> {
        if self.visits == 0 { None } else { Some(self.reward / self.visits as f64) }
    }
}

/// Search tree stored as an arena; handles are indices into `nodes`.
///
/// One tree serves one decision and is dropped afterwards.
pub(crate) struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn new(root: GameState) -> Self {
        Self { nodes: vec![Node::new(root, None, None, NodeKind::Decision)] }
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node { &self.nodes[id] }

    #[inline]
    pub fn len(&self) -> usize { self.nodes.len() }

    /// Descend from the root until a childless node or an unvisited
    /// decision child is reached.
    pub fn select<R: Rng + ?Sized>(&self, exploration: f64, rng: &mut R) -> NodeId {
        let mut id = ROOT;
        loop {
            let node = &self.nodes[id];
            let next = match node.kind {
                NodeKind::Chance => match node.children.choose(rng) {
                    Some(&child) => child,
                    None => return id,
                },
                NodeKind::Decision => {
                    if node.children.is_empty() {
                        return id;
                    }
                    let unvisited: Vec<NodeId> = node
                        .children
                        .iter()
                        .copied()
                        .filter(|&c| self.nodes[c].visits == 0)
                        .collect();
                    if let Some(&child) = unvisited.choose(rng) {
                        return child;
                    }
                    self.best_ucb_child(id, exploration)
                }
            };
            id = next;
        }
    }

    /// Child of a fully visited decision node with the highest UCB1 score;
    /// the earliest child wins ties.
    fn best_ucb_child(&self, id: NodeId, exploration: f64) -> NodeId {
        let parent_visits = self.nodes[id].visits as f64;
        let mut best = self.nodes[id].children[0];
        let mut best_score = f64::NEG_INFINITY;
        for &child in &self.nodes[id].children {
            let score = ucb1(&self.nodes[child], parent_visits, exploration);
            if score > best_score {
                best_score = score;
                best = child;
            }
        }
        best
    }

    /// Attach children to a childless, non-terminal leaf and return one of
    /// them at random. `None` if the leaf has nothing to expand into.
    pub fn expand<R: Rng + ?Sized>(&mut self, id: NodeId, rng: &mut R) -> Option<NodeId> {
        debug_assert!(self.nodes[id].children.is_empty());
        let state = self.nodes[id].state;
        let new_children: Vec<Node> = match self.nodes[id].kind {
            NodeKind::Decision => state
                .successors()
                .map(|(dir, next)| Node::new(next, Some(id), Some(dir), NodeKind::Chance))
                .collect(),
            NodeKind::Chance => state
                .board()
                .empty_cells()
                .map(|idx| Node::new(state.place_spawn(idx), Some(id), None, NodeKind::Decision))
                .collect(),
        };
        for child in new_children {
            let child_id = self.nodes.len();
            self.nodes.push(child);
            self.nodes[id].children.push(child_id);
        }
        self.nodes[id].children.choose(rng).copied()
    }

    /// Add one visit and `reward` to `id` and every ancestor.
    pub fn backpropagate(&mut self, id: NodeId, reward: f64) {
        let mut cursor = Some(id);
        while let Some(cur) = cursor {
            let node = &mut self.nodes[cur];
            node.visits += 1;
            node.reward += reward;
            cursor = node.parent;
        }
    }

    /// Root move with the best average reward among visited children.
    pub fn best_root_action(&self) -> Option<Move> {
        let mut best: Option<(Move, f64)> = None;
        for &child in &self.nodes[ROOT].children {
            let node = &self.nodes[child];
            let (Some(mean), Some(action)) = (node.mean_reward(), node.action) else {
                continue;
            };
            if best.map_or(true, |(_, cur)| mean > cur) {
                best = Some((action, mean));
            }
        }
        best.map(|(action, _)| action)
    }
}

/// `r/n + sqrt(c * ln(T) / n)` for a visited child.
#[inline]
pub(crate) fn ucb1(node: &Node, parent_visits: f64, exploration: f64) -> f64 {
    let n = node.visits as f64;
    node.reward / n + (exploration * parent_visits.ln() / n).sqrt()
}
