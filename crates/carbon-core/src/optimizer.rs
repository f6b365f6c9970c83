//! Minimum-cost selection of mitigation actions.
//!
//! [`solve`] picks the cheapest subset of actions whose summed
//! `reduction_fraction` reaches the requested target. The search is an exact
//! depth-first branch-and-bound over include/exclude decisions and runs on
//! borrowed, immutable input, so independent requests can be solved
//! concurrently without coordination.
//!
//! Among subsets of equal minimum cost the result prefers the one with the
//! fewest actions, then the one whose ascending id sequence sorts first.

use crate::action::{validate_actions, Action};
use crate::error::{CarbonError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Relative tolerance under which two candidate costs count as a tie.
pub const TOLERANCE: f64 = 1e-9;

// ---------------------------------------------------------------------------
// OptimizationRequest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRequest {
    pub baseline_emissions: f64,
    pub target_reduction: f64,
    pub actions: Vec<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_cap: Option<f64>,
}

impl OptimizationRequest {
    pub fn new(baseline_emissions: f64, target_reduction: f64, actions: Vec<Action>) -> Self {
        Self {
            baseline_emissions,
            target_reduction,
            actions,
            budget_cap: None,
        }
    }

    pub fn with_budget_cap(mut self, budget_cap: Option<f64>) -> Self {
        self.budget_cap = budget_cap;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.baseline_emissions.is_finite() || self.baseline_emissions < 0.0 {
            return Err(CarbonError::InvalidRequest(format!(
                "baseline_emissions must be a non-negative number, got {}",
                self.baseline_emissions
            )));
        }
        if !self.target_reduction.is_finite() || !(0.0..=1.0).contains(&self.target_reduction) {
            return Err(CarbonError::InvalidRequest(format!(
                "target_reduction must be within [0, 1], got {}",
                self.target_reduction
            )));
        }
        if let Some(cap) = self.budget_cap {
            if !cap.is_finite() || cap < 0.0 {
                return Err(CarbonError::InvalidRequest(format!(
                    "budget_cap must be a non-negative number, got {cap}"
                )));
            }
        }
        validate_actions(&self.actions)
    }
}

// ---------------------------------------------------------------------------
// SearchOptions
// ---------------------------------------------------------------------------

/// What to do when the node budget runs out before the search completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetPolicy {
    /// Raise [`CarbonError::SearchBudgetExceeded`].
    #[default]
    Fail,
    /// Return the best incumbent with `proven_optimal = false`.
    BestEffort,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Maximum number of search nodes to visit. `None` means unbounded.
    #[serde(default)]
    pub node_budget: Option<u64>,
    #[serde(default)]
    pub on_budget_exhausted: BudgetPolicy,
}

// ---------------------------------------------------------------------------
// OptimizationResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Infeasibility {
    /// Even the full catalog cannot reach the target.
    CatalogShortfall,
    /// Qualifying subsets exist, but every one of them costs more than the cap.
    BudgetExceeded,
}

impl Infeasibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Infeasibility::CatalogShortfall => "catalog_shortfall",
            Infeasibility::BudgetExceeded => "budget_exceeded",
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Infeasibility::CatalogShortfall => "the full action catalog cannot reach the target",
            Infeasibility::BudgetExceeded => {
                "every action set that reaches the target exceeds the budget cap"
            }
        }
    }
}

impl fmt::Display for Infeasibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Chosen action ids in ascending order.
    pub chosen_action_ids: Vec<String>,
    pub total_cost: f64,
    /// Summed reduction of the chosen actions, clamped to 1.0.
    pub achieved_reduction: f64,
    pub projected_emissions: f64,
    pub feasible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infeasibility: Option<Infeasibility>,
    /// True when the raw reduction sum exceeded 1.0 and was clamped.
    pub reduction_clamped: bool,
    /// False only for best-effort answers from an exhausted node budget.
    pub proven_optimal: bool,
    pub nodes_explored: u64,
}

impl OptimizationResult {
    fn infeasible(request: &OptimizationRequest, reason: Infeasibility, nodes: u64) -> Self {
        Self {
            chosen_action_ids: Vec::new(),
            total_cost: 0.0,
            achieved_reduction: 0.0,
            projected_emissions: request.baseline_emissions,
            feasible: false,
            infeasibility: Some(reason),
            reduction_clamped: false,
            proven_optimal: true,
            nodes_explored: nodes,
        }
    }

    fn from_selection(
        request: &OptimizationRequest,
        mut chosen: Vec<&Action>,
        proven_optimal: bool,
        nodes: u64,
    ) -> Self {
        // Sum in id order so identical selections always produce identical bits.
        chosen.sort_by(|a, b| a.id.cmp(&b.id));
        let total_cost = chosen.iter().map(|a| a.cost).sum();
        let raw_reduction: f64 = chosen.iter().map(|a| a.reduction_fraction).sum();
        let reduction_clamped = raw_reduction > 1.0;
        // Accepted selections fall short of the target by rounding noise at most.
        let achieved_reduction = raw_reduction.max(request.target_reduction).min(1.0);
        let projected_emissions = (request.baseline_emissions * (1.0 - achieved_reduction)).max(0.0);
        Self {
            chosen_action_ids: chosen.iter().map(|a| a.id.clone()).collect(),
            total_cost,
            achieved_reduction,
            projected_emissions,
            feasible: true,
            infeasibility: None,
            reduction_clamped,
            proven_optimal,
            nodes_explored: nodes,
        }
    }
}

// ---------------------------------------------------------------------------
// solve
// ---------------------------------------------------------------------------

/// Solve with an unbounded search.
pub fn solve(request: &OptimizationRequest) -> Result<OptimizationResult> {
    solve_with(request, &SearchOptions::default())
}

pub fn solve_with(
    request: &OptimizationRequest,
    options: &SearchOptions,
) -> Result<OptimizationResult> {
    request.validate()?;

    if request.target_reduction == 0.0 {
        return Ok(OptimizationResult::from_selection(request, Vec::new(), true, 0));
    }

    let mut search = Search::new(request, options.node_budget);
    if search.cannot_reach(0.0, 0) {
        tracing::debug!(
            target = request.target_reduction,
            available = search.total_reduction(),
            "catalog cannot reach target"
        );
        return Ok(OptimizationResult::infeasible(
            request,
            Infeasibility::CatalogShortfall,
            0,
        ));
    }

    let completed = search.explore(0, 0.0, 0.0).is_ok();
    let nodes = search.nodes;
    tracing::debug!(nodes, completed, actions = request.actions.len(), "search finished");

    if !completed && options.on_budget_exhausted == BudgetPolicy::Fail {
        return Err(CarbonError::SearchBudgetExceeded {
            budget: options.node_budget.unwrap_or(nodes),
        });
    }

    match search.best {
        Some(best) => {
            let chosen = best.picked.iter().map(|&i| search.order[i]).collect();
            Ok(OptimizationResult::from_selection(request, chosen, completed, nodes))
        }
        None if !completed => Err(CarbonError::SearchBudgetExceeded {
            budget: options.node_budget.unwrap_or(nodes),
        }),
        None => {
            let reason = if request.budget_cap.is_some() {
                Infeasibility::BudgetExceeded
            } else {
                Infeasibility::CatalogShortfall
            };
            Ok(OptimizationResult::infeasible(request, reason, nodes))
        }
    }
}

// ---------------------------------------------------------------------------
// Branch-and-bound
// ---------------------------------------------------------------------------

struct Exhausted;

struct Candidate<'a> {
    cost: f64,
    /// Ascending ids, used for the lexicographic tie-break.
    ids: Vec<&'a str>,
    /// Positions in `Search::order`.
    picked: Vec<usize>,
}

struct Search<'a> {
    /// Actions in exploration order: largest reduction first, then cheapest, then id.
    order: Vec<&'a Action>,
    /// `suffix_reduction[i]` is the summed reduction of `order[i..]`.
    suffix_reduction: Vec<f64>,
    target: f64,
    budget_cap: Option<f64>,
    node_budget: Option<u64>,
    nodes: u64,
    picked: Vec<usize>,
    best: Option<Candidate<'a>>,
}

impl<'a> Search<'a> {
    fn new(request: &'a OptimizationRequest, node_budget: Option<u64>) -> Self {
        let mut order: Vec<&Action> = request.actions.iter().collect();
        order.sort_by(|a, b| {
            b.reduction_fraction
                .total_cmp(&a.reduction_fraction)
                .then_with(|| a.cost.total_cmp(&b.cost))
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut suffix_reduction = vec![0.0; order.len() + 1];
        for i in (0..order.len()).rev() {
            suffix_reduction[i] = suffix_reduction[i + 1] + order[i].reduction_fraction;
        }

        Self {
            order,
            suffix_reduction,
            target: request.target_reduction,
            budget_cap: request.budget_cap,
            node_budget,
            nodes: 0,
            picked: Vec::new(),
            best: None,
        }
    }

    fn total_reduction(&self) -> f64 {
        self.suffix_reduction[0]
    }

    fn explore(&mut self, depth: usize, cost: f64, reduction: f64) -> std::result::Result<(), Exhausted> {
        self.nodes += 1;
        if self.node_budget.is_some_and(|limit| self.nodes > limit) {
            return Err(Exhausted);
        }

        // Extending a qualifying set only adds cost and actions, so stop here.
        if meets_target(reduction, self.picked.len(), self.target) {
            self.offer();
            return Ok(());
        }
        if depth == self.order.len() || self.cannot_reach(reduction, depth) {
            return Ok(());
        }

        let action = self.order[depth];
        let with_cost = cost + action.cost;
        if self.admits(with_cost, self.picked.len() + 1) {
            self.picked.push(depth);
            let outcome = self.explore(depth + 1, with_cost, reduction + action.reduction_fraction);
            self.picked.pop();
            outcome?;
        }
        self.explore(depth + 1, cost, reduction)
    }

    /// True when even taking every action from `depth` on leaves `reduction` short.
    /// The slack covers both sums, so this never prunes a qualifying set.
    fn cannot_reach(&self, reduction: f64, depth: usize) -> bool {
        let bound = reduction + self.suffix_reduction[depth];
        bound + rounding_slack(2 * self.order.len() + 1, bound) < self.target
    }

    /// Whether a partial selection of `count` actions costing `cost` can still win.
    /// Partial costs are summed in exploration order, so the cap check here
    /// allows rounding noise; `offer` enforces the cap exactly.
    fn admits(&self, cost: f64, count: usize) -> bool {
        if let Some(cap) = self.budget_cap {
            if cost > cap + rounding_slack(count, cap) {
                return false;
            }
        }
        match &self.best {
            None => true,
            Some(best) => match cost_cmp(cost, best.cost) {
                Ordering::Less => true,
                Ordering::Equal => count <= best.ids.len(),
                Ordering::Greater => false,
            },
        }
    }

    fn offer(&mut self) {
        let mut chosen: Vec<&'a Action> = self.picked.iter().map(|&i| self.order[i]).collect();
        chosen.sort_by(|a, b| a.id.cmp(&b.id));
        // Same summation order as the reported total_cost.
        let cost: f64 = chosen.iter().map(|a| a.cost).sum();
        if self.budget_cap.is_some_and(|cap| cost > cap) {
            return;
        }
        let ids: Vec<&'a str> = chosen.iter().map(|a| a.id.as_str()).collect();

        let better = match &self.best {
            None => true,
            Some(best) => cost_cmp(cost, best.cost)
                .then_with(|| ids.len().cmp(&best.ids.len()))
                .then_with(|| ids.cmp(&best.ids))
                == Ordering::Less,
        };
        if better {
            self.best = Some(Candidate {
                cost,
                ids,
                picked: self.picked.clone(),
            });
        }
    }
}

/// Rounding slack for a float sum of `terms` values reaching magnitude `scale`.
fn rounding_slack(terms: usize, scale: f64) -> f64 {
    4.0 * f64::EPSILON * terms as f64 * scale.abs().max(1.0)
}

/// Whether a sum of `terms` reductions reaches `target`, up to rounding noise.
fn meets_target(sum: f64, terms: usize, target: f64) -> bool {
    sum + rounding_slack(terms, sum) >= target
}

/// Compare costs, treating values within a relative [`TOLERANCE`] as equal.
fn cost_cmp(a: f64, b: f64) -> Ordering {
    let scale = a.abs().max(b.abs()).max(1.0);
    if (a - b).abs() <= TOLERANCE * scale {
        Ordering::Equal
    } else {
        a.total_cmp(&b)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
