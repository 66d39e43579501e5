//! Exact assignment search with a wall-clock deadline.
//!
//! Both dispatch problems reduce to the same shape: every row (a worker) goes
//! to at most one column (a city or a cluster). A column turns the weight
//! routed into it into value at `rate` per unit, up to its `capacity`, and
//! each used pair pays its cost. The integer quantity/boolean pair of the fuel
//! problem collapses into this form because, for a fixed set of used pairs,
//! routing as much as the column accepts is always optimal; the big-M link
//! (quantity > 0 iff used, quantity >= 1 when used) survives as the per-column
//! row limit `floor(capacity)`.

use std::time::{Duration, Instant};

use serde::Serialize;

const EPS: f64 = 1e-9;
const DEADLINE_CHECK_MASK: u64 = 0xff;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    /// Search space exhausted
    Optimal,
    /// Deadline hit; best assignment found so far
    Incumbent,
    /// Not attempted this turn
    Skipped,
}

#[derive(Debug, Clone)]
pub struct AssignmentModel {
    rows: usize,
    cols: usize,
    cost: Vec<Option<f64>>,
    row_weight: Vec<f64>,
    col_rate: Vec<f64>,
    col_capacity: Vec<f64>,
    col_max_rows: Vec<usize>,
    max_assigned: Option<usize>,
}

impl AssignmentModel {
    /// Model with every pair forbidden until given a cost.
    pub fn new(row_weight: Vec<f64>, col_rate: Vec<f64>, col_capacity: Vec<f64>) -> Self {
        let rows = row_weight.len();
        let cols = col_rate.len();
        Self {
            rows,
            cols,
            cost: vec![None; rows * cols],
            row_weight,
            col_rate,
            col_capacity,
            col_max_rows: vec![usize::MAX; cols],
            max_assigned: None,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn set_cost(&mut self, row: usize, col: usize, cost: f64) {
        if row < self.rows && col < self.cols {
            self.cost[row * self.cols + col] = Some(cost);
        }
    }

    pub fn cost(&self, row: usize, col: usize) -> Option<f64> {
        self.cost.get(row * self.cols + col).copied().flatten()
    }

    pub fn limit_rows(&mut self, col: usize, max_rows: usize) {
        if let Some(limit) = self.col_max_rows.get_mut(col) {
            *limit = max_rows;
        }
    }

    pub fn limit_assigned(&mut self, max_assigned: usize) {
        self.max_assigned = Some(max_assigned);
    }

    pub fn row_weight(&self, row: usize) -> f64 {
        self.row_weight[row]
    }

    pub fn capacity(&self, col: usize) -> f64 {
        self.col_capacity[col]
    }

    fn gain(&self, col: usize, load: f64, weight: f64) -> f64 {
        let capacity = self.col_capacity[col];
        self.col_rate[col] * ((load + weight).min(capacity) - load.min(capacity))
    }

    /// Objective value of a set of (row, col) pairs.
    pub fn objective(&self, pairs: &[(usize, usize)]) -> f64 {
        let mut load = vec![0.0; self.cols];
        let mut value = 0.0;
        for &(row, col) in pairs {
            let weight = self.row_weight[row];
            value += self.gain(col, load[col], weight) - self.cost(row, col).unwrap_or(0.0);
            load[col] += weight;
        }
        value
    }

    /// Whether `pairs` respects every row, column and count limit.
    pub fn is_feasible(&self, pairs: &[(usize, usize)]) -> bool {
        let mut row_used = vec![false; self.rows];
        let mut col_rows = vec![0usize; self.cols];
        for &(row, col) in pairs {
            if row >= self.rows || col >= self.cols || row_used[row] {
                return false;
            }
            if self.cost(row, col).is_none() {
                return false;
            }
            row_used[row] = true;
            col_rows[col] += 1;
            if col_rows[col] > self.col_max_rows[col] {
                return false;
            }
        }
        self.max_assigned.map_or(true, |max| pairs.len() <= max)
    }

    /// Best value a row could add on its own, ignoring other rows.
    fn optimistic(&self, row: usize) -> f64 {
        (0..self.cols)
            .filter(|&col| self.col_max_rows[col] > 0)
            .filter_map(|col| {
                let cost = self.cost(row, col)?;
                Some(self.gain(col, 0.0, self.row_weight[row]) - cost)
            })
            .fold(0.0, f64::max)
    }

    fn greedy(&self, order: &[usize]) -> Vec<(usize, usize)> {
        let mut load = vec![0.0; self.cols];
        let mut col_rows = vec![0usize; self.cols];
        let mut pairs = Vec::new();
        let limit = self.max_assigned.unwrap_or(usize::MAX);
        for &row in order {
            if pairs.len() >= limit {
                break;
            }
            let weight = self.row_weight[row];
            let best = (0..self.cols)
                .filter(|&col| col_rows[col] < self.col_max_rows[col])
                .filter_map(|col| {
                    let cost = self.cost(row, col)?;
                    Some((col, self.gain(col, load[col], weight) - cost))
                })
                .filter(|&(_, delta)| delta > EPS)
                .max_by(|a, b| a.1.total_cmp(&b.1).then_with(|| b.0.cmp(&a.0)));
            if let Some((col, _)) = best {
                load[col] += weight;
                col_rows[col] += 1;
                pairs.push((row, col));
            }
        }
        pairs
    }

    /// Maximises the objective, returning the incumbent if `budget` runs out.
    pub fn solve(&self, budget: Duration) -> Assignment {
        let started = Instant::now();
        let mut order: Vec<usize> = (0..self.rows).collect();
        let optimistic: Vec<f64> = (0..self.rows).map(|row| self.optimistic(row)).collect();
        order.sort_by(|&a, &b| optimistic[b].total_cmp(&optimistic[a]).then_with(|| a.cmp(&b)));

        let greedy = self.greedy(&order);
        let greedy_value = self.objective(&greedy);
        let mut search = Search {
            model: self,
            optimistic: order.iter().map(|&row| optimistic[row]).collect(),
            order,
            deadline: started + budget,
            load: vec![0.0; self.cols],
            col_rows: vec![0; self.cols],
            current: Vec::new(),
            best: greedy,
            best_value: greedy_value,
            nodes: 0,
            timed_out: false,
        };
        search.descend(0, 0.0);

        let status = if search.timed_out {
            SolveStatus::Incumbent
        } else {
            SolveStatus::Optimal
        };
        let mut pairs = search.best;
        pairs.sort_unstable();
        Assignment {
            objective: search.best_value,
            pairs,
            status,
            nodes: search.nodes,
            elapsed: started.elapsed(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Assignment {
    /// Used (row, col) pairs sorted by row
    pub pairs: Vec<(usize, usize)>,
    pub objective: f64,
    pub status: SolveStatus,
    pub nodes: u64,
    pub elapsed: Duration,
}

impl Assignment {
    pub fn skipped() -> Self {
        Self {
            pairs: Vec::new(),
            objective: 0.0,
            status: SolveStatus::Skipped,
            nodes: 0,
            elapsed: Duration::ZERO,
        }
    }
}

struct Search<'a> {
    model: &'a AssignmentModel,
    order: Vec<usize>,
    // optimistic gain per position in `order`, non-increasing
    optimistic: Vec<f64>,
    deadline: Instant,
    load: Vec<f64>,
    col_rows: Vec<usize>,
    current: Vec<(usize, usize)>,
    best: Vec<(usize, usize)>,
    best_value: f64,
    nodes: u64,
    timed_out: bool,
}

impl Search<'_> {
    fn descend(&mut self, depth: usize, value: f64) {
        if self.timed_out {
            return;
        }
        if self.nodes & DEADLINE_CHECK_MASK == 0 && Instant::now() >= self.deadline {
            self.timed_out = true;
            return;
        }
        self.nodes += 1;

        if value > self.best_value + EPS {
            self.best_value = value;
            self.best = self.current.clone();
        }
        if depth == self.order.len() {
            return;
        }
        let slots = self
            .model
            .max_assigned
            .map_or(usize::MAX, |max| max.saturating_sub(self.current.len()));
        if slots == 0 {
            return;
        }
        let end = depth.saturating_add(slots).min(self.order.len());
        let bound: f64 = self.optimistic[depth..end].iter().sum();
        if value + bound <= self.best_value + EPS {
            return;
        }

        let row = self.order[depth];
        let weight = self.model.row_weight[row];
        let mut options: Vec<(usize, f64)> = (0..self.model.cols)
            .filter(|&col| self.col_rows[col] < self.model.col_max_rows[col])
            .filter_map(|col| {
                let cost = self.model.cost(row, col)?;
                Some((col, self.model.gain(col, self.load[col], weight) - cost))
            })
            .collect();
        options.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        for (col, delta) in options {
            self.load[col] += weight;
            self.col_rows[col] += 1;
            self.current.push((row, col));
            self.descend(depth + 1, value + delta);
            self.current.pop();
            self.col_rows[col] -= 1;
            self.load[col] -= weight;
            if self.timed_out {
                return;
            }
        }
        self.descend(depth + 1, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    const GENEROUS: Duration = Duration::from_secs(5);

    fn brute_force(model: &AssignmentModel) -> f64 {
        fn walk(model: &AssignmentModel, row: usize, pairs: &mut Vec<(usize, usize)>, best: &mut f64) {
            if row == model.rows() {
                if model.is_feasible(pairs) {
                    *best = best.max(model.objective(pairs));
                }
                return;
            }
            walk(model, row + 1, pairs, best);
            for col in 0..model.cols() {
                if model.cost(row, col).is_some() {
                    pairs.push((row, col));
                    walk(model, row + 1, pairs, best);
                    pairs.pop();
                }
            }
        }
        let mut best = 0.0;
        walk(model, 0, &mut Vec::new(), &mut best);
        best
    }

    fn random_model(rng: &mut ChaCha8Rng) -> AssignmentModel {
        let rows = rng.gen_range(1..=5);
        let cols = rng.gen_range(1..=3);
        let mut model = AssignmentModel::new(
            (0..rows).map(|_| rng.gen_range(1..60) as f64).collect(),
            (0..cols).map(|_| rng.gen_range(1..6) as f64 / 10.0).collect(),
            (0..cols).map(|_| rng.gen_range(1..100) as f64).collect(),
        );
        for row in 0..rows {
            for col in 0..cols {
                if rng.gen_bool(0.8) {
                    model.set_cost(row, col, rng.gen_range(0..40) as f64);
                }
            }
        }
        for col in 0..cols {
            let capacity = model.capacity(col);
            model.limit_rows(col, capacity as usize);
        }
        if rng.gen_bool(0.3) {
            model.limit_assigned(rng.gen_range(0..=rows));
        }
        model
    }

    #[test]
    fn matches_exhaustive_search_on_small_instances() {
        let mut rng = ChaCha8Rng::seed_from_u64(2021);
        for case in 0..60 {
            let model = random_model(&mut rng);
            let result = model.solve(GENEROUS);
            assert_eq!(result.status, SolveStatus::Optimal);
            assert!(model.is_feasible(&result.pairs), "case {case}");
            let expected = brute_force(&model);
            assert!(
                (result.objective - expected).abs() < 1e-6,
                "case {case}: {} vs {}",
                result.objective,
                expected
            );
            assert!((model.objective(&result.pairs) - result.objective).abs() < 1e-6);
        }
    }

    #[test]
    fn one_row_per_column_matching() {
        // three workers, two clusters, bonus 20 per covered cluster
        let mut model = AssignmentModel::new(vec![1.0; 3], vec![20.0; 2], vec![1.0; 2]);
        for (row, costs) in [[3.0, 9.0], [4.0, 5.0], [2.0, 30.0]].iter().enumerate() {
            for (col, &cost) in costs.iter().enumerate() {
                model.set_cost(row, col, cost);
            }
        }
        model.limit_rows(0, 1);
        model.limit_rows(1, 1);
        let result = model.solve(GENEROUS);
        assert_eq!(result.pairs, vec![(1, 1), (2, 0)]);
        assert_eq!(result.objective, 40.0 - 7.0);
    }

    #[test]
    fn assignment_count_is_capped() {
        let mut model = AssignmentModel::new(vec![1.0; 4], vec![20.0; 4], vec![1.0; 4]);
        for row in 0..4 {
            for col in 0..4 {
                model.set_cost(row, col, if row == col { 1.0 } else { 10.0 });
            }
            model.limit_rows(row, 1);
        }
        model.limit_assigned(2);
        let result = model.solve(GENEROUS);
        assert_eq!(result.pairs.len(), 2);
        assert_eq!(result.objective, 38.0);
    }

    #[test]
    fn unprofitable_pairs_stay_unused() {
        let mut model = AssignmentModel::new(vec![10.0], vec![0.5], vec![100.0]);
        model.set_cost(0, 0, 8.0);
        let result = model.solve(GENEROUS);
        assert!(result.pairs.is_empty());
        assert_eq!(result.objective, 0.0);
    }

    #[test]
    fn column_capacity_bounds_the_gain() {
        let mut model = AssignmentModel::new(vec![80.0, 80.0], vec![1.0], vec![100.0]);
        model.set_cost(0, 0, 1.0);
        model.set_cost(1, 0, 1.0);
        let result = model.solve(GENEROUS);
        assert_eq!(result.pairs.len(), 2);
        assert_eq!(result.objective, 100.0 - 2.0);
    }

    #[test]
    fn expired_deadline_returns_valid_incumbent() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let rows = 30;
        let cols = 10;
        let mut model = AssignmentModel::new(
            (0..rows).map(|_| rng.gen_range(20..200) as f64).collect(),
            vec![0.5; cols],
            vec![150.0; cols],
        );
        for row in 0..rows {
            for col in 0..cols {
                model.set_cost(row, col, rng.gen_range(1..20) as f64 * 4.0);
            }
        }
        let result = model.solve(Duration::ZERO);
        assert_eq!(result.status, SolveStatus::Incumbent);
        assert!(model.is_feasible(&result.pairs));
        assert!(result.objective >= 0.0);
        assert!((model.objective(&result.pairs) - result.objective).abs() < 1e-6);
    }
}
