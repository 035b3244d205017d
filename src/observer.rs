//! Score Observer (C5).
//!
//! Tracks each delegate's local, per-node behavioral record and derives
//! a comparative score from it. Purely local state: two nodes may (and
//! will) disagree on these numbers, which is why §4.5 scores by rank
//! across delegates rather than by any absolute threshold.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ids::UnixSeconds;

/// Streaming median estimator (Jain & Chlamtac's P² algorithm, 5
/// markers). Maintains an approximate median in O(1) space and O(1)
/// amortized time per observation, trading a small error (the spec
/// tolerates up to 2%) for not having to retain every latency sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct P2Median {
    count: u64,
    // marker heights (the running quantile estimates) and positions.
    q: [f64; 5],
    n: [f64; 5],
    np: [f64; 5],
    dn: [f64; 5],
}

impl P2Median {
    pub fn new() -> Self {
        Self {
            count: 0,
            q: [0.0; 5],
            n: [0.0; 5],
            np: [1.0, 2.0, 3.0, 4.0, 5.0],
            dn: [0.0, 0.25, 0.5, 0.75, 1.0],
        }
    }

    pub fn observe(&mut self, x: f64) {
        self.count += 1;
        if self.count <= 5 {
            self.q[(self.count - 1) as usize] = x;
            if self.count == 5 {
                self.q.sort_by(|a, b| a.partial_cmp(b).unwrap());
                for i in 0..5 {
                    self.n[i] = (i + 1) as f64;
                }
            }
            return;
        }

        let mut k = 0usize;
        if x < self.q[0] {
            self.q[0] = x;
            k = 0;
        } else if x >= self.q[4] {
            self.q[4] = x;
            k = 3;
        } else {
            for i in 0..4 {
                if self.q[i] <= x && x < self.q[i + 1] {
                    k = i;
                    break;
                }
            }
        }

        for i in (k + 1)..5 {
            self.n[i] += 1.0;
        }
        for i in 0..5 {
            self.np[i] += self.dn[i];
        }

        for i in 1..4 {
            let d = self.np[i] - self.n[i];
            if (d >= 1.0 && self.n[i + 1] - self.n[i] > 1.0) || (d <= -1.0 && self.n[i - 1] - self.n[i] < -1.0) {
                let sign = d.signum();
                let qi = self.parabolic(i, sign);
                if self.q[i - 1] < qi && qi < self.q[i + 1] {
                    self.q[i] = qi;
                } else {
                    self.q[i] = self.linear(i, sign);
                }
                self.n[i] += sign;
            }
        }
    }

    fn parabolic(&self, i: usize, d: f64) -> f64 {
        let (q, n) = (&self.q, &self.n);
        q[i] + d / (n[i + 1] - n[i - 1])
            * ((n[i] - n[i - 1] + d) * (q[i + 1] - q[i]) / (n[i + 1] - n[i])
                + (n[i + 1] - n[i] - d) * (q[i] - q[i - 1]) / (n[i] - n[i - 1]))
    }

    fn linear(&self, i: usize, d: f64) -> f64 {
        let (q, n) = (&self.q, &self.n);
        q[i] + d * (q[(i as i32 + d as i32) as usize] - q[i]) / (n[(i as i32 + d as i32) as usize] - n[i])
    }

    /// Current median estimate, or `None` until at least one sample has
    /// been observed.
    pub fn median(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else if self.count < 5 {
            let mut sorted: Vec<f64> = self.q[..self.count as usize].to_vec();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
            Some(sorted[sorted.len() / 2])
        } else {
            Some(self.q[2])
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

impl Default for P2Median {
    fn default() -> Self {
        Self::new()
    }
}

/// A bounded running mean of `0.0..=1.0` fractions, used for the
/// tx-inclusion and fee-fraction metrics where a streaming median isn't
/// necessary — these are already bounded ratios, not latencies.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RunningFraction {
    sum: f64,
    count: u64,
}

impl RunningFraction {
    pub fn observe(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Per-delegate, per-wallet behavioral record (§4.5).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Observation {
    pub produced: u64,
    pub missed: u64,
    pub late_latency: P2Median,
    pub early_latency: P2Median,
    pub expected_tx_included: RunningFraction,
    pub unexpected_tx_included: RunningFraction,
    pub invalid_signed: u64,
    pub fee_fraction: RunningFraction,
}

impl Observation {
    /// Records a produced block arriving `arrival_time` against a
    /// `scheduled_time`, updating the early/late latency estimators.
    pub fn record_produced(&mut self, scheduled_time: UnixSeconds, arrival_time: UnixSeconds) {
        self.produced += 1;
        if arrival_time > scheduled_time {
            self.late_latency.observe((arrival_time - scheduled_time) as f64);
        } else if arrival_time < scheduled_time {
            self.early_latency.observe((scheduled_time - arrival_time) as f64);
        }
    }

    pub fn record_missed(&mut self) {
        self.missed += 1;
    }

    pub fn record_tx_inclusion(&mut self, expected_fraction: f64, unexpected_fraction: f64) {
        self.expected_tx_included.observe(expected_fraction);
        self.unexpected_tx_included.observe(unexpected_fraction);
    }

    pub fn record_invalid_signed(&mut self) {
        self.invalid_signed += 1;
    }

    pub fn record_fee_fraction(&mut self, fraction: f64) {
        self.fee_fraction.observe(fraction);
    }

    /// A delegate with any recorded invalid signing is disqualified from
    /// trust consideration regardless of every other metric (§4.5).
    pub fn disqualified(&self) -> bool {
        self.invalid_signed >= 1
    }
}

/// The set of observations this node has accumulated, one per observed
/// delegate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreObserver {
    observations: HashMap<u64, Observation>,
}

impl ScoreObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&mut self, delegate: u64) -> &mut Observation {
        self.observations.entry(delegate).or_default()
    }

    pub fn get(&self, delegate: u64) -> Option<&Observation> {
        self.observations.get(&delegate)
    }

    /// Comparative score for every non-disqualified observed delegate:
    /// the mean of each metric's rank (normalized to `0.0..=1.0`, 1.0
    /// best) across all metrics, weighting early and late latency
    /// equally per §4.5 so a node can't tune its own clock for
    /// advantage. Disqualified delegates are omitted entirely.
    pub fn scores(&self) -> HashMap<u64, f64> {
        let candidates: Vec<(&u64, &Observation)> =
            self.observations.iter().filter(|(_, o)| !o.disqualified()).collect();
        if candidates.is_empty() {
            return HashMap::new();
        }

        let metrics: Vec<Box<dyn Fn(&Observation) -> f64>> = vec![
            Box::new(|o: &Observation| o.late_latency.median().unwrap_or(0.0)),
            Box::new(|o: &Observation| o.early_latency.median().unwrap_or(0.0)),
            Box::new(|o: &Observation| 1.0 - o.expected_tx_included.mean()),
            Box::new(|o: &Observation| o.unexpected_tx_included.mean()),
            Box::new(|o: &Observation| o.fee_fraction.mean()),
        ];

        let mut rank_sums: HashMap<u64, f64> = candidates.iter().map(|(id, _)| (**id, 0.0)).collect();
        for metric in &metrics {
            let mut values: Vec<(u64, f64)> = candidates.iter().map(|(id, o)| (**id, metric(o))).collect();
            // Lower is better for every metric above; sort ascending and
            // assign normalized rank (1.0 = best, i.e. lowest value).
            values.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
            let n = values.len();
            for (idx, (id, _)) in values.iter().enumerate() {
                let normalized = if n > 1 { 1.0 - (idx as f64 / (n - 1) as f64) } else { 1.0 };
                *rank_sums.get_mut(id).unwrap() += normalized;
            }
        }

        let metric_count = metrics.len() as f64;
        rank_sums.into_iter().map(|(id, sum)| (id, sum / metric_count)).collect()
    }
}
