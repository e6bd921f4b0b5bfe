use ahash::AHashMap;

use crate::intern::Endpoint;

/// Running response-time aggregate for one endpoint. The sum is widened so
/// any number of `u64` response times can be added without wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub min: u64,
    pub max: u64,
    pub sum: u128,
    pub count: u64,
}

impl Stats {
    pub fn new(response_time: u64) -> Self {
        Self {
            min: response_time,
            max: response_time,
            sum: u128::from(response_time),
            count: 1,
        }
    }

    pub fn observe(&mut self, response_time: u64) {
        self.min = self.min.min(response_time);
        self.max = self.max.max(response_time);
        self.sum += u128::from(response_time);
        self.count += 1;
    }

    pub fn merge(&mut self, other: &Stats) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.sum += other.sum;
        self.count += other.count;
    }

    pub fn mean(&self) -> f64 {
        self.sum as f64 / self.count as f64
    }
}

/// Endpoint → stats mapping. Worker-local while a part is processed, global
/// once every local map has been folded in.
#[derive(Debug, Clone, Default)]
pub struct StatsMap {
    map: AHashMap<Endpoint, Stats>,
}

impl StatsMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, endpoint: Endpoint, response_time: u64) {
        self.map
            .entry(endpoint)
            .and_modify(|stats| stats.observe(response_time))
            .or_insert_with(|| Stats::new(response_time));
    }

    /// Folds `other` into `self`. Commutative and associative, so the fold
    /// order over worker results does not matter.
    pub fn merge(&mut self, other: StatsMap) {
        for (endpoint, stats) in other.map {
            self.map
                .entry(endpoint)
                .and_modify(|global| global.merge(&stats))
                .or_insert(stats);
        }
    }

    pub fn get(&self, endpoint: &str) -> Option<&Stats> {
        self.map.get(endpoint.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Entries in ascending byte order of the endpoint name.
    pub fn sorted(&self) -> Vec<(&Endpoint, &Stats)> {
        let mut entries: Vec<_> = self.map.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }
}
