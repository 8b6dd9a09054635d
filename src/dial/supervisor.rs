//! Post-processing hook applied to dial responses.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::atomic::AtomicF64;
use crate::dial::ResponseClamp;

/// Running statistics of the responses seen by a supervisor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupervisorStats {
    pub count: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Clamps responses to `[min, max]` and records the raw ones, lock-free.
#[derive(Debug)]
pub struct ResponseSupervisor {
    clamp: ResponseClamp,
    count: AtomicUsize,
    min: AtomicF64,
    max: AtomicF64,
}

impl ResponseSupervisor {
    pub fn new(clamp: ResponseClamp) -> Self {
        Self {
            clamp,
            count: AtomicUsize::new(0),
            min: AtomicF64::new(f64::INFINITY),
            max: AtomicF64::new(f64::NEG_INFINITY),
        }
    }

    pub fn clamp(&self) -> ResponseClamp {
        self.clamp
    }

    pub fn process(&self, response: f64) -> f64 {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.min.fetch_update(|cur| (response < cur).then_some(response));
        self.max.fetch_update(|cur| (response > cur).then_some(response));
        self.clamp.apply(response)
    }

    pub fn stats(&self) -> SupervisorStats {
        let count = self.count.load(Ordering::Acquire);
        let seen = |v: f64| (count > 0).then_some(v);
        SupervisorStats {
            count,
            min: seen(self.min.load(Ordering::Acquire)),
            max: seen(self.max.load(Ordering::Acquire)),
        }
    }

    pub fn reset_stats(&self) {
        self.count.store(0, Ordering::Release);
        self.min.store(f64::INFINITY, Ordering::Release);
        self.max.store(f64::NEG_INFINITY, Ordering::Release);
    }

    pub fn summary(&self) -> String {
        let bound = |v: Option<f64>| v.map_or_else(|| "none".to_string(), |v| v.to_string());
        format!("supervisor[min={}, max={}]", bound(self.clamp.min()), bound(self.clamp.max()))
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn clamps_and_tracks_raw_extremes() {
        let sup = ResponseSupervisor::new(ResponseClamp::new(Some(0.0), Some(2.0)).unwrap());
        assert_eq!(sup.stats().min, None);
        assert_eq!(sup.process(-0.5), 0.0);
        assert_eq!(sup.process(1.0), 1.0);
        assert_eq!(sup.process(3.0), 2.0);
        assert_eq!(
            sup.stats(),
            SupervisorStats {
                count: 3,
                min: Some(-0.5),
                max: Some(3.0)
            }
        );
        sup.reset_stats();
        assert_eq!(sup.stats().count, 0);
    }

    #[test]
    fn stats_are_consistent_across_threads() {
        let sup = ResponseSupervisor::new(ResponseClamp::default());
        thread::scope(|s| {
            for t in 0..8 {
                let sup = &sup;
                s.spawn(move || {
                    for i in 0..100 {
                        sup.process((t * 100 + i) as f64);
                    }
                });
            }
        });
        let stats = sup.stats();
        assert_eq!(stats.count, 800);
        assert_eq!(stats.min, Some(0.0));
        assert_eq!(stats.max, Some(799.0));
    }
}
