//! Cache metrics recorded through the `metrics` facade.
//!
//! No exporter is installed here; the host process decides whether these
//! counters go anywhere.

use metrics::counter;

pub(crate) fn record_cache_hit(tier: &'static str) {
    counter!("cache_hits_total", "tier" => tier).increment(1);
}

pub(crate) fn record_cache_miss() {
    counter!("cache_misses_total").increment(1);
}
