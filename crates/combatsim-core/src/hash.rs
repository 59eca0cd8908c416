//! Report hashing for determinism verification.
//!
//! Two runs of the same scenario with the same configuration must produce
//! identical fingerprints, whatever the number of worker threads.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tally::ScalarStats;

use crate::runner::SimReport;

/// Compute a deterministic hash of a run report.
///
/// Floats are hashed by their bit patterns, so any difference in the last
/// bit of any statistic changes the fingerprint.
#[must_use]
pub fn fingerprint_report(report: &SimReport) -> u64 {
    let mut hasher = DefaultHasher::new();

    report.iterations.hash(&mut hasher);
    report.duration_secs.to_bits().hash(&mut hasher);

    for unit in &report.units {
        unit.unit.hash(&mut hasher);
        unit.label.hash(&mut hasher);
        hash_scalar_stats(&unit.dps, &mut hasher);
    }

    for resource in &report.resources {
        resource.unit.hash(&mut hasher);
        resource.action.hash(&mut hasher);
        resource.power.hash(&mut hasher);
        hash_scalar_stats(&resource.gain, &mut hasher);
        hash_scalar_stats(&resource.requested, &mut hasher);
        hash_scalar_stats(&resource.events, &mut hasher);
    }

    for spell in &report.spells {
        spell.unit.hash(&mut hasher);
        spell.action.hash(&mut hasher);
        hash_scalar_stats(&spell.casts, &mut hasher);
        hash_scalar_stats(&spell.hits, &mut hasher);
        hash_scalar_stats(&spell.damage, &mut hasher);
    }

    for aura in &report.auras {
        aura.unit.hash(&mut hasher);
        aura.label.hash(&mut hasher);
        hash_scalar_stats(&aura.uptime, &mut hasher);
        hash_scalar_stats(&aura.activations, &mut hasher);
    }

    hasher.finish()
}

/// Hash scalar statistics.
fn hash_scalar_stats<H: Hasher>(stats: &ScalarStats, hasher: &mut H) {
    stats.mean.to_bits().hash(hasher);
    stats.variance.to_bits().hash(hasher);
    stats.min.to_bits().hash(hasher);
    stats.max.to_bits().hash(hasher);
    stats.sample_count.hash(hasher);
}
