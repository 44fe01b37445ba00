//! Static marketplace pricing: per-second rates indexed by tier and core kind.

use crate::types::{PricingTier, ResourceKind, Tier};

/// Central rate table in marketplace credits per second of task time.
/// Rows: tier (standard, performance, extreme).
/// Cols: core kind (cpu, gpu).
///
/// These values are part of the public contract; tests pin them exactly.
#[rustfmt::skip]
const RATES: [[f64; 2]; 3] = [
    //                 cpu    gpu
    /* standard    */ [0.001, 0.004],
    /* performance */ [0.003, 0.012],
    /* extreme     */ [0.008, 0.032],
];

/// Surcharge per GB of accelerator memory per second, by tier.
const MEMORY_RATES: [f64; 3] = [0.0001, 0.0003, 0.0008];

/// O(1) rate lookup for one core kind at one tier
pub fn rate(tier: Tier, resource: ResourceKind) -> f64 {
    RATES[tier.to_index()][resource.to_index()]
}

/// O(1) memory surcharge lookup for one tier
pub fn memory_rate(tier: Tier) -> f64 {
    MEMORY_RATES[tier.to_index()]
}

/// Effective per-second rate for a lease: core rate plus the memory
/// surcharge for GPU leases that reserve accelerator memory.
pub fn effective_rate(tier: Tier, resource: ResourceKind, memory_gb: Option<u32>) -> f64 {
    let base = rate(tier, resource);
    match (resource, memory_gb) {
        (ResourceKind::Gpu, Some(gb)) => base + f64::from(gb) * memory_rate(tier),
        _ => base,
    }
}

/// The published pricing table, one entry per tier
pub fn pricing_tiers() -> Vec<PricingTier> {
    [Tier::Standard, Tier::Performance, Tier::Extreme]
        .into_iter()
        .map(|tier| PricingTier {
            tier,
            cpu_rate: rate(tier, ResourceKind::Cpu),
            gpu_rate: rate(tier, ResourceKind::Gpu),
            memory_rate: memory_rate(tier),
        })
        .collect()
}
