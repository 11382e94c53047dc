//! Agent metrics snapshot port.

use async_trait::async_trait;

/// Source of business-metric snapshots for before/after comparison.
///
/// Implementations never raise into the optimizer: any transport or
/// parse failure degrades to `None` and conversion-delta scoring becomes
/// inert for that cycle.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Latest metrics snapshot, or `None` when unavailable. The snapshot
    /// carries at least a numeric `conversion_rate` field.
    async fn fetch_snapshot(&self) -> Option<serde_json::Value>;
}
