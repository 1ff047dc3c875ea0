//! Safety classification of cross-chain messages.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// How much a consumer on another chain may trust a log entry.
///
/// Variants are declared from least to most trusted, so the derived ordering is the trust
/// ordering: `Unsafe < CrossUnsafe < Safe < Finalized`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum SafetyLevel {
    /// Seen on the source chain but not yet anchored by a checkpoint.
    #[default]
    #[display("unsafe")]
    Unsafe,
    /// Durably recorded on the source chain.
    #[display("cross-unsafe")]
    CrossUnsafe,
    /// Reported safe by the source chain and resistant to ordinary reorgs.
    #[display("safe")]
    Safe,
    /// The source block reached L1 finality.
    #[display("finalized")]
    Finalized,
}

impl SafetyLevel {
    /// The most conservative classification, returned whenever a lookup cannot prove more.
    pub const MOST_CONSERVATIVE: Self = Self::Unsafe;
}
