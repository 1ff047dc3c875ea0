use derive_more::{Display, TryFrom};
use reth_db::DatabaseError;
use reth_db_api::table;
use serde::{Deserialize, Serialize};
use supervisor_types::SafetyLevel;

/// Key of a head reference reported by the chain itself.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    Serialize,
    Deserialize,
    TryFrom,
)]
#[try_from(repr)]
#[repr(u8)]
pub enum SafetyHeadRefKey {
    /// Latest block the chain reports as safe.
    #[display("safe")]
    Safe = 0,

    /// Latest block the chain reports as finalized.
    #[display("finalized")]
    Finalized = 1,
}

impl SafetyHeadRefKey {
    /// All stored head references.
    pub const ALL: [Self; 2] = [Self::Safe, Self::Finalized];
}

impl table::Encode for SafetyHeadRefKey {
    type Encoded = [u8; 1];

    fn encode(self) -> Self::Encoded {
        [self as u8]
    }
}

impl table::Decode for SafetyHeadRefKey {
    fn decode(value: &[u8]) -> Result<Self, DatabaseError> {
        if value.is_empty() {
            return Err(DatabaseError::Decode)
        }

        value[0].try_into().map_err(|_| DatabaseError::Decode)
    }
}

impl From<SafetyHeadRefKey> for SafetyLevel {
    fn from(key: SafetyHeadRefKey) -> Self {
        match key {
            SafetyHeadRefKey::Safe => Self::Safe,
            SafetyHeadRefKey::Finalized => Self::Finalized,
        }
    }
}
