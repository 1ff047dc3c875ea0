/// A `u64` carried as a hex quantity (e.g. `"0x1"`) in RPC parameters, used for chain ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexStringU64(pub u64);

impl serde::Serialize for HexStringU64 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        alloy_serde::quantity::serialize(&self.0, serializer)
    }
}

impl<'de> serde::Deserialize<'de> for HexStringU64 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let inner = alloy_serde::quantity::deserialize(deserializer)?;
        Ok(Self(inner))
    }
}

impl From<HexStringU64> for u64 {
    fn from(value: HexStringU64) -> Self {
        value.0
    }
}

impl From<u64> for HexStringU64 {
    fn from(value: u64) -> Self {
        Self(value)
    }
}
