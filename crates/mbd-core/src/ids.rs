use core::fmt;
use core::num::NonZeroU32;

/// Compact, stable identifier of one object in the model database.
///
/// Base ids are assigned by the database and are always positive,
/// so `NonZero` lets `Option<BaseId>` stay pointer-optimized.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct BaseId(NonZeroU32);

impl BaseId {
    /// Wrap a raw database id. Returns None for 0, which the database
    /// never assigns to a real object.
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    /// Recover the raw database id.
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Debug for BaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BaseId({})", self.0.get())
    }
}

impl fmt::Display for BaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_id_round_trip() {
        for raw in [1_u32, 2, 42, 10_000] {
            let id = BaseId::new(raw).unwrap();
            assert_eq!(id.get(), raw);
        }
        assert!(BaseId::new(0).is_none());
    }

    #[test]
    fn option_base_id_is_small() {
        // This is a classic reason for NonZero: Option<BaseId> can be same size as BaseId.
        assert_eq!(
            core::mem::size_of::<BaseId>(),
            core::mem::size_of::<Option<BaseId>>()
        );
    }
}
