use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    /// Represents which directions castling moves can still be played for
    /// both players.
    ///
    /// In Saktris pieces do not start on the board, so castling rights are
    /// not tracked as standalone game state: they are derived from the
    /// `has_moved` bits of kings and rooks on each back row. This type exists
    /// so that the derived rights can participate in the position hash (two
    /// positions with identical occupancy but different rights must hash
    /// differently) and round-trip through snapshots.
    ///
    /// Note these flags do not take into account temporary reasons for which
    /// a castle may not be permitted, e.g. pieces between the king and rook,
    /// or the king moving through an attacked square. Those are checked
    /// during move generation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Castling: u8 {
        /// White may still castle with a rook on the higher-file side of its
        /// king.
        const WHITE_KINGSIDE  = 0b0001;
        /// White may still castle with a rook on the lower-file side of its
        /// king.
        const WHITE_QUEENSIDE = 0b0010;
        /// Black may still castle with a rook on the higher-file side of its
        /// king.
        const BLACK_KINGSIDE  = 0b0100;
        /// Black may still castle with a rook on the lower-file side of its
        /// king.
        const BLACK_QUEENSIDE = 0b1000;

        const WHITE = Self::WHITE_KINGSIDE.bits() | Self::WHITE_QUEENSIDE.bits();
        const BLACK = Self::BLACK_KINGSIDE.bits() | Self::BLACK_QUEENSIDE.bits();
    }
}

impl Default for Castling {
    fn default() -> Self {
        Self::empty()
    }
}

impl Serialize for Castling {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.bits())
    }
}

impl<'de> Deserialize<'de> for Castling {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bits = u8::deserialize(deserializer)?;
        Castling::from_bits(bits)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid castling bits: {bits:#x}")))
    }
}
