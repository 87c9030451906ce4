use bitflags::bitflags;

/// First 8 bytes of every trace file; also terminates the trailing index.
pub const LEAD_IN_MAGIC: [u8; 8] = [0xff, 0xaa, 0xdd, b'D', b'U', b'M', b'P', b'I'];

/// [`LEAD_IN_MAGIC`] read as a big-endian 64-bit word, for comparison against trailer words.
pub const LEAD_IN_MAGIC_WORD: u64 = u64::from_be_bytes(LEAD_IN_MAGIC);

pub const FOOTER_MAGIC: u64 = 0xf007_fee7;

/// Substituted for optional string data (username, unresolved function names). Decoders keep it
/// as an ordinary string.
pub const NONE_SENTINEL: &str = "<none>";

/// Writer version stamped into headers produced by this crate.
pub const FORMAT_VERSION: [u8; 3] = [0, 8, 0];

bitflags! {
    /// Per-record selection of optional fields.
    ///
    /// STATUS is a historical two-bit field: either bit set means status detail is recorded.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FieldMask: u8 {
        const STATUS = 0b0000_0011;
        const CPUTIME = 1 << 2;
        const WALLTIME = 1 << 3;
        const THREADID = 1 << 6;
        const PERFINFO = 1 << 7;
    }
}

impl FieldMask {
    pub fn has_status(self) -> bool {
        self.intersects(FieldMask::STATUS)
    }
}

/// Offsets subtracted from absolute clock seconds so that per-record seconds fit in 16 bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeBias {
    pub cpu_seconds: u32,
    pub wall_seconds: u32,
}
