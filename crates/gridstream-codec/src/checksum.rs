//! Running 128-bit checksum over marshalled bytes.

/// Checksum width in bytes.
pub const CHECKSUM_LEN: usize = 16;

/// A running digest over the bytes transferred since the last reset.
///
/// Snapshots do not disturb the accumulator, so both ends can agree on
/// intermediate checkpoints while the stream keeps flowing.
#[derive(Clone)]
pub struct Checksum {
    hasher: blake3::Hasher,
}

impl Checksum {
    /// Start a fresh accumulator.
    pub fn new() -> Self {
        Self {
            hasher: blake3::Hasher::new(),
        }
    }

    /// Feed bytes into the accumulator.
    pub fn update(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// The digest of everything fed since the last reset.
    ///
    /// Does not reset; calling twice with no intervening update returns the
    /// same value.
    pub fn snapshot(&self) -> [u8; CHECKSUM_LEN] {
        let mut digest = [0u8; CHECKSUM_LEN];
        self.hasher.finalize_xof().fill(&mut digest);
        digest
    }

    /// The snapshot rendered as 32 lowercase hex characters.
    pub fn snapshot_hex(&self) -> String {
        hex::encode(self.snapshot())
    }

    /// Clear the accumulator.
    pub fn reset(&mut self) {
        self.hasher.reset();
    }
}

impl Default for Checksum {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checksum")
            .field("snapshot", &self.snapshot_hex())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_idempotent() {
        let mut checksum = Checksum::new();
        checksum.update(b"payload");
        assert_eq!(checksum.snapshot(), checksum.snapshot());
    }

    #[test]
    fn snapshot_does_not_reset() {
        let mut split = Checksum::new();
        split.update(b"pay");
        let _ = split.snapshot();
        split.update(b"load");

        let mut whole = Checksum::new();
        whole.update(b"payload");

        assert_eq!(split.snapshot(), whole.snapshot());
    }

    #[test]
    fn hex_rendering_is_32_lowercase_chars() {
        let mut checksum = Checksum::new();
        checksum.update(b"abc");
        let rendered = checksum.snapshot_hex();

        assert_eq!(rendered.len(), 2 * CHECKSUM_LEN);
        assert!(rendered
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn reset_restores_the_empty_state() {
        let empty = Checksum::new().snapshot();

        let mut checksum = Checksum::new();
        checksum.update(b"stale");
        checksum.reset();
        assert_eq!(checksum.snapshot(), empty);
    }

    #[test]
    fn different_inputs_differ() {
        let mut a = Checksum::new();
        a.update(b"one");
        let mut b = Checksum::new();
        b.update(b"two");
        assert_ne!(a.snapshot(), b.snapshot());
    }
}
