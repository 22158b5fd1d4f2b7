//! Wire representation of the scalar kinds.
//!
//! Multi-byte values travel in host order unless the twiddle flag is set, in
//! which case they are byte-swapped ("twiddled") to the peer's order. Floats
//! go through their IEEE 754 bit pattern, so the same path serves both
//! native-IEEE hosts (a plain byte copy) and the normalizing fallback.

/// Byte order of a wire format or host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Big,
    Little,
}

impl ByteOrder {
    /// The byte order of the host this code runs on.
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }

    /// Whether values bound for `self` must be byte-swapped on this host.
    pub fn needs_twiddle(self) -> bool {
        self != Self::native()
    }
}

mod sealed {
    pub trait Sealed {}
}

/// A scalar kind with a fixed wire width and twiddle-aware byte layout.
///
/// Implemented for the ten wire scalar kinds; not implementable outside this
/// crate.
pub trait Scalar: Copy + sealed::Sealed {
    /// Wire width in bytes.
    const WIDTH: usize;
    /// The fixed-size wire form.
    type Wire: AsRef<[u8]>;

    /// Encode to wire bytes, swapping if `twiddle` is set.
    fn to_wire(self, twiddle: bool) -> Self::Wire;

    /// Decode from wire bytes, swapping if `twiddle` is set.
    ///
    /// `wire` must hold at least [`WIDTH`](Self::WIDTH) bytes.
    fn from_wire(wire: &[u8], twiddle: bool) -> Self;
}

macro_rules! int_scalar {
    ($($ty:ty),* $(,)?) => {$(
        impl sealed::Sealed for $ty {}

        impl Scalar for $ty {
            const WIDTH: usize = std::mem::size_of::<$ty>();
            type Wire = [u8; std::mem::size_of::<$ty>()];

            fn to_wire(self, twiddle: bool) -> Self::Wire {
                let value = if twiddle { self.swap_bytes() } else { self };
                value.to_ne_bytes()
            }

            fn from_wire(wire: &[u8], twiddle: bool) -> Self {
                let value = Self::from_ne_bytes(wire[..Self::WIDTH].try_into().unwrap());
                if twiddle {
                    value.swap_bytes()
                } else {
                    value
                }
            }
        }
    )*};
}

int_scalar!(u8, i8, u16, i16, u32, i32, u64, i64);

macro_rules! float_scalar {
    ($($ty:ty => $bits:ty),* $(,)?) => {$(
        impl sealed::Sealed for $ty {}

        impl Scalar for $ty {
            const WIDTH: usize = std::mem::size_of::<$ty>();
            type Wire = [u8; std::mem::size_of::<$ty>()];

            fn to_wire(self, twiddle: bool) -> Self::Wire {
                // Full-width swap of the bit pattern; a 64-bit float gets a
                // 64-bit swap.
                let bits = if twiddle {
                    self.to_bits().swap_bytes()
                } else {
                    self.to_bits()
                };
                bits.to_ne_bytes()
            }

            fn from_wire(wire: &[u8], twiddle: bool) -> Self {
                let bits = <$bits>::from_ne_bytes(wire[..Self::WIDTH].try_into().unwrap());
                let bits = if twiddle { bits.swap_bytes() } else { bits };
                Self::from_bits(bits)
            }
        }
    )*};
}

float_scalar!(f32 => u32, f64 => u64);

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip<T: Scalar + PartialEq + std::fmt::Debug>(value: T, twiddle: bool) {
        let wire = value.to_wire(twiddle);
        assert_eq!(wire.as_ref().len(), T::WIDTH);
        assert_eq!(T::from_wire(wire.as_ref(), twiddle), value);
    }

    #[test]
    fn all_kinds_roundtrip_both_twiddles() {
        for twiddle in [false, true] {
            roundtrip(0xA5u8, twiddle);
            roundtrip(-5i8, twiddle);
            roundtrip(0x0102u16, twiddle);
            roundtrip(-300i16, twiddle);
            roundtrip(0x0102_0304u32, twiddle);
            roundtrip(-70_000i32, twiddle);
            roundtrip(0x0102_0304_0506_0708u64, twiddle);
            roundtrip(i64::MIN, twiddle);
            roundtrip(3.5f32, twiddle);
            roundtrip(-2.25e100f64, twiddle);
        }
    }

    #[test]
    fn twiddle_reverses_bytes() {
        let plain = 0x0102_0304u32.to_wire(false);
        let swapped = 0x0102_0304u32.to_wire(true);
        let reversed: Vec<u8> = plain.iter().rev().copied().collect();
        assert_eq!(swapped.as_ref(), reversed.as_slice());
    }

    #[test]
    fn f64_twiddle_is_a_full_width_swap() {
        let value = 1.0f64;
        let plain = value.to_wire(false);
        let swapped = value.to_wire(true);
        let reversed: Vec<u8> = plain.iter().rev().copied().collect();
        assert_eq!(swapped.as_ref(), reversed.as_slice());
    }

    #[test]
    fn native_order_matches_target_endian() {
        #[cfg(target_endian = "little")]
        assert_eq!(ByteOrder::native(), ByteOrder::Little);
        #[cfg(target_endian = "big")]
        assert_eq!(ByteOrder::native(), ByteOrder::Big);

        assert!(!ByteOrder::native().needs_twiddle());
    }
}
