//! 80-bit extended precision sample rates
//!
//! AIFF stores the COMM sample rate as an IEEE 754 80-bit extended float.
//! Only the narrow band of real-world audio rates matters, so the value is
//! reduced to an integer with a fixed set of clamps and a mantissa shift
//! rather than a general long-double conversion. Existing decoded files
//! depend on this exact arithmetic.

/// Returned when the exponent is beyond any usable sample rate
pub const RATE_TOO_BIG: u32 = 67_108_864;

/// Returned when the exponent is 0x40 but the next byte is past 0x1C
pub const RATE_STILL_TOO_BIG: u32 = 800_000_000;

/// Convert a 10-byte extended float into an integer sample rate
///
/// The sign bit is not tested: a negative encoding has a first byte of at
/// least 0x80, so it falls into the "too big" clamp like any other large
/// exponent.
pub fn ieee_float_to_int(b: [u8; 10]) -> u32 {
    // Less than 1
    if b[0] <= 0x3F {
        return 1;
    }

    if b[0] > 0x40 {
        return RATE_TOO_BIG;
    }

    if b[0] == 0x40 && b[1] > 0x1C {
        return RATE_STILL_TOO_BIG;
    }

    let mantissa = (u32::from(b[2]) << 23)
        | (u32::from(b[3]) << 15)
        | (u32::from(b[4]) << 7)
        | (u32::from(b[5]) >> 1);
    mantissa >> (29 - u32::from(b[1]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case([0x40, 0x0B, 0xFA, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], 8000)]
    #[case([0x40, 0x0C, 0xAC, 0x44, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], 11025)]
    #[case([0x40, 0x0D, 0xAC, 0x44, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], 22050)]
    #[case([0x40, 0x0E, 0xAC, 0x44, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], 44100)]
    #[case([0x40, 0x0E, 0xBB, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], 48000)]
    #[case([0x40, 0x0F, 0xBB, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], 96000)]
    fn test_known_rates(#[case] bytes: [u8; 10], #[case] expected: u32) {
        assert_eq!(ieee_float_to_int(bytes), expected);
    }

    #[rstest]
    #[case(0x00)]
    #[case(0x10)]
    #[case(0x3F)]
    fn test_below_one_returns_one(#[case] first: u8) {
        let mut bytes = [0u8; 10];
        bytes[0] = first;
        bytes[2] = 0xFF;
        assert_eq!(ieee_float_to_int(bytes), 1);
    }

    #[test]
    fn test_large_exponent_clamps() {
        let bytes = [0x41, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        assert_eq!(ieee_float_to_int(bytes), RATE_TOO_BIG);
        assert_eq!(RATE_TOO_BIG, 1 << 26);
    }

    #[test]
    fn test_exponent_0x40_above_0x1c_clamps() {
        let bytes = [0x40, 0x1D, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        assert_eq!(ieee_float_to_int(bytes), RATE_STILL_TOO_BIG);
    }

    #[test]
    fn test_exponent_0x1c_uses_shift_of_one() {
        let bytes = [0x40, 0x1C, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        // 0x80 << 23 == 0x4000_0000
        assert_eq!(ieee_float_to_int(bytes), 0x2000_0000);
    }

    #[test]
    fn test_low_bit_of_byte5_is_dropped() {
        let a = [0x40, 0x0E, 0xAC, 0x44, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00];
        let b = [0x40, 0x0E, 0xAC, 0x44, 0x00, 0x03, 0x00, 0x00, 0x00, 0x00];
        assert_eq!(ieee_float_to_int(a), ieee_float_to_int(b));
    }

    // The sign bit never selects a "negative" result; -44100 lands in the
    // large-exponent clamp.
    #[test]
    fn test_sign_bit_is_not_tested() {
        let negative = [0xC0, 0x0E, 0xAC, 0x44, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        assert_eq!(ieee_float_to_int(negative), RATE_TOO_BIG);

        let negative_small = [0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        assert_eq!(ieee_float_to_int(negative_small), RATE_TOO_BIG);
    }

    #[test]
    fn test_trailing_bytes_are_ignored() {
        let a = [0x40, 0x0E, 0xAC, 0x44, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        let b = [0x40, 0x0E, 0xAC, 0x44, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF];
        assert_eq!(ieee_float_to_int(a), ieee_float_to_int(b));
    }

    mod props {
        use super::super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn decoding_is_pure(bytes in proptest::array::uniform10(any::<u8>())) {
                prop_assert_eq!(ieee_float_to_int(bytes), ieee_float_to_int(bytes));
            }

            #[test]
            fn shift_formula_holds(b1 in 0u8..=0x1C, b2: u8, b3: u8, b4: u8, b5: u8) {
                let bytes = [0x40, b1, b2, b3, b4, b5, 0, 0, 0, 0];
                let mantissa = (u32::from(b2) << 23)
                    | (u32::from(b3) << 15)
                    | (u32::from(b4) << 7)
                    | (u32::from(b5) >> 1);
                prop_assert_eq!(ieee_float_to_int(bytes), mantissa >> (29 - u32::from(b1)));
            }
        }
    }
}
