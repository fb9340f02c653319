//! Conversions between the three time domains of the sensor: VCSEL pulse
//! clocks (PCLKs), macro clocks (MCLKs) and microseconds.

/// Macro period in nanoseconds for a VCSEL period given in PCLKs.
pub(crate) fn calc_macro_period(vcsel_period_pclks: u8) -> u32 {
    ((2304 * u32::from(vcsel_period_pclks) * 1655) + 500) / 1000
}

pub(crate) fn timeout_microseconds_to_mclks(timeout_period_us: u32, vcsel_period_pclks: u8) -> u32 {
    let macro_period_ns = u64::from(calc_macro_period(vcsel_period_pclks));
    let mclks = ((u64::from(timeout_period_us) * 1000) + (macro_period_ns / 2)) / macro_period_ns;

    u32::try_from(mclks).unwrap_or(u32::MAX)
}

pub(crate) fn timeout_mclks_to_microseconds(
    timeout_period_mclks: u32,
    vcsel_period_pclks: u8,
) -> u32 {
    let macro_period_ns = u64::from(calc_macro_period(vcsel_period_pclks));
    let us = (u64::from(timeout_period_mclks) * macro_period_ns + (macro_period_ns / 2)) / 1000;

    // Saturates for timeouts beyond u32::MAX microseconds (about 71 minutes).
    u32::try_from(us).unwrap_or(u32::MAX)
}

/// Encode a timeout in MCLKs into the "(LSByte * 2^MSByte) + 1" register
/// format. Low bits shifted out of the mantissa are dropped.
pub(crate) fn encode_timeout(timeout_mclks: u32) -> u16 {
    if timeout_mclks == 0 {
        return 0;
    }

    let mut ls_byte = timeout_mclks - 1;
    let mut ms_byte: u16 = 0;

    while (ls_byte & 0xFFFF_FF00) > 0 {
        ls_byte >>= 1;
        ms_byte += 1;
    }

    (ms_byte << 8) | (ls_byte & 0xFF) as u16
}

/// Decode a "(LSByte * 2^MSByte) + 1" timeout register value into MCLKs.
pub(crate) fn decode_timeout(reg_val: u16) -> u32 {
    // An exponent above 24 cannot come out of `encode_timeout`.
    let exponent = (reg_val >> 8).min(24);
    (u32::from(reg_val & 0x00FF) << exponent) + 1
}

pub(crate) fn decode_vcsel_period(reg_val: u8) -> u8 {
    reg_val.saturating_add(1) << 1
}

pub(crate) fn encode_vcsel_period(period_pclks: u8) -> u8 {
    (period_pclks >> 1).saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macro_period_matches_datasheet_formula() {
        assert_eq!(calc_macro_period(8), 30505);
        assert_eq!(calc_macro_period(10), 38131);
        assert_eq!(calc_macro_period(14), 53384);
    }

    #[test]
    fn timeout_roundtrips_below_one_byte_mantissa() {
        for mclks in 1..=256 {
            assert_eq!(decode_timeout(encode_timeout(mclks)), mclks);
        }
    }

    #[test]
    fn timeout_encoding_drops_shifted_out_bits() {
        // 257 - 1 = 0b1_0000_0000, nothing is lost by the shift.
        assert_eq!(encode_timeout(257), 0x0180);
        assert_eq!(decode_timeout(0x0180), 257);

        // 258 - 1 has its lowest bit set, which the shift discards.
        assert_eq!(encode_timeout(258), 0x0180);
        assert_eq!(decode_timeout(encode_timeout(258)), 257);

        for mclks in 257..=u32::from(u16::MAX) {
            let shift = 32 - (mclks - 1).leading_zeros() - 8;
            let exact = (mclks - 1) & ((1 << shift) - 1) == 0;
            let roundtrip = decode_timeout(encode_timeout(mclks));
            assert_eq!(roundtrip == mclks, exact, "{mclks} mclks");
        }
    }

    #[test]
    fn zero_timeout_encodes_to_zero() {
        assert_eq!(encode_timeout(0), 0);
        assert_eq!(decode_timeout(0), 1);
    }

    #[test]
    fn decode_never_overflows() {
        assert_eq!(decode_timeout(0xFFFF), (0xFF << 24) + 1);
    }

    #[test]
    fn default_tuning_timeouts_convert_to_microseconds() {
        // PRE_RANGE_CONFIG_TIMEOUT_MACROP = 0x0096 at a 14 PCLK period.
        let pre_range_mclks = decode_timeout(0x0096);
        assert_eq!(pre_range_mclks, 151);
        assert_eq!(timeout_mclks_to_microseconds(pre_range_mclks, 14), 8087);
        assert_eq!(timeout_microseconds_to_mclks(8087, 14), 151);
    }

    #[test]
    fn conversions_survive_large_timeouts() {
        let us = timeout_mclks_to_microseconds(decode_timeout(0x0FFF), 18);
        assert!(us > 400_000_000);
        assert!(timeout_microseconds_to_mclks(u32::MAX, 8) > 0);
    }

    #[test]
    fn microseconds_saturate_instead_of_wrapping() {
        let mclks = decode_timeout(0x18FF);
        assert_eq!(timeout_mclks_to_microseconds(mclks, 18), u32::MAX);
        assert_eq!(timeout_microseconds_to_mclks(u32::MAX, 8), 140_795_519);
    }

    #[test]
    fn vcsel_period_encoding() {
        for period in [8, 10, 12, 14, 16, 18] {
            assert_eq!(decode_vcsel_period(encode_vcsel_period(period)), period);
        }
        assert_eq!(encode_vcsel_period(18), 8);
        assert_eq!(encode_vcsel_period(14), 6);
        assert_eq!(decode_vcsel_period(0x04), 10);
    }
}
