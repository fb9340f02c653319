//! Reference SPAD (single photon avalanche diode) selection.

use embedded_hal::{delay::DelayNs, i2c::I2c};

use crate::{
    imp::{poll, PollBound},
    program,
    reg::{self, Register},
    Error, Vl53l0x,
};

const SPAD_INFO_POLL: PollBound = PollBound {
    attempts: 50,
    interval_ms: 5,
};

/// The first 12 reference SPADs are of the non-aperture type.
const FIRST_APERTURE_SPAD: usize = 12;

impl<I2C, E> Vl53l0x<I2C>
where
    I2C: I2c<Error = E>,
{
    /// Get reference SPAD (single photon avalanche diode) count and type.
    /// based on VL53L0X_get_info_from_device(), but only gets reference SPAD
    /// count and type
    pub(crate) fn get_spad_info(
        &mut self,
        delay: &mut impl DelayNs,
    ) -> Result<(u8, bool), Error<E>> {
        self.apply(program::SPAD_INFO_ENTER)?;
        self.update(reg::SPAD_STROBE, |data| *data |= 0x04)?;
        self.apply(program::SPAD_INFO_TRIGGER)?;

        poll(delay, SPAD_INFO_POLL, || {
            let strobe = self.read(reg::SPAD_STROBE)?;
            Ok(strobe != 0x00)
        })?;

        self.write(reg::SPAD_STROBE, 0x01)?;
        let info = self.read(reg::SPAD_INFO)?;

        let count = info & 0x7F;
        let type_is_aperture = (info >> 7) & 0x01 == 0x01;

        self.write(reg::SPAD_MODE, 0x00)?;
        self.write(reg::PAGE_SELECT, 0x06)?;
        self.update(reg::SPAD_STROBE, |data| *data &= !0x04)?;
        self.apply(program::SPAD_INFO_EXIT)?;

        debug!("reference SPADs: {}, aperture: {}", count, type_is_aperture);
        Ok((count, type_is_aperture))
    }

    /// Enable `count` reference SPADs of the given type, keeping only SPADs
    /// the device marks as good.
    pub(crate) fn set_reference_spads(
        &mut self,
        count: u8,
        type_is_aperture: bool,
    ) -> Result<(), E> {
        // The SPAD map (RefGoodSpadMap) is read by
        // VL53L0X_get_info_from_device() in the API, but the same data seems to
        // be more easily readable from GLOBAL_CONFIG_SPAD_ENABLES_REF_0 through
        // _6, so read it from there
        let mut ref_spad_map = [0; 6];
        self.read_many(
            Register::GlobalConfigSpadEnablesRef0 as u8,
            &mut ref_spad_map,
        )?;

        self.apply(program::REF_SPAD_CONFIG)?;

        trim_spad_map(&mut ref_spad_map, count, type_is_aperture);

        self.write_many(Register::GlobalConfigSpadEnablesRef0 as u8, &ref_spad_map)
    }
}

/// Keep the first `count` good SPADs of the requested type in `map` and clear
/// every other bit.
pub(crate) fn trim_spad_map(map: &mut [u8; 6], count: u8, type_is_aperture: bool) {
    let first_spad_to_enable = if type_is_aperture {
        FIRST_APERTURE_SPAD
    } else {
        0
    };
    let mut spads_enabled: u8 = 0;

    for i in 0..48 {
        let (byte, bit) = (i / 8, i % 8);

        if i < first_spad_to_enable || spads_enabled == count {
            // This bit is lower than the first one that should be enabled, or
            // (reference_spad_count) bits have already been enabled, so zero this bit
            map[byte] &= !(1 << bit);
        } else if (map[byte] >> bit) & 0x1 == 0x1 {
            spads_enabled += 1;
        }
    }
}
