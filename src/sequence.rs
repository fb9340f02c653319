use embedded_hal::{delay::DelayNs, i2c::I2c};

use crate::{
    program,
    reg::Register,
    timing::{
        decode_timeout, decode_vcsel_period, encode_timeout, encode_vcsel_period,
        timeout_mclks_to_microseconds, timeout_microseconds_to_mclks,
    },
    Error, VcselPeriodType, Vl53l0x, MIN_TIMING_BUDGET_US,
};

/// Every sequence step enabled.
pub(crate) const ALL_STEPS: u8 = 0xFF;
/// Final range, pre-range and DSS; MSRC and TCC disabled.
pub(crate) const DEFAULT_STEPS: u8 = 0xE8;
/// Sequence config selecting the VHV calibration.
pub(crate) const VHV_CALIBRATION: u8 = 0x01;
/// Sequence config selecting the phase calibration.
pub(crate) const PHASE_CALIBRATION: u8 = 0x02;

const FINAL_RANGE_ENABLE: u8 = 0x80;
const PRE_RANGE_ENABLE: u8 = 0x40;
const TCC_ENABLE: u8 = 0x10;
const DSS_ENABLE: u8 = 0x08;
const MSRC_ENABLE: u8 = 0x04;

// Note that the start overhead differs between reading and applying a
// budget. Both values come from the vendor API.
const GET_START_OVERHEAD: u32 = 1910;
const SET_START_OVERHEAD: u32 = 1320;
const END_OVERHEAD: u32 = 960;
const MSRC_OVERHEAD: u32 = 660;
const TCC_OVERHEAD: u32 = 590;
const DSS_OVERHEAD: u32 = 690;
const PRE_RANGE_OVERHEAD: u32 = 660;
const FINAL_RANGE_OVERHEAD: u32 = 550;

#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SequenceStepEnables {
    pub(crate) tcc: bool,
    pub(crate) msrc: bool,
    pub(crate) dss: bool,
    pub(crate) pre_range: bool,
    pub(crate) final_range: bool,
}

impl SequenceStepEnables {
    pub(crate) fn from_register(sequence_config: u8) -> Self {
        Self {
            tcc: sequence_config & TCC_ENABLE != 0,
            msrc: sequence_config & MSRC_ENABLE != 0,
            dss: sequence_config & DSS_ENABLE != 0,
            pre_range: sequence_config & PRE_RANGE_ENABLE != 0,
            final_range: sequence_config & FINAL_RANGE_ENABLE != 0,
        }
    }
}

/// Timeouts of the sequence steps. `final_range_mclks` excludes the
/// pre-range timeout the device stores it cumulatively with.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SequenceStepTimeouts {
    pub(crate) pre_range_vcsel_period_pclks: u8,
    pub(crate) final_range_vcsel_period_pclks: u8,
    pub(crate) msrc_dss_tcc_mclks: u32,
    pub(crate) pre_range_mclks: u32,
    pub(crate) final_range_mclks: u32,
    pub(crate) msrc_dss_tcc_us: u32,
    pub(crate) pre_range_us: u32,
    pub(crate) final_range_us: u32,
}

impl SequenceStepTimeouts {
    /// Time taken by every enabled step except the final range, including
    /// the fixed start and end overheads.
    /// Saturates at `u32::MAX` for out-of-range register contents.
    fn overhead_before_final_range_us(
        &self,
        enables: SequenceStepEnables,
        start_overhead: u32,
    ) -> u32 {
        // "Start and end overhead times always present"
        let mut budget_us = start_overhead + END_OVERHEAD;

        if enables.tcc {
            budget_us = budget_us
                .saturating_add(self.msrc_dss_tcc_us)
                .saturating_add(TCC_OVERHEAD);
        }

        if enables.dss {
            let dss_us = self.msrc_dss_tcc_us.saturating_add(DSS_OVERHEAD);
            budget_us = budget_us.saturating_add(dss_us.saturating_mul(2));
        } else if enables.msrc {
            budget_us = budget_us
                .saturating_add(self.msrc_dss_tcc_us)
                .saturating_add(MSRC_OVERHEAD);
        }

        if enables.pre_range {
            budget_us = budget_us
                .saturating_add(self.pre_range_us)
                .saturating_add(PRE_RANGE_OVERHEAD);
        }

        budget_us
    }
}

impl<I2C, E> Vl53l0x<I2C>
where
    I2C: I2c<Error = E>,
{
    pub(crate) fn read_measurement_timing_budget(&mut self) -> Result<u32, Error<E>> {
        let enables = self.get_sequence_step_enables()?;
        let timeouts = self.get_sequence_step_timeouts(enables)?;

        let mut budget_us = timeouts.overhead_before_final_range_us(enables, GET_START_OVERHEAD);

        if enables.final_range {
            budget_us = budget_us
                .saturating_add(timeouts.final_range_us)
                .saturating_add(FINAL_RANGE_OVERHEAD);
        }

        debug!("measurement timing budget is {} us", budget_us);
        self.measurement_timing_budget_us = budget_us; // store for internal reuse
        Ok(budget_us)
    }

    pub(crate) fn apply_measurement_timing_budget(
        &mut self,
        budget_us: u32,
    ) -> Result<(), Error<E>> {
        if budget_us < MIN_TIMING_BUDGET_US {
            warn!("timing budget of {} us is below the minimum", budget_us);
            return Err(Error::InvalidParameter);
        }

        let enables = self.get_sequence_step_enables()?;
        let timeouts = self.get_sequence_step_timeouts(enables)?;

        let mut used_budget_us =
            timeouts.overhead_before_final_range_us(enables, SET_START_OVERHEAD);

        if enables.final_range {
            used_budget_us = used_budget_us.saturating_add(FINAL_RANGE_OVERHEAD);

            // "Note that the final range timeout is determined by the timing
            // budget and the sum of all other timeouts within the sequence.
            // If there is no room for the final range timeout, then an error
            // will be set. Otherwise the remaining time will be applied to
            // the final range."

            if used_budget_us > budget_us {
                warn!(
                    "timing budget of {} us leaves no room for the final range ({} us used)",
                    budget_us,
                    used_budget_us
                );
                return Err(Error::BudgetExceeded);
            }

            let final_range_timeout_us = budget_us - used_budget_us;

            // "For the final range timeout, the pre-range timeout
            //  must be added. To do this both final and pre-range
            //  timeouts must be expressed in macro periods MClks
            //  because they have different vcsel periods."

            let mut final_range_timeout_mclks = timeout_microseconds_to_mclks(
                final_range_timeout_us,
                timeouts.final_range_vcsel_period_pclks,
            );

            if enables.pre_range {
                final_range_timeout_mclks =
                    final_range_timeout_mclks.saturating_add(timeouts.pre_range_mclks);
            }

            self.write_u16(
                Register::FinalRangeConfigTimeoutMacropHi as u8,
                encode_timeout(final_range_timeout_mclks),
            )?;

            debug!("applied timing budget of {} us", budget_us);
            self.measurement_timing_budget_us = budget_us; // store for internal reuse
        }

        Ok(())
    }

    // Set the VCSEL (vertical cavity surface emitting laser) pulse period for the
    // given period type (pre-range or final range) to the given value in PCLKs.
    // based on VL53L0X_set_vcsel_pulse_period()
    pub(crate) fn apply_vcsel_pulse_period(
        &mut self,
        period_type: VcselPeriodType,
        period_pclks: u8,
        delay: &mut impl DelayNs,
    ) -> Result<(), Error<E>> {
        let Some(phase_settings) = program::phase_program(period_type, period_pclks) else {
            warn!("invalid VCSEL period of {} PCLKs", period_pclks);
            return Err(Error::InvalidParameter);
        };

        let vcsel_period_reg = encode_vcsel_period(period_pclks);

        // "When the VCSEL period for the pre or final range is changed,
        // the corresponding timeout must be read from the device using
        // the current VCSEL period, then the new VCSEL period can be
        // applied. The timeout then must be written back to the device
        // using the new VCSEL period.
        //
        // For the MSRC timeout, the same applies - this timeout being
        // dependant on the pre-range vcsel period."

        let enables = self.get_sequence_step_enables()?;
        let timeouts = self.get_sequence_step_timeouts(enables)?;

        // "Apply specific settings for the requested clock period"
        self.apply(phase_settings)?;

        match period_type {
            VcselPeriodType::PreRange => {
                self.write(Register::PreRangeConfigVcselPeriod as u8, vcsel_period_reg)?;

                let new_pre_range_timeout_mclks =
                    timeout_microseconds_to_mclks(timeouts.pre_range_us, period_pclks);

                self.write_u16(
                    Register::PreRangeConfigTimeoutMacropHi as u8,
                    encode_timeout(new_pre_range_timeout_mclks),
                )?;

                let new_msrc_timeout_mclks =
                    timeout_microseconds_to_mclks(timeouts.msrc_dss_tcc_us, period_pclks);

                #[allow(clippy::cast_possible_truncation)]
                let msrc_timeout_reg = if new_msrc_timeout_mclks > 256 {
                    255
                } else {
                    new_msrc_timeout_mclks.saturating_sub(1) as u8
                };

                self.write(Register::MsrcConfigTimeoutMacrop as u8, msrc_timeout_reg)?;
            }
            VcselPeriodType::FinalRange => {
                self.write(
                    Register::FinalRangeConfigVcselPeriod as u8,
                    vcsel_period_reg,
                )?;

                let mut new_final_range_timeout_mclks =
                    timeout_microseconds_to_mclks(timeouts.final_range_us, period_pclks);

                if enables.pre_range {
                    new_final_range_timeout_mclks =
                        new_final_range_timeout_mclks.saturating_add(timeouts.pre_range_mclks);
                }

                self.write_u16(
                    Register::FinalRangeConfigTimeoutMacropHi as u8,
                    encode_timeout(new_final_range_timeout_mclks),
                )?;
            }
        }

        // "Finally, the timing budget must be re-applied"
        if self.measurement_timing_budget_us != 0 {
            self.apply_measurement_timing_budget(self.measurement_timing_budget_us)?;
        }

        // "Perform the phase calibration. This is needed after changing on vcsel period."
        let sequence_config = self.read(Register::SystemSequenceConfig as u8)?;
        self.write_sequence_config(PHASE_CALIBRATION)?;
        self.perform_single_ref_calibration(0x00, delay)?;
        self.write_sequence_config(sequence_config)?;

        debug!("VCSEL period set to {} PCLKs", period_pclks);
        Ok(())
    }

    pub(crate) fn get_sequence_step_enables(&mut self) -> Result<SequenceStepEnables, E> {
        let sequence_config = self.read(Register::SystemSequenceConfig as u8)?;
        Ok(SequenceStepEnables::from_register(sequence_config))
    }

    pub(crate) fn get_sequence_step_timeouts(
        &mut self,
        enables: SequenceStepEnables,
    ) -> Result<SequenceStepTimeouts, E> {
        let mut timeouts = SequenceStepTimeouts {
            pre_range_vcsel_period_pclks: self.get_vcsel_pulse_period(VcselPeriodType::PreRange)?,
            ..SequenceStepTimeouts::default()
        };

        timeouts.msrc_dss_tcc_mclks =
            u32::from(self.read(Register::MsrcConfigTimeoutMacrop as u8)?) + 1;
        timeouts.msrc_dss_tcc_us = timeout_mclks_to_microseconds(
            timeouts.msrc_dss_tcc_mclks,
            timeouts.pre_range_vcsel_period_pclks,
        );

        let pre_range_reg = self.read_u16(Register::PreRangeConfigTimeoutMacropHi as u8)?;
        timeouts.pre_range_mclks = decode_timeout(pre_range_reg);
        timeouts.pre_range_us = timeout_mclks_to_microseconds(
            timeouts.pre_range_mclks,
            timeouts.pre_range_vcsel_period_pclks,
        );

        timeouts.final_range_vcsel_period_pclks =
            self.get_vcsel_pulse_period(VcselPeriodType::FinalRange)?;

        let final_range_reg = self.read_u16(Register::FinalRangeConfigTimeoutMacropHi as u8)?;
        timeouts.final_range_mclks = decode_timeout(final_range_reg);

        if enables.pre_range {
            timeouts.final_range_mclks = timeouts
                .final_range_mclks
                .saturating_sub(timeouts.pre_range_mclks);
        }

        timeouts.final_range_us = timeout_mclks_to_microseconds(
            timeouts.final_range_mclks,
            timeouts.final_range_vcsel_period_pclks,
        );

        Ok(timeouts)
    }

    pub(crate) fn get_vcsel_pulse_period(&mut self, period_type: VcselPeriodType) -> Result<u8, E> {
        let register = match period_type {
            VcselPeriodType::PreRange => Register::PreRangeConfigVcselPeriod,
            VcselPeriodType::FinalRange => Register::FinalRangeConfigVcselPeriod,
        };

        Ok(decode_vcsel_period(self.read(register as u8)?))
    }
}
