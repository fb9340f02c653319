use embedded_hal::{delay::DelayNs, i2c::I2c};

use crate::{
    program::{self, RegisterProgram},
    reg::{self, Register},
    sequence, Error, RangeMode, VcselPeriodType, Vl53l0x,
};

/// How often and how far apart a status register is polled.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PollBound {
    pub(crate) attempts: u32,
    pub(crate) interval_ms: u32,
}

const REF_CALIBRATION_POLL: PollBound = PollBound {
    attempts: 100,
    interval_ms: 5,
};

const RANGING_POLL: PollBound = PollBound {
    attempts: 50,
    interval_ms: 50,
};

impl<I2C, E> Vl53l0x<I2C>
where
    I2C: I2c<Error = E>,
{
    pub(crate) fn init(
        &mut self,
        mode: RangeMode,
        delay: &mut impl DelayNs,
    ) -> Result<(), Error<E>> {
        info!("initialising VL53L0X at address {}", self.address);

        // check model ID register (value specified in datasheet)
        let model_id = self.read(Register::IdentificationModelId as u8)?;
        if model_id != reg::EXPECTED_MODEL_ID {
            warn!("unexpected model id {}", model_id);
            return Err(Error::ModelMismatch(model_id));
        }

        // sensor uses 1V8 mode for I/O by default; switch to 2V8 mode
        self.update(Register::VhvConfigPadSclSdaExtsupHv as u8, |data| {
            *data |= 0x01;
        })?;

        self.apply(program::I2C_STANDARD_MODE)?;
        self.stop_variable = self.read(reg::STOP_VARIABLE)?;
        self.apply(program::INTERNAL_PAGE_EXIT)?;

        // disable SIGNAL_RATE_MSRC (bit 1) and SIGNAL_RATE_PRE_RANGE (bit 4) limit
        // checks
        self.update(Register::MsrcConfigControl as u8, |data| *data |= 0x12)?;

        // set final range signal rate limit to 0.25 MCPS (million counts per second)
        self.write_signal_rate_limit(0.25)?;

        self.write_sequence_config(sequence::ALL_STEPS)?;

        let (spad_count, spad_type_is_aperture) = self.get_spad_info(delay)?;
        self.set_reference_spads(spad_count, spad_type_is_aperture)?;

        debug!("loading default tuning settings");
        self.apply(program::DEFAULT_TUNING)?;

        if mode == RangeMode::LongRange {
            info!("applying long range settings");
            self.write_signal_rate_limit(0.1)?;
            self.apply_vcsel_pulse_period(VcselPeriodType::PreRange, 18, delay)?;
            self.apply_vcsel_pulse_period(VcselPeriodType::FinalRange, 14, delay)?;
        }

        // "Set interrupt config to new sample ready"
        self.write(Register::SystemInterruptConfigGpio as u8, 0x04)?;
        self.update(Register::GpioHvMuxActiveHigh as u8, |data| {
            *data &= !0x10;
        })?; // active low
        self.write(Register::SystemInterruptClear as u8, 0x01)?;

        let budget_us = self.read_measurement_timing_budget()?;

        // "Disable MSRC and TCC by default"
        self.write_sequence_config(sequence::DEFAULT_STEPS)?;

        // "Recalculate timing budget"
        self.apply_measurement_timing_budget(budget_us)?;

        info!("running reference calibration");

        self.write_sequence_config(sequence::VHV_CALIBRATION)?;
        self.perform_single_ref_calibration(0x40, delay)
            .map_err(calibration_failed)?;

        self.write_sequence_config(sequence::PHASE_CALIBRATION)?;
        self.perform_single_ref_calibration(0x00, delay)
            .map_err(calibration_failed)?;

        // "restore the previous Sequence Config"
        self.write_sequence_config(sequence::DEFAULT_STEPS)?;

        info!(
            "initialised, timing budget {} us",
            self.measurement_timing_budget_us
        );
        Ok(())
    }

    pub(crate) fn change_address(&mut self, new_address: u8) -> Result<(), Error<E>> {
        if !(0x08..=0x77).contains(&new_address) {
            warn!("refusing reserved address {}", new_address);
            return Err(Error::InvalidParameter);
        }

        self.write(Register::I2cSlaveDeviceAddress as u8, new_address & 0x7F)?;
        self.address = new_address;
        Ok(())
    }

    // Single-shot ranging, based on VL53L0X_PerformSingleRangingMeasurement().
    pub(crate) fn measure(&mut self, delay: &mut impl DelayNs) -> Result<u16, Error<E>> {
        self.apply(program::INTERNAL_PAGE_ENTER)?;
        self.write(reg::STOP_VARIABLE, self.stop_variable)?;
        self.apply(program::INTERNAL_PAGE_EXIT)?;

        self.write(Register::SysrangeStart as u8, 0x01)?; // VL53L0X_REG_SYSRANGE_MODE_START_STOP

        // "Wait until start bit has been cleared"
        poll(delay, RANGING_POLL, || {
            let sysrange = self.read(Register::SysrangeStart as u8)?;
            Ok(sysrange & 0x01 == 0)
        })?;

        poll(delay, RANGING_POLL, || self.interrupt_pending())?;

        // assumptions: Linearity Corrective Gain is 1000 (default);
        // fractional ranging is not enabled
        let range = self.read_u16(Register::ResultRangeStatus as u8 + reg::RANGE_MM_OFFSET)?;

        self.write(Register::SystemInterruptClear as u8, 0x01)?;

        trace!("range {} mm", range);
        Ok(range)
    }

    pub(crate) fn perform_single_ref_calibration(
        &mut self,
        vhv_init_byte: u8,
        delay: &mut impl DelayNs,
    ) -> Result<(), Error<E>> {
        // VL53L0X_REG_SYSRANGE_MODE_START_STOP
        self.write(Register::SysrangeStart as u8, 0x01 | vhv_init_byte)?;

        poll(delay, REF_CALIBRATION_POLL, || self.interrupt_pending())?;

        self.write(Register::SystemInterruptClear as u8, 0x01)?;

        self.write(Register::SysrangeStart as u8, 0x00)?;

        Ok(())
    }

    // Set the return signal rate limit check value in units of MCPS (mega counts
    // per second). "This represents the amplitude of the signal reflected from the
    // target and detected by the device"; setting this limit presumably determines
    // the minimum measurement necessary for the sensor to report a valid reading.
    pub(crate) fn write_signal_rate_limit(&mut self, limit_mcps: f32) -> Result<(), Error<E>> {
        if !(0.0..=511.99).contains(&limit_mcps) {
            warn!("signal rate limit out of range");
            return Err(Error::InvalidParameter);
        }

        // Q9.7 fixed point format (9 integer bits, 7 fractional bits), rounded
        // to the nearest step so 0.1 MCPS lands on 13 like the vendor value.
        #[allow(clippy::cast_possible_truncation)]
        #[allow(clippy::cast_sign_loss)]
        let limit = (limit_mcps * f32::from(1_u16 << 7) + 0.5) as u16;

        self.write_u16(Register::FinalRangeConfigMinCountRateRtnLimit as u8, limit)?;
        Ok(())
    }
}

impl<I2C, E> Vl53l0x<I2C>
where
    I2C: I2c<Error = E>,
{
    fn interrupt_pending(&mut self) -> Result<bool, E> {
        let status = self.read(Register::ResultInterruptStatus as u8)?;
        Ok(status & 0x07 != 0)
    }

    pub(crate) fn write_sequence_config(&mut self, steps: u8) -> Result<(), E> {
        self.write(Register::SystemSequenceConfig as u8, steps)
    }

    pub(crate) fn apply(&mut self, program: RegisterProgram) -> Result<(), E> {
        for (register, data) in program.writes() {
            trace!("program write {} <- {}", register, data);
            self.write(register, data)?;
        }
        Ok(())
    }

    pub(crate) fn write(&mut self, register: u8, data: u8) -> Result<(), E> {
        self.i2c.write(self.address, &[register, data])
    }

    pub(crate) fn write_u16(&mut self, register: u8, data: u16) -> Result<(), E> {
        let [high, low] = data.to_be_bytes();
        self.i2c.write(self.address, &[register, high, low])
    }

    pub(crate) fn write_many(&mut self, register: u8, data: &[u8; 6]) -> Result<(), E> {
        let mut frame = [register; 7];
        frame[1..].copy_from_slice(data);
        self.i2c.write(self.address, &frame)
    }

    pub(crate) fn read(&mut self, register: u8) -> Result<u8, E> {
        let mut data = [0];
        self.i2c.write_read(self.address, &[register], &mut data)?;
        Ok(data[0])
    }

    pub(crate) fn read_u16(&mut self, register: u8) -> Result<u16, E> {
        let mut data = [0; 2];
        self.i2c.write_read(self.address, &[register], &mut data)?;
        Ok(u16::from_be_bytes(data))
    }

    pub(crate) fn read_many(&mut self, register: u8, data: &mut [u8]) -> Result<(), E> {
        self.i2c.write_read(self.address, &[register], data)
    }

    pub(crate) fn update(&mut self, register: u8, f: impl FnOnce(&mut u8)) -> Result<(), E> {
        let mut data = [0];
        self.i2c.write_read(self.address, &[register], &mut data)?;
        f(&mut data[0]);
        self.i2c.write(self.address, &[register, data[0]])
    }
}

fn calibration_failed<E>(error: Error<E>) -> Error<E> {
    match error {
        Error::Timeout => Error::CalibrationFailed,
        other => other,
    }
}

/// Poll `ready` up to `bound.attempts` times, sleeping `bound.interval_ms`
/// between two polls, until it returns true.
pub(crate) fn poll<E>(
    delay: &mut impl DelayNs,
    bound: PollBound,
    mut ready: impl FnMut() -> Result<bool, E>,
) -> Result<(), Error<E>> {
    for attempt in 1..=bound.attempts {
        if ready()? {
            trace!("ready after {} polls", attempt);
            return Ok(());
        }

        if attempt < bound.attempts {
            delay.delay_ms(bound.interval_ms);
        }
    }

    warn!("not ready after {} polls", bound.attempts);
    Err(Error::Timeout)
}
