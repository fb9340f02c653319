#![doc = include_str!("../README.md")]
#![cfg_attr(not(test), no_std)]

mod fmt; // must be first, the other modules use its macros

mod imp;
mod mux;
mod program;
mod reg;
mod sequence;
mod spad;
#[cfg(test)]
mod testing;
mod timing;

pub use mux::{Tca9548a, CHANNEL_COUNT, DEFAULT_MUX_ADDRESS};

use embedded_hal::{delay::DelayNs, i2c::I2c};

/// The default I2C address for the VL53L0X.
pub const DEFAULT_ADDRESS: u8 = 0b010_1001;

/// The smallest measurement timing budget the sensor accepts, in microseconds.
pub const MIN_TIMING_BUDGET_US: u32 = 20_000;

/// Errors that can occur while talking to a VL53L0X or the channel switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// An error occurred on the I2C bus.
    Bus(E),

    /// A parameter was outside of the range the device accepts.
    InvalidParameter,
    /// The enabled sequence steps need more time than the requested
    /// measurement timing budget.
    BudgetExceeded,
    /// The device did not become ready within the polling bound.
    Timeout,
    /// The model ID read from the device was not that of a VL53L0X.
    ModelMismatch(u8),
    /// A reference calibration did not complete during initialisation.
    CalibrationFailed,
}

impl<E> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Error::Bus(error)
    }
}

impl<E: core::fmt::Debug> core::fmt::Display for Error<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// The ranging profile applied during initialisation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RangeMode {
    /// Vendor defaults, good for roughly 30 to 800mm.
    #[default]
    Nominal,
    /// Lower signal rate limit and longer VCSEL periods, good for roughly
    /// 30 to 2000mm at the cost of accuracy.
    LongRange,
}

/// Which of the two VCSEL pulse periods to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VcselPeriodType {
    /// The pre-range step. Valid periods are 12, 14, 16 and 18 PCLKs.
    PreRange,
    /// The final range step. Valid periods are 8, 10, 12 and 14 PCLKs.
    FinalRange,
}

/// A VL53L0X driver. Use the `new` function to create and calibrate a new
/// instance, then call `read_range_single_millimeters` for each measurement.
///
/// A handle is not meant to be shared: every call against one sensor has to
/// be serialised by the caller. When several sensors sit behind a
/// [`Tca9548a`], the caller must also keep the right channel selected for the
/// whole call.
pub struct Vl53l0x<I2C> {
    i2c: I2C,
    address: u8,

    stop_variable: u8,
    // Zero until read from the device during initialisation.
    measurement_timing_budget_us: u32,
}

impl<I2C, E> Vl53l0x<I2C>
where
    I2C: I2c<Error = E>,
{
    /// Create a new instance of the VL53L0X driver. This performs the full
    /// initialisation and reference calibration of the device at `address`
    /// and may fail if the device is not present.
    ///
    /// If the sensor sits behind a channel switch, select its channel before
    /// calling this function.
    ///
    /// # Errors
    /// Forwards any errors from the I2C bus, as well as any initialisation
    /// errors from the device itself. A failed initialisation leaves the
    /// device in an undefined state; start over with a new call.
    pub fn new(
        i2c: I2C,
        address: u8,
        mode: RangeMode,
        delay: &mut impl DelayNs,
    ) -> Result<Self, Error<E>> {
        let mut this = Self {
            i2c,
            address,

            stop_variable: 0,
            measurement_timing_budget_us: 0,
        };

        this.init(mode, delay)?;

        Ok(this)
    }

    /// Check that a VL53L0X answers at `address`, without initialising it.
    ///
    /// # Errors
    /// Returns [`Error::ModelMismatch`] if something other than a VL53L0X
    /// answered, and forwards any errors from the I2C bus.
    pub fn probe(i2c: &mut I2C, address: u8) -> Result<(), Error<E>> {
        let mut model_id = [0];
        i2c.write_read(
            address,
            &[reg::Register::IdentificationModelId as u8],
            &mut model_id,
        )?;

        if model_id[0] == reg::EXPECTED_MODEL_ID {
            Ok(())
        } else {
            warn!("unexpected model id {} at address {}", model_id[0], address);
            Err(Error::ModelMismatch(model_id[0]))
        }
    }

    /// Perform a single-shot range measurement and return the range in
    /// millimeters.
    ///
    /// # Errors
    /// Returns [`Error::Timeout`] if the measurement did not complete in time,
    /// and forwards any errors from the I2C bus. Both leave the handle usable,
    /// so the measurement can simply be retried.
    pub fn read_range_single_millimeters(
        &mut self,
        delay: &mut impl DelayNs,
    ) -> Result<u16, Error<E>> {
        self.measure(delay)
    }

    /// Set the measurement timing budget in microseconds, the time allowed
    /// for one measurement. A longer budget allows for more accurate
    /// measurements; the minimum is [`MIN_TIMING_BUDGET_US`].
    ///
    /// # Errors
    /// Returns [`Error::InvalidParameter`] if the budget is below the minimum,
    /// [`Error::BudgetExceeded`] if the enabled sequence steps alone take
    /// longer, and forwards any errors from the I2C bus.
    pub fn set_measurement_timing_budget(&mut self, budget_us: u32) -> Result<(), Error<E>> {
        self.apply_measurement_timing_budget(budget_us)
    }

    /// Read the measurement timing budget currently configured on the device,
    /// in microseconds.
    ///
    /// # Errors
    /// Forwards any errors from the I2C bus.
    pub fn measurement_timing_budget(&mut self) -> Result<u32, Error<E>> {
        self.read_measurement_timing_budget()
    }

    /// Set the VCSEL pulse period for the given step, in PCLKs. Longer
    /// periods increase the potential range of the sensor. This re-derives the
    /// dependent timeouts and re-runs the phase calibration.
    ///
    /// # Errors
    /// Returns [`Error::InvalidParameter`] without touching the device if the
    /// period is not valid for the step, [`Error::Timeout`] if the phase
    /// calibration did not complete, and forwards any errors from the I2C bus.
    pub fn set_vcsel_pulse_period(
        &mut self,
        period_type: VcselPeriodType,
        period_pclks: u8,
        delay: &mut impl DelayNs,
    ) -> Result<(), Error<E>> {
        self.apply_vcsel_pulse_period(period_type, period_pclks, delay)
    }

    /// Read the VCSEL pulse period for the given step, in PCLKs.
    ///
    /// # Errors
    /// Forwards any errors from the I2C bus.
    pub fn vcsel_pulse_period(&mut self, period_type: VcselPeriodType) -> Result<u8, Error<E>> {
        Ok(self.get_vcsel_pulse_period(period_type)?)
    }

    /// Set the return signal rate limit in MCPS (mega counts per second),
    /// the minimum signal amplitude for a reading to count as valid. Lower
    /// limits increase range but also the chance of inaccurate readings.
    ///
    /// # Errors
    /// Returns [`Error::InvalidParameter`] if the limit is outside of
    /// `0.0..=511.99`, and forwards any errors from the I2C bus.
    pub fn set_signal_rate_limit(&mut self, limit_mcps: f32) -> Result<(), Error<E>> {
        self.write_signal_rate_limit(limit_mcps)
    }

    /// Read the model and revision IDs of the device.
    ///
    /// # Errors
    /// Forwards any errors from the I2C bus.
    pub fn identification(&mut self) -> Result<(u8, u8), Error<E>> {
        let model = self.read(reg::Register::IdentificationModelId as u8)?;
        let revision = self.read(reg::Register::IdentificationRevisionId as u8)?;
        Ok((model, revision))
    }

    /// Move the device to a new I2C address. The device falls back to
    /// [`DEFAULT_ADDRESS`] when powered off.
    ///
    /// # Errors
    /// Returns [`Error::InvalidParameter`] for reserved addresses (outside of
    /// `0x08..=0x77`), and forwards any errors from the I2C bus.
    pub fn set_address(&mut self, new_address: u8) -> Result<(), Error<E>> {
        self.change_address(new_address)
    }

    /// The I2C address this handle talks to.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// The measurement timing budget last read from or applied to the device.
    pub fn cached_timing_budget_us(&self) -> u32 {
        self.measurement_timing_budget_us
    }

    /// Give back the I2C bus.
    pub fn release(self) -> I2C {
        self.i2c
    }
}
