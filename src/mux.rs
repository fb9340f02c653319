use embedded_hal::i2c::I2c;

use crate::Error;

/// The default I2C address for the TCA9548A, with A0 to A2 tied low.
pub const DEFAULT_MUX_ADDRESS: u8 = 0x70;

/// The number of downstream channels on a TCA9548A.
pub const CHANNEL_COUNT: u8 = 8;

/// A TCA9548A I2C channel switch. Connects at most one of its eight
/// downstream buses to the upstream bus at a time, so that several sensors
/// sharing [`DEFAULT_ADDRESS`](crate::DEFAULT_ADDRESS) can be told apart.
///
/// The switch has a single control register and no register addressing: a
/// one byte write sets the enabled channels, one bit per channel.
pub struct Tca9548a<I2C> {
    i2c: I2C,
    address: u8,

    current_channel: Option<u8>,
}

impl<I2C, E> Tca9548a<I2C>
where
    I2C: I2c<Error = E>,
{
    /// Create a new handle for the switch at `address`, disabling every
    /// channel so that the switch state is known.
    ///
    /// # Errors
    /// Forwards any errors from the I2C bus.
    pub fn new(i2c: I2C, address: u8) -> Result<Self, Error<E>> {
        let mut this = Self {
            i2c,
            address,

            current_channel: None,
        };

        this.disable_all()?;

        Ok(this)
    }

    /// Connect downstream channel `channel` (0 to 7) and disconnect all others.
    ///
    /// # Errors
    /// Returns [`Error::InvalidParameter`] without touching the bus if the
    /// channel does not exist, and forwards any errors from the I2C bus. After
    /// a bus error the selected channel is unknown.
    pub fn select_channel(&mut self, channel: u8) -> Result<(), Error<E>> {
        if channel >= CHANNEL_COUNT {
            warn!("no channel {} on the switch", channel);
            return Err(Error::InvalidParameter);
        }

        self.current_channel = None;
        self.i2c.write(self.address, &[1 << channel])?;
        self.current_channel = Some(channel);

        trace!("selected channel {}", channel);
        Ok(())
    }

    /// Disconnect every downstream channel.
    ///
    /// # Errors
    /// Forwards any errors from the I2C bus.
    pub fn disable_all(&mut self) -> Result<(), Error<E>> {
        self.current_channel = None;
        self.i2c.write(self.address, &[0x00])?;

        trace!("disabled all channels");
        Ok(())
    }

    /// The channel last selected through this handle, if any.
    pub fn current_channel(&self) -> Option<u8> {
        self.current_channel
    }

    /// The I2C address this handle talks to.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Give back the I2C bus. The switch keeps its current channel selected.
    pub fn release(self) -> I2C {
        self.i2c
    }
}

#[cfg(test)]
mod tests {
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock, Transaction};

    use super::*;

    #[test]
    fn new_disables_every_channel() {
        let expectations = [Transaction::write(DEFAULT_MUX_ADDRESS, std::vec![0x00])];

        let mut i2c = Mock::new(&expectations);
        let mux = Tca9548a::new(i2c.clone(), DEFAULT_MUX_ADDRESS).unwrap();
        assert_eq!(mux.current_channel(), None);
        assert_eq!(mux.address(), DEFAULT_MUX_ADDRESS);

        i2c.done();
    }

    #[test]
    fn select_channel_writes_one_hot_mask() {
        let expectations = [
            Transaction::write(0x74, std::vec![0x00]),
            Transaction::write(0x74, std::vec![0x01]),
            Transaction::write(0x74, std::vec![0x08]),
            Transaction::write(0x74, std::vec![0x80]),
            Transaction::write(0x74, std::vec![0x00]),
        ];

        let mut i2c = Mock::new(&expectations);
        let mut mux = Tca9548a::new(i2c.clone(), 0x74).unwrap();

        mux.select_channel(0).unwrap();
        assert_eq!(mux.current_channel(), Some(0));
        mux.select_channel(3).unwrap();
        assert_eq!(mux.current_channel(), Some(3));
        mux.select_channel(7).unwrap();
        assert_eq!(mux.current_channel(), Some(7));
        mux.disable_all().unwrap();
        assert_eq!(mux.current_channel(), None);

        i2c.done();
    }

    #[test]
    fn out_of_range_channel_is_rejected_without_bus_traffic() {
        let expectations = [
            Transaction::write(DEFAULT_MUX_ADDRESS, std::vec![0x00]),
            Transaction::write(DEFAULT_MUX_ADDRESS, std::vec![0x04]),
        ];

        let mut i2c = Mock::new(&expectations);
        let mut mux = Tca9548a::new(i2c.clone(), DEFAULT_MUX_ADDRESS).unwrap();

        mux.select_channel(2).unwrap();
        assert_eq!(mux.select_channel(8), Err(Error::InvalidParameter));
        assert_eq!(mux.select_channel(u8::MAX), Err(Error::InvalidParameter));
        assert_eq!(mux.current_channel(), Some(2));

        i2c.done();
    }

    #[test]
    fn failed_select_forgets_the_channel() {
        let expectations = [
            Transaction::write(DEFAULT_MUX_ADDRESS, std::vec![0x00]),
            Transaction::write(DEFAULT_MUX_ADDRESS, std::vec![0x02]),
            Transaction::write(DEFAULT_MUX_ADDRESS, std::vec![0x20])
                .with_error(ErrorKind::Other),
        ];

        let mut i2c = Mock::new(&expectations);
        let mut mux = Tca9548a::new(i2c.clone(), DEFAULT_MUX_ADDRESS).unwrap();

        mux.select_channel(1).unwrap();
        assert_eq!(mux.select_channel(5), Err(Error::Bus(ErrorKind::Other)));
        assert_eq!(mux.current_channel(), None);

        i2c.done();
    }

    #[test]
    fn release_hands_back_the_bus_without_traffic() {
        let expectations = [Transaction::write(DEFAULT_MUX_ADDRESS, std::vec![0x00])];

        let i2c = Mock::new(&expectations);
        let mux = Tca9548a::new(i2c, DEFAULT_MUX_ADDRESS).unwrap();

        let mut i2c = mux.release();
        i2c.done();
    }
}
