//! A register-file stand-in for a VL53L0X, for tests that run whole flows
//! and check the resulting device state rather than every transaction.

use std::{collections::VecDeque, vec::Vec};

use embedded_hal::{
    delay::DelayNs,
    i2c::{ErrorKind, ErrorType, I2c, Operation},
};

use crate::{reg, DEFAULT_ADDRESS};

/// Pages are not modelled, every register address maps to one byte.
pub(crate) struct FakeSensor {
    address: u8,
    regs: [u8; 256],
    forced: [Option<u8>; 256],
    queued: [VecDeque<u8>; 256],
    read_counts: [u32; 256],
    failing: Option<u8>,
    writes: Vec<(u8, Vec<u8>)>,
    foreign_writes: Vec<(u8, Vec<u8>)>,
}

impl FakeSensor {
    pub(crate) fn new(address: u8) -> Self {
        Self {
            address,
            regs: [0; 256],
            forced: [None; 256],
            queued: core::array::from_fn(|_| VecDeque::new()),
            read_counts: [0; 256],
            failing: None,
            writes: Vec::new(),
            foreign_writes: Vec::new(),
        }
    }

    /// A sensor at the default address that passes identification, reports
    /// six aperture SPADs, and completes every calibration and measurement on
    /// the first poll.
    pub(crate) fn responsive() -> Self {
        let mut this = Self::new(DEFAULT_ADDRESS);
        this.set_reg(0xC0, reg::EXPECTED_MODEL_ID);
        this.set_reg(reg::STOP_VARIABLE, 0x3C);
        this.set_reg(reg::SPAD_INFO, 0x86);
        for register in 0xB0..=0xB5 {
            this.set_reg(register, 0xFF);
        }
        this.force(reg::SPAD_STROBE, 0x01);
        this.force(0x13, 0x07);
        this.force(0x00, 0x00);
        this
    }

    pub(crate) fn set_reg(&mut self, register: u8, value: u8) {
        self.regs[usize::from(register)] = value;
    }

    pub(crate) fn set_u16(&mut self, register: u8, value: u16) {
        let [high, low] = value.to_be_bytes();
        self.set_reg(register, high);
        self.set_reg(register.wrapping_add(1), low);
    }

    /// Reads of `register` return `value` whatever is written to it.
    pub(crate) fn force(&mut self, register: u8, value: u8) {
        self.forced[usize::from(register)] = Some(value);
    }

    /// Reads of `register` return `values` in order before falling back.
    pub(crate) fn queue(&mut self, register: u8, values: &[u8]) {
        self.queued[usize::from(register)].extend(values);
    }

    /// Fail every transfer that starts at `register`.
    pub(crate) fn fail_on(&mut self, register: u8) {
        self.failing = Some(register);
    }

    pub(crate) fn reg(&self, register: u8) -> u8 {
        self.regs[usize::from(register)]
    }

    /// Number of reads that started at `register`.
    pub(crate) fn read_count(&self, register: u8) -> u32 {
        self.read_counts[usize::from(register)]
    }

    pub(crate) fn writes(&self) -> &[(u8, Vec<u8>)] {
        &self.writes
    }

    /// Payloads of the writes that started at `register`, oldest first.
    pub(crate) fn writes_to(&self, register: u8) -> Vec<&[u8]> {
        self.writes
            .iter()
            .filter(|(start, _)| *start == register)
            .map(|(_, data)| data.as_slice())
            .collect()
    }

    /// Frames addressed to anything but the sensor, with the target address.
    pub(crate) fn foreign_writes(&self) -> &[(u8, Vec<u8>)] {
        &self.foreign_writes
    }

    fn read_register(&mut self, register: u8) -> u8 {
        let index = usize::from(register);
        if let Some(value) = self.queued[index].pop_front() {
            return value;
        }
        self.forced[index].unwrap_or(self.regs[index])
    }
}

impl ErrorType for FakeSensor {
    type Error = ErrorKind;
}

impl I2c for FakeSensor {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if address != self.address {
            for operation in operations.iter() {
                if let Operation::Write(data) = operation {
                    self.foreign_writes.push((address, data.to_vec()));
                }
            }
            return Ok(());
        }

        let mut pointer = 0_u8;
        for operation in operations.iter_mut() {
            match operation {
                Operation::Write(data) => {
                    let Some((&register, payload)) = data.split_first() else {
                        continue;
                    };
                    if self.failing == Some(register) {
                        return Err(ErrorKind::Other);
                    }

                    pointer = register;
                    if !payload.is_empty() {
                        self.writes.push((register, payload.to_vec()));
                        for (offset, &value) in payload.iter().enumerate() {
                            #[allow(clippy::cast_possible_truncation)]
                            let target = register.wrapping_add(offset as u8);
                            self.set_reg(target, value);
                        }
                    }
                }
                Operation::Read(buffer) => {
                    self.read_counts[usize::from(pointer)] += 1;
                    for (offset, slot) in buffer.iter_mut().enumerate() {
                        #[allow(clippy::cast_possible_truncation)]
                        let source = pointer.wrapping_add(offset as u8);
                        *slot = self.read_register(source);
                    }
                }
            }
        }

        Ok(())
    }
}

/// Records the delays it is asked for instead of sleeping.
#[derive(Debug, Default)]
pub(crate) struct CountingDelay {
    pub(crate) calls: u32,
    pub(crate) total_ms: u32,
}

impl DelayNs for CountingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.calls += 1;
        self.total_ms += ns / 1_000_000;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.calls += 1;
        self.total_ms += ms;
    }
}
