use crate::{
    reg::{Register, PAGE_SELECT, SPAD_MODE, SPAD_STROBE},
    VcselPeriodType,
};

/// An ordered list of single-register writes, applied front to back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RegisterProgram(&'static [(u8, u8)]);

impl RegisterProgram {
    pub(crate) const fn new(writes: &'static [(u8, u8)]) -> Self {
        Self(writes)
    }

    pub(crate) fn writes(self) -> impl Iterator<Item = (u8, u8)> {
        self.0.iter().copied()
    }

    #[cfg(test)]
    pub(crate) const fn len(self) -> usize {
        self.0.len()
    }
}

/// "Set I2C standard mode" and open the internal page holding the stop variable.
pub(crate) const I2C_STANDARD_MODE: RegisterProgram = RegisterProgram::new(&[
    (0x88, 0x00),
    (0x80, 0x01),
    (PAGE_SELECT, 0x01),
    (0x00, 0x00),
]);

/// Open the internal page holding the stop variable.
pub(crate) const INTERNAL_PAGE_ENTER: RegisterProgram =
    RegisterProgram::new(&[(0x80, 0x01), (PAGE_SELECT, 0x01), (0x00, 0x00)]);

/// Close the internal page again. Also ends `I2C_STANDARD_MODE`.
pub(crate) const INTERNAL_PAGE_EXIT: RegisterProgram =
    RegisterProgram::new(&[(0x00, 0x01), (PAGE_SELECT, 0x00), (0x80, 0x00)]);

pub(crate) const SPAD_INFO_ENTER: RegisterProgram = RegisterProgram::new(&[
    (0x80, 0x01),
    (PAGE_SELECT, 0x01),
    (0x00, 0x00),
    (PAGE_SELECT, 0x06),
]);

pub(crate) const SPAD_INFO_TRIGGER: RegisterProgram = RegisterProgram::new(&[
    (PAGE_SELECT, 0x07),
    (SPAD_MODE, 0x01),
    (0x80, 0x01),
    (0x94, 0x6B),
    (SPAD_STROBE, 0x00),
]);

pub(crate) const SPAD_INFO_EXIT: RegisterProgram = RegisterProgram::new(&[
    (PAGE_SELECT, 0x01),
    (0x00, 0x01),
    (PAGE_SELECT, 0x00),
    (0x80, 0x00),
]);

/// Reference SPAD selection, assuming the NVM values are valid.
pub(crate) const REF_SPAD_CONFIG: RegisterProgram = RegisterProgram::new(&[
    (PAGE_SELECT, 0x01),
    (Register::DynamicSpadRefEnStartOffset as u8, 0x00),
    (Register::DynamicSpadNumRequestedRefSpad as u8, 0x2C),
    (PAGE_SELECT, 0x00),
    (Register::GlobalConfigRefEnStartSelect as u8, 0xB4),
]);

/// DefaultTuningSettings from the vendor API (vl53l0x_tuning.h).
#[rustfmt::skip]
pub(crate) const DEFAULT_TUNING: RegisterProgram = RegisterProgram::new(&[
    (0xFF, 0x01), (0x00, 0x00),
    (0xFF, 0x00), (0x09, 0x00), (0x10, 0x00), (0x11, 0x00),
    (0x24, 0x01), (0x25, 0xFF), (0x75, 0x00),
    (0xFF, 0x01), (0x4E, 0x2C), (0x48, 0x00), (0x30, 0x20),
    (0xFF, 0x00), (0x30, 0x09), (0x54, 0x00), (0x31, 0x04), (0x32, 0x03), (0x40, 0x83),
    (0x46, 0x25), (0x60, 0x00), (0x27, 0x00), (0x50, 0x06), (0x51, 0x00), (0x52, 0x96),
    (0x56, 0x08), (0x57, 0x30), (0x61, 0x00), (0x62, 0x00), (0x64, 0x00), (0x65, 0x00),
    (0x66, 0xA0),
    (0xFF, 0x01), (0x22, 0x32), (0x47, 0x14), (0x49, 0xFF), (0x4A, 0x00),
    (0xFF, 0x00), (0x7A, 0x0A), (0x7B, 0x00), (0x78, 0x21),
    (0xFF, 0x01), (0x23, 0x34), (0x42, 0x00), (0x44, 0xFF), (0x45, 0x26), (0x46, 0x05),
    (0x40, 0x40), (0x0E, 0x06), (0x20, 0x1A), (0x43, 0x40),
    (0xFF, 0x00), (0x34, 0x03), (0x35, 0x44),
    (0xFF, 0x01), (0x31, 0x04), (0x4B, 0x09), (0x4C, 0x05), (0x4D, 0x04),
    (0xFF, 0x00), (0x44, 0x00), (0x45, 0x20), (0x47, 0x08), (0x48, 0x28), (0x67, 0x00),
    (0x70, 0x04), (0x71, 0x01), (0x72, 0xFE), (0x76, 0x00), (0x77, 0x00),
    (0xFF, 0x01), (0x0D, 0x01),
    (0xFF, 0x00), (0x80, 0x01), (0x01, 0xF8),
    (0xFF, 0x01), (0x8E, 0x01), (0x00, 0x01), (0xFF, 0x00), (0x80, 0x00),
]);

const PRE_PHASE_HIGH: u8 = Register::PreRangeConfigValidPhaseHigh as u8;
const PRE_PHASE_LOW: u8 = Register::PreRangeConfigValidPhaseLow as u8;

const FINAL_PHASE_HIGH: u8 = Register::FinalRangeConfigValidPhaseHigh as u8;
const FINAL_PHASE_LOW: u8 = Register::FinalRangeConfigValidPhaseLow as u8;
const VCSEL_WIDTH: u8 = Register::GlobalConfigVcselWidth as u8;
const PHASECAL_TIMEOUT: u8 = Register::AlgoPhasecalConfigTimeout as u8;
// Same address as the phasecal timeout, one page up.
const PHASECAL_LIMIT: u8 = 0x30;

macro_rules! pre_range_phase {
    ($high:literal) => {
        RegisterProgram::new(&[(PRE_PHASE_HIGH, $high), (PRE_PHASE_LOW, 0x08)])
    };
}

macro_rules! final_range_phase {
    ($high:literal, $width:literal, $timeout:literal, $limit:literal) => {
        RegisterProgram::new(&[
            (FINAL_PHASE_HIGH, $high),
            (FINAL_PHASE_LOW, 0x08),
            (VCSEL_WIDTH, $width),
            (PHASECAL_TIMEOUT, $timeout),
            (PAGE_SELECT, 0x01),
            (PHASECAL_LIMIT, $limit),
            (PAGE_SELECT, 0x00),
        ])
    };
}

/// Phase check limits and calibration settings for a VCSEL period.
///
/// Returns `None` if `period_pclks` is not a legal period for `period_type`,
/// which doubles as the validation of the requested period.
pub(crate) fn phase_program(
    period_type: VcselPeriodType,
    period_pclks: u8,
) -> Option<RegisterProgram> {
    match (period_type, period_pclks) {
        (VcselPeriodType::PreRange, 12) => Some(pre_range_phase!(0x18)),
        (VcselPeriodType::PreRange, 14) => Some(pre_range_phase!(0x30)),
        (VcselPeriodType::PreRange, 16) => Some(pre_range_phase!(0x40)),
        (VcselPeriodType::PreRange, 18) => Some(pre_range_phase!(0x50)),

        (VcselPeriodType::FinalRange, 8) => Some(final_range_phase!(0x10, 0x02, 0x0C, 0x30)),
        (VcselPeriodType::FinalRange, 10) => Some(final_range_phase!(0x28, 0x03, 0x09, 0x20)),
        (VcselPeriodType::FinalRange, 12) => Some(final_range_phase!(0x38, 0x03, 0x08, 0x20)),
        (VcselPeriodType::FinalRange, 14) => Some(final_range_phase!(0x48, 0x03, 0x07, 0x20)),

        _ => None,
    }
}
