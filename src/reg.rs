/// Named VL53L0X registers on the default register page.
///
/// Registers only ever touched through the fixed vendor programs are left as
/// raw addresses in `program.rs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum Register {
    SysrangeStart = 0x00,
    SystemSequenceConfig = 0x01,
    SystemInterruptConfigGpio = 0x0A,
    SystemInterruptClear = 0x0B,
    ResultInterruptStatus = 0x13,
    ResultRangeStatus = 0x14,

    // Shared with ALGO_PHASECAL_LIM on register page 1.
    AlgoPhasecalConfigTimeout = 0x30,
    GlobalConfigVcselWidth = 0x32,
    FinalRangeConfigMinCountRateRtnLimit = 0x44,
    MsrcConfigTimeoutMacrop = 0x46,
    FinalRangeConfigValidPhaseLow = 0x47,
    FinalRangeConfigValidPhaseHigh = 0x48,
    DynamicSpadNumRequestedRefSpad = 0x4E,
    DynamicSpadRefEnStartOffset = 0x4F,
    PreRangeConfigVcselPeriod = 0x50,
    PreRangeConfigTimeoutMacropHi = 0x51,
    PreRangeConfigValidPhaseLow = 0x56,
    PreRangeConfigValidPhaseHigh = 0x57,
    MsrcConfigControl = 0x60,
    FinalRangeConfigVcselPeriod = 0x70,
    FinalRangeConfigTimeoutMacropHi = 0x71,
    GpioHvMuxActiveHigh = 0x84,
    VhvConfigPadSclSdaExtsupHv = 0x89,
    I2cSlaveDeviceAddress = 0x8A,
    GlobalConfigSpadEnablesRef0 = 0xB0,
    GlobalConfigRefEnStartSelect = 0xB6,
    IdentificationModelId = 0xC0,
    IdentificationRevisionId = 0xC2,
}

/// Offset of the 16-bit range in millimeters from `ResultRangeStatus`.
pub(crate) const RANGE_MM_OFFSET: u8 = 10;

/// Value of `IdentificationModelId` on every VL53L0X.
pub(crate) const EXPECTED_MODEL_ID: u8 = 0xEE;

/// Page-select register used by the vendor programs.
pub(crate) const PAGE_SELECT: u8 = 0xFF;

/// Internal register holding the byte restored before every measurement.
pub(crate) const STOP_VARIABLE: u8 = 0x91;

/// Internal SPAD readout registers.
pub(crate) const SPAD_STROBE: u8 = 0x83;
pub(crate) const SPAD_INFO: u8 = 0x92;
pub(crate) const SPAD_MODE: u8 = 0x81;
