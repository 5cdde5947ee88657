//! BMP280 calibration data and the floating-point compensation formulas.
//!
//! Temperature has to be compensated before pressure: the pressure formula
//! consumes the [`TFine`] value produced by the temperature formula for the
//! same raw sample. The two steps are plain functions so that dependency is
//! carried in the signatures rather than in shared state.

/// Length of the calibration block starting at register `0x88`.
pub const CALIBRATION_LEN: usize = 24;

/// Length of the pressure + temperature burst starting at register `0xF7`.
pub const RAW_SAMPLE_LEN: usize = 6;

/// Factory calibration constants of one BMP280.
///
/// Binary format (little-endian, 12 × 16-bit words):
/// - `dig_T1` (u16), `dig_T2` (i16), `dig_T3` (i16)
/// - `dig_P1` (u16), `dig_P2`..`dig_P9` (i16)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationSet {
    pub dig_t1: u16,
    pub dig_t2: i16,
    pub dig_t3: i16,
    pub dig_p1: u16,
    pub dig_p2: i16,
    pub dig_p3: i16,
    pub dig_p4: i16,
    pub dig_p5: i16,
    pub dig_p6: i16,
    pub dig_p7: i16,
    pub dig_p8: i16,
    pub dig_p9: i16,
}

impl CalibrationSet {
    /// Decodes the raw calibration block read from the device.
    pub fn from_bytes(bytes: &[u8; CALIBRATION_LEN]) -> Self {
        let word = |i: usize| u16::from_le_bytes([bytes[2 * i], bytes[2 * i + 1]]);
        let signed = |i: usize| sign_extend_16(word(i));

        Self {
            dig_t1: word(0),
            dig_t2: signed(1),
            dig_t3: signed(2),
            dig_p1: word(3),
            dig_p2: signed(4),
            dig_p3: signed(5),
            dig_p4: signed(6),
            dig_p5: signed(7),
            dig_p6: signed(8),
            dig_p7: signed(9),
            dig_p8: signed(10),
            dig_p9: signed(11),
        }
    }
}

/// Two's-complement reinterpretation of a raw 16-bit calibration word.
///
/// Values below `0x8000` are returned unchanged, everything else becomes
/// `value - 65536`.
pub const fn sign_extend_16(raw: u16) -> i16 {
    raw as i16
}

/// One burst read of the ADC registers, 20 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawBarometricSample {
    pub raw_pressure: u32,
    pub raw_temperature: u32,
}

impl RawBarometricSample {
    /// Unpacks `press_msb, press_lsb, press_xlsb, temp_msb, temp_lsb, temp_xlsb`.
    ///
    /// Only the high nibble of each `xlsb` byte carries data.
    pub fn from_bytes(bytes: &[u8; RAW_SAMPLE_LEN]) -> Self {
        let unpack = |msb: u8, lsb: u8, xlsb: u8| {
            ((msb as u32) << 12) | ((lsb as u32) << 4) | ((xlsb as u32) >> 4)
        };

        Self {
            raw_pressure: unpack(bytes[0], bytes[1], bytes[2]),
            raw_temperature: unpack(bytes[3], bytes[4], bytes[5]),
        }
    }
}

/// Fine temperature carried from temperature into pressure compensation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TFine(pub i32);

/// Returns the temperature in °C and the `t_fine` needed by
/// [`compensate_pressure`] for the same sample.
pub fn compensate_temperature(raw_temperature: u32, calib: &CalibrationSet) -> (f64, TFine) {
    let raw = raw_temperature as f64;
    let t1 = calib.dig_t1 as f64;

    let var1 = (raw / 16384.0 - t1 / 1024.0) * calib.dig_t2 as f64;
    let delta = raw / 131072.0 - t1 / 8192.0;
    let var2 = delta * delta * calib.dig_t3 as f64;

    let fine = var1 + var2;
    (fine / 5120.0, TFine(fine as i32))
}

/// Returns the pressure in Pa.
///
/// `0.0` means the intermediate denominator vanished and the pressure could
/// not be determined; it is never a real reading.
pub fn compensate_pressure(raw_pressure: u32, t_fine: TFine, calib: &CalibrationSet) -> f64 {
    let mut var1 = t_fine.0 as f64 / 2.0 - 64000.0;
    let mut var2 = var1 * var1 * calib.dig_p6 as f64 / 32768.0;
    var2 += var1 * calib.dig_p5 as f64 * 2.0;
    var2 = var2 / 4.0 + calib.dig_p4 as f64 * 65536.0;
    var1 = (calib.dig_p3 as f64 * var1 * var1 / 524288.0 + calib.dig_p2 as f64 * var1) / 524288.0;
    var1 = (1.0 + var1 / 32768.0) * calib.dig_p1 as f64;

    if var1 == 0.0 {
        return 0.0;
    }

    let mut pressure = 1048576.0 - raw_pressure as f64;
    pressure = (pressure - var2 / 4096.0) * 6250.0 / var1;
    var1 = calib.dig_p9 as f64 * pressure * pressure / 2147483648.0;
    var2 = pressure * calib.dig_p8 as f64 / 32768.0;

    pressure + (var1 + var2 + calib.dig_p7 as f64) / 16.0
}

/// Rounds to two decimal places, the resolution every reading is reported at.
pub fn round2(value: f64) -> f64 {
    round_half_away(value * 100.0) / 100.0
}

// `f64::round` is not available in `core`.
fn round_half_away(value: f64) -> f64 {
    let truncated = value as i64 as f64;
    let frac = value - truncated;
    if frac >= 0.5 {
        truncated + 1.0
    } else if frac <= -0.5 {
        truncated - 1.0
    } else {
        truncated
    }
}
