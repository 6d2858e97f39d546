//! Fixed-point decimal temperatures.
//!
//! The w1 driver reports millidegrees Celsius as an integer, so a temperature
//! is stored as an `i64` count of thousandths of a degree. All arithmetic
//! (Celsius to Fahrenheit, rounding for display) is done on that integer, which
//! keeps values such as `18.125` exact from the sensor file through to the
//! database and back.

use std::{fmt, str::FromStr};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use super::error::ThermoError;

/// Number of fractional decimal digits carried by a [`Temperature`].
pub const SCALE: u32 = 3;

const MILLIS_PER_DEGREE: i64 = 1000;

/// A temperature with exactly three fractional decimal digits.
///
/// The unit is implied by where the value comes from: thermometers return
/// Celsius from [`read_celsius`](crate::core::thermometer::Thermometer::read_celsius)
/// and Fahrenheit from
/// [`read_fahrenheit`](crate::core::thermometer::Thermometer::read_fahrenheit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Temperature {
    millis: i64,
}

impl Temperature {
    pub const ZERO: Temperature = Temperature { millis: 0 };
    pub const MIN: Temperature = Temperature { millis: i64::MIN };
    pub const MAX: Temperature = Temperature { millis: i64::MAX };

    /// Builds a temperature from thousandths of a degree.
    pub const fn from_millis(millis: i64) -> Self {
        Temperature { millis }
    }

    /// Builds a temperature from whole degrees.
    pub const fn from_degrees(degrees: i64) -> Self {
        Temperature {
            millis: degrees * MILLIS_PER_DEGREE,
        }
    }

    /// Thousandths of a degree.
    pub const fn millis(&self) -> i64 {
        self.millis
    }

    /// Converts a Celsius value to Fahrenheit, `F = C * 9/5 + 32`, rounded to
    /// three fractional digits half away from zero.
    ///
    /// Saturates at the bounds of the representation; see
    /// [`checked_celsius_to_fahrenheit`](Self::checked_celsius_to_fahrenheit).
    pub fn celsius_to_fahrenheit(self) -> Temperature {
        self.checked_celsius_to_fahrenheit().unwrap_or(if self.millis < 0 {
            Temperature::MIN
        } else {
            Temperature::MAX
        })
    }

    /// Celsius to Fahrenheit, `None` if the result does not fit.
    pub fn checked_celsius_to_fahrenheit(self) -> Option<Temperature> {
        let scaled = div_round_half_away(self.millis.checked_mul(9)?, 5);
        scaled
            .checked_add(32 * MILLIS_PER_DEGREE)
            .map(Temperature::from_millis)
    }

    /// Renders the value with `places` fractional digits (at most three),
    /// rounding half away from zero.
    pub fn round_to(&self, places: u32) -> String {
        let places = places.min(SCALE);
        let divisor = 10_i64.pow(SCALE - places);
        let rounded = div_round_half_away(self.millis, divisor);
        format_fixed(rounded, places)
    }
}

/// Integer division rounding half away from zero. `divisor` must be positive.
fn div_round_half_away(value: i64, divisor: i64) -> i64 {
    let quotient = value / divisor;
    let remainder = value % divisor;
    if remainder.abs() * 2 >= divisor {
        quotient + value.signum()
    } else {
        quotient
    }
}

/// Formats `units` (an integer scaled by `10^places`) as a decimal string.
fn format_fixed(units: i64, places: u32) -> String {
    let sign = if units < 0 { "-" } else { "" };
    let abs = units.unsigned_abs();
    if places == 0 {
        return format!("{}{}", sign, abs);
    }
    let scale = 10_u64.pow(places);
    format!(
        "{}{}.{:0width$}",
        sign,
        abs / scale,
        abs % scale,
        width = places as usize
    )
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_fixed(self.millis, SCALE))
    }
}

impl FromStr for Temperature {
    type Err = ThermoError;

    /// Parses decimal text such as `68`, `68.0`, `-0.5` or `19.562`.
    ///
    /// More than three fractional digits are rejected rather than rounded.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ThermoError::InvalidTemperature {
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = s.trim();
        let (negative, body) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            Some(_) => (false, trimmed),
            None => return Err(invalid("empty value")),
        };

        let (whole, frac) = body.split_once('.').unwrap_or((body, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid("no digits"));
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("not a decimal number"));
        }
        if frac.len() > SCALE as usize {
            return Err(invalid("more than 3 fractional digits"));
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("out of range"))?
        };
        let mut frac_millis: i64 = if frac.is_empty() {
            0
        } else {
            frac.parse().map_err(|_| invalid("out of range"))?
        };
        frac_millis *= 10_i64.pow(SCALE - frac.len() as u32);

        let millis = whole
            .checked_mul(MILLIS_PER_DEGREE)
            .and_then(|m| m.checked_add(frac_millis))
            .ok_or_else(|| invalid("out of range"))?;

        Ok(Temperature {
            millis: if negative { -millis } else { millis },
        })
    }
}

impl TryFrom<String> for Temperature {
    type Error = ThermoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Temperature> for String {
    fn from(value: Temperature) -> Self {
        value.to_string()
    }
}

// Bound as decimal text, but a DECIMAL column has NUMERIC affinity: SQLite
// stores `18.125` as REAL and `22.000` as INTEGER, so a raw `SELECT` shows a
// number, not the text written. Reading back through `FromSql` re-quantizes to
// millidegrees, which is exact for anything a DS18B20 can report.
impl ToSql for Temperature {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for Temperature {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Text(_) => value
                .as_str()?
                .parse()
                .map_err(|e: ThermoError| FromSqlError::Other(Box::new(e))),
            ValueRef::Integer(degrees) => degrees
                .checked_mul(MILLIS_PER_DEGREE)
                .map(Temperature::from_millis)
                .ok_or(FromSqlError::OutOfRange(degrees)),
            ValueRef::Real(degrees) => {
                let millis = (degrees * MILLIS_PER_DEGREE as f64).round();
                if millis.is_finite() && millis.abs() < i64::MAX as f64 {
                    Ok(Temperature::from_millis(millis as i64))
                } else {
                    Err(FromSqlError::InvalidType)
                }
            }
            _ => Err(FromSqlError::InvalidType),
        }
    }
}
