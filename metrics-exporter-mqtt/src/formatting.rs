//! Canonical textual form for reported values.
//!
//! Integers of any width are written as their exact base-10 digits. Floating-point and decimal values are written in
//! fixed-point notation with exactly two fractional digits, always using `.` as the separator. Floats are rounded from
//! their exact binary value, so `-2.005` (stored as `-2.00499999...`) becomes `-2.00`; exact midpoints round to even,
//! and decimals use the same midpoint rule. A zero result is never signed.
//!
//! Values that aren't numbers, including NaN and the infinities, have no canonical form and yield `None`.
use std::fmt::Write as _;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::snapshot::GaugeValue;

const FRACTION_DIGITS: u32 = 2;

/// Formats values into their canonical text, reusing internal buffers between calls.
pub struct ValueFormatter {
    int_writer: itoa::Buffer,
}

impl ValueFormatter {
    /// Creates a new `ValueFormatter`.
    pub fn new() -> Self {
        Self { int_writer: itoa::Buffer::new() }
    }

    /// Formats a gauge value.
    ///
    /// Returns `None` if the value is not numeric, or is a float that is not finite.
    pub fn format(&mut self, value: &GaugeValue) -> Option<String> {
        match value {
            GaugeValue::I8(v) => Some(self.format_integer(*v)),
            GaugeValue::I16(v) => Some(self.format_integer(*v)),
            GaugeValue::I32(v) => Some(self.format_integer(*v)),
            GaugeValue::I64(v) => Some(self.format_integer(*v)),
            GaugeValue::I128(v) => Some(self.format_integer(*v)),
            GaugeValue::U8(v) => Some(self.format_integer(*v)),
            GaugeValue::U16(v) => Some(self.format_integer(*v)),
            GaugeValue::U32(v) => Some(self.format_integer(*v)),
            GaugeValue::U64(v) => Some(self.format_integer(*v)),
            GaugeValue::U128(v) => Some(self.format_integer(*v)),
            GaugeValue::F32(v) => self.format_float(f64::from(*v)),
            GaugeValue::F64(v) => self.format_float(*v),
            GaugeValue::Decimal(v) => Some(self.format_decimal(*v)),
            GaugeValue::Bool(_) | GaugeValue::Text(_) => None,
        }
    }

    /// Formats an integer as its exact base-10 digits.
    pub fn format_integer<I: itoa::Integer>(&mut self, value: I) -> String {
        self.int_writer.format(value).to_string()
    }

    /// Formats a float with two fractional digits.
    ///
    /// Returns `None` if the value is NaN or infinite.
    pub fn format_float(&mut self, value: f64) -> Option<String> {
        if !value.is_finite() {
            return None;
        }

        let mut out = String::with_capacity(24);
        write!(out, "{:.2}", value).ok()?;

        // Small negative values round to a signed zero.
        if out == "-0.00" {
            out.remove(0);
        }

        Some(out)
    }

    /// Formats a decimal with two fractional digits.
    pub fn format_decimal(&mut self, value: Decimal) -> String {
        let mut rounded =
            value.round_dp_with_strategy(FRACTION_DIGITS, RoundingStrategy::MidpointNearestEven);
        if rounded.is_zero() {
            rounded.set_sign_positive(true);
        }
        rounded.rescale(FRACTION_DIGITS);

        // Rescaling stops short of the target scale when the mantissa would overflow.
        let mut out = rounded.to_string();
        match rounded.scale() {
            0 => out.push_str(".00"),
            1 => out.push('0'),
            _ => {}
        }

        out
    }
}

impl Default for ValueFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Formats a single gauge value.
///
/// See [`ValueFormatter::format`].
pub fn format_value(value: &GaugeValue) -> Option<String> {
    ValueFormatter::new().format(value)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    use super::{format_value, ValueFormatter};
    use crate::snapshot::GaugeValue;

    #[test]
    fn integers() {
        let cases = [
            (GaugeValue::I8(-128), "-128"),
            (GaugeValue::I16(0), "0"),
            (GaugeValue::I32(42), "42"),
            (GaugeValue::I64(i64::MIN), "-9223372036854775808"),
            (GaugeValue::I128(i128::MIN), "-170141183460469231731687303715884105728"),
            (GaugeValue::U8(255), "255"),
            (GaugeValue::U16(65535), "65535"),
            (GaugeValue::U32(1_000_000), "1000000"),
            (GaugeValue::U64(u64::MAX), "18446744073709551615"),
            (GaugeValue::U128(u128::MAX), "340282366920938463463374607431768211455"),
        ];

        for (value, expected) in cases {
            assert_eq!(format_value(&value).as_deref(), Some(expected), "value: {:?}", value);
        }
    }

    #[test]
    fn floats() {
        let cases = [
            (GaugeValue::F64(3.14159), "3.14"),
            (GaugeValue::F64(0.0), "0.00"),
            (GaugeValue::F64(-2.5), "-2.50"),
            (GaugeValue::F64(21.567), "21.57"),
            (GaugeValue::F64(-2.005), "-2.00"),
            (GaugeValue::F64(-0.001), "0.00"),
            (GaugeValue::F64(-0.0), "0.00"),
            (GaugeValue::F64(1e20), "100000000000000000000.00"),
            (GaugeValue::F32(3.14), "3.14"),
            (GaugeValue::F32(-7.0), "-7.00"),
        ];

        for (value, expected) in cases {
            assert_eq!(format_value(&value).as_deref(), Some(expected), "value: {:?}", value);
        }
    }

    #[test]
    fn decimals() {
        let cases = [
            (Decimal::new(314159, 5), "3.14"),
            (Decimal::new(2005, 3), "2.00"),
            (Decimal::new(2015, 3), "2.02"),
            (Decimal::new(-25, 1), "-2.50"),
            (Decimal::new(-1, 3), "0.00"),
            (Decimal::from(42), "42.00"),
        ];

        for (value, expected) in cases {
            assert_eq!(format_value(&GaugeValue::Decimal(value)).as_deref(), Some(expected));
        }
    }

    #[test]
    fn not_formattable() {
        let cases = [
            GaugeValue::Bool(true),
            GaugeValue::Text("12.5".to_string()),
            GaugeValue::F64(f64::NAN),
            GaugeValue::F64(f64::INFINITY),
            GaugeValue::F32(f32::NEG_INFINITY),
        ];

        for value in cases {
            assert_eq!(format_value(&value), None, "value: {:?}", value);
        }
    }

    #[test]
    fn formatter_is_reusable() {
        let mut formatter = ValueFormatter::new();
        assert_eq!(formatter.format_integer(12345u64), "12345");
        assert_eq!(formatter.format_integer(-6i32), "-6");
        assert_eq!(formatter.format_float(1.005).as_deref(), Some("1.00"));
        assert_eq!(formatter.format_integer(7u8), "7");
    }

    proptest! {
        #[test]
        fn property_integers_are_exact(v in any::<i64>(), w in any::<i128>(), u in any::<u128>()) {
            prop_assert_eq!(format_value(&GaugeValue::I64(v)), Some(v.to_string()));
            prop_assert_eq!(format_value(&GaugeValue::I128(w)), Some(w.to_string()));
            prop_assert_eq!(format_value(&GaugeValue::U128(u)), Some(u.to_string()));
        }

        #[test]
        fn property_floats_have_two_fraction_digits(v in -1.0e12f64..1.0e12f64) {
            let formatted = format_value(&GaugeValue::F64(v)).expect("finite floats are formattable");

            let (integral, fraction) = formatted.split_once('.').expect("missing decimal separator");
            prop_assert_eq!(fraction.len(), 2);
            prop_assert!(fraction.bytes().all(|b| b.is_ascii_digit()));
            prop_assert!(integral.trim_start_matches('-').bytes().all(|b| b.is_ascii_digit()));

            let parsed: f64 = formatted.parse().expect("formatted value should parse");
            prop_assert!((parsed - v).abs() <= 0.005 + v.abs() * f64::EPSILON);
        }
    }
}
