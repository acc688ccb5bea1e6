//! 17.14 fixed-point arithmetic.
//!
//! The kernel has no floating point, so the MLFQS formulas run on signed
//! integers carrying [`FRACTION_BITS`] fractional bits. Results must match
//! the reference arithmetic bit for bit, including its silent wraparound on
//! overflow; division by zero panics like integer division.
use core::fmt;
use core::ops::{Add, Div, Mul, Neg, Sub};

/// Number of fractional bits.
pub const FRACTION_BITS: u32 = 14;

const F: i32 = 1 << FRACTION_BITS;

/// A signed real number with 14 fractional bits.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct Fixed(i32);

impl Fixed {
    /// Zero.
    pub const ZERO: Fixed = Fixed(0);
    /// One.
    pub const ONE: Fixed = Fixed(F);

    /// Convert an integer.
    #[inline]
    pub const fn from_int(n: i32) -> Fixed {
        Fixed(n.wrapping_mul(F))
    }

    /// The value of `nom / den`.
    #[inline]
    pub fn from_ratio(nom: i32, den: i32) -> Fixed {
        Fixed::from_int(nom) / Fixed::from_int(den)
    }

    /// Reinterpret a raw 17.14 bit pattern.
    #[inline]
    pub const fn from_raw(raw: i32) -> Fixed {
        Fixed(raw)
    }

    /// The raw 17.14 bit pattern.
    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Convert to an integer, truncating toward zero.
    #[inline]
    pub const fn to_int(self) -> i32 {
        self.0 / F
    }

    /// Convert to the nearest integer. Halves round away from zero.
    #[inline]
    pub const fn to_int_nearest(self) -> i32 {
        if self.0 >= 0 {
            self.0.wrapping_add(F / 2) / F
        } else {
            self.0.wrapping_sub(F / 2) / F
        }
    }

    /// `self + n`.
    #[inline]
    pub const fn add_int(self, n: i32) -> Fixed {
        Fixed(self.0.wrapping_add(n.wrapping_mul(F)))
    }

    /// `self - n`.
    #[inline]
    pub const fn sub_int(self, n: i32) -> Fixed {
        Fixed(self.0.wrapping_sub(n.wrapping_mul(F)))
    }

    /// `self * n`.
    #[inline]
    pub const fn mul_int(self, n: i32) -> Fixed {
        Fixed(self.0.wrapping_mul(n))
    }

    /// `self / n`.
    #[inline]
    pub const fn div_int(self, n: i32) -> Fixed {
        Fixed(self.0.wrapping_div(n))
    }
}

impl Add for Fixed {
    type Output = Fixed;

    fn add(self, rhs: Fixed) -> Fixed {
        Fixed(self.0.wrapping_add(rhs.0))
    }
}

impl Sub for Fixed {
    type Output = Fixed;

    fn sub(self, rhs: Fixed) -> Fixed {
        Fixed(self.0.wrapping_sub(rhs.0))
    }
}

impl Mul for Fixed {
    type Output = Fixed;

    // The product carries 28 fractional bits before rescaling.
    fn mul(self, rhs: Fixed) -> Fixed {
        Fixed(((self.0 as i64 * rhs.0 as i64) / F as i64) as i32)
    }
}

impl Div for Fixed {
    type Output = Fixed;

    fn div(self, rhs: Fixed) -> Fixed {
        Fixed(((self.0 as i64 * F as i64) / rhs.0 as i64) as i32)
    }
}

impl Mul<i32> for Fixed {
    type Output = Fixed;

    fn mul(self, rhs: i32) -> Fixed {
        self.mul_int(rhs)
    }
}

impl Div<i32> for Fixed {
    type Output = Fixed;

    fn div(self, rhs: i32) -> Fixed {
        self.div_int(rhs)
    }
}

impl Neg for Fixed {
    type Output = Fixed;

    fn neg(self) -> Fixed {
        Fixed(self.0.wrapping_neg())
    }
}

impl fmt::Display for Fixed {
    /// Formats with two decimals, truncated.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hundredths = (*self * 100).to_int();
        let sign = if hundredths < 0 { "-" } else { "" };
        let abs = hundredths.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}
