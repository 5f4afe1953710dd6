//! String and number helpers.

/// True when `s` is blank or the literal `null` (any case).
pub fn is_empty_or_null(s: &str) -> bool {
    s.trim().is_empty() || s.eq_ignore_ascii_case("null")
}

pub fn is_not_empty_or_null(s: &str) -> bool {
    !is_empty_or_null(s)
}

/// Parse a base-10 integer, returning 0 on failure.
pub fn atoi(s: &str) -> i64 {
    s.parse().unwrap_or(0)
}

/// Numbers [`itoa`] accepts.
pub trait Itoa {
    fn itoa(self) -> String;
}

macro_rules! impl_itoa_int {
    ($($t:ty),*) => {
        $(impl Itoa for $t {
            fn itoa(self) -> String {
                self.to_string()
            }
        })*
    };
}

impl_itoa_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

macro_rules! impl_itoa_float {
    ($($t:ty),*) => {
        $(impl Itoa for $t {
            // Truncates toward zero; NaN is 0 and infinities saturate.
            fn itoa(self) -> String {
                (self as i64).to_string()
            }
        })*
    };
}

impl_itoa_float!(f32, f64);

/// Format a number in base 10. Floats lose their fractional part.
pub fn itoa<N: Itoa>(n: N) -> String {
    n.itoa()
}
