use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

use serde::{Deserialize, Serialize};

/// Element type of a [`Tensor`](crate::Tensor). Feature matrices, labels and
/// probabilities are all `f64`; `f32` is accepted for compact storage.
pub trait Float:
    Copy
    + PartialOrd
    + fmt::Debug
    + fmt::Display
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Serialize
    + for<'de> Deserialize<'de>
    + 'static
{
    const ZERO: Self;

    /// Sample counts used as divisors in reductions.
    fn from_usize(n: usize) -> Self;
    fn sqrt(self) -> Self;
}

macro_rules! impl_float {
    ($($t:ty),*) => {$(
        impl Float for $t {
            const ZERO: Self = 0.0;

            fn from_usize(n: usize) -> Self {
                n as $t
            }

            fn sqrt(self) -> Self {
                <$t>::sqrt(self)
            }
        }
    )*};
}

impl_float!(f32, f64);
