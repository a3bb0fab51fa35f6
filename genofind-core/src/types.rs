use bytemuck::Pod;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position in the concatenated coordinate space of an index
pub type GenomicPos = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strand {
    #[serde(rename = "+")]
    Forward,
    #[serde(rename = "-")]
    Reverse,
}

impl Strand {
    pub fn index(self) -> usize {
        match self {
            Strand::Forward => 0,
            Strand::Reverse => 1,
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Strand::Forward => write!(f, "+"),
            Strand::Reverse => write!(f, "-"),
        }
    }
}

/// Integer width used for stored target offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressWidth {
    #[default]
    Narrow,
    Wide,
}

impl AddressWidth {
    pub fn bits(self) -> u32 {
        match self {
            AddressWidth::Narrow => 32,
            AddressWidth::Wide => 64,
        }
    }

    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            32 => Some(AddressWidth::Narrow),
            64 => Some(AddressWidth::Wide),
            _ => None,
        }
    }

    /// Largest total base count an index of this width can hold
    pub fn max_bases(self) -> u64 {
        match self {
            AddressWidth::Narrow => 1u64 << 32,
            AddressWidth::Wide => u64::MAX,
        }
    }
}

mod private {
    pub trait Sealed {}
    impl Sealed for u16 {}
    impl Sealed for u32 {}
    impl Sealed for u64 {}
}

/// Fixed-width integer stored little-endian in index files
pub trait Word: Pod + Send + Sync + fmt::Debug + private::Sealed {
    fn from_le(self) -> Self;
    fn to_le(self) -> Self;
}

macro_rules! impl_word {
    ($($t:ty),*) => {$(
        impl Word for $t {
            #[inline]
            fn from_le(self) -> Self {
                <$t>::from_le(self)
            }

            #[inline]
            fn to_le(self) -> Self {
                <$t>::to_le(self)
            }
        }
    )*};
}

impl_word!(u16, u32, u64);

/// Stored offset type, `u32` for collections up to 4 Gb and `u64` beyond.
pub trait Offset: Word + Ord + fmt::Display + 'static {
    const WIDTH: AddressWidth;

    /// Callers check capacity first; larger values truncate.
    fn from_u64(value: u64) -> Self;

    fn to_u64(self) -> u64;

    #[inline]
    fn to_usize(self) -> usize {
        self.to_u64() as usize
    }
}

impl Offset for u32 {
    const WIDTH: AddressWidth = AddressWidth::Narrow;

    #[inline]
    fn from_u64(value: u64) -> Self {
        value as u32
    }

    #[inline]
    fn to_u64(self) -> u64 {
        self as u64
    }
}

impl Offset for u64 {
    const WIDTH: AddressWidth = AddressWidth::Wide;

    #[inline]
    fn from_u64(value: u64) -> Self {
        value
    }

    #[inline]
    fn to_u64(self) -> u64 {
        self
    }
}
