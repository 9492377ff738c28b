/// Trait for primitive values which can be encoded to and decoded from big-endian bytes.
pub trait Primitive: Copy {
    /// Reads a value from the start of `bytes`.
    ///
    /// # Panics
    /// Panics if `bytes` is shorter than the encoded size of the value.
    fn read_be_bytes(bytes: &[u8]) -> Self;

    /// Writes this value to the start of `bytes`.
    ///
    /// # Panics
    /// Panics if `bytes` is shorter than the encoded size of the value.
    fn write_be_bytes(self, bytes: &mut [u8]);
}

macro_rules! primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Primitive for $ty {
                #[inline(always)]
                fn read_be_bytes(bytes: &[u8]) -> Self {
                    Self::from_be_bytes(bytes[..size_of::<Self>()].try_into().unwrap())
                }

                #[inline(always)]
                fn write_be_bytes(self, bytes: &mut [u8]) {
                    bytes[..size_of::<Self>()].copy_from_slice(&self.to_be_bytes());
                }
            }
        )*
    };
}

primitive! {
    u8, u16, u32, u64,
    i8, i16, i32, i64,
}

// floats are carried as their bit pattern, exactly
impl Primitive for f32 {
    #[inline(always)]
    fn read_be_bytes(bytes: &[u8]) -> Self {
        f32::from_bits(u32::read_be_bytes(bytes))
    }

    #[inline(always)]
    fn write_be_bytes(self, bytes: &mut [u8]) {
        self.to_bits().write_be_bytes(bytes);
    }
}

impl Primitive for f64 {
    #[inline(always)]
    fn read_be_bytes(bytes: &[u8]) -> Self {
        f64::from_bits(u64::read_be_bytes(bytes))
    }

    #[inline(always)]
    fn write_be_bytes(self, bytes: &mut [u8]) {
        self.to_bits().write_be_bytes(bytes);
    }
}
