//! Flexible binary serialization/deserialization built around a
//! `Read + Seek`/`Write + Seek` cursor, mirroring how the container format's
//! own tables are length-prefixed and position-addressed.

#[doc(hidden)]
pub mod macros;

mod deserializer;
mod serializer;

pub use deserializer::*;
pub use serializer::*;

use std::io::{Read, Write};
use std::num::{
    NonZeroI16, NonZeroI32, NonZeroI64, NonZeroI8, NonZeroU16, NonZeroU32, NonZeroU64, NonZeroU8,
};

use anyhow::{anyhow, Context};
use uuid::Uuid;

pub trait Deserialize: Sized {
    fn deserialize(deserializer: &mut Deserializer<impl Read>) -> anyhow::Result<Self>;
}

pub trait Serialize: Sized {
    fn serialize(&self, serializer: &mut Serializer<impl Write>) -> anyhow::Result<()>;
}

impl Deserialize for () {
    fn deserialize(_: &mut Deserializer<impl Read>) -> anyhow::Result<Self> {
        Ok(())
    }
}

impl Serialize for () {
    fn serialize(&self, _: &mut Serializer<impl Write>) -> anyhow::Result<()> {
        Ok(())
    }
}

macro_rules! primitive_le {
    ($T:ty) => {
        impl Deserialize for $T {
            fn deserialize(deserializer: &mut Deserializer<impl Read>) -> anyhow::Result<Self> {
                let mut buf = [0; std::mem::size_of::<$T>()];
                deserializer.read_bytes(&mut buf)?;
                Ok(<$T>::from_le_bytes(buf))
            }
        }

        impl Serialize for $T {
            fn serialize(&self, serializer: &mut Serializer<impl Write>) -> anyhow::Result<()> {
                serializer.write_bytes(&self.to_le_bytes())
            }
        }
    };
}

primitive_le!(u8);
primitive_le!(u16);
primitive_le!(u32);
primitive_le!(u64);
primitive_le!(i8);
primitive_le!(i16);
primitive_le!(i32);
primitive_le!(i64);
primitive_le!(f32);
primitive_le!(f64);

macro_rules! nonzero_le {
    ($Underlying:ty, $NonZero:ty) => {
        impl Deserialize for $NonZero {
            fn deserialize(deserializer: &mut Deserializer<impl Read>) -> anyhow::Result<Self> {
                let num = deserializer.deserialize::<$Underlying>()?;
                <$NonZero>::new(num).ok_or_else(|| anyhow!("non-zero value expected but got zero"))
            }
        }

        impl Serialize for $NonZero {
            fn serialize(&self, serializer: &mut Serializer<impl Write>) -> anyhow::Result<()> {
                self.get().serialize(serializer)
            }
        }
    };
}

nonzero_le!(u8, NonZeroU8);
nonzero_le!(u16, NonZeroU16);
nonzero_le!(u32, NonZeroU32);
nonzero_le!(u64, NonZeroU64);
nonzero_le!(i8, NonZeroI8);
nonzero_le!(i16, NonZeroI16);
nonzero_le!(i32, NonZeroI32);
nonzero_le!(i64, NonZeroI64);

impl<T> Deserialize for Vec<T>
where
    T: Deserialize,
{
    fn deserialize(deserializer: &mut Deserializer<impl Read>) -> anyhow::Result<Self> {
        let len = deserializer
            .deserialize::<u32>()
            .context("cannot read array length")? as usize;
        let mut vec = Vec::with_capacity(len);
        for i in 0..len {
            vec.push(deserializer.deserialize().with_context(|| {
                format!("cannot deserialize array element {i} (array of length {len})")
            })?);
        }
        Ok(vec)
    }
}

impl<T> Serialize for Vec<T>
where
    T: Serialize,
{
    fn serialize(&self, serializer: &mut Serializer<impl Write>) -> anyhow::Result<()> {
        (self.len() as u32)
            .serialize(serializer)
            .context("cannot serialize array length")?;
        for (i, element) in self.iter().enumerate() {
            element
                .serialize(serializer)
                .with_context(|| format!("cannot serialize array element {i}"))?;
        }
        Ok(())
    }
}

impl Deserialize for Uuid {
    fn deserialize(deserializer: &mut Deserializer<impl Read>) -> anyhow::Result<Self> {
        let mut buf = [0; 16];
        deserializer.read_bytes(&mut buf)?;
        Ok(Uuid::from_bytes_le(buf))
    }
}

impl Serialize for Uuid {
    fn serialize(&self, serializer: &mut Serializer<impl Write>) -> anyhow::Result<()> {
        serializer.write_bytes(&self.to_bytes_le())
    }
}

impl<R> Deserializer<R> {
    pub fn deserialize<T>(&mut self) -> anyhow::Result<T>
    where
        R: Read,
        T: Deserialize,
    {
        T::deserialize(self)
    }
}

impl<W> Serializer<W> {
    pub fn serialize<T>(&mut self, value: &T) -> anyhow::Result<()>
    where
        W: Write,
        T: Serialize,
    {
        value.serialize(self)
    }
}

pub fn deserialize<T>(buffer: &[u8]) -> anyhow::Result<T>
where
    T: Deserialize,
{
    T::deserialize(&mut Deserializer::from_buffer(buffer))
}

pub fn serialize<T>(value: &T) -> anyhow::Result<Vec<u8>>
where
    T: Serialize,
{
    let mut buffer = Vec::new();
    value.serialize(&mut Serializer::from_write(&mut buffer))?;
    Ok(buffer)
}
