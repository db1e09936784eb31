use std::fmt;
use std::io::{Read, Write};

use anyhow::{anyhow, Context};

use crate::binary::{Deserialize, Deserializer, Serialize, Serializer};

/// A 32-bit boolean, as the container format encodes them (never a single
/// byte).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Bool32(u32);

impl From<bool> for Bool32 {
    fn from(value: bool) -> Self {
        Self(value as u32)
    }
}

impl From<Bool32> for bool {
    fn from(value: Bool32) -> Self {
        value.0 != 0
    }
}

impl Deserialize for Bool32 {
    fn deserialize(deserializer: &mut Deserializer<impl Read>) -> anyhow::Result<Self> {
        let underlying = deserializer
            .deserialize::<u32>()
            .context("cannot deserialize Bool32")?;
        if underlying > 1 {
            Err(anyhow!("Bool32 has invalid value {underlying} (must be 0 or 1)"))
        } else {
            Ok(Self(underlying))
        }
    }
}

impl Serialize for Bool32 {
    fn serialize(&self, serializer: &mut Serializer<impl Write>) -> anyhow::Result<()> {
        self.0.serialize(serializer)
    }
}

impl fmt::Debug for Bool32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&bool::from(*self), f)
    }
}
