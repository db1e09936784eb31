use std::fmt;
use std::io::{Read, Write};

use pkg_core::binary::{Deserialize, Deserializer, Serialize, Serializer};

/// Four unsigned 32-bit words, as the container's GUIDs are encoded.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FGuid(pub [u32; 4]);

impl fmt::Debug for FGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08X}-{:08X}-{:08X}-{:08X}",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

impl Deserialize for FGuid {
    fn deserialize(deserializer: &mut Deserializer<impl Read>) -> anyhow::Result<Self> {
        let mut words = [0u32; 4];
        for word in &mut words {
            *word = deserializer.deserialize::<u32>()?;
        }
        Ok(Self(words))
    }
}

impl Serialize for FGuid {
    fn serialize(&self, serializer: &mut Serializer<impl Write>) -> anyhow::Result<()> {
        for word in self.0 {
            word.serialize(serializer)?;
        }
        Ok(())
    }
}
