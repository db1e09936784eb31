use std::ffi::{CString, NulError};
use std::fmt::{self, Debug, Display};
use std::io::{Read, Write};
use std::ops::Deref;

use anyhow::Context;

use crate::binary::{Deserialize, Deserializer, Serialize, Serializer};

/// A length-prefixed, NUL-terminated string, as used for the container's
/// name table entries and a handful of header fields.
#[derive(Clone, PartialEq, Eq, Default, Hash)]
pub struct ContainerString {
    bytes: Vec<u8>,
}

impl ContainerString {
    /// The string's bytes, without the trailing NUL.
    pub fn to_bytes(&self) -> &[u8] {
        self.bytes.strip_suffix(&[b'\0']).unwrap_or(&self.bytes)
    }
}

impl TryFrom<&str> for ContainerString {
    type Error = NulError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let cstring = CString::new(value)?;
        Ok(Self::from(cstring))
    }
}

impl From<CString> for ContainerString {
    fn from(value: CString) -> Self {
        let mut bytes = value.into_bytes();
        bytes.push(b'\0');
        Self { bytes }
    }
}

impl Deref for ContainerString {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.to_bytes()
    }
}

impl Debug for ContainerString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(self.to_bytes()) {
            Ok(utf8) => Debug::fmt(utf8, f),
            Err(_) => {
                f.write_str("<invalid UTF-8> ")?;
                Debug::fmt(&self.bytes, f)
            }
        }
    }
}

impl Display for ContainerString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(self.to_bytes()) {
            Ok(utf8) => Display::fmt(utf8, f),
            Err(_) => f.write_str("<invalid UTF-8>"),
        }
    }
}

impl Deserialize for ContainerString {
    fn deserialize(deserializer: &mut Deserializer<impl Read>) -> anyhow::Result<Self> {
        let len = deserializer
            .deserialize::<u32>()
            .context("cannot read string length")? as usize;
        let mut bytes = vec![0u8; len];
        deserializer
            .read_bytes(&mut bytes)
            .context("cannot read string bytes")?;
        Ok(Self { bytes })
    }
}

impl Serialize for ContainerString {
    fn serialize(&self, serializer: &mut Serializer<impl Write>) -> anyhow::Result<()> {
        (self.bytes.len() as u32).serialize(serializer)?;
        serializer.write_bytes(&self.bytes)
    }
}
