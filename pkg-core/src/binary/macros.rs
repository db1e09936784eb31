/// Implements `Deserialize`/`Serialize` for a `bitflags!`-generated type by
/// round-tripping through its underlying integer, keeping unknown bits
/// instead of rejecting them (carried through verbatim, per spec).
#[macro_export]
macro_rules! serializable_bitflags {
    ($T:ty, $Underlying:ty) => {
        impl $crate::binary::Deserialize for $T {
            fn deserialize(
                deserializer: &mut $crate::binary::Deserializer<impl ::std::io::Read>,
            ) -> ::anyhow::Result<Self> {
                let bits = deserializer.deserialize::<$Underlying>()?;
                Ok(Self::from_bits_retain(bits))
            }
        }

        impl $crate::binary::Serialize for $T {
            fn serialize(
                &self,
                serializer: &mut $crate::binary::Serializer<impl ::std::io::Write>,
            ) -> ::anyhow::Result<()> {
                self.bits().serialize(serializer)
            }
        }
    };
}
