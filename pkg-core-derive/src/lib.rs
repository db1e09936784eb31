mod deserialize;
mod serialize;

use syn::{parse_macro_input, ItemStruct};

/// Derives `pkg_core::binary::Deserialize` by deserializing each field in
/// declaration order. `#[serialized_when(expr)]` makes a field's presence
/// conditional (the condition may reference earlier fields by name).
#[proc_macro_derive(Deserialize, attributes(serialized_when))]
pub fn derive_deserialize(item: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    deserialize::derive_deserialize_impl(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Derives `pkg_core::binary::Serialize` by serializing each field in
/// declaration order. Mirrors `#[serialized_when(expr)]` on `Deserialize`.
#[proc_macro_derive(Serialize, attributes(serialized_when))]
pub fn derive_serialize(item: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    serialize::derive_serialize_impl(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
