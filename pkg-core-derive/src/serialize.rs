use proc_macro2::{Ident, TokenStream};
use quote::quote;
use syn::{spanned::Spanned, Expr, ItemStruct, LitStr};

pub fn derive_serialize_impl(st: ItemStruct) -> syn::Result<TokenStream> {
    let mut stmts = vec![];
    for (i, field) in st.fields.iter().enumerate() {
        let field_name = field
            .ident
            .clone()
            .unwrap_or_else(|| Ident::new(&i.to_string(), field.span()));
        let error = LitStr::new(
            &format!("cannot serialize field {}::{}", st.ident, field_name),
            field.span(),
        );

        let serialized_when = field
            .attrs
            .iter()
            .any(|attr| attr.path.is_ident("serialized_when"));

        let expr = if serialized_when {
            quote! {
                if let ::std::option::Option::Some(value) = &self.#field_name {
                    ::pkg_core::binary::Serialize::serialize(value, serializer)
                } else {
                    ::std::result::Result::Ok(())
                }
            }
        } else {
            quote! {
                ::pkg_core::binary::Serialize::serialize(&self.#field_name, serializer)
            }
        };
        stmts.push(quote! {
            ::anyhow::Context::context(#expr, #error)?;
        });
    }

    let type_name = st.ident;
    let (impl_generics, type_generics, where_clause) = st.generics.split_for_impl();
    let stmts = TokenStream::from_iter(stmts);

    Ok(quote! {
        impl #impl_generics ::pkg_core::binary::Serialize for #type_name #type_generics #where_clause {
            fn serialize(&self, serializer: &mut ::pkg_core::binary::Serializer<impl ::std::io::Write>) -> ::anyhow::Result<()> {
                #stmts
                Ok(())
            }
        }
    })
}
