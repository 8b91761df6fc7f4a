//! Code generation for `#[derive(Rpc)]` and `rpc_id!`.

use crate::parse::RpcDef;
use proc_macro2::{Literal, TokenStream};
use quote::quote;
use sha2::{Digest, Sha256};

/// First eight bytes of the SHA-256 digest of `name`, little-endian.
pub fn hash_name(name: &str) -> u64 {
    let digest = Sha256::digest(name.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(prefix)
}

/// `RpcId` constant expression for `name`.
pub fn rpc_id_expr(name: &str) -> TokenStream {
    let raw = Literal::u64_suffixed(hash_name(name));
    quote! { ::fabricrpc::rpc::RpcId::from_raw(#raw) }
}

/// `impl Rpc` for a parsed descriptor.
pub fn rpc_impl(def: &RpcDef) -> TokenStream {
    let RpcDef {
        ident,
        generics,
        name,
        request,
        response,
    } = def;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    let id = rpc_id_expr(name);

    quote! {
        impl #impl_generics ::fabricrpc::rpc::Rpc for #ident #ty_generics #where_clause {
            const NAME: &'static str = #name;
            const ID: ::fabricrpc::rpc::RpcId = #id;
            type Request = #request;
            type Response = #response;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::{DeriveInput, parse_quote};

    #[test]
    fn test_hash_name() {
        // sha256("echo") starts with 09 2c 79 e8 f8 0e 55 9e
        assert_eq!(hash_name("echo"), 0x9e55_0ef8_e879_2c09);
        assert_ne!(hash_name("echo"), hash_name("Echo"));
    }

    #[test]
    fn test_rpc_impl_tokens() {
        let input: DeriveInput = parse_quote! {
            #[rpc(name = "echo", request = u32, response = u32)]
            struct Echo;
        };
        let def = RpcDef::from_derive(input).unwrap();
        let tokens = rpc_impl(&def).to_string();
        assert!(tokens.contains("NAME"));
        assert!(tokens.contains("\"echo\""));
        assert!(tokens.contains(&format!("{}u64", hash_name("echo"))));
    }
}
