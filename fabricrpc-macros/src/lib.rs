//! Procedural macros for fabricrpc.
//!
//! This crate provides `#[derive(Rpc)]`, which implements
//! `fabricrpc::rpc::Rpc` for a marker type, and `rpc_id!`, which computes the
//! wire identifier of an RPC name at compile time.
//!
//! # Example
//!
//! ```ignore
//! use fabricrpc::Rpc;
//!
//! #[derive(Rpc)]
//! #[rpc(name = "echo", request = Hello, response = Hello)]
//! pub struct Echo;
//!
//! assert_eq!(Echo::ID, fabricrpc::rpc_id!("echo"));
//! ```
//!
//! Identifiers are the first eight bytes of the SHA-256 digest of the name,
//! read little-endian, matching `fabricrpc::rpc::RpcId::from_name`.

use proc_macro::TokenStream;
use syn::{DeriveInput, LitStr, parse_macro_input};

mod generate;
mod parse;

/// Derives `fabricrpc::rpc::Rpc` for a marker type.
///
/// # Attributes
///
/// - `name = "..."`: the RPC name the identifier is hashed from; defaults
///   to the type name
/// - `request = Type`: the request message (required)
/// - `response = Type`: the response message (required)
///
/// # Example
///
/// ```ignore
/// #[derive(Rpc)]
/// #[rpc(request = u32, response = u32)]
/// pub struct AddOne; // NAME is "AddOne"
/// ```
#[proc_macro_derive(Rpc, attributes(rpc))]
pub fn derive_rpc(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match parse::RpcDef::from_derive(input) {
        Ok(def) => generate::rpc_impl(&def).into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Expands to the `fabricrpc::rpc::RpcId` of an RPC name.
///
/// # Example
///
/// ```ignore
/// const ECHO: fabricrpc::rpc::RpcId = fabricrpc::rpc_id!("echo");
/// ```
#[proc_macro]
pub fn rpc_id(input: TokenStream) -> TokenStream {
    let name = parse_macro_input!(input as LitStr);
    generate::rpc_id_expr(&name.value()).into()
}
