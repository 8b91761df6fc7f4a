//! Parsing of `#[derive(Rpc)]` input.

use syn::{DeriveInput, Error, Generics, Ident, LitStr, Result, Type};

/// Parsed RPC descriptor.
#[derive(Debug)]
pub struct RpcDef {
    /// The type the trait is implemented for
    pub ident: Ident,
    pub generics: Generics,
    /// Name the identifier is hashed from
    pub name: String,
    pub request: Type,
    pub response: Type,
}

impl RpcDef {
    /// Reads the `#[rpc(...)]` attributes of a derive input.
    pub fn from_derive(input: DeriveInput) -> Result<Self> {
        let mut name = None;
        let mut request = None;
        let mut response = None;

        for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("rpc")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let lit: LitStr = meta.value()?.parse()?;
                    if lit.value().is_empty() {
                        return Err(Error::new(lit.span(), "rpc name must not be empty"));
                    }
                    name = Some(lit.value());
                } else if meta.path.is_ident("request") {
                    request = Some(meta.value()?.parse::<Type>()?);
                } else if meta.path.is_ident("response") {
                    response = Some(meta.value()?.parse::<Type>()?);
                } else {
                    return Err(meta.error("expected `name`, `request` or `response`"));
                }
                Ok(())
            })?;
        }

        let request = request.ok_or_else(|| {
            Error::new_spanned(&input.ident, "missing `#[rpc(request = Type)]`")
        })?;
        let response = response.ok_or_else(|| {
            Error::new_spanned(&input.ident, "missing `#[rpc(response = Type)]`")
        })?;

        Ok(Self {
            name: name.unwrap_or_else(|| input.ident.to_string()),
            ident: input.ident,
            generics: input.generics,
            request,
            response,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_parse_all_attributes() {
        let input: DeriveInput = parse_quote! {
            #[rpc(name = "echo", request = Hello, response = Vec<u8>)]
            struct Echo;
        };
        let def = RpcDef::from_derive(input).unwrap();
        assert_eq!(def.ident, "Echo");
        assert_eq!(def.name, "echo");
    }

    #[test]
    fn test_name_defaults_to_ident() {
        let input: DeriveInput = parse_quote! {
            #[rpc(request = u32, response = u32)]
            struct AddOne;
        };
        assert_eq!(RpcDef::from_derive(input).unwrap().name, "AddOne");
    }

    #[test]
    fn test_missing_request() {
        let input: DeriveInput = parse_quote! {
            #[rpc(response = u32)]
            struct Broken;
        };
        let err = RpcDef::from_derive(input).unwrap_err();
        assert!(err.to_string().contains("request"));
    }

    #[test]
    fn test_unknown_key() {
        let input: DeriveInput = parse_quote! {
            #[rpc(request = u32, response = u32, timeout = 5)]
            struct Broken;
        };
        assert!(RpcDef::from_derive(input).is_err());
    }
}
