//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Compile-time sets of RPCs and handlers.
//!
//! A transport is parameterized by the [`RpcSet`] it may call, and
//! [`RpcTransport::serve`](crate::rpc::RpcTransport::serve) takes the
//! [`HandlerSet`] it answers. Both are implemented for tuples of up to eight
//! members, so a set is written as a type or a value list:
//!
//! ```rust
//! # use fabricrpc::Rpc;
//! # use fabricrpc::rpc::{Rpc as _, RpcSet};
//! # #[derive(Rpc)] #[rpc(name = "a", request = u8, response = u8)] struct A;
//! # #[derive(Rpc)] #[rpc(name = "b", request = u8, response = u8)] struct B;
//! type Calls = (A, B);
//! assert!(Calls::contains(B::ID));
//! assert_eq!(Calls::names(), ["a", "b"]);
//! ```

use crate::rpc::{Rpc, RpcError, RpcHandler, RpcId};
use crate::serialization::Serializer;

/// RPCs a transport is allowed to call.
pub trait RpcSet: 'static {
    /// Identifiers of every member, in declaration order.
    fn ids() -> Vec<RpcId>;

    /// Names of every member, in declaration order.
    fn names() -> Vec<&'static str>;

    /// Returns `true` if `id` belongs to a member.
    fn contains(id: RpcId) -> bool;
}

impl RpcSet for () {
    fn ids() -> Vec<RpcId> {
        Vec::new()
    }

    fn names() -> Vec<&'static str> {
        Vec::new()
    }

    fn contains(_id: RpcId) -> bool {
        false
    }
}

/// Handlers a serving transport dispatches requests to.
pub trait HandlerSet: Send + Sync + 'static {
    /// Identifiers of every handled RPC, in declaration order.
    fn handled_ids(&self) -> Vec<RpcId>;

    /// Decodes `request`, runs the handler for `id` and encodes its response
    /// into `response`.
    ///
    /// Returns `None` if no member handles `id`, otherwise the number of
    /// response bytes written.
    fn dispatch<S: Serializer>(
        &self,
        id: RpcId,
        request: &[u8],
        serializer: &S,
        response: &mut [u8],
    ) -> Option<Result<usize, RpcError>>;
}

fn handle_one<H, S>(
    handler: &H,
    request: &[u8],
    serializer: &S,
    response: &mut [u8],
) -> Result<usize, RpcError>
where
    H: RpcHandler,
    S: Serializer,
{
    let request: H::Request = serializer.deserialize(request)?;
    let reply = handler.handle(request);
    Ok(serializer.serialize_into(&reply, response)?)
}

macro_rules! impl_sets {
    ($($member:ident),+) => {
        impl<$($member: Rpc),+> RpcSet for ($($member,)+) {
            fn ids() -> Vec<RpcId> {
                vec![$(<$member as Rpc>::ID),+]
            }

            fn names() -> Vec<&'static str> {
                vec![$(<$member as Rpc>::NAME),+]
            }

            fn contains(id: RpcId) -> bool {
                $(<$member as Rpc>::ID == id)||+
            }
        }

        impl<$($member: RpcHandler),+> HandlerSet for ($($member,)+) {
            fn handled_ids(&self) -> Vec<RpcId> {
                vec![$(<$member as Rpc>::ID),+]
            }

            #[allow(non_snake_case)]
            fn dispatch<S: Serializer>(
                &self,
                id: RpcId,
                request: &[u8],
                serializer: &S,
                response: &mut [u8],
            ) -> Option<Result<usize, RpcError>> {
                let ($($member,)+) = self;
                $(
                    if id == <$member as Rpc>::ID {
                        return Some(handle_one($member, request, serializer, response));
                    }
                )+
                None
            }
        }
    };
}

impl_sets!(A);
impl_sets!(A, B);
impl_sets!(A, B, C);
impl_sets!(A, B, C, D);
impl_sets!(A, B, C, D, E);
impl_sets!(A, B, C, D, E, F);
impl_sets!(A, B, C, D, E, F, G);
impl_sets!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::PostcardSerializer;

    struct Double;

    impl Rpc for Double {
        const NAME: &'static str = "double";
        const ID: RpcId = RpcId::from_raw(2);
        type Request = u32;
        type Response = u32;
    }

    impl RpcHandler for Double {
        fn handle(&self, request: u32) -> u32 {
            request * 2
        }
    }

    struct Shout;

    impl Rpc for Shout {
        const NAME: &'static str = "shout";
        const ID: RpcId = RpcId::from_raw(3);
        type Request = String;
        type Response = String;
    }

    impl RpcHandler for Shout {
        fn handle(&self, request: String) -> String {
            request.to_uppercase()
        }
    }

    #[test]
    fn test_rpc_set_membership() {
        assert!(<(Double, Shout)>::contains(Shout::ID));
        assert!(!<(Double,)>::contains(Shout::ID));
        assert!(!<()>::contains(Double::ID));
        assert_eq!(<(Double, Shout) as RpcSet>::ids(), [Double::ID, Shout::ID]);
        assert_eq!(<(Double,) as RpcSet>::names(), ["double"]);
    }

    #[test]
    fn test_handler_set_ids_follow_declaration_order() {
        assert_eq!((Shout, Double).handled_ids(), [Shout::ID, Double::ID]);
    }

    #[test]
    fn test_dispatch_routes_by_id() {
        let serializer = PostcardSerializer::default();
        let handlers = (Double, Shout);
        let request = serializer.serialize("hi").unwrap();
        let mut response = [0u8; 32];

        let written = handlers
            .dispatch(Shout::ID, &request, &serializer, &mut response)
            .unwrap()
            .unwrap();
        let reply: String = serializer.deserialize(&response[..written]).unwrap();
        assert_eq!(reply, "HI");

        let request = serializer.serialize(&21u32).unwrap();
        let written = handlers
            .dispatch(Double::ID, &request, &serializer, &mut response)
            .unwrap()
            .unwrap();
        let reply: u32 = serializer.deserialize(&response[..written]).unwrap();
        assert_eq!(reply, 42);
    }

    #[test]
    fn test_dispatch_unknown_id() {
        let serializer = PostcardSerializer::default();
        let mut response = [0u8; 8];
        assert!(
            (Double,)
                .dispatch(RpcId::from_raw(99), &[], &serializer, &mut response)
                .is_none()
        );
    }
}
