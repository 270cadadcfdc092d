//! Wire messages for the `sweetrpc.Sweet` service.
//!
//! Hand-written prost messages. Field numbers are assigned in declaration
//! order and have not been checked against a device `.proto`; the tests
//! below pin the resulting layout.

/// Remote payment node the dispenser forwards invoices to.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RemoteNode {
    #[prost(string, tag = "1")]
    pub uri: ::prost::alloc::string::String,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetInfoRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetInfoResponse {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub version: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub commit: ::prost::alloc::string::String,
    #[prost(bool, tag = "4")]
    pub dispense_on_touch: bool,
    #[prost(bool, tag = "5")]
    pub buzz_on_dispense: bool,
    #[prost(message, optional, tag = "6")]
    pub remote_node: ::core::option::Option<RemoteNode>,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct SubscribeDispensesRequest {}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Dispense {
    #[prost(bool, tag = "1")]
    pub dispense: bool,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct SetDispenseOnTouchRequest {
    #[prost(bool, tag = "1")]
    pub dispense_on_touch: bool,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct SetBuzzOnDispenseRequest {
    #[prost(bool, tag = "1")]
    pub buzz_on_dispense: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SetNameRequest {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct ToggleDispenserRequest {
    #[prost(bool, tag = "1")]
    pub dispense: bool,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct RebootRequest {}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct DisconnectFromRemoteNodeRequest {}

/// Shared empty acknowledgement for the control calls.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Empty {}

/// Fully-qualified method paths.
pub(crate) mod path {
    pub const GET_INFO: &str = "/sweetrpc.Sweet/GetInfo";
    pub const SUBSCRIBE_DISPENSES: &str = "/sweetrpc.Sweet/SubscribeDispenses";
    pub const SET_DISPENSE_ON_TOUCH: &str = "/sweetrpc.Sweet/SetDispenseOnTouch";
    pub const SET_BUZZ_ON_DISPENSE: &str = "/sweetrpc.Sweet/SetBuzzOnDispense";
    pub const SET_NAME: &str = "/sweetrpc.Sweet/SetName";
    pub const TOGGLE_DISPENSER: &str = "/sweetrpc.Sweet/ToggleDispenser";
    pub const REBOOT: &str = "/sweetrpc.Sweet/Reboot";
    pub const DISCONNECT_FROM_REMOTE_NODE: &str = "/sweetrpc.Sweet/DisconnectFromRemoteNode";
}

#[cfg(test)]
mod tests {
    use prost::Message;

    use super::*;

    #[test]
    fn dispense_flag_is_field_one() {
        let bytes = Dispense { dispense: true }.encode_to_vec();
        assert_eq!(bytes, vec![0x08, 0x01]);
    }

    #[test]
    fn remote_node_is_field_six() {
        let res = GetInfoResponse {
            remote_node: Some(RemoteNode { uri: "n".into() }),
            ..Default::default()
        };
        // tag 6, wire type 2; nested tag 1, wire type 2
        assert_eq!(res.encode_to_vec(), vec![0x32, 0x03, 0x0a, 0x01, b'n']);
    }

    #[test]
    fn empty_ack_decodes_from_no_bytes() {
        assert_eq!(Empty::decode(&b""[..]).ok(), Some(Empty {}));
    }
}
