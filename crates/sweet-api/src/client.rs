// gRPC client for the `sweetrpc.Sweet` service.
//
// Thin wrapper over `tonic::client::Grpc` using the prost codec. Each call
// clones the underlying channel handle, so a `SweetClient` can be shared
// freely across tasks.

use async_trait::async_trait;
use futures_util::StreamExt;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Channel;
use tonic::{Request, Status};
use tracing::debug;

use crate::device::{DeviceInfo, DeviceRpc, DispenseEvent, DispenseStream};
use crate::error::Error;
use crate::proto::{self, path};

/// Raw RPC client for a single dispenser.
#[derive(Debug, Clone)]
pub struct SweetClient {
    inner: tonic::client::Grpc<Channel>,
}

impl SweetClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: tonic::client::Grpc::new(channel),
        }
    }

    async fn ready(&self) -> Result<tonic::client::Grpc<Channel>, Status> {
        let mut grpc = self.inner.clone();
        grpc.ready()
            .await
            .map_err(|e| Status::unavailable(format!("service was not ready: {e}")))?;
        Ok(grpc)
    }

    async fn unary<Req, Res>(&self, method: &'static str, request: Req) -> Result<Res, Error>
    where
        Req: prost::Message + Send + Sync + 'static,
        Res: prost::Message + Default + Send + Sync + 'static,
    {
        debug!(method, "unary call");
        let mut grpc = self.ready().await?;
        let response = grpc
            .unary(
                Request::new(request),
                PathAndQuery::from_static(method),
                ProstCodec::default(),
            )
            .await?;
        Ok(response.into_inner())
    }
}

#[async_trait]
impl DeviceRpc for SweetClient {
    async fn get_info(&self) -> Result<DeviceInfo, Error> {
        let res: proto::GetInfoResponse = self
            .unary(path::GET_INFO, proto::GetInfoRequest {})
            .await?;
        Ok(res.into())
    }

    async fn subscribe_dispenses(&self) -> Result<DispenseStream, Error> {
        debug!(method = path::SUBSCRIBE_DISPENSES, "opening server stream");
        let mut grpc = self.ready().await?;
        let response = grpc
            .server_streaming(
                Request::new(proto::SubscribeDispensesRequest {}),
                PathAndQuery::from_static(path::SUBSCRIBE_DISPENSES),
                ProstCodec::<proto::SubscribeDispensesRequest, proto::Dispense>::default(),
            )
            .await?;

        let stream = response
            .into_inner()
            .map(|item| item.map(DispenseEvent::from).map_err(Error::from));
        Ok(stream.boxed())
    }

    async fn set_dispense_on_touch(&self, enable: bool) -> Result<(), Error> {
        let req = proto::SetDispenseOnTouchRequest {
            dispense_on_touch: enable,
        };
        let _: proto::Empty = self.unary(path::SET_DISPENSE_ON_TOUCH, req).await?;
        Ok(())
    }

    async fn set_buzz_on_dispense(&self, enable: bool) -> Result<(), Error> {
        let req = proto::SetBuzzOnDispenseRequest {
            buzz_on_dispense: enable,
        };
        let _: proto::Empty = self.unary(path::SET_BUZZ_ON_DISPENSE, req).await?;
        Ok(())
    }

    async fn set_name(&self, name: &str) -> Result<(), Error> {
        let req = proto::SetNameRequest { name: name.into() };
        let _: proto::Empty = self.unary(path::SET_NAME, req).await?;
        Ok(())
    }

    async fn toggle_dispenser(&self, dispense: bool) -> Result<(), Error> {
        let req = proto::ToggleDispenserRequest { dispense };
        let _: proto::Empty = self.unary(path::TOGGLE_DISPENSER, req).await?;
        Ok(())
    }

    async fn reboot(&self) -> Result<(), Error> {
        let _: proto::Empty = self.unary(path::REBOOT, proto::RebootRequest {}).await?;
        Ok(())
    }

    async fn disconnect_from_remote_node(&self) -> Result<(), Error> {
        let _: proto::Empty = self
            .unary(
                path::DISCONNECT_FROM_REMOTE_NODE,
                proto::DisconnectFromRemoteNodeRequest {},
            )
            .await?;
        Ok(())
    }
}
