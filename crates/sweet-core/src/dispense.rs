// ── Dispense event stream ──
//
// Background receive loop for the `SubscribeDispenses` server stream. The
// loop itself never touches cells: every event and the final termination
// are handed to callbacks, which the session routes through its main
// context.

use std::sync::Arc;

use futures_util::StreamExt;
use sweet_api::{DeviceRpc, Error};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Why a dispense subscription stopped delivering events.
#[derive(Debug)]
pub(crate) enum StreamEnd {
    /// The subscription could not be opened.
    OpenFailed(Error),
    /// The stream failed mid-flight, or the device closed it
    /// ([`Error::StreamClosed`]).
    Broken(Error),
}

impl StreamEnd {
    pub(crate) fn reason(&self) -> String {
        match self {
            Self::OpenFailed(e) => format!("subscribe failed: {e}"),
            Self::Broken(e) => e.to_string(),
        }
    }
}

/// Open the subscription and pump events until it ends or `cancel` fires.
///
/// `on_event` receives each "dispense active" flag in arrival order.
/// `on_end` runs once when the stream ends on its own; it is not called
/// after cancellation.
pub(crate) fn spawn_dispense_loop<E, D>(
    rpc: Arc<dyn DeviceRpc>,
    cancel: CancellationToken,
    on_event: E,
    on_end: D,
) -> JoinHandle<()>
where
    E: Fn(bool) + Send + 'static,
    D: FnOnce(StreamEnd) + Send + 'static,
{
    tokio::spawn(async move {
        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            opened = rpc.subscribe_dispenses() => opened,
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "dispense subscription failed to open");
                on_end(StreamEnd::OpenFailed(e));
                return;
            }
        };
        debug!("dispense subscription open");

        let end = loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("dispense subscription cancelled");
                    return;
                }
                item = stream.next() => match item {
                    Some(Ok(event)) => {
                        trace!(dispense = event.dispense, "dispense event");
                        on_event(event.dispense);
                    }
                    Some(Err(e)) => break StreamEnd::Broken(e),
                    None => break StreamEnd::Broken(Error::StreamClosed),
                },
            }
        };

        debug!(reason = %end.reason(), "dispense subscription ended");
        on_end(end);
    })
}
