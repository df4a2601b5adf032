use crate::handler::{HandlerAction, StageHandler};
use ctx_protocol::{Inbound, Transport, TransportError};

/// Drive one connection until either side closes it
pub async fn serve_connection<T: Transport>(
    mut transport: T,
    mut handler: StageHandler,
) -> Result<(), TransportError> {
    loop {
        let text = match transport.recv().await? {
            Inbound::Text(text) => text,
            Inbound::Closed(reason) => {
                match reason {
                    Some(reason) => log::debug!("Client closed the connection: {}", reason),
                    None => log::debug!("Client closed the connection"),
                }
                return Ok(());
            }
        };

        match handler.handle_text(&text).await {
            HandlerAction::Reply(response) => match response.encode() {
                Ok(encoded) => transport.send(encoded).await?,
                Err(e) => log::error!("Failed to encode {} response: {}", response.stage, e),
            },
            HandlerAction::Close(reason) => {
                transport.close(reason).await?;
                return Ok(());
            }
            HandlerAction::Ignore => {}
        }
    }
}
