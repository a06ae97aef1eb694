use async_stream::stream;
use futures_core::Stream;
use quakelink_rs_protocol::{Response, SelectParams};
use tokio::sync::mpsc;

use crate::connection::Connection;
use crate::error::{ClientError, Result};

/// Run a `select` as a [`Stream`] of responses, consuming the connection.
///
/// Yields one `Ok(Response)` per delivered item and ends after the server
/// terminates the stream; a failing select yields one final `Err`. Take an
/// [`AbortHandle`](crate::AbortHandle) from the connection before calling
/// this to be able to end the stream.
///
/// # Example
///
/// ```no_run
/// # async fn example() -> quakelink_rs_client::Result<()> {
/// use quakelink_rs_protocol::{Options, SelectParams};
/// use quakelink_rs_client::{Connection, select_stream};
/// use tokio_stream::StreamExt;
///
/// let mut connection = Connection::default();
/// connection.init("ql://localhost", Options::KEEPALIVE).await?;
///
/// let stream = select_stream(connection, true, SelectParams::default(), 128);
/// tokio::pin!(stream);
/// while let Some(response) = stream.next().await {
///     println!("{} bytes", response?.data.len());
/// }
/// # Ok(())
/// # }
/// ```
pub fn select_stream(
    mut connection: Connection,
    archived: bool,
    params: SelectParams,
    updated_buffer_size: i32,
) -> impl Stream<Item = Result<Response>> {
    stream! {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(async move {
            connection
                .select(archived, &params, updated_buffer_size, move |response| {
                    let _ = tx.send(response);
                })
                .await
        });

        // the sender drops when select returns, ending this loop
        while let Some(response) = rx.recv().await {
            yield Ok(response);
        }

        match worker.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => yield Err(e),
            // worker panicked or was cancelled
            Err(_) => yield Err(ClientError::Disconnected),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::pin::pin;

    use quakelink_rs_protocol::Options;
    use tokio_stream::StreamExt;

    use super::*;
    use crate::mock::{MockConfig, MockServer, data_response};

    fn updated(body: &[u8]) -> Vec<u8> {
        data_response("DATA/SELECT/UPDATED 200", "quakelink/evsum", body, &[])
    }

    #[tokio::test]
    async fn stream_yields_responses_then_ends() {
        let mut config = MockConfig::with_api(2);
        let mut reply = Vec::new();
        reply.extend(updated(b"u1"));
        reply.extend(updated(b"u2"));
        reply.extend_from_slice(b"EOD/SELECT\r\n");
        config.select_reply = reply;
        let server = MockServer::start(config).await;

        let mut connection = Connection::default();
        connection
            .init(&server.url(), Options::empty())
            .await
            .unwrap();

        let mut stream = pin!(select_stream(
            connection,
            false,
            SelectParams::default(),
            10
        ));

        assert_eq!(stream.next().await.unwrap().unwrap().data, b"u1");
        assert_eq!(stream.next().await.unwrap().unwrap().data, b"u2");
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn stream_surfaces_select_errors() {
        let mut config = MockConfig::with_api(2);
        config.select_reply = b"GARBAGE\r\n".to_vec();
        let server = MockServer::start(config).await;

        let mut connection = Connection::default();
        connection
            .init(&server.url(), Options::empty())
            .await
            .unwrap();

        let mut stream = pin!(select_stream(
            connection,
            false,
            SelectParams::default(),
            10
        ));

        let item = stream.next().await.unwrap();
        assert!(matches!(item, Err(ClientError::UnexpectedResponse { .. })));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn stream_ends_via_abort_handle() {
        let mut config = MockConfig::with_api(2);
        config.select_reply = updated(b"u1");
        config.abort_reply = b"EOD/SELECT\r\n".to_vec();
        let server = MockServer::start(config).await;

        let mut connection = Connection::default();
        connection
            .init(&server.url(), Options::empty())
            .await
            .unwrap();
        let handle = connection.abort_handle();

        let mut stream = pin!(select_stream(
            connection,
            false,
            SelectParams::default(),
            10
        ));

        assert_eq!(stream.next().await.unwrap().unwrap().data, b"u1");
        handle.abort();
        assert!(stream.next().await.is_none());
    }
}
