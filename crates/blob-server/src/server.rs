use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, BufReader, BufWriter};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Semaphore};
use tracing::{debug, error, info, warn};

use blob_protocol::{read_frame, status, write_frame, BlobMessage, ProtocolError};

use crate::config::ServerConfig;
use crate::context::ServiceContext;
use crate::error::{ErrorKind, ServerError, ServerResult, ServiceError, ServiceResult};
use crate::get::{ChunkSink, GetPipeline};
use crate::put::PutPipeline;
use crate::router::build_router;

/// Blob service server: the streaming RPC listener plus the admin router.
pub struct BlobServer {
    ctx: ServiceContext,
}

impl BlobServer {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub fn config(&self) -> &ServerConfig {
        self.ctx.config()
    }

    pub fn context(&self) -> &ServiceContext {
        &self.ctx
    }

    /// Build the admin router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.ctx.config())
    }

    /// Check the bucket, bind both listeners, and serve until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        self.ctx.ensure_ready().await?;
        let rpc = TcpListener::bind(self.config().bind_addr).await?;
        let admin = TcpListener::bind(self.config().admin_addr).await?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received");
            }
            let _ = shutdown_tx.send(true);
        });

        info!(addr = %self.config().admin_addr, "admin endpoint listening");
        let admin_server = axum::serve(admin, self.router())
            .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()));
        tokio::try_join!(
            self.serve_rpc(rpc, wait_for_shutdown(shutdown_rx)),
            async { admin_server.await.map_err(ServerError::from) },
        )?;
        Ok(())
    }

    /// Accept RPC connections on `listener` until `shutdown` resolves.
    ///
    /// Connections beyond `max_connections` are answered with an
    /// `UNAVAILABLE` error and closed.
    pub async fn serve_rpc<F>(&self, listener: TcpListener, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send,
    {
        let max_connections = self.config().max_connections;
        let semaphore = Arc::new(Semaphore::new(max_connections));
        info!(addr = %listener.local_addr()?, max_connections, "blob service listening");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("blob service shutting down");
                    break;
                }
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!(error = %e, "failed to accept connection");
                            continue;
                        }
                    };
                    let Ok(permit) = semaphore.clone().try_acquire_owned() else {
                        warn!(%peer, max_connections, "connection limit reached, rejecting");
                        tokio::spawn(reject(stream));
                        continue;
                    };
                    let ctx = self.ctx.clone();
                    tokio::spawn(async move {
                        let _permit = permit;
                        if let Err(e) = handle_connection(ctx, stream, peer).await {
                            warn!(%peer, error = %e, "connection closed with error");
                        }
                    });
                }
            }
        }
        Ok(())
    }
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

async fn reject(stream: TcpStream) {
    let mut writer = BufWriter::new(stream);
    let msg = BlobMessage::Error {
        code: status::UNAVAILABLE,
        message: "server at connection limit".into(),
    };
    if let Err(e) = write_frame(&mut writer, &msg).await {
        debug!(error = %e, "failed to send rejection");
    }
}

/// Serve calls on one connection until the peer closes it.
async fn handle_connection(
    ctx: ServiceContext,
    stream: TcpStream,
    peer: SocketAddr,
) -> ServerResult<()> {
    stream.set_nodelay(true)?;
    let (read, write) = stream.into_split();
    let mut reader = BufReader::new(read);
    let mut writer = BufWriter::new(write);
    debug!(%peer, "connection opened");

    while let Some(msg) = read_frame(&mut reader).await? {
        match msg {
            BlobMessage::PutOpen => handle_put(&ctx, &mut reader, &mut writer).await?,
            BlobMessage::Get { reverse_index } => {
                handle_get(&ctx, &reverse_index, &mut writer).await?
            }
            other => {
                let err = ServiceError::Protocol(format!("unexpected {} message", other.type_name()));
                log_failure("rpc", &err);
                write_frame(&mut writer, &err.to_message()).await?;
                return Ok(());
            }
        }
    }
    debug!(%peer, "connection closed");
    Ok(())
}

/// Run one put call. After a failure the remaining frames are drained so the
/// connection stays usable for the next call.
async fn handle_put<R, W>(ctx: &ServiceContext, reader: &mut R, writer: &mut W) -> ServerResult<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut pipeline = PutPipeline::new(ctx.clone());
    let mut failure: Option<ServiceError> = None;

    loop {
        let msg = match read_frame(reader).await {
            Ok(Some(msg)) => msg,
            Ok(None) => {
                pipeline.abandon().await;
                return Err(ProtocolError::ConnectionClosed.into());
            }
            Err(e) => {
                pipeline.abandon().await;
                return Err(e.into());
            }
        };
        match msg {
            BlobMessage::Put(frame) => {
                if failure.is_some() {
                    continue;
                }
                if let Err(e) = pipeline.handle(frame).await {
                    pipeline.abandon().await;
                    failure = Some(e);
                }
            }
            BlobMessage::PutClose => break,
            other => {
                pipeline.abandon().await;
                let err = ServiceError::Protocol(format!(
                    "unexpected {} message inside put call",
                    other.type_name()
                ));
                log_failure("put", &err);
                write_frame(writer, &err.to_message()).await?;
                return Err(ProtocolError::UnexpectedMessage {
                    expected: "Put",
                    got: other.type_name(),
                }
                .into());
            }
        }
    }

    let result = match failure {
        Some(e) => Err(e),
        None => pipeline.finish().await,
    };
    let reply = match result {
        Ok(_) => BlobMessage::PutAck,
        Err(e) => {
            log_failure("put", &e);
            e.to_message()
        }
    };
    write_frame(writer, &reply).await?;
    Ok(())
}

struct FrameSink<'a, W> {
    writer: &'a mut W,
}

#[async_trait]
impl<'a, W> ChunkSink for FrameSink<'a, W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send_chunk(&mut self, chunk: Bytes) -> ServiceResult<()> {
        let msg = BlobMessage::GetChunk {
            data_chunk: chunk.to_vec(),
        };
        write_frame(&mut *self.writer, &msg).await?;
        Ok(())
    }
}

async fn handle_get<W>(ctx: &ServiceContext, reverse_index: &str, writer: &mut W) -> ServerResult<()>
where
    W: AsyncWrite + Unpin + Send,
{
    let pipeline = GetPipeline::new(ctx.clone());
    let result = {
        let mut sink = FrameSink { writer: &mut *writer };
        pipeline.run(reverse_index, &mut sink).await
    };
    let reply = match result {
        Ok(bytes) => {
            debug!(reverse_index, bytes, "get complete");
            BlobMessage::GetDone
        }
        Err(e) => {
            log_failure("get", &e);
            e.to_message()
        }
    };
    write_frame(writer, &reply).await?;
    Ok(())
}

fn log_failure(call: &str, err: &ServiceError) {
    match err.kind() {
        ErrorKind::Upstream | ErrorKind::Integrity => {
            error!(call, kind = %err.kind(), error = %err, "call failed")
        }
        _ => warn!(call, kind = %err.kind(), error = %err, "call failed"),
    }
}
