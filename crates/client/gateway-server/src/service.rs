use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use anyhow::Context;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use crate::RestGateway;

/// Serve the REST gateway until the process is stopped. Each connection gets
/// its own task; each request its own handler invocation.
pub async fn start_server(gateway: Arc<RestGateway>, external: bool, port: u16) -> anyhow::Result<()> {
    let listen_addr = if external {
        Ipv4Addr::UNSPECIFIED // listen on 0.0.0.0
    } else {
        Ipv4Addr::LOCALHOST
    };
    let addr = SocketAddr::new(listen_addr.into(), port);
    let listener =
        TcpListener::bind(addr).await.with_context(|| format!("Opening socket server at {addr}"))?;

    tracing::info!("REST gateway endpoint started at {addr}");

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let gateway = Arc::clone(&gateway);

        tokio::task::spawn(async move {
            let service = service_fn(move |req| {
                let gateway = Arc::clone(&gateway);
                async move { Ok::<_, std::convert::Infallible>(gateway.handle(req).await) }
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                tracing::error!("Error serving connection: {err:?}");
            }
        });
    }
}
