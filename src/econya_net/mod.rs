use crate::{econya_http, econya_store};
use http::HeaderValue;
use http_body_util::combinators::BoxBody;
use hyper::{
    Method, Request, Response,
    body::{Bytes, Incoming},
    header, server, service,
};
use hyper_util::rt::{TokioIo, TokioTimer};
use socket2::{Domain, Protocol, SockAddr, Socket, TcpKeepalive, Type};
use std::convert::Infallible;
use std::net::SocketAddr;
use tokio::{
    net::{TcpListener, ToSocketAddrs, lookup_host},
    time::Duration,
};

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

#[derive(thiserror::Error, Debug)]
pub enum ResolveSocketAddrError {
    #[error("io")]
    IO(#[from] std::io::Error),
    #[error("unmatched")]
    Unmatched,
}

pub async fn resolve_socket_addr<T: ToSocketAddrs>(
    addr: T,
) -> Result<SocketAddr, ResolveSocketAddrError> {
    let mut addrs = lookup_host(addr).await?;
    let addr = addrs
        .next()
        .ok_or_else(|| ResolveSocketAddrError::Unmatched)?;

    Ok(addr)
}

#[derive(thiserror::Error, Debug)]
pub enum CreateTCPSocketError {
    #[error("io")]
    IO(#[from] std::io::Error),
}

pub fn create_tcp_socket(addr: SocketAddr) -> Result<Socket, CreateTCPSocketError> {
    let domain = match addr {
        SocketAddr::V4(_) => Domain::IPV4,
        SocketAddr::V6(_) => Domain::IPV6,
    };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    let mut keepalive = TcpKeepalive::new();
    keepalive = keepalive.with_time(Duration::from_secs(90));
    keepalive = keepalive.with_interval(Duration::from_secs(30));

    socket.set_tcp_keepalive(&keepalive)?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.set_tcp_nodelay(true)?;

    let addr = SockAddr::from(addr);
    socket.bind(&addr)?;
    socket.listen(1024)?;

    Ok(socket)
}

#[derive(thiserror::Error, Debug)]
pub enum AcceptLoopError {
    #[error("io")]
    IO(#[from] std::io::Error),
}

pub async fn accept_loop(tcp_listener: TcpListener) -> Result<(), AcceptLoopError> {
    let mut http = server::conn::http1::Builder::new();

    http.timer(TokioTimer::new());
    http.keep_alive(true);

    loop {
        let (stream, _) = tcp_listener.accept().await?;
        let http = http.clone();
        let service = service::service_fn(router);

        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            if let Err(err) = http.serve_connection(io, service).await {
                tracing::error!(?err, "accept loop");
            };
        });
    }
}

#[derive(thiserror::Error, Debug)]
pub enum RouterError {
    #[error("respond")]
    Respond(#[from] econya_http::RespondError),
    #[error("go")]
    Go(#[from] econya_http::GoError),
    #[error("http")]
    HTTP(#[from] http::Error),
}

pub async fn router(
    req: Request<Incoming>,
) -> Result<Response<BoxBody<Bytes, Infallible>>, RouterError> {
    let store = econya_store::get_store();

    let mut res = match (req.method(), req.uri().path()) {
        (&Method::GET, "/deals") => econya_http::deals(store.as_ref()).await?,
        (&Method::GET, "/deals/stats") => econya_http::deals_stats(store.as_ref()).await?,
        (&Method::GET, "/go") => econya_http::go(req, store.as_ref()).await?,
        (&Method::GET, "/sante") => econya_http::sante().await?,
        (&Method::GET, "/ping") => econya_http::ping().await?,
        (&Method::GET, "/mescomptes") => econya_http::mescomptes().await?,
        (&Method::GET, "/transactions") => econya_http::transactions(req).await?,
        (&Method::GET, "/ob/start") => econya_http::ob_start().await?,
        (&Method::GET, "/ob/provider") => econya_http::ob_provider(req).await?,
        (&Method::GET, "/ob/callback") => econya_http::ob_callback(req).await?,
        (&Method::GET, "/ob/status") => econya_http::ob_status().await?,
        _ => econya_http::not_found().await?,
    };

    // The site is served from another origin; every demo endpoint is public.
    res.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );

    Ok(res)
}
