#[global_allocator]
static ALLOC: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use crate::econya_core::Result;
use tokio::net::TcpListener;

mod econya_conf;
mod econya_core;
mod econya_domain;
mod econya_http;
mod econya_link;
mod econya_net;
mod econya_store;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_thread_ids(true).init();

    econya_conf::bootstrap();
    econya_store::bootstrap()?;

    let addr = econya_net::resolve_socket_addr(econya_conf::ECONYA_ADDR.as_str()).await?;
    let tcp_socket = econya_net::create_tcp_socket(addr)?;
    let tcp_listener = TcpListener::from_std(tcp_socket.into())?;

    tracing::info!(%addr, version = econya_http::VERSION, "econya backend listening");

    let accept_loop = econya_net::accept_loop(tcp_listener);
    tokio::spawn(accept_loop).await??;

    Ok(())
}
