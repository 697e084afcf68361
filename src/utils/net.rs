use std::net::IpAddr;
use std::net::SocketAddr;

/// accept any host the nodes bind to, e.g. 127.0.0.1 or ::1
pub fn socket_addr(
    host: IpAddr,
    port: u16,
) -> SocketAddr {
    SocketAddr::new(host, port)
}
