//! Binding the HTTP listener, walking upward from the configured port when it
//! is taken.

use std::io;
use std::net::{IpAddr, SocketAddr};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::TcpListener;

/// Binds `addr` with `SO_REUSEADDR` so a restarted server does not wait out
/// sockets lingering in TIME_WAIT.
pub fn bind_reusable(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1024)?;
    TcpListener::from_std(socket.into())
}

/// Tries `start`, `start + 1`, ... for up to `attempts` ports. Only
/// "address in use" moves on to the next port; any other bind error is
/// returned immediately.
pub fn find_available_port(host: &str, start: u16, attempts: u16) -> io::Result<(TcpListener, u16)> {
    let ip: IpAddr = host
        .parse()
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, format!("invalid bind host '{}'", host)))?;

    for offset in 0..attempts.max(1) {
        let Some(port) = start.checked_add(offset) else {
            break;
        };

        match bind_reusable(SocketAddr::new(ip, port)) {
            Ok(listener) => {
                let bound = listener.local_addr()?.port();
                if offset > 0 {
                    tracing::warn!("⚠️ STARTUP: Port {} is in use, using {} instead", start, bound);
                }
                return Ok((listener, bound));
            }
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                tracing::debug!("   port {} in use", port);
            }
            Err(e) => return Err(e),
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AddrInUse,
        format!("no free port in {}..{} on {}", start, start.saturating_add(attempts), host),
    ))
}
