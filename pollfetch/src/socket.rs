//! Non-blocking socket setup.

use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::{mem, ptr};

/// Result of issuing `connect` on a non-blocking socket.
///
/// `InProgress` is the expected outcome: the handshake continues in the
/// kernel and completion is signalled by writability.
#[derive(Debug)]
pub enum ConnectOutcome {
    Connected,
    InProgress,
    Failed(io::Error),
}

/// Resolve `host:port` with the platform resolver and take the first address.
pub(crate) fn resolve(host: &str, port: u16) -> io::Result<SocketAddr> {
    (host, port).to_socket_addrs()?.next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("no addresses for {host}"),
        )
    })
}

/// Create a non-blocking TCP socket and start connecting it to `addr`.
///
/// Socket creation errors are returned as `Err`; the connect itself is
/// reported through [`ConnectOutcome`].
pub(crate) fn connect_nonblocking(
    addr: SocketAddr,
    tcp_nodelay: bool,
) -> io::Result<(TcpStream, ConnectOutcome)> {
    let domain = match addr {
        SocketAddr::V4(_) => libc::AF_INET,
        SocketAddr::V6(_) => libc::AF_INET6,
    };

    let fd = unsafe { libc::socket(domain, libc::SOCK_STREAM, 0) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    // Owned from here so every early return closes it.
    let fd = unsafe { OwnedFd::from_raw_fd(fd) };
    set_cloexec(fd.as_raw_fd())?;
    set_nonblocking(fd.as_raw_fd())?;

    let stream = TcpStream::from(fd);
    if tcp_nodelay {
        stream.set_nodelay(true)?;
    }

    let (storage, len) = raw_sockaddr(addr);
    let ret = unsafe {
        libc::connect(
            stream.as_raw_fd(),
            (&storage as *const libc::sockaddr_storage).cast(),
            len,
        )
    };

    let outcome = if ret == 0 {
        ConnectOutcome::Connected
    } else {
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            // An interrupted connect keeps going asynchronously.
            Some(libc::EINPROGRESS) | Some(libc::EINTR) => ConnectOutcome::InProgress,
            _ => ConnectOutcome::Failed(err),
        }
    };
    Ok((stream, outcome))
}

fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn set_cloexec(fd: RawFd) -> io::Result<()> {
    if unsafe { libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Raw socket address for `addr`, with its length.
fn raw_sockaddr(addr: SocketAddr) -> (libc::sockaddr_storage, libc::socklen_t) {
    // Zeroed storage also clears sin_zero and any platform length fields.
    let mut storage: libc::sockaddr_storage = unsafe { mem::zeroed() };
    let len = match addr {
        SocketAddr::V4(v4) => {
            let mut sin: libc::sockaddr_in = unsafe { mem::zeroed() };
            sin.sin_family = libc::AF_INET as libc::sa_family_t;
            sin.sin_port = v4.port().to_be();
            sin.sin_addr = libc::in_addr {
                s_addr: u32::from_ne_bytes(v4.ip().octets()),
            };
            unsafe { ptr::write((&mut storage as *mut libc::sockaddr_storage).cast(), sin) };
            mem::size_of::<libc::sockaddr_in>()
        }
        SocketAddr::V6(v6) => {
            let mut sin6: libc::sockaddr_in6 = unsafe { mem::zeroed() };
            sin6.sin6_family = libc::AF_INET6 as libc::sa_family_t;
            sin6.sin6_port = v6.port().to_be();
            sin6.sin6_flowinfo = v6.flowinfo();
            sin6.sin6_addr = libc::in6_addr {
                s6_addr: v6.ip().octets(),
            };
            sin6.sin6_scope_id = v6.scope_id();
            unsafe { ptr::write((&mut storage as *mut libc::sockaddr_storage).cast(), sin6) };
            mem::size_of::<libc::sockaddr_in6>()
        }
    };
    (storage, len as libc::socklen_t)
}
