use std::io;
use std::net::Ipv4Addr;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::mem;

use super::{Event, Interrupt, PacketSource};
use crate::config::{CaptureProtocol, Config};
use crate::error::errno;
use crate::{Error, Result, debug};

/// Size of the receive buffer; large enough for any IPv4 datagram.
pub const RECV_BUF_LEN: usize = 65_536;

/// An `AF_INET`/`SOCK_RAW` socket bound to a local address for a single
/// transport protocol. Every datagram it delivers starts with the IPv4 header.
#[derive(Debug)]
pub struct RawSocket {
    fd: OwnedFd,
    interrupt: Interrupt,
    host: Ipv4Addr,
    protocol: CaptureProtocol,
}

impl RawSocket {
    /// Opens a raw socket for `config.protocol`, binds it to `config.host`,
    /// enables `IP_HDRINCL`, and starts routing SIGINT/SIGTERM to the socket's
    /// wait.
    ///
    /// Requires `CAP_NET_RAW`.
    ///
    /// # Errors
    ///
    /// Returns [Error::Setup] if any step fails. The descriptor is closed
    /// before returning.
    pub fn open(config: &Config) -> Result<Self> {
        let interrupt = Interrupt::new().map_err(Error::Setup)?;
        Self::with_interrupt(config, interrupt)
    }

    /// Like [RawSocket::open], but waits on an [Interrupt] the caller set up
    /// earlier, so signals arriving before the socket exists are not lost.
    ///
    /// # Errors
    ///
    /// Returns [Error::Setup] if any step fails.
    pub fn with_interrupt(config: &Config, interrupt: Interrupt) -> Result<Self> {
        let fd = unsafe {
            libc::socket(
                libc::AF_INET,
                libc::SOCK_RAW | libc::SOCK_CLOEXEC,
                config.protocol.as_raw(),
            )
        };
        if fd == -1 {
            return Err(Error::Setup(errno!("failed to create raw socket")));
        }

        // SAFETY: `fd` was just returned by `socket` and is owned here; it is
        // closed on every early return below.
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };

        let mut addr: libc::sockaddr_in = unsafe { mem::zeroed() };
        addr.sin_family = libc::AF_INET as libc::sa_family_t;
        addr.sin_port = 0;
        addr.sin_addr = libc::in_addr {
            // Octets are already in network order.
            s_addr: u32::from_ne_bytes(config.host.octets()),
        };

        if unsafe {
            libc::bind(
                fd.as_raw_fd(),
                &raw const addr as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
            )
        } == -1
        {
            return Err(Error::Setup(errno!(
                "failed to bind raw socket to {}",
                config.host
            )));
        }

        let on: libc::c_int = 1;
        if unsafe {
            libc::setsockopt(
                fd.as_raw_fd(),
                libc::IPPROTO_IP,
                libc::IP_HDRINCL,
                &raw const on as *const libc::c_void,
                mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        } == -1
        {
            return Err(Error::Setup(errno!("failed to set IP_HDRINCL on raw socket")));
        }

        Ok(Self {
            fd,
            interrupt,
            host: config.host,
            protocol: config.protocol,
        })
    }

    /// Returns the address the socket is bound to.
    pub fn host(&self) -> Ipv4Addr {
        self.host
    }

    /// Returns the protocol the socket was opened for.
    pub fn protocol(&self) -> CaptureProtocol {
        self.protocol
    }

    /// Waits until either a datagram or an interrupt signal is ready.
    ///
    /// Returns `true` if an interrupt is pending.
    fn wait(&self) -> io::Result<bool> {
        let mut fds = [
            libc::pollfd {
                fd: self.interrupt.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            },
            libc::pollfd {
                fd: self.fd.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            },
        ];

        loop {
            let n = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, -1) };

            if n == -1 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(io::Error::new(
                    err.kind(),
                    format!("failed to wait on raw socket: {err}"),
                ));
            }

            // Interrupts take priority over queued datagrams.
            if fds[0].revents & libc::POLLIN != 0 {
                return Ok(true);
            }

            if fds[1].revents != 0 {
                return Ok(false);
            }
        }
    }
}

impl PacketSource for RawSocket {
    fn next_packet(&mut self, buf: &mut [u8]) -> Result<Event> {
        if self.wait()? {
            let signo = self.interrupt.take()?;
            debug!("caught signal {signo}");
            return Ok(Event::Interrupted);
        }

        let n = unsafe {
            libc::recv(
                self.fd.as_raw_fd(),
                buf.as_mut_ptr() as *mut libc::c_void,
                buf.len(),
                0,
            )
        };

        if n == -1 {
            return Err(Error::Io(errno!("failed to receive from raw socket")));
        }

        Ok(Event::Packet(n as usize))
    }
}

impl AsRawFd for RawSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_reports_setup_failure_or_binds() {
        // Raw sockets need CAP_NET_RAW; either outcome must be well-formed.
        let config = Config {
            host: Ipv4Addr::LOCALHOST,
            protocol: CaptureProtocol::Icmp,
            dump_payload: false,
        };

        match RawSocket::open(&config) {
            Ok(sock) => {
                assert_eq!(sock.host(), Ipv4Addr::LOCALHOST);
                assert_eq!(sock.protocol(), CaptureProtocol::Icmp);
                assert!(sock.as_raw_fd() >= 0);
            }
            Err(err) => {
                assert!(matches!(err, Error::Setup(_)));
                assert!(err.to_string().starts_with("socket setup failed: "));
            }
        }
    }

    fn loopback_icmp() -> Config {
        Config {
            host: Ipv4Addr::LOCALHOST,
            protocol: CaptureProtocol::Icmp,
            dump_payload: false,
        }
    }

    fn checksum(bytes: &[u8]) -> u16 {
        let mut sum = 0u32;
        for chunk in bytes.chunks(2) {
            let hi = chunk[0] as u32;
            let lo = chunk.get(1).copied().unwrap_or(0) as u32;
            sum += (hi << 8) | lo;
        }
        while sum > 0xFFFF {
            sum = (sum & 0xFFFF) + (sum >> 16);
        }
        !(sum as u16)
    }

    #[test]
    fn raised_sigint_unblocks_wait() {
        // Needs CAP_NET_RAW.
        let mut sock = match RawSocket::open(&loopback_icmp()) {
            Ok(sock) => sock,
            Err(Error::Setup(_)) => return,
            Err(err) => panic!("unexpected error: {err}"),
        };

        assert_eq!(unsafe { libc::raise(libc::SIGINT) }, 0);

        let mut buf = vec![0u8; RECV_BUF_LEN];
        assert_eq!(sock.next_packet(&mut buf).unwrap(), Event::Interrupted);
    }

    #[test]
    fn receives_icmp_echo_on_loopback() {
        // Needs CAP_NET_RAW.
        let mut sock = match RawSocket::open(&loopback_icmp()) {
            Ok(sock) => sock,
            Err(Error::Setup(_)) => return,
            Err(err) => panic!("unexpected error: {err}"),
        };

        let mut datagram = [0u8; 28];
        datagram[0] = 0x45;
        datagram[8] = 64;
        datagram[9] = libc::IPPROTO_ICMP as u8;
        datagram[12..16].copy_from_slice(&[127, 0, 0, 1]);
        datagram[16..20].copy_from_slice(&[127, 0, 0, 1]);
        // Echo request, id 0x1234, sequence 1.
        datagram[20] = 8;
        datagram[24..26].copy_from_slice(&0x1234u16.to_be_bytes());
        datagram[26..28].copy_from_slice(&1u16.to_be_bytes());
        let icmp_sum = checksum(&datagram[20..]);
        datagram[22..24].copy_from_slice(&icmp_sum.to_be_bytes());

        let mut dst: libc::sockaddr_in = unsafe { mem::zeroed() };
        dst.sin_family = libc::AF_INET as libc::sa_family_t;
        dst.sin_addr = libc::in_addr {
            s_addr: u32::from_ne_bytes([127, 0, 0, 1]),
        };

        let sent = unsafe {
            libc::sendto(
                sock.as_raw_fd(),
                datagram.as_ptr() as *const libc::c_void,
                datagram.len(),
                0,
                &raw const dst as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
            )
        };
        assert_eq!(sent, datagram.len() as isize);

        let mut buf = vec![0u8; RECV_BUF_LEN];
        let Event::Packet(n) = sock.next_packet(&mut buf).unwrap() else {
            panic!("expected a packet");
        };

        let header = crate::parse::decode(&buf[..n]).unwrap();
        assert_eq!(
            crate::parse::format_summary(&header),
            "Protocol: ICMP 127.0.0.1 -> 127.0.0.1"
        );
        assert!(n >= 28);
    }

    #[test]
    fn buffer_fits_largest_datagram() {
        assert!(RECV_BUF_LEN > u16::MAX as usize);
    }
}
