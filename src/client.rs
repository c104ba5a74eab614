//! Connection manager: owns the socket to a core client and frames
//! request/reply byte streams over it.
//!
//! One request may be outstanding at a time; [`crate::rpc::Rpc`] borrows the
//! client mutably for the duration of an exchange.

use crate::rpc::Rpc;
use boincrpc_proto::{self as proto, auth, xml, LineStream, MFile, Result, RpcError};
use mio::{Events, Interest, Poll, Token};
use nix::errno::Errno;
use nix::sys::socket::{getsockopt, sockopt};
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::os::fd::OwnedFd;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::{Duration, Instant};

/// Receive timeout applied to every established connection.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(30);

const CONNECTING: Token = Token(0);

/// Size of each `read` off the socket.
const READ_CHUNK: usize = 8192;

enum Transport {
    Tcp(TcpStream),
    Unix(UnixStream),
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Transport::Tcp(s) => s.read(buf),
            Transport::Unix(s) => s.read(buf),
        }
    }
}

impl Write for Transport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Transport::Tcp(s) => s.write(buf),
            Transport::Unix(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Transport::Tcp(s) => s.flush(),
            Transport::Unix(s) => s.flush(),
        }
    }
}

/// State of a non-blocking connect between `init_asynch` and the poll that
/// settles it.
struct Pending {
    addr: SocketAddr,
    stream: Option<mio::net::TcpStream>,
    poll: Poll,
    events: Events,
    start: Instant,
    timeout: Duration,
    retry: bool,
}

impl Pending {
    /// Open a fresh non-blocking socket and issue `connect`.
    fn open(&mut self) -> io::Result<()> {
        if let Some(mut old) = self.stream.take() {
            let _ = self.poll.registry().deregister(&mut old);
        }
        let mut stream = mio::net::TcpStream::connect(self.addr)?;
        self.poll.registry().register(
            &mut stream,
            CONNECTING,
            Interest::READABLE.add(Interest::WRITABLE),
        )?;
        self.stream = Some(stream);
        Ok(())
    }

    fn expired(&self) -> bool {
        self.start.elapsed() > self.timeout
    }

    /// Returns the connected stream once the handshake has completed.
    fn poll_connect(&mut self) -> Result<Option<TcpStream>> {
        if self.stream.is_none() {
            self.open().map_err(RpcError::Connect)?;
        }

        match self.poll.poll(&mut self.events, Some(Duration::ZERO)) {
            Ok(()) => {}
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => return Ok(None),
            Err(e) => return Err(RpcError::Select(e)),
        }
        if !self.events.is_empty() {
            log::debug!("connect to {}: socket ready", self.addr);
        }

        let Some(stream) = self.stream.as_ref() else {
            return Ok(None);
        };
        let so_error = getsockopt(stream, sockopt::SocketError)
            .map_err(|e| RpcError::Select(io::Error::from(e)))?;
        if so_error != 0 {
            return Err(RpcError::Connect(io::Error::from_raw_os_error(so_error)));
        }
        match stream.peer_addr() {
            Ok(_) => {}
            Err(ref e)
                if e.kind() == io::ErrorKind::NotConnected
                    || e.raw_os_error() == Some(Errno::EINPROGRESS as i32) =>
            {
                return Ok(None);
            }
            Err(e) => return Err(RpcError::Connect(e)),
        }

        let Some(mut stream) = self.stream.take() else {
            return Ok(None);
        };
        self.poll
            .registry()
            .deregister(&mut stream)
            .map_err(RpcError::Socket)?;
        Ok(Some(TcpStream::from(OwnedFd::from(stream))))
    }
}

pub(crate) fn not_connected() -> RpcError {
    RpcError::Connect(io::Error::new(io::ErrorKind::NotConnected, "not connected"))
}

/// Resolve `host` (loopback when empty) to a socket address.
fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    if host.is_empty() {
        return Ok(SocketAddr::from(([127, 0, 0, 1], port)));
    }
    let mut addrs = (host, port).to_socket_addrs().map_err(|e| {
        log::debug!("resolving {} failed: {}", host, e);
        RpcError::GetHostByName(host.to_string())
    })?;
    addrs
        .next()
        .ok_or_else(|| RpcError::GetHostByName(host.to_string()))
}

/// Accumulate reply bytes from `src` until the sentinel arrives.
///
/// The returned buffer holds everything before the sentinel. End of stream
/// or a read error before the sentinel is a `Read` error.
pub fn read_reply<R: Read>(src: &mut R) -> Result<Vec<u8>> {
    let mut acc = MFile::new();
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        let n = match src.read(&mut chunk) {
            Ok(0) => {
                return Err(RpcError::Read(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed before end of reply",
                )));
            }
            Ok(n) => n,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(RpcError::Read(e)),
        };
        if let Some(pos) = proto::find_sentinel(&chunk[..n]) {
            acc.append(&chunk[..pos]);
            return Ok(acc.into_bytes());
        }
        acc.append(&chunk[..n]);
    }
}

/// A client connection to a core client's GUI RPC endpoint.
#[derive(Default)]
pub struct RpcClient {
    stream: Option<Transport>,
    pending: Option<Pending>,
}

impl RpcClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// True between `init_asynch` and the `init_poll` call that settles it.
    pub fn is_connecting(&self) -> bool {
        self.pending.is_some()
    }

    /// Connect synchronously over TCP. An empty `host` means loopback.
    pub fn init(&mut self, host: &str, port: u16) -> Result<()> {
        self.close();
        let addr = resolve(host, port)?;
        log::debug!("connecting to {}", addr);
        let stream = TcpStream::connect(addr).map_err(RpcError::Connect)?;
        stream
            .set_read_timeout(Some(RECV_TIMEOUT))
            .map_err(RpcError::Socket)?;
        self.stream = Some(Transport::Tcp(stream));
        Ok(())
    }

    /// Start a non-blocking TCP connect. Follow with [`RpcClient::init_poll`]
    /// until it stops returning [`RpcError::Retry`].
    ///
    /// With `retry` set, a refused or failed connect is reissued on the next
    /// poll until `timeout` has elapsed.
    pub fn init_asynch(
        &mut self,
        host: &str,
        timeout: Duration,
        retry: bool,
        port: u16,
    ) -> Result<()> {
        self.close();
        let addr = resolve(host, port)?;
        let poll = Poll::new().map_err(RpcError::Socket)?;
        let mut pending = Pending {
            addr,
            stream: None,
            poll,
            events: Events::with_capacity(4),
            start: Instant::now(),
            timeout,
            retry,
        };
        log::debug!("starting asynchronous connect to {}", addr);
        match pending.open() {
            Ok(()) => {}
            Err(e) if retry => log::debug!("connect to {} failed ({}), will retry", addr, e),
            Err(e) => return Err(RpcError::Connect(e)),
        }
        self.pending = Some(pending);
        Ok(())
    }

    /// Drive an asynchronous connect. `Ok(())` once connected, `Retry` while
    /// still in progress, any other error once the attempt is abandoned.
    pub fn init_poll(&mut self) -> Result<()> {
        let Some(pending) = self.pending.as_mut() else {
            return if self.stream.is_some() {
                Ok(())
            } else {
                Err(not_connected())
            };
        };

        match pending.poll_connect() {
            Ok(Some(stream)) => {
                log::debug!("connected to {}", pending.addr);
                self.pending = None;
                stream.set_nonblocking(false).map_err(RpcError::Socket)?;
                stream
                    .set_read_timeout(Some(RECV_TIMEOUT))
                    .map_err(RpcError::Socket)?;
                self.stream = Some(Transport::Tcp(stream));
                Ok(())
            }
            Ok(None) => {
                if pending.expired() {
                    log::debug!("connect to {} timed out", pending.addr);
                    self.pending = None;
                    return Err(RpcError::Connect(io::Error::new(
                        io::ErrorKind::TimedOut,
                        "connect timed out",
                    )));
                }
                Err(RpcError::Retry)
            }
            Err(RpcError::Connect(e)) if pending.retry && !pending.expired() => {
                log::warn!("connect to {} failed: {}; retrying", pending.addr, e);
                if let Err(e) = pending.open() {
                    log::debug!("reconnect to {} failed: {}", pending.addr, e);
                }
                Err(RpcError::Retry)
            }
            Err(e) => {
                self.pending = None;
                Err(e)
            }
        }
    }

    /// Connect to the core client's Unix-domain socket in the working directory.
    pub fn init_unix_domain(&mut self) -> Result<()> {
        self.init_unix_domain_at(proto::GUI_RPC_FILE)
    }

    pub fn init_unix_domain_at(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.close();
        let path = path.as_ref();
        log::debug!("connecting to {}", path.display());
        let stream = UnixStream::connect(path).map_err(RpcError::Connect)?;
        stream
            .set_read_timeout(Some(RECV_TIMEOUT))
            .map_err(RpcError::Socket)?;
        self.stream = Some(Transport::Unix(stream));
        Ok(())
    }

    /// Nonce challenge: `<auth1/>`, then `<auth2>` carrying
    /// MD5(nonce + password).
    pub fn authorize(&mut self, password: &str) -> Result<()> {
        let nonce = {
            let mut rpc = Rpc::new(self);
            rpc.do_rpc("<auth1/>\n")?;
            let mut fin = rpc.stream();
            let mut nonce = None;
            while let Some(line) = fin.next_line() {
                let mut value = String::new();
                if xml::parse_str(&line, "nonce", &mut value) {
                    nonce = Some(value);
                    break;
                }
            }
            nonce
        };
        let Some(nonce) = nonce else {
            log::warn!("auth1 reply carried no nonce");
            return Err(RpcError::Authenticator);
        };

        let request = format!(
            "<auth2>\n<nonce_hash>{}</nonce_hash>\n</auth2>\n",
            auth::nonce_hash(&nonce, password)
        );
        let mut rpc = Rpc::new(self);
        rpc.do_rpc(&request)?;
        let mut fin = rpc.stream();
        while let Some(line) = fin.next_line() {
            if xml::match_tag(&line, "<authorized/>") {
                return Ok(());
            }
            if xml::match_tag(&line, "<unauthorized/>") {
                break;
            }
        }
        log::warn!("core client rejected the password");
        Err(RpcError::Authenticator)
    }

    /// Frame `payload` and write it to the socket.
    pub fn send_request(&mut self, payload: &str) -> Result<()> {
        let stream = self.stream.as_mut().ok_or_else(not_connected)?;
        let buf = proto::encode_request(payload);
        log::debug!("sending request ({} bytes)", buf.len());
        stream.write_all(&buf).map_err(RpcError::Write)
    }

    /// Read one complete reply, without its sentinel.
    pub fn get_reply(&mut self) -> Result<Vec<u8>> {
        let stream = self.stream.as_mut().ok_or_else(not_connected)?;
        let reply = read_reply(stream)?;
        log::debug!("received reply ({} bytes)", reply.len());
        Ok(reply)
    }

    /// Drop the connection, or abandon an in-progress connect. Safe to call
    /// any number of times.
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            log::debug!("connection closed");
        }
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{envelope, MockPeer};
    use proptest::prelude::*;
    use std::net::TcpListener;
    use std::os::unix::net::UnixListener;

    /// Yields `data` in pieces of the given sizes, then the remainder.
    struct ChunkedReader {
        data: Vec<u8>,
        sizes: Vec<usize>,
        pos: usize,
        call: usize,
    }

    impl ChunkedReader {
        fn new(data: &[u8], sizes: Vec<usize>) -> Self {
            Self {
                data: data.to_vec(),
                sizes,
                pos: 0,
                call: 0,
            }
        }
    }

    impl Read for ChunkedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let left = self.data.len() - self.pos;
            let want = self
                .sizes
                .get(self.call)
                .copied()
                .unwrap_or(left)
                .max(1)
                .min(left)
                .min(buf.len());
            self.call += 1;
            buf[..want].copy_from_slice(&self.data[self.pos..self.pos + want]);
            self.pos += want;
            Ok(want)
        }
    }

    fn refused_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    fn poll_until_settled(client: &mut RpcClient) -> Result<()> {
        for _ in 0..500 {
            match client.init_poll() {
                Err(RpcError::Retry) => std::thread::sleep(Duration::from_millis(10)),
                other => return other,
            }
        }
        panic!("asynchronous connect never settled");
    }

    #[test]
    fn read_reply_stops_at_sentinel() {
        let mut src = ChunkedReader::new(b"<a>\n</a>\n\x03trailing", vec![3, 4]);
        assert_eq!(read_reply(&mut src).unwrap(), b"<a>\n</a>\n".to_vec());
    }

    #[test]
    fn read_reply_eof_before_sentinel() {
        let mut src = ChunkedReader::new(b"<success/>\n", vec![]);
        assert!(matches!(read_reply(&mut src), Err(RpcError::Read(_))));
    }

    #[test]
    fn sentinel_alone_in_final_chunk() {
        let mut src = ChunkedReader::new(b"abc\x03", vec![3, 1]);
        assert_eq!(read_reply(&mut src).unwrap(), b"abc".to_vec());
    }

    proptest! {
        #[test]
        fn sentinel_found_at_any_chunk_boundary(
            body in "[a-z<>/\n]{0,300}",
            sizes in proptest::collection::vec(1usize..40, 0..20),
        ) {
            let mut data = body.clone().into_bytes();
            data.push(proto::SENTINEL);
            let mut src = ChunkedReader::new(&data, sizes);
            prop_assert_eq!(read_reply(&mut src).unwrap(), body.into_bytes());
        }
    }

    #[test]
    fn close_is_idempotent() {
        let mut client = RpcClient::new();
        client.close();
        client.close();
        assert!(!client.is_connected());

        let peer = MockPeer::spawn(vec![envelope("<success/>\n")]);
        client.init("127.0.0.1", peer.port).unwrap();
        assert!(client.is_connected());
        client.close();
        client.close();
        assert!(!client.is_connected());

        let peer2 = MockPeer::spawn(vec![envelope("<success/>\n")]);
        client.init("127.0.0.1", peer2.port).unwrap();
        let mut rpc = Rpc::new(&mut client);
        rpc.do_rpc("<run_benchmarks/>\n").unwrap();
        rpc.parse_reply().unwrap();
        drop(peer);
        assert_eq!(peer2.requests().len(), 1);
    }

    #[test]
    fn framing_round_trip_through_echo_peer() {
        let peer = MockPeer::spawn_with(1, |request| request.to_string());
        let mut client = RpcClient::new();
        client.init("", peer.port).unwrap();
        client.send_request("<get_state/>\n").unwrap();
        let reply = client.get_reply().unwrap();
        assert_eq!(
            reply,
            b"<boinc_gui_rpc_request>\n<get_state/>\n</boinc_gui_rpc_request>\n".to_vec()
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn echo_peer_returns_any_payload_framed(
            payloads in proptest::collection::vec("[^\\x03]{0,200}", 1..4),
        ) {
            let peer = MockPeer::spawn_with(payloads.len(), |request| request.to_string());
            let mut client = RpcClient::new();
            client.init("", peer.port).unwrap();
            for payload in &payloads {
                client.send_request(payload).unwrap();
                let expected =
                    format!("{}{}{}", proto::request::OPEN, payload, proto::request::CLOSE);
                prop_assert_eq!(client.get_reply().unwrap(), expected.into_bytes());
            }
            client.close();
            prop_assert_eq!(peer.requests().len(), payloads.len());
        }
    }

    #[test]
    fn init_refused() {
        let port = refused_port();
        let mut client = RpcClient::new();
        let err = client.init("127.0.0.1", port).unwrap_err();
        assert!(matches!(err, RpcError::Connect(_)));
        assert!(!client.is_connected());
    }

    #[test]
    fn init_unknown_host() {
        let mut client = RpcClient::new();
        let err = client.init("no-such-host.invalid", 31416).unwrap_err();
        assert!(matches!(err, RpcError::GetHostByName(_)));
    }

    #[test]
    fn send_without_connection() {
        let mut client = RpcClient::new();
        assert!(matches!(
            client.send_request("<quit/>\n"),
            Err(RpcError::Connect(_))
        ));
        assert!(matches!(client.get_reply(), Err(RpcError::Connect(_))));
    }

    #[test]
    fn asynch_connect_settles() {
        let peer = MockPeer::spawn(vec![envelope("<success/>\n")]);
        let mut client = RpcClient::new();
        client
            .init_asynch("127.0.0.1", Duration::from_secs(5), false, peer.port)
            .unwrap();
        assert!(client.is_connecting());
        poll_until_settled(&mut client).unwrap();
        assert!(client.is_connected());
        assert!(!client.is_connecting());

        client.run_benchmarks().unwrap();
        assert!(peer.requests()[0].contains("<run_benchmarks/>"));
    }

    #[test]
    fn asynch_connect_refused_without_retry() {
        let port = refused_port();
        let mut client = RpcClient::new();
        match client.init_asynch("127.0.0.1", Duration::from_secs(5), false, port) {
            Err(e) => assert!(matches!(e, RpcError::Connect(_))),
            Ok(()) => {
                let err = poll_until_settled(&mut client).unwrap_err();
                assert!(matches!(err, RpcError::Connect(_)));
            }
        }
        assert!(!client.is_connecting());
        assert!(!client.is_connected());
    }

    #[test]
    fn asynch_retry_gives_up_after_timeout() {
        let port = refused_port();
        let mut client = RpcClient::new();
        client
            .init_asynch("127.0.0.1", Duration::from_millis(100), true, port)
            .unwrap();
        let err = poll_until_settled(&mut client).unwrap_err();
        assert!(matches!(err, RpcError::Connect(_)));
    }

    #[test]
    fn init_poll_without_connect() {
        let mut client = RpcClient::new();
        assert!(matches!(client.init_poll(), Err(RpcError::Connect(_))));
    }

    #[test]
    fn unix_domain_exchange() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boinc_socket");
        let listener = UnixListener::bind(&path).unwrap();
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_reply(&mut stream).unwrap();
            stream.write_all(envelope("<success/>\n").as_bytes()).unwrap();
            stream.write_all(&[proto::SENTINEL]).unwrap();
            String::from_utf8(request).unwrap()
        });

        let mut client = RpcClient::new();
        client.init_unix_domain_at(&path).unwrap();
        client.quit().unwrap();
        assert!(server.join().unwrap().contains("<quit/>"));
    }

    fn auth_peer(nonce: &'static str, expected: String) -> MockPeer {
        MockPeer::spawn_with(2, move |request| {
            if request.contains("<auth1/>") {
                envelope(&format!("<nonce>{}</nonce>\n", nonce))
            } else if request.contains(&format!("<nonce_hash>{}</nonce_hash>", expected)) {
                envelope("<authorized/>\n")
            } else {
                envelope("<unauthorized/>\n")
            }
        })
    }

    #[test]
    fn authorize_with_matching_hash() {
        // MD5("abc")
        let peer = auth_peer("ab", "900150983cd24fb0d6963f7d28e17f72".to_string());
        let mut client = RpcClient::new();
        client.init("127.0.0.1", peer.port).unwrap();
        client.authorize("c").unwrap();
        let requests = peer.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].contains(&auth::nonce_hash("ab", "c")));
    }

    #[test]
    fn authorize_with_wrong_password() {
        let peer = auth_peer("ab", "900150983cd24fb0d6963f7d28e17f72".to_string());
        let mut client = RpcClient::new();
        client.init("127.0.0.1", peer.port).unwrap();
        assert!(matches!(
            client.authorize("wrong"),
            Err(RpcError::Authenticator)
        ));
        // not connection-fatal
        assert!(client.is_connected());
    }

    #[test]
    fn authorize_without_nonce() {
        let peer = MockPeer::spawn(vec![envelope("<error>no nonce here</error>\n")]);
        let mut client = RpcClient::new();
        client.init("127.0.0.1", peer.port).unwrap();
        assert!(matches!(
            client.authorize("pw"),
            Err(RpcError::Authenticator)
        ));
    }
}
