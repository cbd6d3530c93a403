//! RCON packet codec over a blocking TCP stream.
//!
//! Packet layout, all integers little-endian i32:
//! ```text
//! length | request id | type | body bytes | 0x00 | 0x00
//! ```
//! `length` counts everything after itself. Long responses arrive as several
//! packets with the request's id. The server splits them by characters, not
//! bytes, so fragment size says nothing about whether more follows; every
//! command is chased by an empty response packet whose echo marks the end.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use super::{Connector, RconError, Transport};

const TYPE_RESPONSE: i32 = 0;
const TYPE_COMMAND: i32 = 2;
const TYPE_LOGIN: i32 = 3;

/// Request id the server answers with when the password is wrong.
const AUTH_FAILED_ID: i32 = -1;

/// Largest command body the server accepts.
const MAX_COMMAND: usize = 1446;
/// id + type + two terminating NULs.
const HEADER_SIZE: usize = 10;
/// Upper bound on an accepted packet; anything larger is garbage.
const MAX_PACKET: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq)]
struct Packet {
    id: i32,
    kind: i32,
    body: Vec<u8>,
}

fn encode(id: i32, kind: i32, body: &[u8]) -> Vec<u8> {
    let length = (HEADER_SIZE + body.len()) as i32;
    let mut buf = Vec::with_capacity(4 + HEADER_SIZE + body.len());
    buf.extend_from_slice(&length.to_le_bytes());
    buf.extend_from_slice(&id.to_le_bytes());
    buf.extend_from_slice(&kind.to_le_bytes());
    buf.extend_from_slice(body);
    buf.extend_from_slice(&[0, 0]);
    buf
}

fn read_i32<R: Read>(reader: &mut R) -> Result<i32, RconError> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_packet<R: Read>(reader: &mut R) -> Result<Packet, RconError> {
    let length = read_i32(reader)?;
    let length = usize::try_from(length)
        .ok()
        .filter(|len| (HEADER_SIZE..=MAX_PACKET).contains(len))
        .ok_or_else(|| RconError::Protocol(format!("invalid packet length {}", length)))?;

    let id = read_i32(reader)?;
    let kind = read_i32(reader)?;
    let mut body = vec![0u8; length - 8];
    reader.read_exact(&mut body)?;

    // Body is followed by two NULs; some servers send only one.
    while body.last() == Some(&0) {
        body.pop();
    }

    Ok(Packet { id, kind, body })
}

/// Authenticated RCON connection.
pub struct RconConnection {
    stream: TcpStream,
    next_id: i32,
}

impl RconConnection {
    /// Connects to `addr` and logs in with `password`.
    ///
    /// `timeout` bounds the connect and every subsequent read and write.
    pub fn connect(addr: SocketAddr, password: &str, timeout: Duration) -> Result<Self, RconError> {
        let stream = TcpStream::connect_timeout(&addr, timeout)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        stream.set_nodelay(true)?;

        let mut conn = Self { stream, next_id: 0 };
        conn.login(password)?;
        Ok(conn)
    }

    fn allocate_id(&mut self) -> i32 {
        // Positive ids only; -1 is reserved for auth failure.
        self.next_id = if self.next_id >= i32::MAX - 1 {
            1
        } else {
            self.next_id + 1
        };
        self.next_id
    }

    fn send(&mut self, id: i32, kind: i32, body: &[u8]) -> Result<(), RconError> {
        self.stream.write_all(&encode(id, kind, body))?;
        self.stream.flush()?;
        Ok(())
    }

    fn login(&mut self, password: &str) -> Result<(), RconError> {
        let id = self.allocate_id();
        self.send(id, TYPE_LOGIN, password.as_bytes())?;

        loop {
            let packet = read_packet(&mut self.stream)?;
            if packet.id == AUTH_FAILED_ID {
                return Err(RconError::Auth);
            }
            // Some servers send an empty response before the auth reply.
            if packet.kind == TYPE_RESPONSE && packet.body.is_empty() {
                continue;
            }
            if packet.id != id {
                return Err(RconError::Protocol(format!(
                    "login reply for request {} while expecting {}",
                    packet.id, id
                )));
            }
            return Ok(());
        }
    }
}

impl Transport for RconConnection {
    fn command(&mut self, command: &str) -> Result<String, RconError> {
        if command.len() > MAX_COMMAND {
            return Err(RconError::CommandTooLong(command.len()));
        }

        let id = self.allocate_id();
        let end = self.allocate_id();
        self.send(id, TYPE_COMMAND, command.as_bytes())?;
        // Requests are answered in order, so the end marker's echo follows the last fragment.
        self.send(end, TYPE_RESPONSE, b"")?;

        let mut response = Vec::new();
        let mut fragments = 0usize;
        loop {
            let packet = read_packet(&mut self.stream)?;
            if packet.id == end {
                break;
            }
            if packet.id != id {
                return Err(RconError::Protocol(format!(
                    "response for request {} while expecting {}",
                    packet.id, id
                )));
            }
            fragments += 1;
            response.extend_from_slice(&packet.body);
        }

        debug!(
            command,
            fragments,
            bytes = response.len(),
            "RCON command completed"
        );
        Ok(String::from_utf8_lossy(&response).into_owned())
    }
}

/// Connects over TCP with a fixed host, port and password.
pub struct TcpConnector {
    host: String,
    port: u16,
    password: String,
    timeout: Duration,
}

impl TcpConnector {
    pub fn new(host: String, port: u16, password: String, timeout: Duration) -> Self {
        Self {
            host,
            port,
            password,
            timeout,
        }
    }
}

impl Connector for TcpConnector {
    type Transport = RconConnection;

    fn connect(&self) -> Result<RconConnection, RconError> {
        let mut last_error = None;
        for addr in (self.host.as_str(), self.port).to_socket_addrs()? {
            match RconConnection::connect(addr, &self.password, self.timeout) {
                Ok(conn) => return Ok(conn),
                Err(RconError::Auth) => return Err(RconError::Auth),
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| {
            RconError::Protocol(format!("{} resolved to no addresses", self.host))
        }))
    }

    fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::net::TcpListener;
    use std::thread;

    /// Largest fragment the server sends, in characters.
    const FRAGMENT_CHARS: usize = 4096;

    /// Runs a one-connection fake server; `handler` sees each decoded command.
    ///
    /// Any other packet type is answered like vanilla does, with an
    /// "Unknown request" reply under the same id.
    fn fake_server<H>(password: &'static str, mut handler: H) -> SocketAddr
    where
        H: FnMut(&str) -> Vec<Vec<u8>> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            while let Ok(packet) = read_packet(&mut stream) {
                let body = String::from_utf8(packet.body).unwrap();
                if packet.kind == TYPE_LOGIN {
                    let id = if body == password { packet.id } else { AUTH_FAILED_ID };
                    stream.write_all(&encode(id, TYPE_COMMAND, b"")).unwrap();
                    continue;
                }
                if packet.kind != TYPE_COMMAND {
                    let reply = format!("Unknown request {:x}", packet.kind);
                    stream
                        .write_all(&encode(packet.id, TYPE_RESPONSE, reply.as_bytes()))
                        .unwrap();
                    continue;
                }
                for chunk in handler(&body) {
                    stream
                        .write_all(&encode(packet.id, TYPE_RESPONSE, &chunk))
                        .unwrap();
                }
            }
        });
        addr
    }

    #[test]
    fn test_encode_layout() {
        let bytes = encode(7, TYPE_COMMAND, b"list");
        assert_eq!(&bytes[0..4], &14i32.to_le_bytes());
        assert_eq!(&bytes[4..8], &7i32.to_le_bytes());
        assert_eq!(&bytes[8..12], &2i32.to_le_bytes());
        assert_eq!(&bytes[12..16], b"list");
        assert_eq!(&bytes[16..], &[0, 0]);
    }

    #[test]
    fn test_read_packet_rejects_bad_length() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&3i32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 16]);
        assert!(matches!(
            read_packet(&mut Cursor::new(bytes)),
            Err(RconError::Protocol(_))
        ));
    }

    #[test]
    fn test_read_packet_truncated() {
        let bytes = encode(1, TYPE_RESPONSE, b"hello");
        let truncated = bytes[..bytes.len() - 4].to_vec();
        assert!(matches!(
            read_packet(&mut Cursor::new(truncated)),
            Err(RconError::Io(_))
        ));
    }

    #[test]
    fn test_login_and_command() {
        let addr = fake_server("secret", |cmd| match cmd {
            "list" => vec![b"There are 1 of a max 20 players online: Notch".to_vec()],
            _ => vec![b"Unknown command".to_vec()],
        });

        let mut conn = RconConnection::connect(addr, "secret", Duration::from_secs(5)).unwrap();
        assert_eq!(
            conn.command("list").unwrap(),
            "There are 1 of a max 20 players online: Notch"
        );
        assert_eq!(conn.command("help").unwrap(), "Unknown command");
    }

    #[test]
    fn test_wrong_password() {
        let addr = fake_server("secret", |_| Vec::new());
        let result = RconConnection::connect(addr, "guess", Duration::from_secs(5));
        assert!(matches!(result, Err(RconError::Auth)));
    }

    #[test]
    fn test_fragmented_response_is_reassembled() {
        let addr = fake_server("secret", |_| {
            vec![vec![b'a'; FRAGMENT_CHARS], vec![b'b'; FRAGMENT_CHARS], b"tail".to_vec()]
        });

        let mut conn = RconConnection::connect(addr, "secret", Duration::from_secs(5)).unwrap();
        let response = conn.command("forge tps").unwrap();
        assert_eq!(response.len(), 2 * FRAGMENT_CHARS + 4);
        assert!(response.starts_with('a'));
        assert!(response.ends_with("btail"));
    }

    #[test]
    fn test_multibyte_fragment_is_not_taken_as_last() {
        let addr = fake_server("secret", |cmd| match cmd {
            "forge entity list" => {
                // 4096 characters, 4097 bytes
                let head = format!("\u{a7}{}", "a".repeat(FRAGMENT_CHARS - 1));
                vec![head.into_bytes(), b"  3: minecraft:cow\n".to_vec()]
            }
            "list" => vec![b"There are 0 of a max 20 players online: ".to_vec()],
            _ => Vec::new(),
        });

        let mut conn = RconConnection::connect(addr, "secret", Duration::from_secs(5)).unwrap();
        let response = conn.command("forge entity list").unwrap();
        assert_eq!(response.len(), FRAGMENT_CHARS + 1 + "  3: minecraft:cow\n".len());
        assert!(response.starts_with('\u{a7}'));
        assert!(response.ends_with("3: minecraft:cow\n"));

        // nothing left over on the socket for the next command
        assert_eq!(
            conn.command("list").unwrap(),
            "There are 0 of a max 20 players online: "
        );
    }

    #[test]
    fn test_exact_fragment_size_response_completes() {
        let addr = fake_server("secret", |_| vec![vec![b'x'; FRAGMENT_CHARS]]);
        let mut conn =
            RconConnection::connect(addr, "secret", Duration::from_millis(500)).unwrap();
        assert_eq!(conn.command("tps").unwrap().len(), FRAGMENT_CHARS);
    }

    #[test]
    fn test_empty_response() {
        let addr = fake_server("secret", |_| vec![Vec::new()]);
        let mut conn = RconConnection::connect(addr, "secret", Duration::from_secs(5)).unwrap();
        assert_eq!(conn.command("save-all").unwrap(), "");
    }

    #[test]
    fn test_command_too_long() {
        let addr = fake_server("secret", |_| Vec::new());
        let mut conn = RconConnection::connect(addr, "secret", Duration::from_secs(5)).unwrap();
        let command = "x".repeat(MAX_COMMAND + 1);
        assert!(matches!(
            conn.command(&command),
            Err(RconError::CommandTooLong(_))
        ));
    }

    #[test]
    fn test_server_gone_is_io_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            // Accept the login, then hang up.
            let (mut stream, _) = listener.accept().unwrap();
            let packet = read_packet(&mut stream).unwrap();
            stream
                .write_all(&encode(packet.id, TYPE_COMMAND, b""))
                .unwrap();
        });

        let mut conn = RconConnection::connect(addr, "any", Duration::from_secs(5)).unwrap();
        assert!(matches!(conn.command("list"), Err(RconError::Io(_))));
    }

    #[test]
    fn test_tcp_connector_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let connector = TcpConnector::new(
            "127.0.0.1".to_string(),
            port,
            "secret".to_string(),
            Duration::from_millis(500),
        );
        assert_eq!(connector.endpoint(), format!("127.0.0.1:{port}"));
        assert!(matches!(connector.connect(), Err(RconError::Io(_))));
    }
}
