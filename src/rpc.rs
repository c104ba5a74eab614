//! A single request/reply exchange over an [`RpcClient`].

use crate::client::{not_connected, RpcClient};
use crate::types::{parse_list, Parse};
use boincrpc_proto::xml::{match_tag, parse_int, parse_str};
use boincrpc_proto::{LineStream, MemStream, Result, RpcError};

/// Borrows the client for one exchange, so a second request cannot be sent
/// until this reply has been dropped.
pub struct Rpc<'a> {
    client: &'a mut RpcClient,
    reply: String,
}

impl<'a> Rpc<'a> {
    pub fn new(client: &'a mut RpcClient) -> Self {
        Self {
            client,
            reply: String::new(),
        }
    }

    /// Send `request` and read the whole reply. Success only means the
    /// exchange completed; use [`Rpc::parse_reply`] or the typed parsers for
    /// the peer's verdict.
    pub fn do_rpc(&mut self, request: &str) -> Result<()> {
        if !self.client.is_connected() {
            return Err(not_connected());
        }
        self.client.send_request(request)?;
        let bytes = self.client.get_reply()?;
        self.reply = String::from_utf8_lossy(&bytes).into_owned();
        // The line reader ignores an unterminated tail; the sentinel ends
        // the last line.
        if !self.reply.is_empty() && !self.reply.ends_with('\n') {
            self.reply.push('\n');
        }
        Ok(())
    }

    /// Line reader positioned at the start of the reply.
    pub fn stream(&self) -> MemStream<'_> {
        MemStream::new(&self.reply)
    }

    pub fn reply(&self) -> &str {
        &self.reply
    }

    /// Interpret a generic status reply.
    pub fn parse_reply(&self) -> Result<()> {
        parse_reply(&mut self.stream())
    }

    /// Find the first `<T::TAG>` element in the reply and parse it. An
    /// `<error>` or `<unauthorized/>` reply is reported as such.
    pub fn parse_element<T: Parse + Default>(&self) -> Result<T> {
        let open = format!("<{}>", T::TAG);
        let mut fin = self.stream();
        while let Some(line) = fin.next_line() {
            if match_tag(&line, &open) {
                let mut item = T::default();
                item.parse(&mut fin)?;
                return Ok(item);
            }
            if let Some(err) = reply_error(&line) {
                return Err(err);
            }
        }
        Err(RpcError::XmlParse(T::TAG.to_string()))
    }

    /// Parse every `<T::TAG>` child of the first `<list_tag>` element.
    pub fn parse_list<T: Parse + Default>(&self, list_tag: &str) -> Result<Vec<T>> {
        let open = format!("<{}>", list_tag);
        let empty = format!("<{}/>", list_tag);
        let mut fin = self.stream();
        while let Some(line) = fin.next_line() {
            if match_tag(&line, &open) {
                return parse_list(&mut fin, list_tag);
            }
            if match_tag(&line, &empty) {
                return Ok(Vec::new());
            }
            if let Some(err) = reply_error(&line) {
                return Err(err);
            }
        }
        Err(RpcError::XmlParse(list_tag.to_string()))
    }
}

/// Error carried by a single reply line, if any.
pub(crate) fn reply_error(line: &str) -> Option<RpcError> {
    if match_tag(line, "<unauthorized/>") {
        return Some(RpcError::Authenticator);
    }
    let mut msg = String::new();
    if parse_str(line, "error", &mut msg) {
        return Some(error_from_message(&msg));
    }
    None
}

/// Scan a reply for `<success/>`, `<status>N</status>`, `<unauthorized/>`
/// or `<error>message</error>`.
pub fn parse_reply(input: &mut dyn LineStream) -> Result<()> {
    while let Some(line) = input.next_line() {
        if match_tag(&line, "<success/>") {
            return Ok(());
        }
        let mut status = 0;
        if parse_int(&line, "status", &mut status) {
            return match status {
                0 => Ok(()),
                n => Err(RpcError::Status(n)),
            };
        }
        if let Some(err) = reply_error(&line) {
            return Err(err);
        }
    }
    Err(RpcError::XmlParse("boinc_gui_rpc_reply".to_string()))
}

/// Map the peer's English error text to an error. Only this function knows
/// the message vocabulary.
pub fn error_from_message(msg: &str) -> RpcError {
    if msg.contains("unauthorized") || msg.contains("Missing authenticator") {
        RpcError::Authenticator
    } else if msg.contains("Missing URL") {
        RpcError::InvalidUrl
    } else if msg.contains("Already attached to project") {
        RpcError::AlreadyAttached
    } else {
        RpcError::Failed(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{envelope, MockPeer};
    use crate::types::Project;

    fn scan(body: &str) -> Result<()> {
        let reply = envelope(body);
        parse_reply(&mut MemStream::new(&reply))
    }

    #[test]
    fn success_and_zero_status() {
        assert!(scan("<success/>\n").is_ok());
        assert!(scan("<status>0</status>\n").is_ok());
    }

    #[test]
    fn nonzero_status() {
        assert!(matches!(scan("<status>-136</status>\n"), Err(RpcError::Status(-136))));
    }

    #[test]
    fn unauthorized_tag() {
        assert!(matches!(scan("<unauthorized/>\n"), Err(RpcError::Authenticator)));
    }

    #[test]
    fn reply_without_verdict() {
        assert!(matches!(scan("<something_else/>\n"), Err(RpcError::XmlParse(_))));
    }

    #[yare::parameterized(
        unauthorized      = { "unauthorized",                    -155 },
        missing_auth      = { "Missing authenticator",           -155 },
        missing_url       = { "Missing URL",                     -189 },
        already_attached  = { "Already attached to project",     -130 },
        unmapped          = { "No such project",                 -1 },
    )]
    fn error_messages_map_to_codes(msg: &str, code: i32) {
        let err = scan(&format!("<error>{}</error>\n", msg)).unwrap_err();
        assert_eq!(err.code(), code);
    }

    #[test]
    fn unmapped_error_keeps_text() {
        match error_from_message("disk full") {
            RpcError::Failed(text) => assert_eq!(text, "disk full"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn do_rpc_requires_connection() {
        let mut client = RpcClient::new();
        let mut rpc = Rpc::new(&mut client);
        assert!(matches!(rpc.do_rpc("<get_state/>\n"), Err(RpcError::Connect(_))));
    }

    #[test]
    fn unterminated_last_line_is_still_read() {
        let peer = MockPeer::spawn(vec!["<success/>".to_string()]);
        let mut client = RpcClient::new();
        client.init("127.0.0.1", peer.port).unwrap();
        let mut rpc = Rpc::new(&mut client);
        rpc.do_rpc("<run_benchmarks/>\n").unwrap();
        assert_eq!(rpc.reply(), "<success/>\n");
        rpc.parse_reply().unwrap();
    }

    #[test]
    fn parse_element_reports_peer_error() {
        let peer = MockPeer::spawn(vec![envelope("<error>unauthorized</error>\n")]);
        let mut client = RpcClient::new();
        client.init("127.0.0.1", peer.port).unwrap();
        let mut rpc = Rpc::new(&mut client);
        rpc.do_rpc("<get_project_status/>\n").unwrap();
        assert!(matches!(
            rpc.parse_element::<Project>(),
            Err(RpcError::Authenticator)
        ));
    }

    #[test]
    fn parse_list_finds_children() {
        let body = "<projects>\n<project>\n<master_url>https://a/</master_url>\n</project>\n\
                    <project>\n<master_url>https://b/</master_url>\n</project>\n</projects>\n";
        let peer = MockPeer::spawn(vec![envelope(body), envelope("<projects/>\n")]);
        let mut client = RpcClient::new();
        client.init("127.0.0.1", peer.port).unwrap();

        let mut rpc = Rpc::new(&mut client);
        rpc.do_rpc("<get_project_status/>\n").unwrap();
        let projects = rpc.parse_list::<Project>("projects").unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[1].master_url, "https://b/");

        rpc.do_rpc("<get_project_status/>\n").unwrap();
        assert!(rpc.parse_list::<Project>("projects").unwrap().is_empty());
    }
}
