use super::{yes_no, Parse};
use boincrpc_proto::xml::{match_tag, parse_bool, parse_int, parse_str};
use boincrpc_proto::{LineStream, Result, RpcError};
use serde::Serialize;
use std::io::{self, Write};

/// The account manager the core client is using, if any.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AcctMgrInfo {
    pub acct_mgr_name: String,
    pub acct_mgr_url: String,
    pub have_credentials: bool,
    pub cookie_required: bool,
    pub cookie_failure_url: String,
}

impl AcctMgrInfo {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_attached(&self) -> bool {
        !self.acct_mgr_url.is_empty()
    }

    pub fn print(&self, out: &mut dyn Write) -> io::Result<()> {
        if !self.is_attached() {
            return writeln!(out, "Not using an account manager");
        }
        writeln!(out, "Account manager info:")?;
        writeln!(out, "   name: {}", self.acct_mgr_name)?;
        writeln!(out, "   URL: {}", self.acct_mgr_url)?;
        writeln!(out, "   have credentials: {}", yes_no(self.have_credentials))?;
        writeln!(out, "   cookie required: {}", yes_no(self.cookie_required))?;
        if !self.cookie_failure_url.is_empty() {
            writeln!(out, "   cookie failure URL: {}", self.cookie_failure_url)?;
        }
        Ok(())
    }
}

impl Parse for AcctMgrInfo {
    const TAG: &'static str = "acct_mgr_info";

    fn parse(&mut self, input: &mut dyn LineStream) -> Result<()> {
        while let Some(line) = input.next_line() {
            if match_tag(&line, "</acct_mgr_info>") {
                return Ok(());
            }
            if parse_str(&line, "acct_mgr_name", &mut self.acct_mgr_name) {
                continue;
            }
            if parse_str(&line, "acct_mgr_url", &mut self.acct_mgr_url) {
                continue;
            }
            if parse_bool(&line, "have_credentials", &mut self.have_credentials) {
                continue;
            }
            if parse_bool(&line, "cookie_required", &mut self.cookie_required) {
                continue;
            }
            if parse_str(&line, "cookie_failure_url", &mut self.cookie_failure_url) {
                continue;
            }
        }
        Err(RpcError::XmlParse(Self::TAG.to_string()))
    }
}

/// Result of an account manager synchronisation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AcctMgrRpcReply {
    pub error_num: i32,
    /// Notices passed on from the account manager, in order.
    pub messages: Vec<String>,
}

impl AcctMgrRpcReply {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn print(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "status: {}", self.error_num)?;
        for msg in &self.messages {
            writeln!(out, "   {}", msg)?;
        }
        Ok(())
    }
}

impl Parse for AcctMgrRpcReply {
    const TAG: &'static str = "acct_mgr_rpc_reply";

    fn parse(&mut self, input: &mut dyn LineStream) -> Result<()> {
        while let Some(line) = input.next_line() {
            if match_tag(&line, "</acct_mgr_rpc_reply>") {
                return Ok(());
            }
            if parse_int(&line, "error_num", &mut self.error_num) {
                continue;
            }
            let mut msg = String::new();
            if parse_str(&line, "message", &mut msg) {
                self.messages.push(msg);
                continue;
            }
        }
        Err(RpcError::XmlParse(Self::TAG.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boincrpc_proto::MemStream;

    #[test]
    fn info_with_credentials() {
        let text = "\
<acct_mgr_url>https://am.example/</acct_mgr_url>
<acct_mgr_name>Example AM</acct_mgr_name>
<have_credentials/>
</acct_mgr_info>
";
        let mut info = AcctMgrInfo::default();
        info.parse(&mut MemStream::new(text)).unwrap();
        assert!(info.is_attached());
        assert_eq!(info.acct_mgr_name, "Example AM");
        assert!(info.have_credentials);
        assert!(!info.cookie_required);
    }

    #[test]
    fn info_not_attached() {
        let mut info = AcctMgrInfo::default();
        info.parse(&mut MemStream::new("</acct_mgr_info>\n")).unwrap();
        let mut out = Vec::new();
        info.print(&mut out).unwrap();
        assert_eq!(out, b"Not using an account manager\n");
    }

    #[test]
    fn rpc_reply_collects_messages() {
        let text = "\
<error_num>0</error_num>
<message>first</message>
<message>second</message>
</acct_mgr_rpc_reply>
";
        let mut reply = AcctMgrRpcReply::default();
        reply.parse(&mut MemStream::new(text)).unwrap();
        assert_eq!(reply.error_num, 0);
        assert_eq!(reply.messages, vec!["first", "second"]);
    }

    #[test]
    fn truncated_replies() {
        let mut info = AcctMgrInfo::default();
        let err = info
            .parse(&mut MemStream::new("<acct_mgr_name>AM</acct_mgr_name>\n"))
            .unwrap_err();
        assert!(matches!(err, RpcError::XmlParse(ref t) if t == "acct_mgr_info"));

        let mut reply = AcctMgrRpcReply::default();
        let err = reply
            .parse(&mut MemStream::new("<error_num>0</error_num>\n<message>hi</message>\n"))
            .unwrap_err();
        assert!(matches!(err, RpcError::XmlParse(ref t) if t == "acct_mgr_rpc_reply"));
    }
}
