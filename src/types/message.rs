use super::{parse_text_block, Parse};
use boincrpc_proto::xml::{match_tag, parse_int, parse_str};
use boincrpc_proto::{LineStream, Result, RpcError};
use serde::Serialize;
use std::io::{self, Write};

/// One entry of the core client's event log.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Message {
    pub project: String,
    pub priority: i32,
    pub seqno: i32,
    pub timestamp: i32,
    pub body: String,
}

impl Message {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn print(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "{}: {} ({}) [{}] {}",
            self.seqno,
            self.timestamp,
            self.priority,
            self.project,
            self.body.trim()
        )
    }
}

impl Parse for Message {
    const TAG: &'static str = "msg";

    fn parse(&mut self, input: &mut dyn LineStream) -> Result<()> {
        while let Some(line) = input.next_line() {
            if match_tag(&line, "</msg>") {
                return Ok(());
            }
            if parse_text_block(&line, input, "body", &mut self.body)? {
                continue;
            }
            if parse_str(&line, "project", &mut self.project) {
                continue;
            }
            if parse_int(&line, "pri", &mut self.priority) {
                continue;
            }
            if parse_int(&line, "seqno", &mut self.seqno) {
                continue;
            }
            if parse_int(&line, "time", &mut self.timestamp) {
                continue;
            }
        }
        Err(RpcError::XmlParse(Self::TAG.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::parse_list;
    use boincrpc_proto::MemStream;

    #[test]
    fn multi_line_body() {
        let text = "\
<msg>
<project>X@Home</project>
<pri>1</pri>
<seqno>41</seqno>
<body>
<![CDATA[Scheduler request completed:
got 2 new tasks]]>
</body>
<time>1700000000</time>
</msg>
<msg>
<project></project>
<seqno>42</seqno>
<body>Starting BOINC client</body>
</msg>
</msgs>
";
        let msgs: Vec<Message> = parse_list(&mut MemStream::new(text), "msgs").unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].project, "X@Home");
        assert_eq!(msgs[0].seqno, 41);
        assert_eq!(msgs[0].timestamp, 1700000000);
        assert_eq!(
            msgs[0].body,
            "Scheduler request completed:\ngot 2 new tasks"
        );
        assert_eq!(msgs[1].body, "Starting BOINC client");
    }

    #[test]
    fn body_without_end_tag() {
        let mut m = Message::default();
        let err = m
            .parse(&mut MemStream::new("<body>\nno end\n"))
            .unwrap_err();
        assert!(matches!(err, RpcError::XmlParse(ref t) if t == "body"));
    }

    #[test]
    fn msg_without_end_tag() {
        let mut m = Message::default();
        let err = m
            .parse(&mut MemStream::new("<seqno>3</seqno>\n<body>hello</body>\n"))
            .unwrap_err();
        assert!(matches!(err, RpcError::XmlParse(ref t) if t == "msg"));
    }
}
