//! Typed snapshots of the elements exchanged over GUI RPC.
//!
//! Every type parses from a [`LineStream`] positioned just after its opening
//! tag, consuming lines until the matching closing tag. Lines it does not
//! recognise are skipped, so newer peers can add fields freely. The only
//! error a struct parser raises itself is `XmlParse`, when the stream ends
//! before the closing tag.

mod account;
mod acct_mgr;
mod app;
mod message;
mod project;
mod proxy;
mod result;
mod state;
mod status;
mod transfer;
mod workunit;

pub use account::{AccountIn, AccountOut, ProjectConfig};
pub use acct_mgr::{AcctMgrInfo, AcctMgrRpcReply};
pub use app::{App, AppVersion};
pub use message::Message;
pub use project::{DiskUsage, Project};
pub use proxy::GrProxyInfo;
pub use result::TaskResult;
pub use state::CcState;
pub use status::{CcStatus, RunMode, VersionInfo};
pub use transfer::FileTransfer;
pub use workunit::Workunit;

use boincrpc_proto::xml::{copy_element_contents, match_tag, strip_cdata};
use boincrpc_proto::{LineStream, Result, RpcError};

/// An element that can populate itself from a line stream.
pub trait Parse {
    /// Element name without brackets.
    const TAG: &'static str;

    fn parse(&mut self, input: &mut dyn LineStream) -> Result<()>;
}

/// Parse `<T::TAG>` children until `</list_tag>`.
pub(crate) fn parse_list<T: Parse + Default>(
    input: &mut dyn LineStream,
    list_tag: &str,
) -> Result<Vec<T>> {
    let open = format!("<{}>", T::TAG);
    let close = format!("</{}>", list_tag);
    let mut items = Vec::new();
    while let Some(line) = input.next_line() {
        if match_tag(&line, &close) {
            return Ok(items);
        }
        if match_tag(&line, &open) {
            let mut item = T::default();
            item.parse(input)?;
            items.push(item);
        }
    }
    Err(RpcError::XmlParse(list_tag.to_string()))
}

/// Capture an element whose contents may span several lines. Returns
/// `Ok(false)` when `line` does not open `tag`.
pub(crate) fn parse_multiline(
    line: &str,
    input: &mut dyn LineStream,
    tag: &str,
    out: &mut String,
) -> Result<bool> {
    let open = format!("<{}>", tag);
    let Some(idx) = line.find(&open) else {
        return Ok(false);
    };
    let close = format!("</{}>", tag);
    let rest = &line[idx + open.len()..];
    out.clear();
    match rest.find(&close) {
        Some(end) => out.push_str(&rest[..end]),
        None => {
            out.push_str(rest);
            copy_element_contents(input, &close, out)?;
        }
    }
    Ok(true)
}

/// [`parse_multiline`] followed by CDATA unwrapping.
pub(crate) fn parse_text_block(
    line: &str,
    input: &mut dyn LineStream,
    tag: &str,
    out: &mut String,
) -> Result<bool> {
    if !parse_multiline(line, input, tag, out)? {
        return Ok(false);
    }
    *out = strip_cdata(out).to_string();
    Ok(true)
}

/// Human-readable `yes`/`no`.
pub(crate) fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boincrpc_proto::MemStream;

    #[test]
    fn multiline_on_one_line() {
        let mut s = MemStream::new("");
        let mut out = String::new();
        assert!(parse_multiline("<gui_urls>x</gui_urls>\n", &mut s, "gui_urls", &mut out).unwrap());
        assert_eq!(out, "x");
    }

    #[test]
    fn multiline_spanning_lines() {
        let mut s = MemStream::new("<gui_url>\n</gui_url>\n</gui_urls>\n<after/>\n");
        let mut out = String::new();
        assert!(parse_multiline("<gui_urls>\n", &mut s, "gui_urls", &mut out).unwrap());
        assert_eq!(out, "\n<gui_url>\n</gui_url>\n");
        assert_eq!(s.next_line().as_deref(), Some("<after/>\n"));
    }

    #[test]
    fn text_block_strips_cdata() {
        let mut s = MemStream::new("<![CDATA[\nhello\n]]>\n</body>\n");
        let mut out = String::new();
        assert!(parse_text_block("<body>\n", &mut s, "body", &mut out).unwrap());
        assert_eq!(out, "\nhello\n");
    }

    #[test]
    fn text_block_not_matching() {
        let mut s = MemStream::new("");
        let mut out = String::from("keep");
        assert!(!parse_text_block("<other/>\n", &mut s, "body", &mut out).unwrap());
        assert_eq!(out, "keep");
    }
}
