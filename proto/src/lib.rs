//! Wire protocol for GUI RPC client <-> core client communication.
//!
//! Requests are framed as:
//!   `<boinc_gui_rpc_request>\n` payload `</boinc_gui_rpc_request>\n` 0x03
//! Replies are arbitrary text terminated by the same 0x03 byte; the text
//! itself is wrapped in `<boinc_gui_rpc_reply>` tags.

pub mod auth;
pub mod error;
pub mod mfile;
pub mod miofile;
pub mod xml;

pub use error::{Result, RpcError};
pub use mfile::MFile;
pub use miofile::{FileStream, LineStream, MemStream, LINE_LEN};

/// Default TCP port of the core client.
pub const GUI_RPC_PORT: u16 = 31416;

/// Default Unix-domain socket path, relative to the core client's data dir.
pub const GUI_RPC_FILE: &str = "boinc_socket";

/// End-of-message marker after every request and reply.
pub const SENTINEL: u8 = 0x03;

/// Request envelope tags
pub mod request {
    pub const OPEN: &str = "<boinc_gui_rpc_request>\n";
    pub const CLOSE: &str = "</boinc_gui_rpc_request>\n";
}

/// Reply envelope tags
pub mod reply {
    pub const OPEN: &str = "<boinc_gui_rpc_reply>";
    pub const CLOSE: &str = "</boinc_gui_rpc_reply>";
}

/// Wrap a request payload in the envelope and append the sentinel.
pub fn encode_request(payload: &str) -> Vec<u8> {
    let mut mf = MFile::with_capacity(
        request::OPEN.len() + payload.len() + request::CLOSE.len() + 1,
    );
    mf.puts(request::OPEN);
    mf.puts(payload);
    mf.puts(request::CLOSE);
    mf.append(&[SENTINEL]);
    mf.into_bytes()
}

/// Position of the first sentinel byte in `data`, if any.
pub fn find_sentinel(data: &[u8]) -> Option<usize> {
    data.iter().position(|&b| b == SENTINEL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn request_envelope_layout() {
        let encoded = encode_request("<get_state/>\n");
        assert_eq!(
            encoded,
            b"<boinc_gui_rpc_request>\n<get_state/>\n</boinc_gui_rpc_request>\n\x03".to_vec()
        );
        assert_eq!(find_sentinel(&encoded), Some(encoded.len() - 1));
    }

    #[test]
    fn no_sentinel_in_plain_text() {
        assert_eq!(find_sentinel(b"<success/>\n"), None);
    }

    proptest! {
        #[test]
        fn sentinel_is_last_byte(payload in "[^\u{3}]*") {
            let encoded = encode_request(&payload);
            prop_assert_eq!(find_sentinel(&encoded), Some(encoded.len() - 1));
            let body = std::str::from_utf8(&encoded[..encoded.len() - 1]).unwrap();
            prop_assert!(body.contains(payload.as_str()));
        }
    }
}
