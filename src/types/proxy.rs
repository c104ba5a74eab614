use super::{yes_no, Parse};
use boincrpc_proto::xml::{match_tag, parse_bool, parse_int, parse_str, xml_escape};
use boincrpc_proto::{LineStream, Result, RpcError};
use serde::Serialize;
use std::io::{self, Write};

/// HTTP and SOCKS proxy settings of the core client.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GrProxyInfo {
    pub use_http_proxy: bool,
    pub use_socks_proxy: bool,
    pub use_http_authentication: bool,
    pub socks_version: i32,
    pub socks_server_name: String,
    pub socks_server_port: i32,
    pub http_server_name: String,
    pub http_server_port: i32,
    pub socks5_user_name: String,
    pub socks5_user_passwd: String,
    pub http_user_name: String,
    pub http_user_passwd: String,
    pub no_proxy: String,
}

impl GrProxyInfo {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// The `<proxy_info>` element sent by `set_proxy_settings`.
    pub fn to_request(&self) -> String {
        let mut req = String::from("    <proxy_info>\n");
        if self.use_http_proxy {
            req.push_str("        <use_http_proxy/>\n");
        }
        if self.use_socks_proxy {
            req.push_str("        <use_socks_proxy/>\n");
        }
        if self.use_http_authentication {
            req.push_str("        <use_http_auth/>\n");
        }
        req.push_str(&format!(
            "        <http_server_name>{}</http_server_name>\n\
             \x20       <http_server_port>{}</http_server_port>\n\
             \x20       <http_user_name>{}</http_user_name>\n\
             \x20       <http_user_passwd>{}</http_user_passwd>\n\
             \x20       <socks_server_name>{}</socks_server_name>\n\
             \x20       <socks_server_port>{}</socks_server_port>\n\
             \x20       <socks5_user_name>{}</socks5_user_name>\n\
             \x20       <socks5_user_passwd>{}</socks5_user_passwd>\n\
             \x20       <no_proxy>{}</no_proxy>\n",
            xml_escape(&self.http_server_name),
            self.http_server_port,
            xml_escape(&self.http_user_name),
            xml_escape(&self.http_user_passwd),
            xml_escape(&self.socks_server_name),
            self.socks_server_port,
            xml_escape(&self.socks5_user_name),
            xml_escape(&self.socks5_user_passwd),
            xml_escape(&self.no_proxy),
        ));
        req.push_str("    </proxy_info>\n");
        req
    }

    pub fn print(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "HTTP proxy: {}", yes_no(self.use_http_proxy))?;
        writeln!(
            out,
            "   server: {}:{}",
            self.http_server_name, self.http_server_port
        )?;
        writeln!(out, "   authentication: {}", yes_no(self.use_http_authentication))?;
        writeln!(out, "   user: {}", self.http_user_name)?;
        writeln!(out, "SOCKS proxy: {}", yes_no(self.use_socks_proxy))?;
        writeln!(
            out,
            "   server: {}:{}",
            self.socks_server_name, self.socks_server_port
        )?;
        writeln!(out, "   user: {}", self.socks5_user_name)?;
        writeln!(out, "no proxy for: {}", self.no_proxy)
    }
}

impl Parse for GrProxyInfo {
    const TAG: &'static str = "proxy_info";

    fn parse(&mut self, input: &mut dyn LineStream) -> Result<()> {
        while let Some(line) = input.next_line() {
            if match_tag(&line, "</proxy_info>") {
                return Ok(());
            }
            if parse_bool(&line, "use_http_proxy", &mut self.use_http_proxy) {
                continue;
            }
            if parse_bool(&line, "use_socks_proxy", &mut self.use_socks_proxy) {
                continue;
            }
            if parse_bool(&line, "use_http_auth", &mut self.use_http_authentication) {
                continue;
            }
            if parse_int(&line, "socks_version", &mut self.socks_version) {
                continue;
            }
            if parse_str(&line, "socks_server_name", &mut self.socks_server_name) {
                continue;
            }
            if parse_int(&line, "socks_server_port", &mut self.socks_server_port) {
                continue;
            }
            if parse_str(&line, "http_server_name", &mut self.http_server_name) {
                continue;
            }
            if parse_int(&line, "http_server_port", &mut self.http_server_port) {
                continue;
            }
            if parse_str(&line, "socks5_user_name", &mut self.socks5_user_name) {
                continue;
            }
            if parse_str(&line, "socks5_user_passwd", &mut self.socks5_user_passwd) {
                continue;
            }
            if parse_str(&line, "http_user_name", &mut self.http_user_name) {
                continue;
            }
            if parse_str(&line, "http_user_passwd", &mut self.http_user_passwd) {
                continue;
            }
            if parse_str(&line, "no_proxy", &mut self.no_proxy) {
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
    fn parse_http_proxy() {
        let text = "\
<use_http_proxy/>
<use_http_auth/>
<http_server_name>proxy.local</http_server_name>
<http_server_port>3128</http_server_port>
<http_user_name>bob</http_user_name>
<socks_version>5</socks_version>
<no_proxy>localhost</no_proxy>
</proxy_info>
";
        let mut pi = GrProxyInfo::default();
        pi.parse(&mut MemStream::new(text)).unwrap();
        assert!(pi.use_http_proxy);
        assert!(!pi.use_socks_proxy);
        assert!(pi.use_http_authentication);
        assert_eq!(pi.http_server_name, "proxy.local");
        assert_eq!(pi.http_server_port, 3128);
        assert_eq!(pi.socks_version, 5);
        assert_eq!(pi.no_proxy, "localhost");
    }

    #[test]
    fn request_escapes_and_parses_back() {
        let pi = GrProxyInfo {
            use_socks_proxy: true,
            socks_server_name: "socks.local".into(),
            socks_server_port: 1080,
            socks5_user_passwd: "a<b&c".into(),
            ..Default::default()
        };
        let req = pi.to_request();
        assert!(req.contains("<use_socks_proxy/>"));
        assert!(!req.contains("<use_http_proxy/>"));
        assert!(req.contains("<socks5_user_passwd>a&lt;b&amp;c</socks5_user_passwd>"));

        let mut fin = MemStream::new(&req);
        assert!(fin.next_line().unwrap().contains("<proxy_info>"));
        let mut back = GrProxyInfo::default();
        back.parse(&mut fin).unwrap();
        assert_eq!(back, pi);
    }

    #[test]
    fn truncated_proxy_info() {
        let mut pi = GrProxyInfo::default();
        let err = pi.parse(&mut MemStream::new("<use_http_proxy/>\n")).unwrap_err();
        assert!(matches!(err, RpcError::XmlParse(ref t) if t == "proxy_info"));
    }
}
