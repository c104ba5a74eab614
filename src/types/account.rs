//! Project configuration and account lookup/creation payloads.

use super::{yes_no, Parse};
use boincrpc_proto::auth::passwd_hash;
use boincrpc_proto::xml::{
    copy_element_contents, match_tag, parse_bool, parse_int, parse_str, strip_cdata,
    xml_escape,
};
use boincrpc_proto::{LineStream, Result, RpcError};
use serde::Serialize;
use std::io::{self, Write};

/// Shortest password a project accepts when it does not say otherwise.
pub const DEFAULT_MIN_PASSWD_LENGTH: i32 = 6;

/// What a project's `get_project_config.php` says about itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectConfig {
    pub error_num: i32,
    pub name: String,
    pub master_url: String,
    pub min_passwd_length: i32,
    pub account_manager: bool,
    pub uses_username: bool,
    pub account_creation_disabled: bool,
    pub client_account_creation_disabled: bool,
    pub terms_of_use: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            error_num: 0,
            name: String::new(),
            master_url: String::new(),
            min_passwd_length: DEFAULT_MIN_PASSWD_LENGTH,
            account_manager: false,
            uses_username: false,
            account_creation_disabled: false,
            client_account_creation_disabled: false,
            terms_of_use: String::new(),
        }
    }
}

impl ProjectConfig {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn print(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "name: {}", self.name)?;
        writeln!(out, "master URL: {}", self.master_url)?;
        writeln!(out, "min password length: {}", self.min_passwd_length)?;
        writeln!(out, "account manager: {}", yes_no(self.account_manager))?;
        writeln!(out, "uses user name: {}", yes_no(self.uses_username))?;
        writeln!(
            out,
            "account creation disabled: {}",
            yes_no(self.account_creation_disabled || self.client_account_creation_disabled)
        )?;
        if !self.terms_of_use.is_empty() {
            writeln!(out, "terms of use:\n{}", self.terms_of_use)?;
        }
        Ok(())
    }

    fn parse_terms_of_use(&mut self, line: &str, input: &mut dyn LineStream) -> Result<bool> {
        const OPEN: &str = "<terms_of_use>";
        const CLOSE: &str = "</terms_of_use>";
        let Some(idx) = line.find(OPEN) else {
            return Ok(false);
        };
        let rest = &line[idx + OPEN.len()..];
        let text = match rest.find(CLOSE) {
            Some(end) => rest[..end].to_string(),
            None => {
                let mut text = rest.to_string();
                copy_element_contents(input, CLOSE, &mut text)?;
                text
            }
        };
        self.terms_of_use = strip_cdata(&text).to_string();
        Ok(true)
    }
}

impl Parse for ProjectConfig {
    const TAG: &'static str = "project_config";

    fn parse(&mut self, input: &mut dyn LineStream) -> Result<()> {
        while let Some(line) = input.next_line() {
            if match_tag(&line, "</project_config>") {
                return Ok(());
            }
            if self.parse_terms_of_use(&line, input)? {
                continue;
            }
            if parse_int(&line, "error_num", &mut self.error_num) {
                continue;
            }
            if parse_str(&line, "name", &mut self.name) {
                continue;
            }
            if parse_str(&line, "master_url", &mut self.master_url) {
                continue;
            }
            if parse_int(&line, "min_passwd_length", &mut self.min_passwd_length) {
                continue;
            }
            if parse_bool(&line, "account_manager", &mut self.account_manager) {
                continue;
            }
            if parse_bool(&line, "uses_username", &mut self.uses_username) {
                continue;
            }
            if parse_bool(
                &line,
                "account_creation_disabled",
                &mut self.account_creation_disabled,
            ) {
                continue;
            }
            if parse_bool(
                &line,
                "client_account_creation_disabled",
                &mut self.client_account_creation_disabled,
            ) {
                continue;
            }
        }
        Err(RpcError::XmlParse(Self::TAG.to_string()))
    }
}

/// Credentials for looking up or creating an account on a project.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountIn {
    pub url: String,
    pub email_addr: String,
    pub user_name: String,
    pub passwd: String,
}

impl AccountIn {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Body of a `<lookup_account>` or `<create_account>` request. The
    /// password never leaves the host in clear; only its digest is sent.
    /// The user name is included only for account creation.
    pub(crate) fn to_request(&self, tag: &str, with_user_name: bool) -> String {
        let mut req = format!(
            "<{tag}>\n   <url>{}</url>\n   <email_addr>{}</email_addr>\n   <passwd_hash>{}</passwd_hash>\n",
            xml_escape(&self.url),
            xml_escape(&self.email_addr),
            passwd_hash(&self.passwd, &self.email_addr),
        );
        if with_user_name {
            req.push_str(&format!(
                "   <user_name>{}</user_name>\n",
                xml_escape(&self.user_name)
            ));
        }
        req.push_str(&format!("</{tag}>\n"));
        req
    }
}

/// Outcome of an account lookup or creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccountOut {
    pub error_num: i32,
    pub error_msg: String,
    pub authenticator: String,
}

impl AccountOut {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn print(&self, out: &mut dyn Write) -> io::Result<()> {
        if self.error_num != 0 {
            writeln!(out, "error in account lookup: {}", self.error_num)?;
            if !self.error_msg.is_empty() {
                writeln!(out, "{}", self.error_msg)?;
            }
            Ok(())
        } else {
            writeln!(out, "account key: {}", self.authenticator)
        }
    }
}

impl Parse for AccountOut {
    const TAG: &'static str = "account_out";

    fn parse(&mut self, input: &mut dyn LineStream) -> Result<()> {
        while let Some(line) = input.next_line() {
            if match_tag(&line, "</account_out>") {
                return Ok(());
            }
            if parse_int(&line, "error_num", &mut self.error_num) {
                continue;
            }
            if parse_str(&line, "error_msg", &mut self.error_msg) {
                continue;
            }
            if parse_str(&line, "authenticator", &mut self.authenticator) {
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
    fn project_config_defaults() {
        let mut pc = ProjectConfig::default();
        assert_eq!(pc.min_passwd_length, 6);
        pc.min_passwd_length = 10;
        pc.clear();
        assert_eq!(pc.min_passwd_length, 6);
    }

    #[test]
    fn project_config_fields() {
        let text = "\
<name>X@Home</name>
<master_url>https://x/</master_url>
<uses_username/>
<client_account_creation_disabled/>
<terms_of_use>
<![CDATA[Be nice.
Really.]]>
</terms_of_use>
</project_config>
";
        let mut pc = ProjectConfig::default();
        pc.parse(&mut MemStream::new(text)).unwrap();
        assert_eq!(pc.name, "X@Home");
        assert_eq!(pc.min_passwd_length, 6);
        assert!(pc.uses_username);
        assert!(pc.client_account_creation_disabled);
        assert!(!pc.account_creation_disabled);
        assert_eq!(pc.terms_of_use, "Be nice.\nReally.");
    }

    #[test]
    fn long_terms_of_use_are_kept_whole() {
        let mut text = String::from("<name>Big</name>\n<terms_of_use>\n");
        for _ in 0..1100 {
            text.push_str(&"x".repeat(63));
            text.push('\n');
        }
        text.push_str("</terms_of_use>\n<min_passwd_length>8</min_passwd_length>\n</project_config>\n");
        let mut pc = ProjectConfig::default();
        pc.parse(&mut MemStream::new(&text)).unwrap();
        assert_eq!(pc.name, "Big");
        assert_eq!(pc.terms_of_use.len(), 1100 * 64 - 1);
        assert_eq!(pc.min_passwd_length, 8);
    }

    #[test]
    fn account_request_hashes_password() {
        let ai = AccountIn {
            url: "https://x/".into(),
            email_addr: "Me@Example.com".into(),
            user_name: "me".into(),
            passwd: "secret".into(),
        };
        let lookup = ai.to_request("lookup_account", false);
        assert!(lookup.starts_with("<lookup_account>\n"));
        assert!(lookup.contains(&format!(
            "<passwd_hash>{}</passwd_hash>",
            passwd_hash("secret", "me@example.com")
        )));
        assert!(!lookup.contains("secret"));
        assert!(!lookup.contains("<user_name>"));

        let create = ai.to_request("create_account", true);
        assert!(create.contains("<user_name>me</user_name>"));
        assert!(create.ends_with("</create_account>\n"));
    }

    #[test]
    fn account_out_fields() {
        let mut ao = AccountOut::default();
        ao.parse(&mut MemStream::new(
            "<authenticator>abc123</authenticator>\n</account_out>\n",
        ))
        .unwrap();
        assert_eq!(ao.error_num, 0);
        assert_eq!(ao.authenticator, "abc123");

        let mut ao = AccountOut::default();
        let err = ao
            .parse(&mut MemStream::new("<error_num>-136</error_num>\n"))
            .unwrap_err();
        assert!(matches!(err, RpcError::XmlParse(ref t) if t == "account_out"));
    }

    #[test]
    fn truncated_project_config() {
        let mut pc = ProjectConfig::default();
        let err = pc
            .parse(&mut MemStream::new("<name>X</name>\n<terms_of_use>ok</terms_of_use>\n"))
            .unwrap_err();
        assert!(matches!(err, RpcError::XmlParse(ref t) if t == "project_config"));
    }
}
