use super::{yes_no, Parse};
use boincrpc_proto::xml::{match_tag, parse_bool, parse_double, parse_int};
use boincrpc_proto::{LineStream, Result, RpcError};
use serde::Serialize;
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

/// Computation or network activity mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Always = 1,
    Auto = 2,
    Never = 3,
    /// Return to the permanent mode after a temporary override.
    Restore = 4,
}

impl RunMode {
    const ALL: [RunMode; 4] = [
        RunMode::Always,
        RunMode::Auto,
        RunMode::Never,
        RunMode::Restore,
    ];

    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            RunMode::Always => "always",
            RunMode::Auto => "auto",
            RunMode::Never => "never",
            RunMode::Restore => "restore",
        }
    }

    /// The presence-only element naming this mode, e.g. `<auto/>`.
    pub fn tag(self) -> String {
        format!("<{}/>", self.name())
    }

    /// Mode named by a presence-only element on `line`.
    pub fn from_line(line: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| match_tag(line, &m.tag()))
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RunMode {
    type Err = RpcError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| RpcError::UnknownOp(s.to_string()))
    }
}

/// Snapshot of the core client's activity status.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CcStatus {
    pub network_status: i32,
    pub ams_password_error: bool,
    pub task_suspend_reason: i32,
    pub network_suspend_reason: i32,
    pub task_mode: i32,
    pub network_mode: i32,
    pub task_mode_perm: i32,
    pub network_mode_perm: i32,
    pub task_mode_delay: f64,
    pub network_mode_delay: f64,
    pub disallow_attach: bool,
    pub simple_gui_only: bool,
}

fn mode_name(code: i32) -> &'static str {
    RunMode::from_code(code).map_or("unknown", RunMode::name)
}

impl CcStatus {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn print(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "network status: {}", self.network_status)?;
        writeln!(out, "account manager password error: {}", yes_no(self.ams_password_error))?;
        writeln!(out, "task mode: {}", mode_name(self.task_mode))?;
        writeln!(out, "   permanent: {}", mode_name(self.task_mode_perm))?;
        writeln!(out, "   suspend reason: {}", self.task_suspend_reason)?;
        writeln!(out, "network mode: {}", mode_name(self.network_mode))?;
        writeln!(out, "   permanent: {}", mode_name(self.network_mode_perm))?;
        writeln!(out, "   suspend reason: {}", self.network_suspend_reason)
    }
}

impl Parse for CcStatus {
    const TAG: &'static str = "cc_status";

    fn parse(&mut self, input: &mut dyn LineStream) -> Result<()> {
        while let Some(line) = input.next_line() {
            if match_tag(&line, "</cc_status>") {
                return Ok(());
            }
            if parse_int(&line, "network_status", &mut self.network_status) {
                continue;
            }
            if parse_bool(&line, "ams_password_error", &mut self.ams_password_error) {
                continue;
            }
            if parse_int(&line, "task_suspend_reason", &mut self.task_suspend_reason) {
                continue;
            }
            if parse_int(&line, "network_suspend_reason", &mut self.network_suspend_reason) {
                continue;
            }
            if parse_int(&line, "task_mode", &mut self.task_mode) {
                continue;
            }
            if parse_int(&line, "network_mode", &mut self.network_mode) {
                continue;
            }
            if parse_int(&line, "task_mode_perm", &mut self.task_mode_perm) {
                continue;
            }
            if parse_int(&line, "network_mode_perm", &mut self.network_mode_perm) {
                continue;
            }
            if parse_double(&line, "task_mode_delay", &mut self.task_mode_delay) {
                continue;
            }
            if parse_double(&line, "network_mode_delay", &mut self.network_mode_delay) {
                continue;
            }
            if parse_bool(&line, "disallow_attach", &mut self.disallow_attach) {
                continue;
            }
            if parse_bool(&line, "simple_gui_only", &mut self.simple_gui_only) {
                continue;
            }
        }
        Err(RpcError::XmlParse(Self::TAG.to_string()))
    }
}

/// Protocol version advertised by one side of `exchange_versions`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    pub major: i32,
    pub minor: i32,
    pub release: i32,
}

impl VersionInfo {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn print(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{}", self)
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.release)
    }
}

impl Parse for VersionInfo {
    const TAG: &'static str = "server_version";

    fn parse(&mut self, input: &mut dyn LineStream) -> Result<()> {
        while let Some(line) = input.next_line() {
            if match_tag(&line, "</server_version>") {
                return Ok(());
            }
            if parse_int(&line, "major", &mut self.major) {
                continue;
            }
            if parse_int(&line, "minor", &mut self.minor) {
                continue;
            }
            if parse_int(&line, "release", &mut self.release) {
                continue;
            }
        }
        Err(RpcError::XmlParse(Self::TAG.to_string()))
    }
}
