use super::Parse;
use boincrpc_proto::xml::{match_tag, parse_double, parse_int, parse_str};
use boincrpc_proto::{LineStream, Result, RpcError};
use serde::Serialize;
use std::io::{self, Write};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Workunit {
    pub name: String,
    pub app_name: String,
    pub version_num: i32,
    pub rsc_fpops_est: f64,
    pub rsc_fpops_bound: f64,
    pub rsc_memory_bound: f64,
    pub rsc_disk_bound: f64,
    #[serde(skip)]
    pub project: Option<usize>,
    #[serde(skip)]
    pub app: Option<usize>,
}

impl Workunit {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn print(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "   name: {}", self.name)?;
        writeln!(out, "   FP estimate: {:e}", self.rsc_fpops_est)?;
        writeln!(out, "   FP bound: {:e}", self.rsc_fpops_bound)?;
        writeln!(out, "   memory bound: {:.2} MB", self.rsc_memory_bound / (1024.0 * 1024.0))?;
        writeln!(out, "   disk bound: {:.2} MB", self.rsc_disk_bound / (1024.0 * 1024.0))
    }
}

impl Parse for Workunit {
    const TAG: &'static str = "workunit";

    fn parse(&mut self, input: &mut dyn LineStream) -> Result<()> {
        while let Some(line) = input.next_line() {
            if match_tag(&line, "</workunit>") {
                return Ok(());
            }
            if parse_str(&line, "name", &mut self.name) {
                continue;
            }
            if parse_str(&line, "app_name", &mut self.app_name) {
                continue;
            }
            if parse_int(&line, "version_num", &mut self.version_num) {
                continue;
            }
            if parse_double(&line, "rsc_fpops_est", &mut self.rsc_fpops_est) {
                continue;
            }
            if parse_double(&line, "rsc_fpops_bound", &mut self.rsc_fpops_bound) {
                continue;
            }
            if parse_double(&line, "rsc_memory_bound", &mut self.rsc_memory_bound) {
                continue;
            }
            if parse_double(&line, "rsc_disk_bound", &mut self.rsc_disk_bound) {
                continue;
            }
        }
        Err(RpcError::XmlParse(Self::TAG.to_string()))
    }
}
