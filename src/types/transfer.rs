use super::{yes_no, Parse};
use boincrpc_proto::xml::{match_tag, parse_bool, parse_double, parse_int, parse_str};
use boincrpc_proto::{LineStream, Result, RpcError};
use serde::Serialize;
use std::io::{self, Write};

/// A file upload or download tracked by the core client.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileTransfer {
    pub name: String,
    pub project_url: String,
    pub project_name: String,
    pub nbytes: f64,
    pub generated_locally: bool,
    pub uploaded: bool,
    pub upload_when_present: bool,
    pub sticky: bool,
    /// A `<persistent_file_xfer>` block was present.
    pub pers_xfer_active: bool,
    /// A `<file_xfer>` block was present.
    pub xfer_active: bool,
    pub num_retries: i32,
    pub first_request_time: f64,
    pub next_request_time: f64,
    pub status: i32,
    pub time_so_far: f64,
    pub bytes_xferred: f64,
    pub file_offset: f64,
    pub xfer_speed: f64,
    pub hostname: String,
    pub project_backoff: f64,
}

impl FileTransfer {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Upload when the file was produced on this host, download otherwise.
    pub fn is_upload(&self) -> bool {
        self.generated_locally
    }

    pub fn print(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "   name: {}", self.name)?;
        writeln!(out, "   direction: {}", if self.is_upload() { "upload" } else { "download" })?;
        writeln!(out, "   sticky: {}", yes_no(self.sticky))?;
        writeln!(out, "   xfer active: {}", yes_no(self.xfer_active))?;
        writeln!(out, "   time_so_far: {}", self.time_so_far)?;
        writeln!(out, "   bytes_xferred: {}", self.bytes_xferred)?;
        writeln!(out, "   xfer_speed: {}", self.xfer_speed)
    }
}

impl Parse for FileTransfer {
    const TAG: &'static str = "file_transfer";

    fn parse(&mut self, input: &mut dyn LineStream) -> Result<()> {
        while let Some(line) = input.next_line() {
            if match_tag(&line, "</file_transfer>") {
                return Ok(());
            }
            if parse_str(&line, "name", &mut self.name) {
                continue;
            }
            if parse_str(&line, "project_url", &mut self.project_url) {
                continue;
            }
            if parse_str(&line, "project_name", &mut self.project_name) {
                continue;
            }
            if parse_double(&line, "nbytes", &mut self.nbytes) {
                continue;
            }
            if parse_bool(&line, "generated_locally", &mut self.generated_locally) {
                continue;
            }
            if parse_bool(&line, "uploaded", &mut self.uploaded) {
                continue;
            }
            if parse_bool(&line, "upload_when_present", &mut self.upload_when_present) {
                continue;
            }
            if parse_bool(&line, "sticky", &mut self.sticky) {
                continue;
            }
            if match_tag(&line, "<persistent_file_xfer>") {
                self.pers_xfer_active = true;
                continue;
            }
            if match_tag(&line, "<file_xfer>") {
                self.xfer_active = true;
                continue;
            }
            if parse_int(&line, "num_retries", &mut self.num_retries) {
                continue;
            }
            if parse_double(&line, "first_request_time", &mut self.first_request_time) {
                continue;
            }
            if parse_double(&line, "next_request_time", &mut self.next_request_time) {
                continue;
            }
            if parse_int(&line, "status", &mut self.status) {
                continue;
            }
            if parse_double(&line, "time_so_far", &mut self.time_so_far) {
                continue;
            }
            if parse_double(&line, "last_bytes_xferred", &mut self.bytes_xferred) {
                continue;
            }
            if parse_double(&line, "file_offset", &mut self.file_offset) {
                continue;
            }
            if parse_double(&line, "xfer_speed", &mut self.xfer_speed) {
                continue;
            }
            if parse_str(&line, "hostname", &mut self.hostname) {
                continue;
            }
            if parse_double(&line, "project_backoff", &mut self.project_backoff) {
                continue;
            }
        }
        Err(RpcError::XmlParse(Self::TAG.to_string()))
    }
}
