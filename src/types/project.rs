use super::{parse_multiline, yes_no, Parse};
use boincrpc_proto::xml::{match_tag, parse_bool, parse_double, parse_int, parse_str};
use boincrpc_proto::{LineStream, Result, RpcError};
use serde::Serialize;
use std::io::{self, Write};

/// A project the core client is attached to.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Project {
    pub master_url: String,
    pub project_name: String,
    pub user_name: String,
    pub team_name: String,
    pub host_venue: String,
    pub hostid: i32,
    pub resource_share: f64,
    pub user_total_credit: f64,
    pub user_expavg_credit: f64,
    pub host_total_credit: f64,
    pub host_expavg_credit: f64,
    pub disk_usage: f64,
    pub nrpc_failures: i32,
    pub master_fetch_failures: i32,
    pub min_rpc_time: f64,
    pub download_backoff: f64,
    pub upload_backoff: f64,
    pub short_term_debt: f64,
    pub long_term_debt: f64,
    pub duration_correction_factor: f64,
    pub sched_rpc_pending: i32,
    pub master_url_fetch_pending: bool,
    pub tentative: bool,
    pub non_cpu_intensive: bool,
    pub suspended_via_gui: bool,
    pub dont_request_more_work: bool,
    pub scheduler_rpc_in_progress: bool,
    pub attached_via_acct_mgr: bool,
    pub detach_when_done: bool,
    pub ended: bool,
    /// Raw `<gui_urls>` contents.
    pub gui_urls: String,
}

impl Project {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Display name, falling back to the URL before the first scheduler
    /// contact fills it in.
    pub fn name(&self) -> &str {
        if self.project_name.is_empty() {
            &self.master_url
        } else {
            &self.project_name
        }
    }

    pub fn print(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "   name: {}", self.project_name)?;
        writeln!(out, "   master URL: {}", self.master_url)?;
        writeln!(out, "   user_name: {}", self.user_name)?;
        writeln!(out, "   team_name: {}", self.team_name)?;
        writeln!(out, "   resource share: {}", self.resource_share)?;
        writeln!(out, "   user_total_credit: {}", self.user_total_credit)?;
        writeln!(out, "   user_expavg_credit: {}", self.user_expavg_credit)?;
        writeln!(out, "   host_total_credit: {}", self.host_total_credit)?;
        writeln!(out, "   host_expavg_credit: {}", self.host_expavg_credit)?;
        writeln!(out, "   disk usage: {:.2}MB", self.disk_usage / (1024.0 * 1024.0))?;
        writeln!(out, "   nrpc_failures: {}", self.nrpc_failures)?;
        writeln!(out, "   master_fetch_failures: {}", self.master_fetch_failures)?;
        writeln!(out, "   master fetch pending: {}", yes_no(self.master_url_fetch_pending))?;
        writeln!(out, "   scheduler RPC pending: {}", yes_no(self.sched_rpc_pending != 0))?;
        writeln!(out, "   scheduler RPC in progress: {}", yes_no(self.scheduler_rpc_in_progress))?;
        writeln!(out, "   tentative: {}", yes_no(self.tentative))?;
        writeln!(out, "   suspended via GUI: {}", yes_no(self.suspended_via_gui))?;
        writeln!(out, "   don't request more work: {}", yes_no(self.dont_request_more_work))?;
        writeln!(out, "   attached via account manager: {}", yes_no(self.attached_via_acct_mgr))?;
        writeln!(out, "   detach when done: {}", yes_no(self.detach_when_done))?;
        writeln!(out, "   ended: {}", yes_no(self.ended))?;
        writeln!(out, "   duration correction factor: {}", self.duration_correction_factor)
    }
}

impl Parse for Project {
    const TAG: &'static str = "project";

    fn parse(&mut self, input: &mut dyn LineStream) -> Result<()> {
        while let Some(line) = input.next_line() {
            if match_tag(&line, "</project>") {
                return Ok(());
            }
            if parse_str(&line, "master_url", &mut self.master_url) {
                continue;
            }
            if parse_str(&line, "project_name", &mut self.project_name) {
                continue;
            }
            if parse_str(&line, "user_name", &mut self.user_name) {
                continue;
            }
            if parse_str(&line, "team_name", &mut self.team_name) {
                continue;
            }
            if parse_str(&line, "host_venue", &mut self.host_venue) {
                continue;
            }
            if parse_int(&line, "hostid", &mut self.hostid) {
                continue;
            }
            if parse_double(&line, "resource_share", &mut self.resource_share) {
                continue;
            }
            if parse_double(&line, "user_total_credit", &mut self.user_total_credit) {
                continue;
            }
            if parse_double(&line, "user_expavg_credit", &mut self.user_expavg_credit) {
                continue;
            }
            if parse_double(&line, "host_total_credit", &mut self.host_total_credit) {
                continue;
            }
            if parse_double(&line, "host_expavg_credit", &mut self.host_expavg_credit) {
                continue;
            }
            if parse_double(&line, "disk_usage", &mut self.disk_usage) {
                continue;
            }
            if parse_int(&line, "nrpc_failures", &mut self.nrpc_failures) {
                continue;
            }
            if parse_int(&line, "master_fetch_failures", &mut self.master_fetch_failures) {
                continue;
            }
            if parse_double(&line, "min_rpc_time", &mut self.min_rpc_time) {
                continue;
            }
            if parse_double(&line, "download_backoff", &mut self.download_backoff) {
                continue;
            }
            if parse_double(&line, "upload_backoff", &mut self.upload_backoff) {
                continue;
            }
            if parse_double(&line, "short_term_debt", &mut self.short_term_debt) {
                continue;
            }
            if parse_double(&line, "long_term_debt", &mut self.long_term_debt) {
                continue;
            }
            if parse_double(
                &line,
                "duration_correction_factor",
                &mut self.duration_correction_factor,
            ) {
                continue;
            }
            if parse_int(&line, "sched_rpc_pending", &mut self.sched_rpc_pending) {
                continue;
            }
            if parse_bool(&line, "master_url_fetch_pending", &mut self.master_url_fetch_pending) {
                continue;
            }
            if parse_bool(&line, "tentative", &mut self.tentative) {
                continue;
            }
            if parse_bool(&line, "non_cpu_intensive", &mut self.non_cpu_intensive) {
                continue;
            }
            if parse_bool(&line, "suspended_via_gui", &mut self.suspended_via_gui) {
                continue;
            }
            if parse_bool(&line, "dont_request_more_work", &mut self.dont_request_more_work) {
                continue;
            }
            if parse_bool(&line, "scheduler_rpc_in_progress", &mut self.scheduler_rpc_in_progress) {
                continue;
            }
            if parse_bool(&line, "attached_via_acct_mgr", &mut self.attached_via_acct_mgr) {
                continue;
            }
            if parse_bool(&line, "detach_when_done", &mut self.detach_when_done) {
                continue;
            }
            if parse_bool(&line, "ended", &mut self.ended) {
                continue;
            }
            if parse_multiline(&line, input, "gui_urls", &mut self.gui_urls)? {
                continue;
            }
        }
        Err(RpcError::XmlParse(Self::TAG.to_string()))
    }
}

/// Disk space used by each project, plus host-wide totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiskUsage {
    pub projects: Vec<Project>,
    pub d_total: f64,
    pub d_free: f64,
    pub d_boinc: f64,
    pub d_allowed: f64,
}

impl DiskUsage {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn print(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "======== Disk usage ========")?;
        writeln!(out, "total: {}", self.d_total)?;
        writeln!(out, "free: {}", self.d_free)?;
        writeln!(out, "used by BOINC: {}", self.d_boinc)?;
        writeln!(out, "allowed: {}", self.d_allowed)?;
        for (i, p) in self.projects.iter().enumerate() {
            writeln!(out, "{}) -----------", i + 1)?;
            writeln!(out, "   master URL: {}", p.master_url)?;
            writeln!(out, "   disk usage: {:.2}MB", p.disk_usage / (1024.0 * 1024.0))?;
        }
        Ok(())
    }
}

impl Parse for DiskUsage {
    const TAG: &'static str = "disk_usage_summary";

    fn parse(&mut self, input: &mut dyn LineStream) -> Result<()> {
        while let Some(line) = input.next_line() {
            if match_tag(&line, "</disk_usage_summary>") {
                return Ok(());
            }
            if match_tag(&line, "<project>") {
                let mut project = Project::default();
                project.parse(input)?;
                self.projects.push(project);
                continue;
            }
            if parse_double(&line, "d_total", &mut self.d_total) {
                continue;
            }
            if parse_double(&line, "d_free", &mut self.d_free) {
                continue;
            }
            if parse_double(&line, "d_boinc", &mut self.d_boinc) {
                continue;
            }
            if parse_double(&line, "d_allowed", &mut self.d_allowed) {
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

    const PROJECT: &str = "\
    <master_url>https://x/</master_url>
    <project_name>X@Home</project_name>
    <user_name>alice</user_name>
    <hostid>17</hostid>
    <resource_share>100.000000</resource_share>
    <user_total_credit>1234.5</user_total_credit>
    <disk_usage>2097152</disk_usage>
    <suspended_via_gui/>
    <dont_request_more_work/>
    <some_future_field>ignored</some_future_field>
    <gui_urls>
        <gui_url>
            <name>Help</name>
        </gui_url>
    </gui_urls>
</project>
";

    #[test]
    fn parses_documented_fields() {
        let mut p = Project::default();
        p.parse(&mut MemStream::new(PROJECT)).unwrap();
        assert_eq!(p.master_url, "https://x/");
        assert_eq!(p.project_name, "X@Home");
        assert_eq!(p.name(), "X@Home");
        assert_eq!(p.user_name, "alice");
        assert_eq!(p.hostid, 17);
        assert_eq!(p.resource_share, 100.0);
        assert_eq!(p.user_total_credit, 1234.5);
        assert_eq!(p.disk_usage, 2097152.0);
        assert!(p.suspended_via_gui);
        assert!(p.dont_request_more_work);
        assert!(!p.tentative);
        assert!(p.gui_urls.contains("<name>Help</name>"));
    }

    #[test]
    fn clear_resets_everything() {
        let mut p = Project::default();
        p.parse(&mut MemStream::new(PROJECT)).unwrap();
        p.clear();
        assert_eq!(p, Project::default());
        assert_eq!(p.name(), "");
    }

    #[test]
    fn truncated_project() {
        let mut p = Project::default();
        let err = p
            .parse(&mut MemStream::new("<master_url>https://x/</master_url>\n"))
            .unwrap_err();
        assert!(matches!(err, RpcError::XmlParse(ref t) if t == "project"));

        let mut du = DiskUsage::default();
        let err = du
            .parse(&mut MemStream::new("<d_total>1000</d_total>\n"))
            .unwrap_err();
        assert!(matches!(err, RpcError::XmlParse(ref t) if t == "disk_usage_summary"));
    }

    #[test]
    fn non_numeric_field_reads_as_zero() {
        let mut p = Project::default();
        p.parse(&mut MemStream::new("<hostid>abc</hostid>\n</project>\n"))
            .unwrap();
        assert_eq!(p.hostid, 0);
    }

    #[test]
    fn disk_usage_summary() {
        let text = "\
<project>
<master_url>https://a/</master_url>
<disk_usage>1048576</disk_usage>
</project>
<project>
<master_url>https://b/</master_url>
<disk_usage>0</disk_usage>
</project>
<d_total>1000</d_total>
<d_free>400</d_free>
<d_boinc>50</d_boinc>
<d_allowed>500</d_allowed>
</disk_usage_summary>
";
        let mut du = DiskUsage::default();
        du.parse(&mut MemStream::new(text)).unwrap();
        assert_eq!(du.projects.len(), 2);
        assert_eq!(du.projects[1].master_url, "https://b/");
        assert_eq!(du.d_free, 400.0);
        assert_eq!(du.d_allowed, 500.0);

        let mut out = Vec::new();
        du.print(&mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("1.00MB"));
    }

    #[test]
    fn project_list() {
        let text = "<project>\n<master_url>https://a/</master_url>\n</project>\n</projects>\n";
        let projects: Vec<Project> = parse_list(&mut MemStream::new(text), "projects").unwrap();
        assert_eq!(projects.len(), 1);
    }
}
