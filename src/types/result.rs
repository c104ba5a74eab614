use super::{parse_text_block, yes_no, Parse};
use boincrpc_proto::xml::{match_tag, parse_bool, parse_double, parse_int, parse_str};
use boincrpc_proto::{LineStream, Result, RpcError};
use serde::Serialize;
use std::io::{self, Write};

/// One task (a "result") held by the core client.
///
/// Fields from a nested `<active_task>` block are flattened in; `active_task`
/// records whether that block was present.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskResult {
    pub name: String,
    pub wu_name: String,
    pub project_url: String,
    pub plan_class: String,
    pub version_num: i32,
    pub report_deadline: f64,
    pub received_time: f64,
    pub ready_to_report: bool,
    pub got_server_ack: bool,
    pub final_cpu_time: f64,
    pub final_elapsed_time: f64,
    pub state: i32,
    pub scheduler_state: i32,
    pub exit_status: i32,
    pub signal: i32,
    pub stderr_out: String,
    pub suspended_via_gui: bool,
    pub project_suspended_via_gui: bool,
    pub coproc_missing: bool,

    pub active_task: bool,
    pub active_task_state: i32,
    pub app_version_num: i32,
    pub slot: i32,
    pub pid: i32,
    pub checkpoint_cpu_time: f64,
    pub current_cpu_time: f64,
    pub fraction_done: f64,
    pub elapsed_time: f64,
    pub swap_size: f64,
    pub working_set_size_smoothed: f64,
    pub estimated_cpu_time_remaining: f64,
    pub too_large: bool,
    pub needs_shmem: bool,
    pub edf_scheduled: bool,

    #[serde(skip)]
    pub project: Option<usize>,
    #[serde(skip)]
    pub wu: Option<usize>,
    #[serde(skip)]
    pub app: Option<usize>,
    #[serde(skip)]
    pub avp: Option<usize>,
}

fn state_name(state: i32) -> &'static str {
    match state {
        0 => "new",
        1 => "downloading",
        2 => "downloaded",
        3 => "compute error",
        4 => "uploading",
        5 => "uploaded",
        6 => "aborted",
        7 => "upload failed",
        _ => "unknown",
    }
}

fn scheduler_state_name(state: i32) -> &'static str {
    match state {
        0 => "uninitialized",
        1 => "preempted",
        2 => "scheduled",
        _ => "unknown",
    }
}

fn active_task_state_name(state: i32) -> &'static str {
    match state {
        0 => "UNINITIALIZED",
        1 => "EXECUTING",
        5 => "ABORT_PENDING",
        8 => "QUIT_PENDING",
        9 => "SUSPENDED",
        _ => "unknown",
    }
}

impl TaskResult {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn print(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "   name: {}", self.name)?;
        writeln!(out, "   WU name: {}", self.wu_name)?;
        writeln!(out, "   project URL: {}", self.project_url)?;
        writeln!(out, "   received: {}", self.received_time)?;
        writeln!(out, "   report deadline: {}", self.report_deadline)?;
        writeln!(out, "   ready to report: {}", yes_no(self.ready_to_report))?;
        writeln!(out, "   got server ack: {}", yes_no(self.got_server_ack))?;
        writeln!(out, "   final CPU time: {}", self.final_cpu_time)?;
        writeln!(out, "   state: {}", state_name(self.state))?;
        writeln!(out, "   scheduler state: {}", scheduler_state_name(self.scheduler_state))?;
        writeln!(out, "   exit_status: {}", self.exit_status)?;
        writeln!(out, "   signal: {}", self.signal)?;
        writeln!(out, "   suspended via GUI: {}", yes_no(self.suspended_via_gui))?;
        writeln!(out, "   active_task_state: {}", active_task_state_name(self.active_task_state))?;
        writeln!(out, "   app version num: {}", self.app_version_num)?;
        writeln!(out, "   checkpoint CPU time: {}", self.checkpoint_cpu_time)?;
        writeln!(out, "   current CPU time: {}", self.current_cpu_time)?;
        writeln!(out, "   fraction done: {:.6}", self.fraction_done)?;
        writeln!(out, "   elapsed time: {}", self.elapsed_time)?;
        writeln!(out, "   swap size: {:.0} MB", self.swap_size / (1024.0 * 1024.0))?;
        writeln!(
            out,
            "   working set size: {:.0} MB",
            self.working_set_size_smoothed / (1024.0 * 1024.0)
        )?;
        writeln!(
            out,
            "   estimated CPU time remaining: {}",
            self.estimated_cpu_time_remaining
        )
    }
}

impl Parse for TaskResult {
    const TAG: &'static str = "result";

    fn parse(&mut self, input: &mut dyn LineStream) -> Result<()> {
        while let Some(line) = input.next_line() {
            if match_tag(&line, "</result>") {
                return Ok(());
            }
            if parse_str(&line, "name", &mut self.name) {
                continue;
            }
            if parse_str(&line, "wu_name", &mut self.wu_name) {
                continue;
            }
            if parse_str(&line, "project_url", &mut self.project_url) {
                continue;
            }
            if parse_str(&line, "plan_class", &mut self.plan_class) {
                continue;
            }
            if parse_int(&line, "version_num", &mut self.version_num) {
                continue;
            }
            if parse_double(&line, "report_deadline", &mut self.report_deadline) {
                continue;
            }
            if parse_double(&line, "received_time", &mut self.received_time) {
                continue;
            }
            if parse_bool(&line, "ready_to_report", &mut self.ready_to_report) {
                continue;
            }
            if parse_bool(&line, "got_server_ack", &mut self.got_server_ack) {
                continue;
            }
            if parse_double(&line, "final_cpu_time", &mut self.final_cpu_time) {
                continue;
            }
            if parse_double(&line, "final_elapsed_time", &mut self.final_elapsed_time) {
                continue;
            }
            if parse_int(&line, "state", &mut self.state) {
                continue;
            }
            if parse_int(&line, "scheduler_state", &mut self.scheduler_state) {
                continue;
            }
            if parse_int(&line, "exit_status", &mut self.exit_status) {
                continue;
            }
            if parse_int(&line, "signal", &mut self.signal) {
                continue;
            }
            if parse_text_block(&line, input, "stderr_out", &mut self.stderr_out)? {
                continue;
            }
            if parse_bool(&line, "suspended_via_gui", &mut self.suspended_via_gui) {
                continue;
            }
            if parse_bool(
                &line,
                "project_suspended_via_gui",
                &mut self.project_suspended_via_gui,
            ) {
                continue;
            }
            if parse_bool(&line, "coproc_missing", &mut self.coproc_missing) {
                continue;
            }
            if match_tag(&line, "<active_task>") {
                self.active_task = true;
                continue;
            }
            if parse_int(&line, "active_task_state", &mut self.active_task_state) {
                continue;
            }
            if parse_int(&line, "app_version_num", &mut self.app_version_num) {
                continue;
            }
            if parse_int(&line, "slot", &mut self.slot) {
                continue;
            }
            if parse_int(&line, "pid", &mut self.pid) {
                continue;
            }
            if parse_double(&line, "checkpoint_cpu_time", &mut self.checkpoint_cpu_time) {
                continue;
            }
            if parse_double(&line, "current_cpu_time", &mut self.current_cpu_time) {
                continue;
            }
            if parse_double(&line, "fraction_done", &mut self.fraction_done) {
                continue;
            }
            if parse_double(&line, "elapsed_time", &mut self.elapsed_time) {
                continue;
            }
            if parse_double(&line, "swap_size", &mut self.swap_size) {
                continue;
            }
            if parse_double(
                &line,
                "working_set_size_smoothed",
                &mut self.working_set_size_smoothed,
            ) {
                continue;
            }
            if parse_double(
                &line,
                "estimated_cpu_time_remaining",
                &mut self.estimated_cpu_time_remaining,
            ) {
                continue;
            }
            if parse_bool(&line, "too_large", &mut self.too_large) {
                continue;
            }
            if parse_bool(&line, "needs_shmem", &mut self.needs_shmem) {
                continue;
            }
            if parse_bool(&line, "edf_scheduled", &mut self.edf_scheduled) {
                continue;
            }
        }
        Err(RpcError::XmlParse(Self::TAG.to_string()))
    }
}
