//! Typed wrappers for each GUI RPC request.
//!
//! Every operation is one [`Rpc`] exchange: build the request body, send it,
//! then either parse the generic verdict or a typed element from the reply.

use crate::client::RpcClient;
use crate::rpc::{reply_error, Rpc};
use crate::types::{
    AccountIn, AccountOut, AcctMgrInfo, AcctMgrRpcReply, CcState, CcStatus, DiskUsage,
    FileTransfer, GrProxyInfo, Message, Parse, Project, ProjectConfig, RunMode, TaskResult,
    VersionInfo,
};
use boincrpc_proto::xml::xml_escape;
use boincrpc_proto::{LineStream, Result, RpcError};

/// Protocol version this client announces in `exchange_versions`.
pub const CLIENT_VERSION: VersionInfo = VersionInfo {
    major: 7,
    minor: 0,
    release: 0,
};

/// `error_num` reported by the `_poll` requests while the core client is
/// still waiting on the remote server.
pub const ERR_IN_PROGRESS: i32 = -204;

/// Request element for a project operation name.
fn project_op_tag(op: &str) -> Option<&'static str> {
    Some(match op {
        "reset" => "project_reset",
        "detach" => "project_detach",
        "update" => "project_update",
        "suspend" => "project_suspend",
        "resume" => "project_resume",
        "nomorework" => "project_nomorework",
        "allowmorework" => "project_allowmorework",
        "detach_when_done" => "project_detach_when_done",
        "dont_detach_when_done" => "project_dont_detach_when_done",
        _ => return None,
    })
}

fn result_op_tag(op: &str) -> Option<&'static str> {
    Some(match op {
        "abort" => "abort_result",
        "suspend" => "suspend_result",
        "resume" => "resume_result",
        _ => return None,
    })
}

fn file_transfer_op_tag(op: &str) -> Option<&'static str> {
    Some(match op {
        "retry" => "retry_file_transfer",
        "abort" => "abort_file_transfer",
        _ => return None,
    })
}

/// Map an in-progress poll reply to [`RpcError::Retry`].
fn settled(error_num: i32) -> Result<()> {
    if error_num == ERR_IN_PROGRESS {
        Err(RpcError::Retry)
    } else {
        Ok(())
    }
}

impl RpcClient {
    /// Send `request` and interpret the generic verdict.
    fn simple_rpc(&mut self, request: &str) -> Result<()> {
        let mut rpc = Rpc::new(self);
        rpc.do_rpc(request)?;
        rpc.parse_reply()
    }

    fn element_rpc<T: Parse + Default>(&mut self, request: &str) -> Result<T> {
        let mut rpc = Rpc::new(self);
        rpc.do_rpc(request)?;
        rpc.parse_element()
    }

    fn list_rpc<T: Parse + Default>(&mut self, request: &str, list_tag: &str) -> Result<Vec<T>> {
        let mut rpc = Rpc::new(self);
        rpc.do_rpc(request)?;
        rpc.parse_list(list_tag)
    }

    /// Read a `<tag><mode/></tag>` reply.
    fn mode_rpc(&mut self, request: &str, tag: &str) -> Result<RunMode> {
        let mut rpc = Rpc::new(self);
        rpc.do_rpc(request)?;
        let mut fin = rpc.stream();
        while let Some(line) = fin.next_line() {
            if let Some(mode) = RunMode::from_line(&line) {
                return Ok(mode);
            }
            if let Some(err) = reply_error(&line) {
                return Err(err);
            }
        }
        Err(RpcError::XmlParse(tag.to_string()))
    }

    pub fn exchange_versions(&mut self) -> Result<VersionInfo> {
        let request = format!(
            "<exchange_versions>\n   <major>{}</major>\n   <minor>{}</minor>\n   <release>{}</release>\n</exchange_versions>\n",
            CLIENT_VERSION.major, CLIENT_VERSION.minor, CLIENT_VERSION.release
        );
        self.element_rpc(&request)
    }

    pub fn get_state(&mut self) -> Result<CcState> {
        self.element_rpc("<get_state/>\n")
    }

    /// Tasks known to the core client; `active_only` limits the list to
    /// those with a running or suspended process.
    pub fn get_results(&mut self, active_only: bool) -> Result<Vec<TaskResult>> {
        let request = format!(
            "<get_results>\n<active_only>{}</active_only>\n</get_results>\n",
            i32::from(active_only)
        );
        self.list_rpc(&request, "results")
    }

    pub fn get_file_transfers(&mut self) -> Result<Vec<FileTransfer>> {
        self.list_rpc("<get_file_transfers/>\n", "file_transfers")
    }

    pub fn get_project_status(&mut self) -> Result<Vec<Project>> {
        self.list_rpc("<get_project_status/>\n", "projects")
    }

    pub fn get_disk_usage(&mut self) -> Result<DiskUsage> {
        self.element_rpc("<get_disk_usage/>\n")
    }

    /// Messages with a sequence number greater than `seqno`.
    pub fn get_messages(&mut self, seqno: i32) -> Result<Vec<Message>> {
        let request = format!("<get_messages>\n<seqno>{}</seqno>\n</get_messages>\n", seqno);
        self.list_rpc(&request, "msgs")
    }

    pub fn get_cc_status(&mut self) -> Result<CcStatus> {
        self.element_rpc("<get_cc_status/>\n")
    }

    pub fn get_run_mode(&mut self) -> Result<RunMode> {
        self.mode_rpc("<get_run_mode/>\n", "run_mode")
    }

    /// Set the computation mode; a non-zero `duration` (seconds) makes the
    /// change temporary.
    pub fn set_run_mode(&mut self, mode: RunMode, duration: f64) -> Result<()> {
        let request = format!(
            "<set_run_mode>\n{}\n<duration>{}</duration>\n</set_run_mode>\n",
            mode.tag(),
            duration
        );
        self.simple_rpc(&request)
    }

    pub fn get_network_mode(&mut self) -> Result<RunMode> {
        self.mode_rpc("<get_network_mode/>\n", "network_mode")
    }

    pub fn set_network_mode(&mut self, mode: RunMode, duration: f64) -> Result<()> {
        let request = format!(
            "<set_network_mode>\n{}\n<duration>{}</duration>\n</set_network_mode>\n",
            mode.tag(),
            duration
        );
        self.simple_rpc(&request)
    }

    /// Apply `op` (`reset`, `detach`, `update`, `suspend`, `resume`,
    /// `nomorework`, `allowmorework`, `detach_when_done`,
    /// `dont_detach_when_done`) to `project`.
    pub fn project_op(&mut self, project: &Project, op: &str) -> Result<()> {
        let tag = project_op_tag(op).ok_or_else(|| RpcError::UnknownOp(op.to_string()))?;
        let request = format!(
            "<{tag}>\n  <project_url>{}</project_url>\n</{tag}>\n",
            xml_escape(&project.master_url)
        );
        self.simple_rpc(&request)
    }

    pub fn project_attach(&mut self, url: &str, authenticator: &str, name: &str) -> Result<()> {
        let request = format!(
            "<project_attach>\n  <project_url>{}</project_url>\n  <authenticator>{}</authenticator>\n  <project_name>{}</project_name>\n</project_attach>\n",
            xml_escape(url),
            xml_escape(authenticator),
            xml_escape(name)
        );
        self.simple_rpc(&request)
    }

    /// Apply `op` (`abort`, `suspend`, `resume`) to a task.
    pub fn result_op(&mut self, result: &TaskResult, op: &str) -> Result<()> {
        let tag = result_op_tag(op).ok_or_else(|| RpcError::UnknownOp(op.to_string()))?;
        let request = format!(
            "<{tag}>\n  <project_url>{}</project_url>\n  <name>{}</name>\n</{tag}>\n",
            xml_escape(&result.project_url),
            xml_escape(&result.name)
        );
        self.simple_rpc(&request)
    }

    /// Apply `op` (`retry`, `abort`) to a file transfer.
    pub fn file_transfer_op(&mut self, ft: &FileTransfer, op: &str) -> Result<()> {
        let tag = file_transfer_op_tag(op).ok_or_else(|| RpcError::UnknownOp(op.to_string()))?;
        let request = format!(
            "<{tag}>\n  <project_url>{}</project_url>\n  <filename>{}</filename>\n</{tag}>\n",
            xml_escape(&ft.project_url),
            xml_escape(&ft.name)
        );
        self.simple_rpc(&request)
    }

    pub fn set_proxy_settings(&mut self, info: &GrProxyInfo) -> Result<()> {
        let request = format!(
            "<set_proxy_settings>\n{}</set_proxy_settings>\n",
            info.to_request()
        );
        self.simple_rpc(&request)
    }

    pub fn get_proxy_settings(&mut self) -> Result<GrProxyInfo> {
        self.element_rpc("<get_proxy_settings/>\n")
    }

    /// Tell the core client a network connection is now available.
    pub fn network_available(&mut self) -> Result<()> {
        self.simple_rpc("<network_available/>\n")
    }

    pub fn run_benchmarks(&mut self) -> Result<()> {
        self.simple_rpc("<run_benchmarks/>\n")
    }

    /// Ask the core client to exit.
    pub fn quit(&mut self) -> Result<()> {
        self.simple_rpc("<quit/>\n")
    }

    pub fn acct_mgr_info(&mut self) -> Result<AcctMgrInfo> {
        self.element_rpc("<acct_mgr_info/>\n")
    }

    /// Start an account manager synchronisation; follow with
    /// [`RpcClient::acct_mgr_rpc_poll`]. With `use_config_file` the core
    /// client takes the manager URL and credentials from its own
    /// configuration and the other arguments are ignored. An empty `url`
    /// detaches from the current manager.
    pub fn acct_mgr_rpc(
        &mut self,
        url: &str,
        name: &str,
        password: &str,
        use_config_file: bool,
    ) -> Result<()> {
        let request = if use_config_file {
            "<acct_mgr_rpc>\n  <use_config_file/>\n</acct_mgr_rpc>\n".to_string()
        } else {
            format!(
                "<acct_mgr_rpc>\n  <url>{}</url>\n  <name>{}</name>\n  <password>{}</password>\n</acct_mgr_rpc>\n",
                xml_escape(url),
                xml_escape(name),
                xml_escape(password)
            )
        };
        self.simple_rpc(&request)
    }

    /// Outcome of the last [`RpcClient::acct_mgr_rpc`]; `Retry` while it is
    /// still running.
    pub fn acct_mgr_rpc_poll(&mut self) -> Result<AcctMgrRpcReply> {
        let reply: AcctMgrRpcReply = self.element_rpc("<acct_mgr_rpc_poll/>\n")?;
        settled(reply.error_num)?;
        Ok(reply)
    }

    /// Start fetching a project's configuration; follow with
    /// [`RpcClient::get_project_config_poll`].
    pub fn get_project_config(&mut self, url: &str) -> Result<()> {
        let request = format!(
            "<get_project_config>\n   <url>{}</url>\n</get_project_config>\n",
            xml_escape(url)
        );
        self.simple_rpc(&request)
    }

    pub fn get_project_config_poll(&mut self) -> Result<ProjectConfig> {
        let config: ProjectConfig = self.element_rpc("<get_project_config_poll/>\n")?;
        settled(config.error_num)?;
        Ok(config)
    }

    pub fn lookup_account(&mut self, account: &AccountIn) -> Result<()> {
        self.simple_rpc(&account.to_request("lookup_account", false))
    }

    pub fn lookup_account_poll(&mut self) -> Result<AccountOut> {
        let out: AccountOut = self.element_rpc("<lookup_account_poll/>\n")?;
        settled(out.error_num)?;
        Ok(out)
    }

    pub fn create_account(&mut self, account: &AccountIn) -> Result<()> {
        self.simple_rpc(&account.to_request("create_account", true))
    }

    pub fn create_account_poll(&mut self) -> Result<AccountOut> {
        let out: AccountOut = self.element_rpc("<create_account_poll/>\n")?;
        settled(out.error_num)?;
        Ok(out)
    }
}
