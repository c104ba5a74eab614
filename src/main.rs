use boincrpc::config::Config;
use boincrpc::types::{AccountIn, FileTransfer, GrProxyInfo, Project, RunMode, TaskResult};
use boincrpc::{RpcClient, RpcError};
use serde::Serialize;
use std::error::Error;
use std::io::{self, Write};
use std::time::Duration;

type CmdResult = Result<(), Box<dyn Error>>;

/// Delay between `_poll` requests while the core client is still busy.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

fn print_usage() {
    eprintln!(
        "boincrpc - talk to a BOINC core client over GUI RPC

Usage:
  boincrpc [--host HOST[:PORT]] [--passwd PASSWORD] [--unix [PATH]] [--json] <command> [args...]

Commands:
  get_state | get_results [--active] | get_file_transfers | get_project_status
  get_disk_usage | get_messages [seqno] | get_cc_status | get_proxy_settings
  exchange_versions | acct_mgr_info
  get_run_mode | get_network_mode
  set_run_mode <always|auto|never|restore> [duration]
  set_network_mode <always|auto|never|restore> [duration]
  project <URL> <reset|detach|update|suspend|resume|nomorework|allowmorework|
                 detach_when_done|dont_detach_when_done>
  project_attach <URL> <authenticator> [name]
  task <URL> <name> <abort|suspend|resume>
  file_transfer <URL> <filename> <retry|abort>
  set_proxy_settings <http_server> <http_port> <http_user> <http_passwd>
                     <socks_server> <socks_port> <socks5_user> <socks5_passwd> <no_proxy>
  get_project_config <URL>
  lookup_account <URL> <email> <passwd>
  create_account <URL> <email> <passwd> <name>
  acct_mgr attach <URL> <name> <passwd> | acct_mgr sync | acct_mgr detach
  network_available | run_benchmarks | quit

The --unix PATH operand must contain a '/'; without one, ./boinc_socket is used.

Environment:
  BOINCRPC_HOST           Default host (HOST[:PORT])
  BOINCRPC_PORT           Default port
  BOINCRPC_PASSWORD_FILE  Password file (default gui_rpc_auth.cfg)
  RUST_LOG                Log filter (default warn)"
    );
}

fn arg<'a>(args: &'a [String], i: usize, what: &str) -> Result<&'a str, Box<dyn Error>> {
    args.get(i)
        .map(|s| s.as_str())
        .ok_or_else(|| format!("missing {}", what).into())
}

/// Print `value` as JSON or through its human-readable dump.
fn show<T, F>(cfg: &Config, value: &T, print: F) -> CmdResult
where
    T: Serialize,
    F: FnOnce(&T, &mut dyn Write) -> io::Result<()>,
{
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if cfg.json {
        serde_json::to_writer_pretty(&mut out, value)?;
        writeln!(out)?;
    } else {
        print(value, &mut out)?;
    }
    Ok(())
}

fn show_list<T, F>(cfg: &Config, title: &str, items: &[T], print: F) -> CmdResult
where
    T: Serialize,
    F: Fn(&T, &mut dyn Write) -> io::Result<()>,
{
    show(cfg, &items, |items, out| {
        writeln!(out, "======== {} ========", title)?;
        for (i, item) in items.iter().enumerate() {
            writeln!(out, "{}) -----------", i + 1)?;
            print(item, out)?;
        }
        Ok(())
    })
}

/// Repeat a `_poll` request until the core client has an answer.
fn poll_until_done<T>(mut poll: impl FnMut() -> boincrpc::Result<T>) -> boincrpc::Result<T> {
    loop {
        match poll() {
            Err(RpcError::Retry) => std::thread::sleep(POLL_INTERVAL),
            other => return other,
        }
    }
}

fn parse_duration(args: &[String], i: usize) -> Result<f64, Box<dyn Error>> {
    match args.get(i) {
        Some(s) => Ok(s.parse::<f64>().map_err(|_| format!("invalid duration '{}'", s))?),
        None => Ok(0.0),
    }
}

fn parse_port(s: &str) -> Result<i32, Box<dyn Error>> {
    Ok(s.parse::<i32>().map_err(|_| format!("invalid port '{}'", s))?)
}

fn connect(cfg: &Config) -> boincrpc::Result<RpcClient> {
    let mut client = RpcClient::new();
    match &cfg.unix_path {
        Some(path) => client.init_unix_domain_at(path)?,
        None => client.init(&cfg.host, cfg.port)?,
    }
    if let Some(password) = cfg.password.as_deref().filter(|pw| !pw.is_empty()) {
        client.authorize(password)?;
    }
    Ok(client)
}

fn run(cfg: &Config, args: &[String]) -> CmdResult {
    let Some(cmd) = args.first() else {
        print_usage();
        std::process::exit(1);
    };
    if matches!(cmd.as_str(), "-h" | "--help" | "help") {
        print_usage();
        return Ok(());
    }

    let mut client = connect(cfg)?;
    let ops = &args[1..];
    match cmd.as_str() {
        "get_state" => {
            let state = client.get_state()?;
            show(cfg, &state, |s, out| s.print(out))
        }
        "get_results" => {
            let active_only = ops.first().map(|s| s == "--active").unwrap_or(false);
            let results = client.get_results(active_only)?;
            show_list(cfg, "Tasks", &results, |r, out| r.print(out))
        }
        "get_file_transfers" => {
            let transfers = client.get_file_transfers()?;
            show_list(cfg, "File transfers", &transfers, |t, out| t.print(out))
        }
        "get_project_status" => {
            let projects = client.get_project_status()?;
            show_list(cfg, "Projects", &projects, |p, out| p.print(out))
        }
        "get_disk_usage" => {
            let usage = client.get_disk_usage()?;
            show(cfg, &usage, |u, out| u.print(out))
        }
        "get_messages" => {
            let seqno = match ops.first() {
                Some(s) => s.parse().map_err(|_| format!("invalid seqno '{}'", s))?,
                None => 0,
            };
            let msgs = client.get_messages(seqno)?;
            show(cfg, &msgs, |msgs, out| {
                for m in msgs {
                    m.print(out)?;
                }
                Ok(())
            })
        }
        "get_cc_status" => {
            let status = client.get_cc_status()?;
            show(cfg, &status, |s, out| s.print(out))
        }
        "get_proxy_settings" => {
            let info = client.get_proxy_settings()?;
            show(cfg, &info, |p, out| p.print(out))
        }
        "exchange_versions" => {
            let version = client.exchange_versions()?;
            show(cfg, &version, |v, out| v.print(out))
        }
        "acct_mgr_info" => {
            let info = client.acct_mgr_info()?;
            show(cfg, &info, |i, out| i.print(out))
        }
        "get_run_mode" => {
            let mode = client.get_run_mode()?;
            show(cfg, &mode, |m, out| writeln!(out, "run mode: {}", m))
        }
        "get_network_mode" => {
            let mode = client.get_network_mode()?;
            show(cfg, &mode, |m, out| writeln!(out, "network mode: {}", m))
        }
        "set_run_mode" => {
            let mode: RunMode = arg(ops, 0, "mode")?.parse()?;
            client.set_run_mode(mode, parse_duration(ops, 1)?)?;
            Ok(())
        }
        "set_network_mode" => {
            let mode: RunMode = arg(ops, 0, "mode")?.parse()?;
            client.set_network_mode(mode, parse_duration(ops, 1)?)?;
            Ok(())
        }
        "project" => {
            let project = Project {
                master_url: arg(ops, 0, "project URL")?.to_string(),
                ..Default::default()
            };
            client.project_op(&project, arg(ops, 1, "operation")?)?;
            Ok(())
        }
        "project_attach" => {
            let url = arg(ops, 0, "project URL")?;
            let auth = arg(ops, 1, "authenticator")?;
            let name = ops.get(2).map(|s| s.as_str()).unwrap_or("");
            client.project_attach(url, auth, name)?;
            Ok(())
        }
        "task" => {
            let result = TaskResult {
                project_url: arg(ops, 0, "project URL")?.to_string(),
                name: arg(ops, 1, "task name")?.to_string(),
                ..Default::default()
            };
            client.result_op(&result, arg(ops, 2, "operation")?)?;
            Ok(())
        }
        "file_transfer" => {
            let ft = FileTransfer {
                project_url: arg(ops, 0, "project URL")?.to_string(),
                name: arg(ops, 1, "file name")?.to_string(),
                ..Default::default()
            };
            client.file_transfer_op(&ft, arg(ops, 2, "operation")?)?;
            Ok(())
        }
        "set_proxy_settings" => {
            let http_server_name = arg(ops, 0, "HTTP server")?.to_string();
            let socks_server_name = arg(ops, 4, "SOCKS server")?.to_string();
            let info = GrProxyInfo {
                use_http_proxy: !http_server_name.is_empty(),
                use_socks_proxy: !socks_server_name.is_empty(),
                http_server_port: parse_port(arg(ops, 1, "HTTP port")?)?,
                http_user_name: arg(ops, 2, "HTTP user")?.to_string(),
                http_user_passwd: arg(ops, 3, "HTTP password")?.to_string(),
                socks_server_port: parse_port(arg(ops, 5, "SOCKS port")?)?,
                socks5_user_name: arg(ops, 6, "SOCKS5 user")?.to_string(),
                socks5_user_passwd: arg(ops, 7, "SOCKS5 password")?.to_string(),
                no_proxy: arg(ops, 8, "no-proxy list")?.to_string(),
                http_server_name,
                socks_server_name,
                ..Default::default()
            };
            client.set_proxy_settings(&info)?;
            Ok(())
        }
        "get_project_config" => {
            client.get_project_config(arg(ops, 0, "project URL")?)?;
            let config = poll_until_done(|| client.get_project_config_poll())?;
            show(cfg, &config, |c, out| c.print(out))
        }
        "lookup_account" | "create_account" => {
            let account = AccountIn {
                url: arg(ops, 0, "project URL")?.to_string(),
                email_addr: arg(ops, 1, "email address")?.to_string(),
                passwd: arg(ops, 2, "password")?.to_string(),
                user_name: if cmd == "create_account" {
                    arg(ops, 3, "user name")?.to_string()
                } else {
                    String::new()
                },
            };
            let out = if cmd == "lookup_account" {
                client.lookup_account(&account)?;
                poll_until_done(|| client.lookup_account_poll())?
            } else {
                client.create_account(&account)?;
                poll_until_done(|| client.create_account_poll())?
            };
            show(cfg, &out, |a, w| a.print(w))
        }
        "acct_mgr" => {
            match arg(ops, 0, "acct_mgr subcommand")? {
                "attach" => client.acct_mgr_rpc(
                    arg(ops, 1, "account manager URL")?,
                    arg(ops, 2, "name")?,
                    arg(ops, 3, "password")?,
                    false,
                )?,
                "sync" => client.acct_mgr_rpc("", "", "", true)?,
                "detach" => client.acct_mgr_rpc("", "", "", false)?,
                other => return Err(format!("unknown acct_mgr subcommand '{}'", other).into()),
            }
            let reply = poll_until_done(|| client.acct_mgr_rpc_poll())?;
            show(cfg, &reply, |r, out| r.print(out))
        }
        "network_available" => Ok(client.network_available()?),
        "run_benchmarks" => Ok(client.run_benchmarks()?),
        "quit" => Ok(client.quit()?),
        _ => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            std::process::exit(1);
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (cfg, rest) = match Config::load(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&cfg, &rest) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
