use super::Parse;
use boincrpc_proto::xml::{match_tag, parse_double, parse_int, parse_str};
use boincrpc_proto::{LineStream, Result, RpcError};
use serde::Serialize;
use std::io::{self, Write};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct App {
    pub name: String,
    pub user_friendly_name: String,
    /// Index of the owning project in the enclosing snapshot.
    #[serde(skip)]
    pub project: Option<usize>,
}

impl App {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn print(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "   name: {}", self.name)?;
        writeln!(out, "   user-friendly name: {}", self.user_friendly_name)
    }
}

impl Parse for App {
    const TAG: &'static str = "app";

    fn parse(&mut self, input: &mut dyn LineStream) -> Result<()> {
        while let Some(line) = input.next_line() {
            if match_tag(&line, "</app>") {
                return Ok(());
            }
            if parse_str(&line, "name", &mut self.name) {
                continue;
            }
            if parse_str(&line, "user_friendly_name", &mut self.user_friendly_name) {
                continue;
            }
        }
        Err(RpcError::XmlParse(Self::TAG.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppVersion {
    pub app_name: String,
    pub version_num: i32,
    pub platform: String,
    pub plan_class: String,
    pub avg_ncpus: f64,
    pub flops: f64,
    #[serde(skip)]
    pub project: Option<usize>,
    #[serde(skip)]
    pub app: Option<usize>,
}

impl AppVersion {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn print(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "   application: {}", self.app_name)?;
        writeln!(out, "   version: {:.2}", f64::from(self.version_num) / 100.0)?;
        writeln!(out, "   platform: {}", self.platform)?;
        if !self.plan_class.is_empty() {
            writeln!(out, "   plan class: {}", self.plan_class)?;
        }
        writeln!(out, "   avg #CPUS: {:.3}", self.avg_ncpus)?;
        writeln!(out, "   estimated GFLOPS: {:.2}", self.flops / 1e9)
    }
}

impl Parse for AppVersion {
    const TAG: &'static str = "app_version";

    fn parse(&mut self, input: &mut dyn LineStream) -> Result<()> {
        while let Some(line) = input.next_line() {
            if match_tag(&line, "</app_version>") {
                return Ok(());
            }
            if parse_str(&line, "app_name", &mut self.app_name) {
                continue;
            }
            if parse_int(&line, "version_num", &mut self.version_num) {
                continue;
            }
            if parse_str(&line, "platform", &mut self.platform) {
                continue;
            }
            if parse_str(&line, "plan_class", &mut self.plan_class) {
                continue;
            }
            if parse_double(&line, "avg_ncpus", &mut self.avg_ncpus) {
                continue;
            }
            if parse_double(&line, "flops", &mut self.flops) {
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
    fn app_fields() {
        let mut app = App::default();
        app.parse(&mut MemStream::new(
            "<name>setiathome</name>\n<user_friendly_name>SETI@home</user_friendly_name>\n</app>\n",
        ))
        .unwrap();
        assert_eq!(app.name, "setiathome");
        assert_eq!(app.user_friendly_name, "SETI@home");
        assert_eq!(app.project, None);
    }

    #[test]
    fn app_version_fields() {
        let text = "\
<app_name>setiathome</app_name>
<version_num>603</version_num>
<platform>x86_64-pc-linux-gnu</platform>
<avg_ncpus>1.000000</avg_ncpus>
<flops>2500000000</flops>
</app_version>
";
        let mut avp = AppVersion::default();
        avp.parse(&mut MemStream::new(text)).unwrap();
        assert_eq!(avp.version_num, 603);
        assert_eq!(avp.platform, "x86_64-pc-linux-gnu");
        assert_eq!(avp.avg_ncpus, 1.0);

        let mut out = Vec::new();
        avp.print(&mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("version: 6.03"));
    }

    #[test]
    fn truncated_app() {
        let mut app = App::default();
        let err = app.parse(&mut MemStream::new("<name>x</name>\n")).unwrap_err();
        assert!(matches!(err, RpcError::XmlParse(ref t) if t == "app"));

        let mut avp = AppVersion::default();
        let err = avp
            .parse(&mut MemStream::new("<version_num>603</version_num>\n"))
            .unwrap_err();
        assert!(matches!(err, RpcError::XmlParse(ref t) if t == "app_version"));
    }
}
