//! The full `<client_state>` snapshot.
//!
//! The snapshot is read in one pass. Apps, app versions, workunits and
//! results belong to the most recent `<project>` before them, and each
//! back-reference is resolved against elements already read. The peer lists
//! projects, then apps and app versions, then workunits, then results; an
//! element that refers to something listed later is left unresolved
//! (`None`).

use super::{parse_multiline, App, AppVersion, Parse, Project, TaskResult, Workunit};
use boincrpc_proto::xml::{match_tag, parse_bool, parse_int, parse_str};
use boincrpc_proto::{LineStream, Result, RpcError};
use log::debug;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CcState {
    pub projects: Vec<Project>,
    pub apps: Vec<App>,
    pub app_versions: Vec<AppVersion>,
    pub workunits: Vec<Workunit>,
    pub results: Vec<TaskResult>,
    pub platform_name: String,
    pub core_client_major_version: i32,
    pub core_client_minor_version: i32,
    pub core_client_release: i32,
    pub executing_as_daemon: bool,
    /// Raw `<global_preferences>` contents.
    pub global_prefs: String,
}

/// URLs compare equal with or without a trailing slash.
fn same_url(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

impl CcState {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn project_index(&self, url: &str) -> Option<usize> {
        self.projects
            .iter()
            .position(|p| same_url(&p.master_url, url))
    }

    fn app_index(&self, project: Option<usize>, name: &str) -> Option<usize> {
        self.apps
            .iter()
            .position(|a| a.project == project && a.name == name)
    }

    fn app_version_index(
        &self,
        project: Option<usize>,
        app: Option<usize>,
        version_num: i32,
        plan_class: &str,
    ) -> Option<usize> {
        self.app_versions.iter().position(|av| {
            av.project == project
                && av.app == app
                && av.version_num == version_num
                && av.plan_class == plan_class
        })
    }

    fn wu_index(&self, project: Option<usize>, name: &str) -> Option<usize> {
        self.workunits
            .iter()
            .position(|wu| wu.project == project && wu.name == name)
    }

    pub fn lookup_project(&self, url: &str) -> Option<&Project> {
        self.project_index(url).map(|i| &self.projects[i])
    }

    pub fn lookup_app(&self, project_url: &str, name: &str) -> Option<&App> {
        let project = self.project_index(project_url)?;
        self.app_index(Some(project), name).map(|i| &self.apps[i])
    }

    pub fn lookup_app_version(
        &self,
        project_url: &str,
        app_name: &str,
        version_num: i32,
        plan_class: &str,
    ) -> Option<&AppVersion> {
        let project = Some(self.project_index(project_url)?);
        let app = Some(self.app_index(project, app_name)?);
        self.app_version_index(project, app, version_num, plan_class)
            .map(|i| &self.app_versions[i])
    }

    pub fn lookup_wu(&self, project_url: &str, name: &str) -> Option<&Workunit> {
        let project = self.project_index(project_url)?;
        self.wu_index(Some(project), name).map(|i| &self.workunits[i])
    }

    pub fn lookup_result(&self, project_url: &str, name: &str) -> Option<&TaskResult> {
        let project = Some(self.project_index(project_url)?);
        self.results
            .iter()
            .find(|r| r.project == project && r.name == name)
    }

    /// Project owning `result`, as resolved when the snapshot was read.
    pub fn result_project(&self, result: &TaskResult) -> Option<&Project> {
        result.project.and_then(|i| self.projects.get(i))
    }

    pub fn result_wu(&self, result: &TaskResult) -> Option<&Workunit> {
        result.wu.and_then(|i| self.workunits.get(i))
    }

    fn add_app(&mut self, mut app: App, project: Option<usize>) {
        app.project = project;
        self.apps.push(app);
    }

    fn add_app_version(&mut self, mut av: AppVersion, project: Option<usize>) {
        av.project = project;
        av.app = self.app_index(project, &av.app_name);
        self.app_versions.push(av);
    }

    fn add_workunit(&mut self, mut wu: Workunit, project: Option<usize>) {
        wu.project = project;
        wu.app = self.app_index(project, &wu.app_name);
        self.workunits.push(wu);
    }

    fn add_result(&mut self, mut result: TaskResult, current: Option<usize>) {
        result.project = if result.project_url.is_empty() {
            current
        } else {
            self.project_index(&result.project_url)
        };
        result.wu = self.wu_index(result.project, &result.wu_name);
        match result.wu {
            Some(wi) => {
                let wu = &self.workunits[wi];
                result.app = wu.app;
                let version_num = if result.version_num != 0 {
                    result.version_num
                } else {
                    wu.version_num
                };
                result.avp = self.app_version_index(
                    result.project,
                    result.app,
                    version_num,
                    &result.plan_class,
                );
            }
            None => debug!("result {} precedes workunit {}", result.name, result.wu_name),
        }
        self.results.push(result);
    }

    pub fn print(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "======== Projects ========")?;
        for (i, p) in self.projects.iter().enumerate() {
            writeln!(out, "{}) -----------", i + 1)?;
            p.print(out)?;
        }
        writeln!(out, "\n======== Applications ========")?;
        for (i, app) in self.apps.iter().enumerate() {
            writeln!(out, "{}) -----------", i + 1)?;
            app.print(out)?;
            if let Some(p) = app.project.and_then(|i| self.projects.get(i)) {
                writeln!(out, "   project: {}", p.name())?;
            }
        }
        writeln!(out, "\n======== Application versions ========")?;
        for (i, av) in self.app_versions.iter().enumerate() {
            writeln!(out, "{}) -----------", i + 1)?;
            av.print(out)?;
            if let Some(p) = av.project.and_then(|i| self.projects.get(i)) {
                writeln!(out, "   project: {}", p.name())?;
            }
        }
        writeln!(out, "\n======== Workunits ========")?;
        for (i, wu) in self.workunits.iter().enumerate() {
            writeln!(out, "{}) -----------", i + 1)?;
            wu.print(out)?;
            if let Some(p) = wu.project.and_then(|i| self.projects.get(i)) {
                writeln!(out, "   project: {}", p.name())?;
            }
        }
        writeln!(out, "\n======== Tasks ========")?;
        for (i, r) in self.results.iter().enumerate() {
            writeln!(out, "{}) -----------", i + 1)?;
            r.print(out)?;
        }
        Ok(())
    }
}

impl Parse for CcState {
    const TAG: &'static str = "client_state";

    fn parse(&mut self, input: &mut dyn LineStream) -> Result<()> {
        let mut current: Option<usize> = None;
        while let Some(line) = input.next_line() {
            if match_tag(&line, "</client_state>") {
                return Ok(());
            }
            if parse_multiline(&line, input, "global_preferences", &mut self.global_prefs)? {
                continue;
            }
            if match_tag(&line, "<project>") {
                let mut project = Project::default();
                project.parse(input)?;
                self.projects.push(project);
                current = Some(self.projects.len() - 1);
                continue;
            }
            if match_tag(&line, "<app>") {
                let mut app = App::default();
                app.parse(input)?;
                self.add_app(app, current);
                continue;
            }
            if match_tag(&line, "<app_version>") {
                let mut av = AppVersion::default();
                av.parse(input)?;
                self.add_app_version(av, current);
                continue;
            }
            if match_tag(&line, "<workunit>") {
                let mut wu = Workunit::default();
                wu.parse(input)?;
                self.add_workunit(wu, current);
                continue;
            }
            if match_tag(&line, "<result>") {
                let mut result = TaskResult::default();
                result.parse(input)?;
                self.add_result(result, current);
                continue;
            }
            if parse_str(&line, "platform_name", &mut self.platform_name) {
                continue;
            }
            if parse_int(
                &line,
                "core_client_major_version",
                &mut self.core_client_major_version,
            ) {
                continue;
            }
            if parse_int(
                &line,
                "core_client_minor_version",
                &mut self.core_client_minor_version,
            ) {
                continue;
            }
            if parse_int(&line, "core_client_release", &mut self.core_client_release) {
                continue;
            }
            if parse_bool(&line, "executing_as_daemon", &mut self.executing_as_daemon) {
                continue;
            }
        }
        Err(RpcError::XmlParse(Self::TAG.to_string()))
    }
}
