use std::fmt::Write as _;

use glres::trace::Command;
use glres::{DiagnosticEntry, FramebufferStatus, Severity, TextureState};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    Failed,
    Pending,
    Cancelled,
    Incomplete,
}

impl Status {
    fn label(self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::Failed => "failed",
            Status::Pending => "pending",
            Status::Cancelled => "cancelled",
            Status::Incomplete => "incomplete",
        }
    }
}

/// Outcome of building one named resource.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceReport {
    pub name: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ResourceReport {
    pub fn ok(name: &str, detail: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            status: Status::Ok,
            detail,
        }
    }

    pub fn failed(name: &str, error: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            status: Status::Failed,
            detail: Some(error.to_string()),
        }
    }

    pub fn texture(name: &str, state: &TextureState) -> Self {
        let (status, detail) = match state {
            TextureState::Ready { width, height } => (Status::Ok, Some(format!("{width}x{height}"))),
            TextureState::Pending => (Status::Pending, Some("load did not finish".to_string())),
            TextureState::Failed { reason } => (Status::Failed, Some(reason.clone())),
            TextureState::Cancelled => (Status::Cancelled, None),
        };
        Self {
            name: name.to_string(),
            status,
            detail,
        }
    }

    pub fn framebuffer(name: &str, status: FramebufferStatus, attached: &[String]) -> Self {
        let detail = if attached.is_empty() {
            status_name(status).to_string()
        } else {
            format!("{} [{}]", status_name(status), attached.join(", "))
        };
        Self {
            name: name.to_string(),
            status: if status.is_complete() {
                Status::Ok
            } else {
                Status::Incomplete
            },
            detail: Some(detail),
        }
    }
}

fn status_name(status: FramebufferStatus) -> &'static str {
    match status {
        FramebufferStatus::Complete => "complete",
        FramebufferStatus::IncompleteAttachment => "incomplete attachment",
        FramebufferStatus::MissingAttachment => "missing attachment",
        FramebufferStatus::IncompleteDimensions => "incomplete dimensions",
        FramebufferStatus::Unsupported => "unsupported",
        FramebufferStatus::Other(_) => "unknown status",
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtensionReport {
    pub required: Vec<String>,
    pub supported: Vec<String>,
    pub missing: Vec<String>,
}

impl ExtensionReport {
    pub fn is_ok(&self) -> bool {
        self.missing.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticLine {
    pub severity: &'static str,
    pub message: String,
}

impl From<DiagnosticEntry> for DiagnosticLine {
    fn from(entry: DiagnosticEntry) -> Self {
        Self {
            severity: match entry.severity {
                Severity::Log => "log",
                Severity::Error => "error",
            },
            message: entry.message,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TraceLine {
    pub call: &'static str,
    pub detail: String,
}

impl From<&Command> for TraceLine {
    fn from(command: &Command) -> Self {
        Self {
            call: command.name(),
            detail: format!("{command:?}"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProbeReport {
    pub manifest: String,
    pub extensions: ExtensionReport,
    pub programs: Vec<ResourceReport>,
    pub meshes: Vec<ResourceReport>,
    pub textures: Vec<ResourceReport>,
    pub framebuffers: Vec<ResourceReport>,
    pub shadow_maps: Vec<ResourceReport>,
    pub draws: Vec<ResourceReport>,
    pub diagnostics: Vec<DiagnosticLine>,
    pub command_count: usize,
    /// Device objects still alive after every resource was deleted.
    pub leaked_objects: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<TraceLine>>,
}

impl ProbeReport {
    /// Extension negotiation and every program must have succeeded.
    pub fn is_success(&self) -> bool {
        self.extensions.is_ok()
            && self
                .programs
                .iter()
                .all(|program| program.status == Status::Ok)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Manifest: {}", self.manifest);
        render_extensions(&mut out, &self.extensions);

        let sections = [
            ("Programs", &self.programs),
            ("Meshes", &self.meshes),
            ("Textures", &self.textures),
            ("Framebuffers", &self.framebuffers),
            ("Shadow maps", &self.shadow_maps),
            ("Draws", &self.draws),
        ];
        for (title, entries) in sections {
            if entries.is_empty() {
                continue;
            }
            let _ = writeln!(out, "{title}:");
            for entry in entries {
                let _ = write!(out, "  {:<20} {:<10}", entry.name, entry.status.label());
                if let Some(detail) = &entry.detail {
                    let _ = write!(out, " {detail}");
                }
                out.push('\n');
            }
        }

        if !self.diagnostics.is_empty() {
            let _ = writeln!(out, "Diagnostics:");
            for line in &self.diagnostics {
                let _ = writeln!(out, "  [{}] {}", line.severity, line.message);
            }
        }

        let _ = writeln!(out, "Commands issued: {}", self.command_count);
        let _ = writeln!(out, "Objects leaked after teardown: {}", self.leaked_objects);

        if let Some(trace) = &self.trace {
            let _ = writeln!(out, "Trace:");
            for (index, line) in trace.iter().enumerate() {
                let _ = writeln!(out, "  {index:>5} {:<24} {}", line.call, line.detail);
            }
        }
        out
    }
}

pub fn render_extensions(out: &mut String, report: &ExtensionReport) {
    let _ = writeln!(out, "Extensions:");
    if report.required.is_empty() {
        let _ = writeln!(out, "  (none required)");
    }
    for name in &report.required {
        let status = if report.missing.contains(name) {
            "missing"
        } else {
            "supported"
        };
        let _ = writeln!(out, "  {name:<32} {status}");
    }
    let extra: Vec<&String> = report
        .supported
        .iter()
        .filter(|name| !report.required.contains(name))
        .collect();
    if !extra.is_empty() {
        let names: Vec<&str> = extra.iter().map(|name| name.as_str()).collect();
        let _ = writeln!(out, "  also supported: {}", names.join(", "));
    }
}
