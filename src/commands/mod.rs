pub mod batch;
pub mod dump;
pub mod export;
pub mod join;
pub mod mirror;
pub mod mirror_range;

#[derive(Debug, Clone)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }
}

/// Check an external binary is reachable before driving it in a loop.
pub fn ensure_binary_available(name: &str, report: &mut CommandReport) -> bool {
    if which::which(name).is_ok() {
        return true;
    }
    report.issue(format!("{name} binary unavailable; ensure it is on PATH"));
    false
}
