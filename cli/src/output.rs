//! Operator-facing output: the run summary and trust decisions.

use crate::logging::Annotations;
use camino::Utf8PathBuf;
use repo_trust::squatting::{Tick, TrustDecision};
use std::io::{self, Write};

/// Closing summary of a subcommand run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Whether the subcommand succeeded.
    pub success: bool,
    /// `owner/name` of the repository, when known.
    pub repository: Option<String>,
    /// Release tag, when one was involved.
    pub release: Option<String>,
    /// Number of artifacts in the manifest.
    pub artifacts: Option<usize>,
    /// Manifest written or verified.
    pub manifest: Option<Utf8PathBuf>,
    /// Published badge URL.
    pub badge_url: Option<String>,
}

impl RunSummary {
    /// A successful summary for `repository`.
    #[must_use]
    pub fn success(repository: impl Into<String>) -> Self {
        Self {
            success: true,
            repository: Some(repository.into()),
            ..Self::default()
        }
    }

    /// Format the summary block.
    ///
    /// # Examples
    ///
    /// ```
    /// use repo_trust_cli::output::RunSummary;
    ///
    /// let summary = RunSummary {
    ///     release: Some("v1.0.0".to_owned()),
    ///     artifacts: Some(3),
    ///     ..RunSummary::success("octo/widgets")
    /// };
    /// let text = summary.display_text();
    /// assert!(text.contains("Status:      SUCCESS"));
    /// assert!(text.contains("Artifacts:   3"));
    /// ```
    #[must_use]
    pub fn display_text(&self) -> String {
        let rule = "=".repeat(60);
        let mut lines = vec![
            rule.clone(),
            "REPO TRUST RUN SUMMARY".to_owned(),
            rule.clone(),
            format!(
                "Status:      {}",
                if self.success { "SUCCESS" } else { "FAILED" }
            ),
        ];
        let fields = [
            ("Repository:  ", self.repository.clone()),
            ("Release:     ", self.release.clone()),
            ("Artifacts:   ", self.artifacts.map(|count| count.to_string())),
            ("Manifest:    ", self.manifest.as_ref().map(ToString::to_string)),
            ("Badge URL:   ", self.badge_url.clone()),
        ];
        for (label, value) in fields {
            if let Some(value) = value {
                lines.push(format!("{label}{value}"));
            }
        }
        lines.push(rule);
        lines.join("\n")
    }

    /// Print the summary and record step outputs.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a step output cannot be written.
    pub fn emit(&self, out: &mut dyn Write, annotations: &Annotations) -> io::Result<()> {
        write_line(out, &self.display_text());
        annotations.set_output("success", if self.success { "true" } else { "false" })?;
        if let Some(count) = self.artifacts {
            annotations.set_output("artifacts_count", &count.to_string())?;
        }
        if let Some(url) = &self.badge_url {
            annotations.set_output("badge_url", url)?;
        }
        Ok(())
    }
}

/// Print a trust decision as pretty JSON followed by its redirect plan.
///
/// # Errors
///
/// Returns a serialization error if the decision cannot be encoded.
pub fn write_decision(out: &mut dyn Write, decision: &TrustDecision) -> serde_json::Result<()> {
    let json = serde_json::to_string_pretty(decision)?;
    write_line(out, &json);
    match &decision.redirect {
        Some(plan) => write_line(
            out,
            &format!(
                "redirecting to {} in {} seconds",
                plan.target,
                plan.delay.as_secs()
            ),
        ),
        None => write_line(out, "no redirect scheduled"),
    }
    Ok(())
}

/// Describe one countdown tick.
#[must_use]
pub fn describe_tick(tick: &Tick) -> String {
    match tick {
        Tick::Pending { remaining } => format!("redirecting in {remaining}s"),
        Tick::Navigate(target) => format!("navigate: {target}"),
        Tick::Cancelled => "redirect cancelled".to_owned(),
    }
}

/// Write `text` and a newline, ignoring failures.
pub fn write_line(out: &mut dyn Write, text: &str) {
    if writeln!(out, "{text}").is_err() {
        // Best-effort output; ignore write failures.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repo_trust::squatting::{DecisionDetail, TrustLevel};
    use tempfile::TempDir;

    #[test]
    fn failed_summaries_omit_unknown_fields() {
        let text = RunSummary::default().display_text();
        assert!(text.contains("Status:      FAILED"));
        assert!(!text.contains("Badge URL"));
    }

    #[test]
    fn emit_records_step_outputs_in_actions() {
        let dir = TempDir::new().expect("tempdir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("output")).expect("utf8");
        let annotations = Annotations::new(true, Some(path.clone()));
        let summary = RunSummary {
            artifacts: Some(2),
            badge_url: Some("https://octo.github.io/w/repo-trust/distribution.svg".to_owned()),
            ..RunSummary::success("octo/w")
        };
        let mut out = Vec::new();

        summary.emit(&mut out, &annotations).expect("emit");

        let outputs = std::fs::read_to_string(path).expect("outputs");
        assert_eq!(
            outputs,
            "success=true\nartifacts_count=2\nbadge_url=https://octo.github.io/w/repo-trust/distribution.svg\n"
        );
        assert!(String::from_utf8_lossy(&out).contains("REPO TRUST RUN SUMMARY"));
    }

    #[test]
    fn decisions_print_level_and_redirect() {
        let decision = TrustDecision::warning(
            "fork",
            DecisionDetail::default(),
            "https://github.com/octo/widgets".to_owned(),
        );
        let mut out = Vec::new();

        write_decision(&mut out, &decision).expect("json");

        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("\"level\": \"warning\""));
        assert!(text.contains("\"delay_seconds\": 15"));
        assert!(text.contains("redirecting to https://github.com/octo/widgets in 15 seconds"));
        assert_eq!(decision.level, TrustLevel::Warning);
    }

    #[test]
    fn ticks_are_described() {
        assert_eq!(describe_tick(&Tick::Pending { remaining: 3 }), "redirecting in 3s");
        assert_eq!(describe_tick(&Tick::Cancelled), "redirect cancelled");
    }
}
