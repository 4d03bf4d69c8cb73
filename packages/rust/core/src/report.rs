//! Audit report output.
//!
//! A profile containing code reviews is written as a code-review report:
//! `portfolio_url` and `experience` are dropped and `projects` becomes
//! `project_details`. Any other profile is a portfolio report without
//! `code_reviews`.

use std::path::{Path, PathBuf};

use chrono::Local;
use serde_json::Value;
use tracing::info;

use footprint_shared::{Category, FootprintError, PORTFOLIO_URL, Profile, Result};

/// Default file name prefix.
pub const DEFAULT_PREFIX: &str = "audit_report";

/// Which report shape a profile is written as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Portfolio,
    CodeReview,
}

impl ReportKind {
    pub fn of(profile: &Profile) -> Self {
        if profile.items(&Category::CodeReviews).is_empty() {
            Self::Portfolio
        } else {
            Self::CodeReview
        }
    }
}

/// Render the report JSON for `profile`.
pub fn report_value(profile: &Profile) -> Value {
    let mut value = profile.to_value();
    let Value::Object(map) = &mut value else {
        return value;
    };

    match ReportKind::of(profile) {
        ReportKind::CodeReview => {
            map.remove(PORTFOLIO_URL);
            map.remove(Category::Experience.as_str());
            if let Some(projects) = map.remove(Category::Projects.as_str()) {
                map.insert("project_details".into(), projects);
            }
        }
        ReportKind::Portfolio => {
            map.remove(Category::CodeReviews.as_str());
        }
    }
    value
}

/// Write the report to `<dir>/<prefix>_<YYYYmmdd_HHMMSS>.json`, creating
/// `dir` if needed. Returns the written path.
pub fn write_report(profile: &Profile, dir: &Path, prefix: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| FootprintError::io(dir, e))?;

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("{prefix}_{timestamp}.json"));

    let json = serde_json::to_string_pretty(&report_value(profile))
        .map_err(|e| FootprintError::parse(format!("failed to serialize report: {e}")))?;
    std::fs::write(&path, json).map_err(|e| FootprintError::io(&path, e))?;

    info!(path = %path.display(), kind = ?ReportKind::of(profile), "report saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use footprint_shared::Item;
    use serde_json::json;
    use uuid::Uuid;

    fn portfolio() -> Profile {
        let mut profile = Profile::new();
        profile
            .scalars
            .insert(PORTFOLIO_URL.into(), json!("https://alice.dev/"));
        profile
            .sections
            .insert(Category::Projects, vec![Item::new().with("title", "Chat App")]);
        profile.sections.insert(
            Category::Experience,
            vec![Item::new().with("title", "Engineer @ Acme")],
        );
        profile
    }

    #[test]
    fn portfolio_report_keeps_everything_but_reviews() {
        let value = report_value(&portfolio());
        assert_eq!(value["portfolio_url"], "https://alice.dev/");
        assert_eq!(value["projects"][0]["title"], "Chat App");
        assert!(value.get("code_reviews").is_none());
    }

    #[test]
    fn code_review_report_is_separated() {
        let mut profile = portfolio();
        profile.sections.insert(
            Category::CodeReviews,
            vec![Item::new().with("file_name", "main.py")],
        );

        assert_eq!(ReportKind::of(&profile), ReportKind::CodeReview);
        let value = report_value(&profile);
        assert!(value.get("portfolio_url").is_none());
        assert!(value.get("experience").is_none());
        assert!(value.get("projects").is_none());
        assert_eq!(value["project_details"][0]["title"], "Chat App");
        assert_eq!(value["code_reviews"][0]["file_name"], "main.py");
    }

    #[test]
    fn report_is_written_with_timestamped_name() {
        let dir = std::env::temp_dir().join(format!("fp-report-test-{}", Uuid::now_v7()));
        let path = write_report(&portfolio(), &dir, DEFAULT_PREFIX).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("audit_report_"));
        assert!(name.ends_with(".json"));
        // audit_report_YYYYmmdd_HHMMSS.json
        assert_eq!(name.len(), "audit_report_".len() + 15 + ".json".len());

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, report_value(&portfolio()));

        std::fs::remove_dir_all(&dir).ok();
    }
}
