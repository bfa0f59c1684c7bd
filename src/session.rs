//! Per-session artifact directory.
//!
//! Each run gets one directory holding everything it produced: the plan
//! JSON, step images, narration WAVs, the event log, and the HTML
//! export. Nothing outside this directory is written during a session
//! (config aside), and nothing here is read back on later runs.

use crate::audio;
use crate::events::SessionLog;
use crate::plan::RepairPlan;
use crate::util::slugify;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const SESSIONS_ROOT: &str = "scrapsmith-sessions";

#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub dir: PathBuf,
    pub log: SessionLog,
}

impl Session {
    /// Create the session directory. With `--out` the given directory is
    /// used as-is; otherwise a stamped, slugged directory is created
    /// under `scrapsmith-sessions/` in the working directory.
    pub fn create(out_override: Option<&Path>, plan_title: &str) -> Result<Session> {
        let dir = match out_override {
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(SESSIONS_ROOT).join(dir_name(plan_title, Utc::now())),
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("Could not create session directory {}", dir.display()))?;

        let id = short_id();
        let log = SessionLog::new(dir.join("events.jsonl"), id.clone());
        Ok(Session { id, dir, log })
    }

    pub fn plan_path(&self) -> PathBuf {
        self.dir.join("plan.json")
    }

    pub fn image_path(&self, step_index: usize) -> PathBuf {
        self.dir.join(format!("step-{:02}.png", step_index + 1))
    }

    pub fn narration_path(&self, step_index: usize) -> PathBuf {
        self.dir.join(format!("step-{:02}.wav", step_index + 1))
    }

    pub fn export_path(&self) -> PathBuf {
        self.dir.join("export.html")
    }

    pub fn write_plan(&self, plan: &RepairPlan) -> Result<()> {
        let json = serde_json::to_string_pretty(plan)?;
        fs::write(self.plan_path(), json)
            .with_context(|| format!("Could not write {}", self.plan_path().display()))?;
        Ok(())
    }

    pub fn write_step_image(&self, step_index: usize, data: &[u8]) -> Result<PathBuf> {
        let path = self.image_path(step_index);
        fs::write(&path, data).with_context(|| format!("Could not write {}", path.display()))?;
        Ok(path)
    }

    pub fn write_narration(
        &self,
        step_index: usize,
        samples: &[i16],
        sample_rate: u32,
    ) -> Result<PathBuf> {
        let path = self.narration_path(step_index);
        audio::write_wav(&path, samples, sample_rate)?;
        Ok(path)
    }
}

fn dir_name(plan_title: &str, when: DateTime<Utc>) -> String {
    format!("{}-{}", when.format("%Y%m%d-%H%M%S"), slugify(plan_title))
}

fn short_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::demo_plan;
    use chrono::TimeZone;

    #[test]
    fn test_dir_name_stamped_and_slugged() {
        let when = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        assert_eq!(
            dir_name("Split Chair Leg, Splinted and Braced", when),
            "20260314-092653-split-chair-leg-splinted-and-braced"
        );
    }

    #[test]
    fn test_artifact_paths() {
        let temp = tempfile::tempdir().unwrap();
        let session = Session::create(Some(temp.path()), "ignored").unwrap();

        assert_eq!(session.plan_path(), temp.path().join("plan.json"));
        assert_eq!(session.image_path(0), temp.path().join("step-01.png"));
        assert_eq!(session.narration_path(9), temp.path().join("step-10.wav"));
        assert_eq!(session.export_path(), temp.path().join("export.html"));
    }

    #[test]
    fn test_write_plan_and_artifacts() {
        let temp = tempfile::tempdir().unwrap();
        let session = Session::create(Some(temp.path()), "t").unwrap();
        let plan = demo_plan();

        session.write_plan(&plan).unwrap();
        let written = std::fs::read_to_string(session.plan_path()).unwrap();
        let parsed: RepairPlan = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed.title, plan.title);
        assert_eq!(parsed.steps.len(), plan.steps.len());

        let img = session.write_step_image(2, &[1, 2, 3]).unwrap();
        assert!(img.ends_with("step-03.png"));
        assert_eq!(std::fs::read(&img).unwrap(), vec![1, 2, 3]);

        let wav = session.write_narration(0, &[0, 100, -100], 24_000).unwrap();
        assert!(wav.ends_with("step-01.wav"));
        assert!(wav.exists());
    }

    #[test]
    fn test_short_id_is_eight_chars() {
        assert_eq!(short_id().len(), 8);
        assert_ne!(short_id(), short_id());
    }
}
