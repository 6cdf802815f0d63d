use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use arcpath_core::{JumpTuning, LevelGrid};
use arcpath_system_edit_evaluator::EvaluatorTuning;
use arcpath_system_trajectory::ControllerTuning;
use serde::Deserialize;

/// Tuning tables read from the optional settings file.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Settings {
    pub(crate) jump: JumpTuning,
    pub(crate) controller: ControllerTuning,
    pub(crate) evaluator: EvaluatorTuning,
}

impl Settings {
    /// Loads settings from `path`, or the defaults when no path is given.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings at {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid settings in {}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        let settings: Self =
            toml::from_str(contents).context("failed to parse settings toml contents")?;
        settings.jump.validate().context("invalid [jump] table")?;
        if settings.evaluator.platform_run == 0 {
            bail!("[evaluator] platform_run must be at least one tile");
        }
        Ok(settings)
    }
}

/// Reads a level file, one grid row per line.
pub(crate) fn load_level(path: &Path) -> Result<LevelGrid> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read level at {}", path.display()))?;
    parse_level(&contents).with_context(|| format!("invalid level in {}", path.display()))
}

fn parse_level(contents: &str) -> Result<LevelGrid> {
    let rows: Vec<&str> = contents
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .collect();
    if rows.iter().all(|row| row.is_empty()) {
        bail!("level contains no rows");
    }
    Ok(LevelGrid::from_rows(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcpath_core::WeightMode;

    #[test]
    fn missing_tables_fall_back_to_defaults() {
        let settings = Settings::parse("[jump]\napex_height = 3\n").expect("valid settings");
        assert_eq!(settings.jump.apex_height, 3);
        assert_eq!(settings.jump.flat_span, JumpTuning::default().flat_span);
        assert_eq!(settings.controller, ControllerTuning::default());
        assert_eq!(settings.evaluator.platform_run, 3);
    }

    #[test]
    fn every_table_is_read() {
        let settings = Settings::parse(
            "[jump]\nweight_mode = \"arc_length\"\n\n\
             [controller]\njump_cooldown_ms = 250\n\n\
             [evaluator]\nplatform_run = 5\n",
        )
        .expect("valid settings");
        assert_eq!(settings.jump.weight_mode, WeightMode::ArcLength);
        assert_eq!(settings.controller.jump_cooldown_ms, 250);
        assert_eq!(settings.evaluator.platform_run, 5);
    }

    #[test]
    fn invalid_tuning_is_rejected() {
        let error = Settings::parse("[jump]\napex_height = 0\n").expect_err("zero apex");
        assert!(format!("{error:#}").contains("invalid [jump] table"));
        assert!(Settings::parse("[evaluator]\nplatform_run = 0\n").is_err());
        assert!(Settings::parse("[physics]\ngravity = 9.8\n").is_err());
    }

    #[test]
    fn level_rows_keep_trailing_spaces() {
        let grid = parse_level("X  \r\nPPP\n").expect("two rows");
        assert_eq!(grid.to_rows(), vec!["X  ", "PPP"]);
        assert!(parse_level("\n\n").is_err());
    }
}
