//! Helpers shared by commands.

use anyhow::{anyhow, Context, Result};
use pinnacle_scene::{ModelFormat, OptimizationProfile, TargetEngine, WriteOptions, WriteReport};
use pinnacle_tools::{PinnacleConfig, RecentFiles, Session};
use serde::Serialize;
use std::path::Path;

/// Loads `--config`, or the defaults when absent.
pub fn load_config(path: Option<&Path>) -> Result<PinnacleConfig> {
    match path {
        Some(path) => PinnacleConfig::load(path).context("Failed to load configuration"),
        None => Ok(PinnacleConfig::default()),
    }
}

pub fn parse_profile(name: Option<&str>, fallback: OptimizationProfile) -> Result<OptimizationProfile> {
    match name {
        Some(name) => name.parse().map_err(|e: String| anyhow!(e)),
        None => Ok(fallback),
    }
}

pub fn parse_engine(name: Option<&str>, fallback: TargetEngine) -> Result<TargetEngine> {
    match name {
        Some(name) => name.parse().map_err(|e: String| anyhow!(e)),
        None => Ok(fallback),
    }
}

/// Opens `input` in a new session, recording it in the recent-files list
/// when the platform has a config directory.
pub fn open_session(input: &Path) -> Result<Session> {
    let recent = match RecentFiles::load() {
        Ok(recent) => Some(recent),
        Err(e) => {
            log::warn!("Recent files unavailable: {}", e);
            None
        }
    };
    let session = Session::new(recent);
    session
        .open(input)
        .with_context(|| format!("Failed to load model: {}", input.display()))?;
    Ok(session)
}

/// Writes the session's scene to `output` in the format its extension names.
pub fn export_scene(session: &Session, output: &Path) -> Result<WriteReport> {
    let format = ModelFormat::from_extension(output);
    if !format.can_export() {
        return Err(anyhow!(
            "cannot write '{}': unsupported output extension",
            output.display()
        ));
    }
    session
        .export(format, output, &WriteOptions::default())
        .with_context(|| format!("Failed to write {}", output.display()))
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_profile() {
        assert_eq!(
            parse_profile(Some("VR"), OptimizationProfile::Desktop).unwrap(),
            OptimizationProfile::Vr
        );
        assert_eq!(
            parse_profile(None, OptimizationProfile::Mobile).unwrap(),
            OptimizationProfile::Mobile
        );
        assert!(parse_profile(Some("toaster"), OptimizationProfile::Desktop).is_err());
    }

    #[test]
    fn test_parse_engine() {
        assert_eq!(
            parse_engine(Some("unity-urp"), TargetEngine::GenericPbr).unwrap(),
            TargetEngine::UnityUrp
        );
    }

    #[test]
    fn test_missing_config_is_an_error() {
        assert!(load_config(Some(Path::new("/definitely/not/here.json"))).is_err());
        assert!(load_config(None).is_ok());
    }
}
