use crate::generation::errors::{RoadError, RoadResult};
use crate::resources::GenerationSettings;
use std::fs;
use std::path::{Path, PathBuf};

pub mod range_types;

pub fn get_config_path() -> Option<PathBuf> {
    dirs::config_dir().and_then(|mut path| {
        path.push("waygen");
        fs::create_dir_all(&path).ok()?;
        path.push("settings.toml");
        Some(path)
    })
}

/// Load settings from the user config directory, falling back to defaults.
pub fn load_settings() -> GenerationSettings {
    if let Some(config_path) = get_config_path() {
        if let Ok(settings) = load_settings_from(&config_path) {
            return settings;
        }
    }
    GenerationSettings::default()
}

pub fn load_settings_from(path: &Path) -> RoadResult<GenerationSettings> {
    let contents = fs::read_to_string(path)?;
    Ok(toml::from_str::<GenerationSettings>(&contents)?)
}

pub fn save_settings(settings: &GenerationSettings) -> RoadResult<()> {
    let config_path = get_config_path().ok_or(RoadError::ConfigDirNotFound)?;
    save_settings_to(settings, &config_path)
}

pub fn save_settings_to(settings: &GenerationSettings, path: &Path) -> RoadResult<()> {
    let contents = toml::to_string_pretty(settings)?;
    fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_round_trip_through_file() {
        let path =
            std::env::temp_dir().join(format!("waygen_settings_{}.toml", std::process::id()));
        let mut settings = GenerationSettings::default();
        settings.routing.max_iterations = range_types::IterationCap::new(500);
        settings.connectivity.regional_radius = 750.0;

        save_settings_to(&settings, &path).unwrap();
        let loaded = load_settings_from(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(loaded.routing.max_iterations.get(), 500);
        assert_eq!(loaded.connectivity.regional_radius, 750.0);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = load_settings_from(Path::new("/nonexistent/waygen/settings.toml"));
        assert!(matches!(result, Err(RoadError::Io(_))));
    }
}
