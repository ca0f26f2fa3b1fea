//! File-backed root-meter store (`<settings_path>/energy.conf`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use energyhub_app::ports::RootMeterStore;
use energyhub_domain::error::EnergyHubError;
use energyhub_domain::id::ThingId;

/// Settings file name inside the settings directory.
const SETTINGS_FILE: &str = "energy.conf";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct EnergySettings {
    root_meter_thing_id: Option<ThingId>,
}

/// Persists the chosen root meter in a small TOML file.
pub struct FileRootMeterStore {
    path: PathBuf,
}

impl FileRootMeterStore {
    /// Store located at `<settings_path>/energy.conf`.
    #[must_use]
    pub fn in_settings_path(settings_path: &Path) -> Self {
        Self {
            path: settings_path.join(SETTINGS_FILE),
        }
    }

    async fn write(&self, settings: &EnergySettings) -> Result<(), EnergyHubError> {
        let content = toml::to_string(settings).map_err(wrap)?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(wrap)?;
        }
        tokio::fs::write(&self.path, content).await.map_err(wrap)?;
        Ok(())
    }
}

fn wrap<E: std::error::Error + Send + Sync + 'static>(err: E) -> EnergyHubError {
    EnergyHubError::Storage(Box::new(err))
}

impl RootMeterStore for FileRootMeterStore {
    async fn load(&self) -> Result<Option<ThingId>, EnergyHubError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(wrap(err)),
        };
        let settings: EnergySettings = toml::from_str(&content).map_err(wrap)?;
        Ok(settings.root_meter_thing_id)
    }

    async fn save(&self, thing_id: ThingId) -> Result<(), EnergyHubError> {
        self.write(&EnergySettings {
            root_meter_thing_id: Some(thing_id),
        })
        .await
    }

    async fn clear(&self) -> Result<(), EnergyHubError> {
        self.write(&EnergySettings::default()).await
    }
}
