use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::firebase::{FirebaseApp, FirebaseConfig};
use crate::sink::FileSink;
use crate::utilities::{Options, Utilities};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Without this section the vendor helpers stay disabled.
    #[serde(default)]
    pub firebase: Option<FirebaseConfig>,
    /// Base directory for relative CSV export filenames.
    #[serde(default)]
    pub export_dir: Option<PathBuf>,
}

impl Config {
    pub fn trace_loaded(&self) {
        match &self.firebase {
            Some(firebase) => info!(
                project_id = %firebase.project_id,
                storage_bucket = %firebase.storage_bucket,
                auth_token_set = firebase.auth_token.is_some(),
                "Loaded Config with Firebase section"
            ),
            None => info!("Loaded Config without Firebase section"),
        }
        debug!(?self, "Config loaded (full debug)");
    }

    /// Build a facade: file sink rooted at `export_dir`, initialised with a
    /// [`FirebaseApp`] when the Firebase section is present.
    pub fn build_utilities(&self) -> Utilities {
        let sink = match &self.export_dir {
            Some(dir) => FileSink::with_base_dir(dir),
            None => FileSink::new(),
        };
        let mut utilities = Utilities::with_sink(Arc::new(sink));
        let options = self
            .firebase
            .clone()
            .map(|firebase| Options::with_app(Arc::new(FirebaseApp::new(firebase))));
        utilities.init(options);
        utilities
    }
}
