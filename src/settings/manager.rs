//! Settings file wrangling
// (c) 2024 Ross Younger

use super::RunSettings;

use figment::{
    providers::{Format, Serialized, Toml},
    value::Value,
    Figment, Metadata, Provider,
};
use std::{
    collections::HashSet,
    fmt::Display,
    path::{Path, PathBuf},
};
use struct_field_names_as_array::FieldNamesAsSlice as _;
use tabled::{settings::style::Style, Table, Tabled};
use tracing::trace;

// ERRORS ////////////////////////////////////////////////////////////////////////////////////////////////////

/// Fatal problems with the settings file
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The file exists but could not be read or deserialized
    #[error("could not read settings from {}: {source}", path.display())]
    Parse {
        /// The settings file
        path: PathBuf,
        /// What went wrong
        #[source]
        source: Box<figment::Error>,
    },
    /// The file deserialized, but its contents are not usable
    #[error("invalid settings in {}: {reason}", path.display())]
    Invalid {
        /// The settings file
        path: PathBuf,
        /// What went wrong
        reason: String,
    },
    /// The file did not exist and a new one could not be created
    #[error("could not create settings file {}: {source}", path.display())]
    Create {
        /// The settings file
        path: PathBuf,
        /// What went wrong
        #[source]
        source: std::io::Error,
    },
}

// SYSTEM DEFAULTS //////////////////////////////////////////////////////////////////////////////////////////////

/// A `[https://docs.rs/figment/latest/figment/trait.Provider.html](figment::Provider)` that holds
/// our set of fixed default settings
#[derive(Default)]
struct SystemDefault {}

impl SystemDefault {
    const META_NAME: &str = "default";
}

impl Provider for SystemDefault {
    fn metadata(&self) -> Metadata {
        figment::Metadata::named(Self::META_NAME)
    }

    fn data(
        &self,
    ) -> std::result::Result<
        figment::value::Map<figment::Profile, figment::value::Dict>,
        figment::Error,
    > {
        Serialized::defaults(RunSettings::default()).data()
    }
}

// LOAD-OR-CREATE ///////////////////////////////////////////////////////////////////////////////////////////////

/// The result of [`load`]
#[derive(Debug, Clone)]
pub struct Loaded {
    /// The settings to use for this process
    pub settings: RunSettings,
    /// True if the file did not exist and was created with defaults
    pub created: bool,
}

/// Loads settings from `path`.
///
/// If the file does not exist, it is created containing the default settings, which are returned.
/// Either way, the caller gets settings it can run with, or a fatal error.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Loaded, SettingsError> {
    let path = path.as_ref();
    if path.exists() {
        let mgr = Manager::with_file(path);
        let settings = mgr.get().map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;
        settings
            .validate()
            .map_err(|reason| SettingsError::Invalid {
                path: path.to_path_buf(),
                reason,
            })?;
        return Ok(Loaded {
            settings,
            created: false,
        });
    }

    trace!("settings file {path:?} not present, creating it");
    let settings = RunSettings::default();
    create(path, &settings).map_err(|source| SettingsError::Create {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Loaded {
        settings,
        created: true,
    })
}

fn create(path: &Path, settings: &RunSettings) -> std::io::Result<()> {
    let contents = toml::to_string_pretty(settings)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    // create_new: if someone else created the file in the meantime, we must not overwrite it
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    std::io::Write::write_all(&mut file, contents.as_bytes())?;
    file.sync_all()
}

// SETTINGS MANAGER /////////////////////////////////////////////////////////////////////////////////////////////

/// Merges the hard-wired defaults with a settings file.
#[derive(Debug)]
pub struct Manager {
    /// Settings data
    data: Figment,
}

impl Manager {
    /// Testing/internal constructor, holds only the defaults
    #[must_use]
    pub fn without_files() -> Self {
        Self {
            data: Figment::new().merge(SystemDefault::default()),
        }
    }

    /// Layers the given TOML file over the defaults.
    /// (If the file is missing or unparseable, the error surfaces from [`get`](Self::get).)
    #[must_use]
    pub fn with_file<P: AsRef<Path>>(path: P) -> Self {
        let mut mgr = Self::without_files();
        mgr.merge_toml_file(path);
        mgr
    }

    /// Merges in a data set from a TOML file
    pub fn merge_toml_file<T>(&mut self, toml: T)
    where
        T: AsRef<Path>,
    {
        let f = std::mem::take(&mut self.data);
        // in the error case, this leaves the figment in a fused state
        self.data = f.merge(Toml::file_exact(toml.as_ref()));
    }

    /// Attempts to extract the settings
    pub fn get(&self) -> Result<RunSettings, figment::Error> {
        self.data.extract::<RunSettings>()
    }

    /// Lists the keys present in the merged data that [`RunSettings`] does not know about
    #[must_use]
    pub fn unrecognised_fields(&self) -> Vec<String> {
        let known: HashSet<&str> = RunSettings::FIELD_NAMES_AS_SLICE.iter().copied().collect();
        let Ok(data) = self.data.data() else {
            return Vec::new();
        };
        let Some(dict) = data.get(&figment::Profile::Default) else {
            return Vec::new();
        };
        dict.keys()
            .filter(|k| !known.contains(k.as_str()))
            .cloned()
            .collect()
    }
}

// PRETTY PRINT SUPPORT ///////////////////////////////////////////////////////////////////////////////////////

#[derive(Tabled)]
struct PrettySetting {
    field: String,
    value: String,
    source: String,
}

impl PrettySetting {
    fn render_source(meta: Option<&Metadata>) -> String {
        if let Some(m) = meta {
            m.source
                .as_ref()
                .map_or_else(|| m.name.to_string(), figment::Source::to_string)
        } else {
            String::new()
        }
    }

    fn render_value(value: &Value) -> String {
        match value {
            Value::String(_tag, s) => s.to_string(),
            Value::Char(_tag, c) => c.to_string(),
            Value::Bool(_tag, b) => b.to_string(),
            Value::Num(_tag, num) => {
                if let Some(i) = num.to_i128() {
                    i.to_string()
                } else if let Some(u) = num.to_u128() {
                    u.to_string()
                } else if let Some(ff) = num.to_f64() {
                    ff.to_string()
                } else {
                    "<number>".into()
                }
            }
            Value::Empty(_tag, _) => "<empty>".into(),
            Value::Dict(_tag, dict) => format!("{{{} entries}}", dict.len()),
            Value::Array(_tag, vec) => {
                format!(
                    "[{}]",
                    vec.iter()
                        .map(PrettySetting::render_value)
                        .collect::<Vec<_>>()
                        .join(",")
                )
            }
        }
    }
}

impl Display for Manager {
    /// Formats every known field, its value and where the value came from
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut rows = Vec::<PrettySetting>::new();
        for field in RunSettings::FIELD_NAMES_AS_SLICE {
            match self.data.find_value(field) {
                Ok(v) => rows.push(PrettySetting {
                    field: (*field).to_string(),
                    value: PrettySetting::render_value(&v),
                    source: PrettySetting::render_source(self.data.find_metadata(field)),
                }),
                Err(e) => writeln!(f, "error on field {field}: {e}")?,
            }
        }
        write!(f, "{}", Table::new(rows).with(Style::sharp()))
    }
}
