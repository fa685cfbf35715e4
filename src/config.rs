use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::backend::BackendKind;
use crate::registry::{Registry, SignaturePackage};

pub const DEFAULT_CONFIG_FILE: &str = "makemessages.json";

/// Configuration for makemessages
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directories scanned for template files
    #[serde(default)]
    pub template_paths: Vec<String>,

    /// Extensions (with leading dot) of template files
    #[serde(default = "default_template_extensions")]
    pub template_extensions: Vec<String>,

    /// Go package directories
    #[serde(default)]
    pub package_paths: Vec<String>,

    /// Also scan packages below each package path
    #[serde(default)]
    pub recursive: bool,

    /// Output directory for catalogs
    #[serde(default = "default_output")]
    pub output: String,

    /// Language codes to write catalogs for (e.g., ["de", "fr"])
    #[serde(default)]
    pub languages: Vec<String>,

    /// Glob patterns for paths to skip while walking
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Additional translation function signatures
    #[serde(default)]
    pub functions: Vec<SignaturePackage>,

    /// Keep the builtin gotext signatures in front of `functions`
    #[serde(default = "default_true")]
    pub include_default_functions: bool,

    #[serde(default)]
    pub backend: BackendKind,
}

fn default_template_extensions() -> Vec<String> {
    vec![".html".to_string()]
}

fn default_output() -> String {
    "locales".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            template_paths: Vec::new(),
            template_extensions: default_template_extensions(),
            package_paths: Vec::new(),
            recursive: false,
            output: default_output(),
            languages: Vec::new(),
            ignore: Vec::new(),
            functions: Vec::new(),
            include_default_functions: true,
            backend: BackendKind::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load from default config file, or return default config
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Check the settings a run cannot do without.
    pub fn validate(&self) -> Result<()> {
        if self.languages.is_empty() {
            bail!("At least one language must be specified");
        }
        if self.package_paths.is_empty() && self.template_paths.is_empty() {
            bail!("At least one package path or template path must be specified");
        }
        Ok(())
    }

    /// Signature registry described by this configuration.
    pub fn registry(&self) -> Result<Registry> {
        if self.include_default_functions {
            Registry::with_extra(self.functions.clone())
        } else {
            Registry::new(self.functions.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.template_extensions, vec![".html"]);
        assert_eq!(config.output, "locales");
        assert!(config.include_default_functions);
        assert_eq!(config.backend, BackendKind::Embedded);
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            "templatePaths": ["templates"],
            "templateExtensions": [".html", ".txt"],
            "packagePaths": ["."],
            "recursive": true,
            "languages": ["de", "fr"],
            "ignore": ["**/vendor/**"],
            "backend": "gettext",
            "includeDefaultFunctions": false,
            "functions": [{
                "prefixes": ["example.com/app/i18n."],
                "functions": [{ "name": "T", "arguments": ["singular"] }]
            }]
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.recursive);
        assert_eq!(config.backend, BackendKind::Gettext);
        config.validate().unwrap();

        let registry = config.registry().unwrap();
        assert_eq!(registry.packages().len(), 1);
        assert!(registry
            .lookup("github.com/leonelquinteros/gotext.Get", "Get")
            .is_none());
    }

    #[test]
    fn test_validate_messages() {
        let mut config = Config::default();
        config.package_paths.push(".".to_string());
        assert_eq!(
            config.validate().unwrap_err().to_string(),
            "At least one language must be specified"
        );

        config.languages.push("fr".to_string());
        config.package_paths.clear();
        assert_eq!(
            config.validate().unwrap_err().to_string(),
            "At least one package path or template path must be specified"
        );
    }

    #[test]
    fn test_load_reports_path() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("makemessages.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
