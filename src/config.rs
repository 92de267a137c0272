//! Converter configuration (YAML)
//!
//! ```yaml
//! template:
//!   github:
//!     username: someone
//!     repo: templates
//!     branch: master
//!     path: mnt/隐藏表格.xlsx
//! output_dir: out
//! ```

use crate::error::{ConvertError, ConvertResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Template file name looked up in the working directory by default.
pub const DEFAULT_TEMPLATE_FILE: &str = "隐藏表格.xlsx";

/// A file inside a GitHub repository, fetched from raw.githubusercontent.com.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubFile {
    pub username: String,
    pub repo: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    pub path: String,
}

fn default_branch() -> String {
    "master".to_string()
}

/// Where the reference workbook comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplateLocation {
    Path { path: PathBuf },
    Url { url: String },
    Github { github: GithubFile },
}

impl Default for TemplateLocation {
    fn default() -> Self {
        TemplateLocation::Path {
            path: PathBuf::from(DEFAULT_TEMPLATE_FILE),
        }
    }
}

impl FromStr for TemplateLocation {
    type Err = ConvertError;

    /// `http(s)://…` is a URL, anything else a local path.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConvertError::Config("template location is empty".to_string()));
        }
        if s.starts_with("http://") || s.starts_with("https://") {
            Ok(TemplateLocation::Url { url: s.to_string() })
        } else {
            Ok(TemplateLocation::Path {
                path: PathBuf::from(s),
            })
        }
    }
}

impl fmt::Display for TemplateLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateLocation::Path { path } => write!(f, "{}", path.display()),
            TemplateLocation::Url { url } => f.write_str(url),
            TemplateLocation::Github { github } => write!(
                f,
                "github:{}/{}@{}:{}",
                github.username, github.repo, github.branch, github.path
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    pub template: TemplateLocation,
    pub output_dir: PathBuf,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            template: TemplateLocation::default(),
            output_dir: PathBuf::from("."),
        }
    }
}

impl ConverterConfig {
    pub fn from_yaml(yaml: &str) -> ConvertResult<Self> {
        serde_yaml::from_str(yaml).map_err(|e| ConvertError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> ConvertResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConvertError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Load `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> ConvertResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}
