//! Template acquisition
//!
//! Local files are read directly; remote templates are downloaded with `curl`,
//! which is available on every supported platform.

use crate::config::{GithubFile, TemplateLocation};
use crate::error::{ConvertError, ConvertResult};
use std::process::Command;
use tracing::info;

const RAW_GITHUB_HOST: &str = "https://raw.githubusercontent.com";

/// Seconds before a download is abandoned.
const FETCH_TIMEOUT_SECS: &str = "60";

/// Read the reference workbook bytes from `location`.
pub fn fetch_template(location: &TemplateLocation) -> ConvertResult<Vec<u8>> {
    let bytes = match location {
        TemplateLocation::Path { path } => std::fs::read(path).map_err(|e| {
            ConvertError::Fetch(format!("cannot read template {}: {}", path.display(), e))
        })?,
        TemplateLocation::Url { url } => download(url)?,
        TemplateLocation::Github { github } => download(&github_raw_url(github))?,
    };
    if bytes.is_empty() {
        return Err(ConvertError::Fetch(format!("template {} is empty", location)));
    }
    info!(template = %location, bytes = bytes.len(), "fetched template");
    Ok(bytes)
}

/// `https://raw.githubusercontent.com/<user>/<repo>/<branch>/<path>`, every
/// segment percent-encoded.
pub fn github_raw_url(file: &GithubFile) -> String {
    let path = file
        .path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(percent_encode)
        .collect::<Vec<_>>()
        .join("/");
    format!(
        "{}/{}/{}/{}/{}",
        RAW_GITHUB_HOST,
        percent_encode(&file.username),
        percent_encode(&file.repo),
        percent_encode(&file.branch),
        path
    )
}

pub(crate) fn percent_encode(segment: &str) -> String {
    let mut encoded = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char)
            }
            other => encoded.push_str(&format!("%{:02X}", other)),
        }
    }
    encoded
}

fn download(url: &str) -> ConvertResult<Vec<u8>> {
    let output = Command::new("curl")
        .args(["-fsSL", "--max-time", FETCH_TIMEOUT_SECS, url])
        .output()
        .map_err(|e| ConvertError::Fetch(format!("failed to run curl: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ConvertError::Fetch(format!(
            "download of {} failed: {}",
            url,
            stderr.trim()
        )));
    }
    Ok(output.stdout)
}
