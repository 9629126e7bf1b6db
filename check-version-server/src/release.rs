use std::str::FromStr;

use thiserror::Error;

/// A downloadable file of the current release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    pub name: String,
    pub download_url: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("asset must look like NAME=URL, got {0:?}")]
pub struct ParseAssetError(String);

impl FromStr for ReleaseAsset {
    type Err = ParseAssetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((name, url)) if !name.trim().is_empty() && !url.trim().is_empty() => Ok(Self {
                name: name.trim().to_owned(),
                download_url: url.trim().to_owned(),
            }),
            _ => Err(ParseAssetError(s.to_owned())),
        }
    }
}

/// The release that clients are compared against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    pub version: String,
    /// Release page, served when no asset matches the client platform.
    pub update_url: String,
    pub update_log: String,
    pub assets: Vec<ReleaseAsset>,
}

impl ReleaseInfo {
    /// Download link for the asset best matching `os_arch`.
    #[must_use]
    pub fn update_url_for(&self, os_arch: &str) -> &str {
        pick_asset(&self.assets, os_arch).map_or(&self.update_url, |a| &a.download_url)
    }
}

const WINDOWS_EXTS: &[&str] = &[".zip", ".exe", ".msi"];
const LINUX_EXTS: &[&str] = &[".appimage", ".deb", ".rpm", ".tar.gz", ".tgz", ".zip"];

/// Picks the asset to offer a client reporting `os_arch`, e.g. `windows-x64`.
///
/// Anything mentioning `win` is treated as Windows, everything else as Linux.
/// Preference goes by package extension, then by the name containing `os_arch`,
/// then by the name containing every alphanumeric token of it, and finally the
/// first asset.
#[must_use]
pub fn pick_asset<'a>(assets: &'a [ReleaseAsset], os_arch: &str) -> Option<&'a ReleaseAsset> {
    let first = assets.first()?;
    let needle = os_arch.trim().to_lowercase();
    if needle.is_empty() {
        return Some(first);
    }
    let names: Vec<String> = assets.iter().map(|a| a.name.to_lowercase()).collect();

    let exts = if needle.contains("win") {
        WINDOWS_EXTS
    } else {
        LINUX_EXTS
    };
    for ext in exts {
        if let Some(i) = names.iter().position(|n| n.ends_with(ext)) {
            return Some(&assets[i]);
        }
    }

    if let Some(i) = names.iter().position(|n| n.contains(&needle)) {
        return Some(&assets[i]);
    }

    let tokens: Vec<&str> = needle
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.is_empty() {
        return Some(first);
    }
    names
        .iter()
        .position(|n| tokens.iter().all(|t| n.contains(t)))
        .map_or(Some(first), |i| Some(&assets[i]))
}
