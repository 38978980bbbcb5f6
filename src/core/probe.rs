use serde::Serialize;
use std::path::Path;

use crate::wpcli::WpCli;

/// A directory WP-CLI recognised as a WordPress installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Installation {
    pub path: String,
    pub version: String,
    pub title: String,
    pub site_url: String,
}

/// Confirm `dir` is an installation and collect its display metadata.
///
/// Any failure of the version query (timeout, non-zero exit, empty output)
/// means "not an installation" and yields `None`. Title and URL are taken as
/// returned, empty or not.
pub fn probe(wp: &WpCli, dir: &Path) -> Option<Installation> {
    let path = dir.display().to_string();

    let Some(version) = wp.core_version(&path) else {
        tracing::debug!("{}: no WordPress version reported, skipping", path);
        return None;
    };

    let title = wp.option(&path, "blogname");
    let site_url = wp.option(&path, "siteurl");
    tracing::debug!("{}: WordPress {} ({})", path, version, site_url);

    Some(Installation {
        path,
        version,
        title,
        site_url,
    })
}
