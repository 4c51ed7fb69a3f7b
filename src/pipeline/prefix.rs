//! Vendor prefixing for style bundles.
//!
//! lightningcss adds (and removes) vendor prefixes according to a set of
//! browser targets. Versions use lightningcss' encoding:
//! `major << 16 | minor << 8 | patch`.

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use std::collections::BTreeMap;

/// Browser names accepted in the manifest's `browsers` table.
pub const KNOWN_BROWSERS: &[&str] = &[
    "android", "chrome", "edge", "firefox", "ie", "ios_saf", "opera", "safari", "samsung",
];

pub fn is_known_browser(name: &str) -> bool {
    KNOWN_BROWSERS.contains(&name)
}

/// Parse `"4"`, `"4.4"` or `"4.4.3"` into the encoded form.
pub fn parse_version(version: &str) -> Option<u32> {
    let mut parts = version.trim().split('.');
    let major: u32 = parts.next()?.parse().ok()?;
    let minor: u32 = parts.next().map_or(Some(0), |p| p.parse().ok())?;
    let patch: u32 = parts.next().map_or(Some(0), |p| p.parse().ok())?;
    if parts.next().is_some() || major > 0xffff || minor > 0xff || patch > 0xff {
        return None;
    }
    Some(major << 16 | minor << 8 | patch)
}

const fn v(major: u32) -> Option<u32> {
    Some(major << 16)
}

/// Defaults close to "last 2 versions, android 4, opera 12".
pub const DEFAULT_BROWSERS: Browsers = Browsers {
    android: v(4),
    chrome: v(120),
    edge: v(120),
    firefox: v(121),
    ie: v(10),
    ios_saf: v(16),
    opera: v(12),
    safari: v(16),
    samsung: v(22),
};

/// Build targets from defaults plus the manifest's overrides.
pub fn targets(overrides: &BTreeMap<String, u32>) -> Targets {
    Targets::from(browsers(overrides))
}

/// Defaults plus the manifest's overrides.
pub fn browsers(overrides: &BTreeMap<String, u32>) -> Browsers {
    let mut browsers = DEFAULT_BROWSERS;
    for (name, &version) in overrides {
        let slot = match name.as_str() {
            "android" => &mut browsers.android,
            "chrome" => &mut browsers.chrome,
            "edge" => &mut browsers.edge,
            "firefox" => &mut browsers.firefox,
            "ie" => &mut browsers.ie,
            "ios_saf" => &mut browsers.ios_saf,
            "opera" => &mut browsers.opera,
            "safari" => &mut browsers.safari,
            "samsung" => &mut browsers.samsung,
            _ => continue,
        };
        *slot = Some(version);
    }
    browsers
}

/// Name → `major.minor` for every browser that has a target.
pub fn describe(browsers: &Browsers) -> BTreeMap<&'static str, String> {
    let slots = [
        ("android", browsers.android),
        ("chrome", browsers.chrome),
        ("edge", browsers.edge),
        ("firefox", browsers.firefox),
        ("ie", browsers.ie),
        ("ios_saf", browsers.ios_saf),
        ("opera", browsers.opera),
        ("safari", browsers.safari),
        ("samsung", browsers.samsung),
    ];
    slots
        .into_iter()
        .filter_map(|(name, v)| Some((name, format_version(v?))))
        .collect()
}

/// Inverse of [`parse_version`], dropping a zero patch.
pub fn format_version(version: u32) -> String {
    let (major, minor, patch) = (version >> 16, (version >> 8) & 0xff, version & 0xff);
    if patch == 0 {
        format!("{major}.{minor}")
    } else {
        format!("{major}.{minor}.{patch}")
    }
}

/// Rewrite a stylesheet with prefixes for `targets`, keeping it readable.
pub fn prefix_css(source: &str, targets: Targets) -> Result<String, String> {
    let mut stylesheet =
        StyleSheet::parse(source, ParserOptions::default()).map_err(|e| e.to_string())?;
    stylesheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| e.to_string())?;
    let result = stylesheet
        .to_css(PrinterOptions {
            minify: false,
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| e.to_string())?;
    Ok(result.code)
}
