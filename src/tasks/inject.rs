//! Third-party import injection.
//!
//! Style sources can carry marker blocks that list third-party imports:
//!
//! ```scss
//! // bower:scss
//! @import "../../bower_components/bootstrap/scss/bootstrap.scss";
//! // endbower
//! ```
//!
//! The block body is regenerated from the bundle's vendor files whose
//! extension matches the block type. A block only accepts types the host
//! language can import: `.less` hosts take `less` and `css`, `.scss` hosts
//! take `scss` and `css`, and `.sass` hosts also accept `scss`.

use regex::{Captures, Regex};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use super::TaskContext;
use crate::error::{BuildError, BuildResult};
use crate::manifest::BundleKind;
use crate::resolve::resolve_globs;
use crate::utils::hash;
use crate::utils::path::{relative_path, to_slash};
use crate::{debug, log};

static BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^([ \t]*)//[ \t]*bower:(\S+)[ \t]*\r?\n(?s:.*?)^[ \t]*//[ \t]*endbower")
        .expect("valid bower block regex")
});

/// Block types a host file may receive.
fn accepted_types(host_ext: &str) -> &'static [&'static str] {
    match host_ext {
        "less" => &["less", "css"],
        "scss" => &["scss", "css"],
        "sass" => &["sass", "scss", "css"],
        _ => &[],
    }
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or_default()
}

/// Regenerate every marker block of `text`.
pub fn inject_blocks(host: &Path, text: &str, vendor: &[PathBuf]) -> String {
    let accepted = accepted_types(extension(host));
    let host_dir = host.parent().unwrap_or(Path::new(""));

    BLOCK
        .replace_all(text, |caps: &Captures<'_>| {
            let indent = &caps[1];
            let block_type = &caps[2];
            if !accepted.contains(&block_type) {
                return caps[0].to_string();
            }

            let mut out = format!("{indent}// bower:{block_type}\n");
            for file in vendor.iter().filter(|f| extension(f) == block_type) {
                let rel = to_slash(&relative_path(host_dir, file));
                out.push_str(&format!("{indent}@import \"{rel}\";\n"));
            }
            out.push_str(indent);
            out.push_str("// endbower");
            out
        })
        .into_owned()
}

/// Rewrite marker blocks in every first-party style source.
pub fn run(ctx: &TaskContext) -> BuildResult<()> {
    let paths = &ctx.manifest.paths;
    let mut updated = 0usize;

    for bundle in ctx.manifest.bundles_of(BundleKind::Style) {
        let vendor = resolve_globs(&paths.root, &bundle.vendor);
        let own = resolve_globs(&paths.source, &bundle.files);

        for host in own.iter().filter(|p| !accepted_types(extension(p)).is_empty()) {
            let text = fs::read_to_string(host).map_err(|err| BuildError::io(host, err))?;
            let injected = inject_blocks(host, &text, &vendor);
            if hash::digest(&injected) == hash::digest(&text) {
                continue;
            }
            fs::write(host, &injected).map_err(|err| BuildError::io(host, err))?;
            debug!("inject"; "{}", paths.root_relative(host));
            updated += 1;
        }
    }

    if updated > 0 {
        log!("inject"; "updated {}", crate::utils::plural_count(updated, "file"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildConfig;
    use crate::tasks::tests::Site;

    #[test]
    fn test_inject_less_block() {
        let host = Path::new("/site/assets/styles/main.less");
        let text = "// bower:less\n// endbower\nbody { margin: 0; }\n";
        let vendor = [
            PathBuf::from("/site/bower_components/bootstrap/less/bootstrap.less"),
            PathBuf::from("/site/bower_components/normalize/normalize.css"),
            PathBuf::from("/site/bower_components/jquery/jquery.js"),
        ];
        let out = inject_blocks(host, text, &vendor);
        assert_eq!(
            out,
            "// bower:less\n@import \"../../bower_components/bootstrap/less/bootstrap.less\";\n// endbower\nbody { margin: 0; }\n"
        );
    }

    #[test]
    fn test_inject_replaces_stale_lines_and_keeps_indent() {
        let host = Path::new("/site/assets/styles/main.scss");
        let text = "  // bower:css\n  @import \"old.css\";\n  // endbower\n";
        let vendor = [PathBuf::from("/site/assets/styles/vendor/new.css")];
        let out = inject_blocks(host, text, &vendor);
        assert_eq!(out, "  // bower:css\n  @import \"vendor/new.css\";\n  // endbower\n");
    }

    #[test]
    fn test_incompatible_block_untouched() {
        let host = Path::new("/site/assets/styles/main.less");
        let text = "// bower:scss\n@import \"x\";\n// endbower\n";
        let vendor = [PathBuf::from("/site/a.scss")];
        assert_eq!(inject_blocks(host, text, &vendor), text);
    }

    #[test]
    fn test_inject_is_stable() {
        let host = Path::new("/site/assets/styles/main.less");
        let vendor = [PathBuf::from("/site/bower_components/a/a.less")];
        let once = inject_blocks(host, "// bower:less\n// endbower\n", &vendor);
        assert_eq!(inject_blocks(host, &once, &vendor), once);
    }

    #[test]
    fn test_run_rewrites_hosts_once() {
        let site = Site::new();
        let block = "// bower:less\n// endbower\n";
        site.write("bower_components/bootstrap/bootstrap.less", "");
        site.write("bower_components/jquery/jquery.js", "");
        site.write("assets/styles/main.less", block);
        site.write("assets/styles/plain.css", block);
        let ctx = site.context(
            r#"{ "bundles": [ { "name": "main.css", "type": "style",
                "files": ["styles/*"],
                "vendor": ["bower_components/**/*"] } ] }"#,
            BuildConfig::DEVELOPMENT,
        );

        run(&ctx).unwrap();
        assert_eq!(
            site.read("assets/styles/main.less"),
            "// bower:less\n@import \"../../bower_components/bootstrap/bootstrap.less\";\n// endbower\n"
        );
        // Plain css can't import, so it is never a host
        assert_eq!(site.read("assets/styles/plain.css"), block);

        let host = site.path("assets/styles/main.less");
        let before = fs::metadata(&host).unwrap().modified().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        run(&ctx).unwrap();
        assert_eq!(fs::metadata(&host).unwrap().modified().unwrap(), before);
    }
}
