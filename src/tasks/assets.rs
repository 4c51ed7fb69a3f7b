//! Fonts and images.
//!
//! Fonts are copied into one flat `fonts/` directory. Images keep their
//! layout below the glob base; PNGs are re-encoded with maximum compression
//! and the result is kept only when it is smaller than the source. Outputs
//! at least as new as their source are skipped.

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ImageEncoder, ImageFormat};
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use super::TaskContext;
use crate::error::{BuildError, BuildResult};
use crate::resolve::{Matched, resolve_with_base};
use crate::utils::mtime::is_output_fresh;
use crate::utils::plural_count;
use crate::{debug, log};

/// What happened to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Fresh,
    Copied,
    Optimized,
}

pub fn fonts(ctx: &TaskContext) -> BuildResult<()> {
    let out_dir = ctx.build_dir().join("fonts");
    let paths = &ctx.manifest.paths;
    let matched = resolve_with_base(&paths.source, &ctx.manifest.fonts);

    let (fonts, shadowed) = flatten(matched);
    for path in &shadowed {
        log!("fonts"; "skipping {}: another font has the same name", paths.root_relative(path));
    }

    let outcomes = fonts
        .par_iter()
        .map(|(source, name)| copy_if_stale(source, &out_dir.join(name)))
        .collect::<BuildResult<Vec<_>>>()?;

    report("fonts", &outcomes);
    Ok(())
}

/// Pair each match with its flat output name. The first match of a name
/// wins; later ones are returned separately.
fn flatten(matched: Vec<Matched>) -> (Vec<(PathBuf, OsString)>, Vec<PathBuf>) {
    let mut seen = FxHashSet::default();
    let mut kept = Vec::with_capacity(matched.len());
    let mut shadowed = Vec::new();
    for m in matched {
        let Some(name) = m.path.file_name().map(OsString::from) else {
            continue;
        };
        if seen.insert(name.clone()) {
            kept.push((m.path, name));
        } else {
            shadowed.push(m.path);
        }
    }
    (kept, shadowed)
}

pub fn images(ctx: &TaskContext) -> BuildResult<()> {
    let out_dir = ctx.build_dir().join("images");
    let matched = resolve_with_base(&ctx.manifest.paths.source, &ctx.manifest.images);

    let outcomes = matched
        .par_iter()
        .map(|m| process_image(m, &out_dir))
        .collect::<BuildResult<Vec<_>>>()?;

    report("images", &outcomes);
    Ok(())
}

fn report(task: &str, outcomes: &[Outcome]) {
    let written = outcomes.iter().filter(|o| **o != Outcome::Fresh).count();
    let optimized = outcomes.iter().filter(|o| **o == Outcome::Optimized).count();
    if written == 0 {
        debug!(task; "{} up to date", plural_count(outcomes.len(), "file"));
        return;
    }
    if optimized > 0 {
        log!(task; "wrote {} ({} optimized)", plural_count(written, "file"), optimized);
    } else {
        log!(task; "wrote {}", plural_count(written, "file"));
    }
}

fn ensure_parent(path: &Path) -> BuildResult<()> {
    match path.parent() {
        Some(parent) => fs::create_dir_all(parent).map_err(|err| BuildError::io(parent, err)),
        None => Ok(()),
    }
}

fn copy_if_stale(source: &Path, output: &Path) -> BuildResult<Outcome> {
    if is_output_fresh(output, source) {
        return Ok(Outcome::Fresh);
    }
    ensure_parent(output)?;
    fs::copy(source, output).map_err(|err| BuildError::io(output, err))?;
    Ok(Outcome::Copied)
}

fn process_image(matched: &Matched, out_dir: &Path) -> BuildResult<Outcome> {
    let output: PathBuf = out_dir.join(&matched.relative);
    let is_png = matched
        .path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("png"));
    if !is_png {
        return copy_if_stale(&matched.path, &output);
    }
    if is_output_fresh(&output, &matched.path) {
        return Ok(Outcome::Fresh);
    }

    let original = fs::read(&matched.path).map_err(|err| BuildError::io(&matched.path, err))?;
    ensure_parent(&output)?;
    match recompress_png(&original) {
        Some(smaller) if smaller.len() < original.len() => {
            fs::write(&output, smaller).map_err(|err| BuildError::io(&output, err))?;
            Ok(Outcome::Optimized)
        }
        _ => {
            fs::write(&output, &original).map_err(|err| BuildError::io(&output, err))?;
            Ok(Outcome::Copied)
        }
    }
}

/// Re-encode a PNG losslessly with the strongest compression.
///
/// Returns `None` when the input can't be decoded.
pub fn recompress_png(bytes: &[u8]) -> Option<Vec<u8>> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Png).ok()?;
    let mut out = Vec::new();
    PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive)
        .write_image(img.as_bytes(), img.width(), img.height(), img.color().into())
        .ok()?;
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildConfig;
    use crate::tasks::tests::{MANIFEST, Site};
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn png_bytes(compression: CompressionType) -> Vec<u8> {
        let img = RgbaImage::from_fn(64, 64, |x, _| Rgba([(x % 2) as u8 * 255, 0, 0, 255]));
        let mut out = Vec::new();
        PngEncoder::new_with_quality(&mut out, compression, FilterType::NoFilter)
            .write_image(img.as_raw(), 64, 64, image::ExtendedColorType::Rgba8)
            .unwrap();
        out
    }

    #[test]
    fn test_recompress_keeps_pixels() {
        let original = png_bytes(CompressionType::Fast);
        let smaller = recompress_png(&original).unwrap();
        let a = image::load_from_memory(&original).unwrap().to_rgba8();
        let b = image::load_from_memory(&smaller).unwrap().to_rgba8();
        assert_eq!(a, b);
    }

    #[test]
    fn test_recompress_rejects_garbage() {
        assert!(recompress_png(b"not a png").is_none());
    }

    #[test]
    fn test_images_keep_layout_and_skip_fresh() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("images/icons/dot.png");
        fs::create_dir_all(src.parent().unwrap()).unwrap();
        fs::write(&src, png_bytes(CompressionType::Fast)).unwrap();

        let matched = Matched {
            path: src.clone(),
            relative: PathBuf::from("icons/dot.png"),
        };
        let out_dir = dir.path().join("dist/images");
        let first = process_image(&matched, &out_dir).unwrap();
        assert_ne!(first, Outcome::Fresh);
        assert!(out_dir.join("icons/dot.png").exists());

        assert_eq!(process_image(&matched, &out_dir).unwrap(), Outcome::Fresh);
    }

    #[test]
    fn test_flatten_keeps_first_of_each_name() {
        let matched = ["a/icons.woff", "b/icons.woff", "b/text.woff"]
            .into_iter()
            .map(|p| Matched {
                path: PathBuf::from("/site/assets/fonts").join(p),
                relative: PathBuf::from(p),
            })
            .collect();

        let (kept, shadowed) = flatten(matched);
        let names: Vec<_> = kept.iter().map(|(_, n)| n.to_str().unwrap()).collect();
        assert_eq!(names, ["icons.woff", "text.woff"]);
        assert_eq!(kept[0].0, Path::new("/site/assets/fonts/a/icons.woff"));
        assert_eq!(shadowed, [PathBuf::from("/site/assets/fonts/b/icons.woff")]);
    }

    #[test]
    fn test_fonts_copy_first_duplicate() {
        let site = Site::new();
        site.write("assets/fonts/a/icons.woff", "first");
        site.write("assets/fonts/b/icons.woff", "second");
        let ctx = site.context(MANIFEST, BuildConfig::DEVELOPMENT);

        fonts(&ctx).unwrap();
        assert_eq!(site.read("static/local/fonts/icons.woff"), "first");
    }

    #[test]
    fn test_non_png_is_copied() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("logo.svg");
        fs::write(&src, "<svg/>").unwrap();
        let matched = Matched {
            path: src,
            relative: PathBuf::from("logo.svg"),
        };
        let out_dir = dir.path().join("out");
        assert_eq!(process_image(&matched, &out_dir).unwrap(), Outcome::Copied);
        assert_eq!(fs::read_to_string(out_dir.join("logo.svg")).unwrap(), "<svg/>");
    }
}
