//! Source Map v3 output.
//!
//! Mappings are line-granular: every generated line points at column 0 of
//! the corresponding line in the source it came from. When a preprocessor
//! or prefixer changes the line count of a file, lines past the end of the
//! original clamp to its last line.

use serde::Serialize;
use std::ops::Range;

use crate::manifest::BundleKind;

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// One input of a source map.
#[derive(Debug, Clone)]
pub struct MapSource<'a> {
    /// Path relative to `sourceRoot`, forward slashes.
    pub name: String,
    pub content: Option<&'a str>,
}

impl MapSource<'_> {
    fn line_count(&self) -> usize {
        self.content.map_or(1, |c| c.lines().count().max(1))
    }
}

/// Byte range of the generated text that came from `sources[source]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub source: usize,
    pub range: Range<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceMapV3<'a> {
    version: u8,
    file: &'a str,
    source_root: &'a str,
    sources: Vec<&'a str>,
    sources_content: Vec<Option<&'a str>>,
    names: Vec<&'a str>,
    mappings: String,
}

/// Append a base64 VLQ value.
pub fn encode_vlq(out: &mut String, value: i64) {
    let mut rest = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    };
    loop {
        let mut digit = rest & 0b1_1111;
        rest >>= 5;
        if rest > 0 {
            digit |= 0b10_0000;
        }
        out.push(BASE64[digit as usize] as char);
        if rest == 0 {
            break;
        }
    }
}

/// Compute the `mappings` field for `text`.
///
/// One pass over the generated lines; segments are visited in order and
/// each keeps a running line offset.
pub fn mappings(text: &str, segments: &[Segment], sources: &[MapSource<'_>]) -> String {
    let mut out = String::new();
    let (mut prev_source, mut prev_line) = (0i64, 0i64);

    let last_lines: Vec<usize> = sources
        .iter()
        .map(|s| s.line_count().saturating_sub(1))
        .collect();
    let mut ordered: Vec<&Segment> = segments.iter().collect();
    ordered.sort_by_key(|s| s.range.start);

    let mut cursor = 0;
    // (segment index, lines of it already passed)
    let mut current: Option<(usize, usize)> = None;

    let line_starts = std::iter::once(0).chain(text.match_indices('\n').map(|(i, _)| i + 1));
    for (idx, pos) in line_starts.enumerate() {
        if idx > 0 {
            out.push(';');
        }
        if pos >= text.len() && idx > 0 {
            continue;
        }
        while cursor < ordered.len() && ordered[cursor].range.end <= pos {
            cursor += 1;
        }
        let Some(seg) = ordered.get(cursor).filter(|s| s.range.start <= pos) else {
            continue;
        };

        let offset = match current {
            Some((i, offset)) if i == cursor => offset + 1,
            // Entered mid-segment only when it doesn't begin on a line start
            _ => usize::from(seg.range.start < pos),
        };
        current = Some((cursor, offset));

        let last = last_lines.get(seg.source).copied().unwrap_or(0);
        let line = offset.min(last) as i64;
        let source = seg.source as i64;

        encode_vlq(&mut out, 0);
        encode_vlq(&mut out, source - prev_source);
        encode_vlq(&mut out, line - prev_line);
        encode_vlq(&mut out, 0);
        prev_source = source;
        prev_line = line;
    }
    out
}

/// Serialize a complete source map.
pub fn render(
    file: &str,
    source_root: &str,
    text: &str,
    segments: &[Segment],
    sources: &[MapSource<'_>],
) -> String {
    let map = SourceMapV3 {
        version: 3,
        file,
        source_root,
        sources: sources.iter().map(|s| s.name.as_str()).collect(),
        sources_content: sources.iter().map(|s| s.content).collect(),
        names: Vec::new(),
        mappings: mappings(text, segments, sources),
    };
    // Only strings and integers; serialization can't fail
    serde_json::to_string(&map).unwrap_or_default()
}

/// Trailing comment that links output to its map.
pub fn mapping_comment(kind: BundleKind, map_name: &str) -> String {
    match kind {
        BundleKind::Style => format!("\n/*# sourceMappingURL={map_name} */\n"),
        BundleKind::Script => format!("\n//# sourceMappingURL={map_name}\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vlq(value: i64) -> String {
        let mut s = String::new();
        encode_vlq(&mut s, value);
        s
    }

    #[test]
    fn test_encode_vlq() {
        assert_eq!(vlq(0), "A");
        assert_eq!(vlq(1), "C");
        assert_eq!(vlq(-1), "D");
        assert_eq!(vlq(15), "e");
        assert_eq!(vlq(16), "gB");
        assert_eq!(vlq(-17), "jB");
    }

    #[test]
    fn test_mappings_follow_segments() {
        // "a1\na2" from source 0, then "b1" from source 1
        let text = "a1\na2\nb1";
        let segments = [
            Segment { source: 0, range: 0..5 },
            Segment { source: 1, range: 6..8 },
        ];
        let sources = [
            MapSource { name: "a.css".into(), content: Some("a1\na2") },
            MapSource { name: "b.css".into(), content: Some("b1") },
        ];
        // line 0 -> (0, 0), line 1 -> (0, 1), line 2 -> (1, 0)
        assert_eq!(mappings(text, &segments, &sources), "AAAA;AACA;ACDA");
    }

    #[test]
    fn test_mappings_clamp_to_original_length() {
        let text = "x\ny\nz";
        let segments = [Segment { source: 0, range: 0..5 }];
        let sources = [MapSource { name: "a.less".into(), content: Some("x") }];
        assert_eq!(mappings(text, &segments, &sources), "AAAA;AAAA;AAAA");
    }

    #[test]
    fn test_mappings_segment_starting_mid_line() {
        let text = "x\nab\ncd";
        let segments = [
            Segment { source: 0, range: 0..3 },
            Segment { source: 1, range: 3..7 },
        ];
        let sources = [
            MapSource { name: "a.css".into(), content: Some("x\na") },
            MapSource { name: "b.css".into(), content: Some("b\ncd") },
        ];
        assert_eq!(mappings(text, &segments, &sources), "AAAA;AACA;ACAA");
    }

    #[test]
    fn test_mappings_long_segment() {
        let content = (0..2000).map(|i| format!("l{i}")).collect::<Vec<_>>().join("\n");
        let segments = [Segment { source: 0, range: 0..content.len() }];
        let sources = [MapSource { name: "vendor.js".into(), content: Some(&content) }];

        let expected = format!("AAAA{}", ";AACA".repeat(1999));
        assert_eq!(mappings(&content, &segments, &sources), expected);
    }

    #[test]
    fn test_render_fields() {
        let sources = [MapSource { name: "main.css".into(), content: Some("a{}") }];
        let segments = [Segment { source: 0, range: 0..3 }];
        let json = render("main.css", "assets/styles/", "a{}", &segments, &sources);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], 3);
        assert_eq!(value["sourceRoot"], "assets/styles/");
        assert_eq!(value["sources"][0], "main.css");
        assert_eq!(value["sourcesContent"][0], "a{}");
        assert_eq!(value["mappings"], "AAAA");
    }

    #[test]
    fn test_mapping_comment() {
        assert_eq!(
            mapping_comment(BundleKind::Style, "main.css.map"),
            "\n/*# sourceMappingURL=main.css.map */\n"
        );
        assert!(mapping_comment(BundleKind::Script, "app.js.map").starts_with("\n//#"));
    }
}
