//! Text measurement and wrapping.
//!
//! Font metrics come from a [`FontMetrics`] provider. [`TextLayout`] wraps
//! that provider with a per-font character width cache and remembers the
//! natural height of containers whose text was edited.

pub mod container;

use crate::layers::{FontFamily, FontSpec, LayerId};
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

/// Characters sampled for the narrowest line a container must allow.
const MIN_WIDTH_SAMPLE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Source of text measurements.
pub trait FontMetrics {
    /// Width of a single line of text.
    fn text_width(&self, text: &str, font: &FontSpec) -> f64;

    /// Height of one line in pixels.
    fn line_height_px(&self, font: &FontSpec, line_height: f64) -> f64 {
        font.size * line_height
    }

    /// Distance from the top of a line's em box to its baseline.
    fn ascent(&self, font: &FontSpec) -> f64 {
        font.size * 0.8
    }
}

/// Deterministic metrics from average character widths.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproximateMetrics;

impl ApproximateMetrics {
    /// Average character width as a fraction of the font size.
    pub fn char_width_factor(family: FontFamily) -> f64 {
        match family {
            // handwritten, medium width
            FontFamily::GelPen => 0.55,
            FontFamily::NotoSans => 0.52,
            // handwritten with wider characters
            FontFamily::GelPenSerif => 0.58,
        }
    }
}

impl FontMetrics for ApproximateMetrics {
    fn text_width(&self, text: &str, font: &FontSpec) -> f64 {
        let char_width = font.size * Self::char_width_factor(font.family);
        text.chars().map(|_| char_width).sum()
    }
}

/// Measured block of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextMetrics {
    pub width: f64,
    pub height: f64,
    pub baseline: f64,
}

type FontKey = (FontFamily, u64);

fn font_key(font: &FontSpec) -> FontKey {
    (font.family, font.size.to_bits())
}

/// Wrapping and measuring on top of a metrics provider.
pub struct TextLayout {
    metrics: Box<dyn FontMetrics>,
    char_widths: RwLock<HashMap<FontKey, HashMap<char, f64>>>,
    original_container_heights: RwLock<HashMap<LayerId, f64>>,
}

impl Default for TextLayout {
    fn default() -> Self {
        Self::new(ApproximateMetrics)
    }
}

impl fmt::Debug for TextLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fonts = self.char_widths.read().map(|cache| cache.len()).unwrap_or(0);
        f.debug_struct("TextLayout").field("cached_fonts", &fonts).finish()
    }
}

impl TextLayout {
    pub fn new(metrics: impl FontMetrics + 'static) -> Self {
        Self {
            metrics: Box::new(metrics),
            char_widths: RwLock::new(HashMap::new()),
            original_container_heights: RwLock::new(HashMap::new()),
        }
    }

    pub fn metrics(&self) -> &dyn FontMetrics {
        self.metrics.as_ref()
    }

    /// Width of one character, cached per font.
    pub fn char_width(&self, ch: char, font: &FontSpec) -> f64 {
        let key = font_key(font);
        if let Ok(cache) = self.char_widths.read() {
            if let Some(width) = cache.get(&key).and_then(|widths| widths.get(&ch)) {
                return *width;
            }
        }
        let mut buf = [0u8; 4];
        let width = self.metrics.text_width(ch.encode_utf8(&mut buf), font);
        if let Ok(mut cache) = self.char_widths.write() {
            cache.entry(key).or_default().insert(ch, width);
        }
        width
    }

    pub fn line_width(&self, line: &str, font: &FontSpec) -> f64 {
        self.metrics.text_width(line, font)
    }

    /// Size and baseline of possibly multi-line text.
    pub fn measure_text(&self, text: &str, font: &FontSpec, line_height: f64) -> TextMetrics {
        let line_px = self.metrics.line_height_px(font, line_height);
        let mut width: f64 = 0.0;
        let mut lines = 0usize;
        for line in text.split('\n') {
            width = width.max(self.line_width(line, font));
            lines += 1;
        }
        let height = lines as f64 * line_px;
        let baseline = (lines - 1) as f64 * line_px + (line_px - font.size) / 2.0 + self.metrics.ascent(font);
        TextMetrics { width, height, baseline }
    }

    /// Narrowest line width a container must leave room for.
    pub fn approx_min_line_width(&self, font: &FontSpec) -> f64 {
        MIN_WIDTH_SAMPLE
            .chars()
            .map(|ch| self.char_width(ch, font))
            .fold(0.0, f64::max)
    }

    /// Wrap `text` so every line fits `max_width`.
    ///
    /// Paragraphs split on `\n` and are packed greedily from [`parse_tokens`].
    /// Tokens wider than the limit break per character, at least one character
    /// per line. Non-finite or negative widths return the input unchanged.
    /// Wrapping already wrapped text at the same width returns it unchanged.
    pub fn wrap_text(&self, text: &str, font: &FontSpec, max_width: f64) -> String {
        if !max_width.is_finite() || max_width < 0.0 {
            return text.to_string();
        }
        let mut lines: Vec<String> = Vec::new();
        for paragraph in text.split('\n') {
            if self.line_width(paragraph, font) <= max_width {
                lines.push(paragraph.to_string());
                continue;
            }
            let first_line = lines.len();
            let mut current = String::new();
            for token in parse_tokens(paragraph) {
                let candidate = join_token(&current, token);
                if self.line_width(&candidate, font) <= max_width {
                    current = candidate;
                    continue;
                }
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                if self.line_width(token, font) <= max_width {
                    current = token.to_string();
                    continue;
                }
                let mut chunks = self.break_token(token, font, max_width);
                current = chunks.pop().unwrap_or_default();
                lines.extend(chunks);
            }
            if !current.is_empty() {
                lines.push(current);
            }
            if lines.len() == first_line {
                lines.push(String::new());
            }
        }
        lines.join("\n")
    }

    fn break_token(&self, token: &str, font: &FontSpec, max_width: f64) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut chunk = String::new();
        let mut width = 0.0;
        for ch in token.chars() {
            let ch_width = self.char_width(ch, font);
            if !chunk.is_empty() && width + ch_width > max_width {
                chunks.push(std::mem::take(&mut chunk));
                width = 0.0;
            }
            chunk.push(ch);
            width += ch_width;
        }
        if !chunk.is_empty() {
            chunks.push(chunk);
        }
        chunks
    }

    /// Height a container had before its text started growing it.
    pub fn original_container_height(&self, container_id: LayerId) -> Option<f64> {
        self.original_container_heights
            .read()
            .ok()
            .and_then(|heights| heights.get(&container_id).copied())
    }

    pub fn record_original_container_height(&self, container_id: LayerId, height: f64) {
        if let Ok(mut heights) = self.original_container_heights.write() {
            heights.insert(container_id, height);
        }
    }

    pub fn reset_original_container_height(&self, container_id: LayerId) {
        if let Ok(mut heights) = self.original_container_heights.write() {
            heights.remove(&container_id);
        }
    }
}

/// Split a line into wrap tokens.
///
/// Words split on spaces, then after each hyphen so compounds can break there.
/// The hyphen stays on the left part.
pub fn parse_tokens(line: &str) -> Vec<&str> {
    line.split(' ')
        .filter(|word| !word.is_empty())
        .flat_map(|word| word.split_inclusive('-'))
        .collect()
}

fn join_token(current: &str, token: &str) -> String {
    if current.is_empty() {
        token.to_string()
    } else if current.ends_with('-') {
        format!("{current}{token}")
    } else {
        format!("{current} {token}")
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Every character is the same width regardless of font size.
    #[derive(Debug, Clone, Copy)]
    pub(crate) struct FixedMetrics {
        pub char_width: f64,
    }

    impl FontMetrics for FixedMetrics {
        fn text_width(&self, text: &str, _font: &FontSpec) -> f64 {
            text.chars().map(|_| self.char_width).sum()
        }
    }

    pub(crate) fn fixed_layout(char_width: f64) -> TextLayout {
        TextLayout::new(FixedMetrics { char_width })
    }

    fn font() -> FontSpec {
        FontSpec::new(FontFamily::GelPen, 20.0)
    }

    #[test]
    fn test_parse_tokens() {
        assert_eq!(parse_tokens("well-known  fact"), vec!["well-", "known", "fact"]);
        assert_eq!(parse_tokens("a--b"), vec!["a-", "-", "b"]);
        assert!(parse_tokens("   ").is_empty());
    }

    #[test]
    fn test_fitting_paragraph_untouched() {
        let layout = fixed_layout(10.0);
        assert_eq!(layout.wrap_text("hello  world", &font(), 200.0), "hello  world");
    }

    #[test]
    fn test_wrap_words() {
        let layout = fixed_layout(10.0);
        assert_eq!(layout.wrap_text("hello world", &font(), 60.0), "hello\nworld");
        assert_eq!(layout.wrap_text("a b c d", &font(), 30.0), "a b\nc d");
    }

    #[test]
    fn test_wrap_keeps_hyphen_joins() {
        let layout = fixed_layout(10.0);
        assert_eq!(layout.wrap_text("well-known fact", &font(), 100.0), "well-known\nfact");
        assert_eq!(layout.wrap_text("well-known", &font(), 60.0), "well-\nknown");
    }

    #[test]
    fn test_wrap_breaks_long_words() {
        let layout = fixed_layout(10.0);
        assert_eq!(layout.wrap_text("abcdefgh ij", &font(), 30.0), "abc\ndef\ngh\nij");
        // at least one character per line
        assert_eq!(layout.wrap_text("abc", &font(), 5.0), "a\nb\nc");
    }

    #[test]
    fn test_wrap_preserves_paragraphs() {
        let layout = fixed_layout(10.0);
        assert_eq!(layout.wrap_text("one two\n\nthree", &font(), 50.0), "one\ntwo\n\nthree");
        assert_eq!(layout.wrap_text("one two\n\nthree", &font(), 40.0), "one\ntwo\n\nthre\ne");
        assert_eq!(layout.wrap_text("      ", &font(), 30.0), "");
    }

    #[test]
    fn test_wrap_rejects_bad_width() {
        let layout = fixed_layout(10.0);
        let text = "some long text";
        assert_eq!(layout.wrap_text(text, &font(), f64::NAN), text);
        assert_eq!(layout.wrap_text(text, &font(), f64::INFINITY), text);
        assert_eq!(layout.wrap_text(text, &font(), -1.0), text);
    }

    #[test]
    fn test_wrap_is_idempotent() {
        let layout = TextLayout::default();
        let samples = [
            "The quick brown fox jumps over the lazy dog",
            "state-of-the-art self-contained wrapping",
            "Supercalifragilisticexpialidocious is long",
            "line one\nline two is a bit longer\n\n  spaced   out  ",
            "a",
            "",
        ];
        for text in samples {
            for width in [0.0, 5.0, 11.0, 37.5, 60.0, 99.0, 150.0, 400.0] {
                let once = layout.wrap_text(text, &font(), width);
                let twice = layout.wrap_text(&once, &font(), width);
                assert_eq!(once, twice, "not idempotent for {text:?} at {width}");
            }
        }
    }

    #[test]
    fn test_measure_text() {
        let layout = fixed_layout(10.0);
        let metrics = layout.measure_text("hello\nhi", &font(), 1.25);
        assert!((metrics.width - 50.0).abs() < f64::EPSILON);
        assert!((metrics.height - 50.0).abs() < f64::EPSILON);
        assert!(metrics.baseline > 25.0 && metrics.baseline < 50.0);
    }

    #[test]
    fn test_char_width_cache() {
        let layout = TextLayout::default();
        let font = font();
        let expected = 20.0 * ApproximateMetrics::char_width_factor(FontFamily::GelPen);
        assert!((layout.char_width('x', &font) - expected).abs() < f64::EPSILON);
        assert!((layout.char_width('x', &font) - expected).abs() < f64::EPSILON);
        let bigger = font.with_size(40.0);
        assert!((layout.char_width('x', &bigger) - 2.0 * expected).abs() < 1e-12);
    }

    #[test]
    fn test_original_container_height() {
        let layout = TextLayout::default();
        let id = uuid::Uuid::new_v4();
        assert_eq!(layout.original_container_height(id), None);
        layout.record_original_container_height(id, 40.0);
        assert_eq!(layout.original_container_height(id), Some(40.0));
        layout.reset_original_container_height(id);
        assert_eq!(layout.original_container_height(id), None);
    }
}
