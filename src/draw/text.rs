use egui::{Color32, Context, FontId};

/// Measures rendered text so labels can be wrapped to fit node shapes.
pub trait TextMeasure {
    fn text_width(&self, text: &str, font_size: f32) -> f32;

    fn line_height(&self, font_size: f32) -> f32 {
        font_size * 1.2
    }
}

/// Fixed advance per character. Deterministic, does not need a font atlas.
#[derive(Debug, Clone, Copy)]
pub struct MonospaceMeasure {
    /// Advance of one character as a fraction of the font size.
    pub advance: f32,
}

impl Default for MonospaceMeasure {
    fn default() -> Self {
        Self { advance: 0.6 }
    }
}

impl TextMeasure for MonospaceMeasure {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars().count() as f32 * font_size * self.advance
    }
}

/// Measures with the fonts loaded into an egui context.
pub struct FontsMeasure<'a> {
    ctx: &'a Context,
}

impl<'a> FontsMeasure<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }
}

impl TextMeasure for FontsMeasure<'_> {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        self.ctx.fonts(|f| {
            f.layout_no_wrap(
                text.to_owned(),
                FontId::proportional(font_size),
                Color32::WHITE,
            )
            .size()
            .x
        })
    }

    fn line_height(&self, font_size: f32) -> f32 {
        self.ctx
            .fonts(|f| f.row_height(&FontId::proportional(font_size)))
    }
}

/// Greedy word wrap: words are appended to the current line until the measured width would
/// exceed `max_width`, then a new line starts. A single word wider than `max_width` is split
/// by characters.
pub fn wrap_label(
    text: &str,
    max_width: f32,
    font_size: f32,
    measure: &dyn TextMeasure,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let fits = |s: &str| measure.text_width(s, font_size) <= max_width;

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_owned()
        } else {
            format!("{current} {word}")
        };
        if fits(&candidate) {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if fits(word) {
            current.push_str(word);
            continue;
        }

        for ch in word.chars() {
            current.push(ch);
            if !fits(&current) && current.chars().count() > 1 {
                current.pop();
                lines.push(std::mem::take(&mut current));
                current.push(ch);
            }
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    const M: MonospaceMeasure = MonospaceMeasure { advance: 1.0 };

    #[test]
    fn test_short_text_single_line() {
        assert_eq!(wrap_label("read input", 100.0, 1.0, &M), vec!["read input"]);
    }

    #[test]
    fn test_greedy_wrap() {
        let lines = wrap_label("check if the value is positive", 12.0, 1.0, &M);
        assert_eq!(lines, vec!["check if the", "value is", "positive"]);
        for l in &lines {
            assert!(M.text_width(l, 1.0) <= 12.0);
        }
    }

    #[test]
    fn test_long_word_split_by_chars() {
        let lines = wrap_label("abcdefghij", 4.0, 1.0, &M);
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(wrap_label("  a   b  ", 10.0, 1.0, &M), vec!["a b"]);
        assert!(wrap_label("   ", 10.0, 1.0, &M).is_empty());
    }

    #[test]
    fn test_width_narrower_than_one_char_still_progresses() {
        let lines = wrap_label("ab", 0.5, 1.0, &M);
        assert_eq!(lines, vec!["a", "b"]);
    }
}
