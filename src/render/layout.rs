//! Text layout for the band under the artwork.
//!
//! Font sizes step down as titles get longer; anything past twenty
//! characters wraps onto a second line.

/// Longest title that still fits on one line.
const SINGLE_LINE_MAX: usize = 20;

/// Laid-out text for the title band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLayout {
    /// One or two title lines, top to bottom.
    pub title_lines: Vec<String>,
    pub title_size: u32,
    pub artist_size: u32,
}

impl TextLayout {
    /// Lay out `title`. Lengths are counted in characters, not bytes.
    #[must_use]
    pub fn for_title(title: &str) -> Self {
        let len = title.chars().count();
        let (title_size, artist_size) = match len {
            0..13 => (24, 18),
            13..=16 => (20, 14),
            17..=SINGLE_LINE_MAX => (16, 12),
            _ => (16, 10),
        };

        let title_lines = if len > SINGLE_LINE_MAX {
            let (first, second) = split_title(title);
            vec![first, second]
        } else {
            vec![title.to_string()]
        };

        Self {
            title_lines,
            title_size,
            artist_size,
        }
    }

    /// Baselines (y) for each title line and then the artist, starting at `top`.
    #[must_use]
    pub fn baselines(&self, top: u32) -> (Vec<u32>, u32) {
        const GAP: u32 = 5;
        let mut y = top;
        let mut lines = Vec::with_capacity(self.title_lines.len());
        for _ in &self.title_lines {
            y += self.title_size;
            lines.push(y);
            y += GAP;
        }
        (lines, y + self.artist_size)
    }
}

/// Break at the last space within the first 21 characters, or hard-break
/// after 20 when there is none.
fn split_title(title: &str) -> (String, String) {
    let chars: Vec<char> = title.chars().collect();
    let window = &chars[..chars.len().min(SINGLE_LINE_MAX + 1)];
    let split = window
        .iter()
        .rposition(|c| *c == ' ')
        .unwrap_or(SINGLE_LINE_MAX);

    let first: String = chars[..split].iter().collect();
    let second: String = chars[split..].iter().collect();
    (first, second.trim().to_string())
}
