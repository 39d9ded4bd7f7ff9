//! Block segmenter and source map.
//!
//! Splits raw Courgette text into line records tagged with the active
//! block context. Both the parser and the diagnostics engine walk this
//! output, so the two pipelines always agree on block boundaries.

/// The three block kinds a header line can open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Scenario,
    Definition,
    Schedule,
}

impl BlockKind {
    /// The header label including the trailing colon.
    pub fn label(&self) -> &'static str {
        match self {
            BlockKind::Scenario => "Scenario:",
            BlockKind::Definition => "Definition:",
            BlockKind::Schedule => "Schedule:",
        }
    }

    /// Match a trimmed line against the three block headers.
    pub fn from_header(trimmed: &str) -> Option<BlockKind> {
        for kind in [BlockKind::Scenario, BlockKind::Definition, BlockKind::Schedule] {
            if trimmed.starts_with(kind.label()) {
                return Some(kind);
            }
        }
        None
    }
}

/// Structural classification of a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    /// `#`-prefixed line. Ignored by the parser, visible to diagnostics.
    Comment,
    Header(BlockKind),
    Text,
}

/// One line of the source with its segmentation metadata.
#[derive(Debug, Clone)]
pub struct SegmentedLine {
    /// Zero-based line index.
    pub index: usize,
    pub raw: String,
    pub trimmed: String,
    /// Count of leading whitespace characters.
    pub indent: usize,
    pub kind: LineKind,
    /// The block governing this line; `None` before any header.
    pub context: Option<BlockKind>,
}

impl SegmentedLine {
    /// For header lines, the block name: the remainder after the label,
    /// trimmed. Empty names are reported by the diagnostics engine.
    pub fn header_name(&self) -> Option<&str> {
        match self.kind {
            LineKind::Header(kind) => Some(self.trimmed[kind.label().len()..].trim()),
            _ => None,
        }
    }
}

/// Per-line character offsets into the original text.
///
/// Offsets count characters, with one newline between consecutive lines,
/// so callers can highlight exact substrings without re-scanning.
#[derive(Debug, Clone)]
pub struct SourceMap {
    line_starts: Vec<usize>,
    line_lens: Vec<usize>,
}

impl SourceMap {
    fn from_lines(lines: &[&str]) -> Self {
        let mut line_starts = Vec::with_capacity(lines.len());
        let mut line_lens = Vec::with_capacity(lines.len());
        let mut offset = 0usize;
        for line in lines {
            let len = line.chars().count();
            line_starts.push(offset);
            line_lens.push(len);
            offset += len + 1;
        }
        SourceMap {
            line_starts,
            line_lens,
        }
    }

    /// Absolute character offset of `column` (zero-based) on `line`
    /// (zero-based).
    pub fn offset(&self, line: usize, column: usize) -> usize {
        self.line_starts.get(line).copied().unwrap_or(0) + column
    }

    /// Character length of the given line, excluding the newline.
    pub fn line_len(&self, line: usize) -> usize {
        self.line_lens.get(line).copied().unwrap_or(0)
    }
}

/// Segmenter output: the tagged lines plus the shared source map.
#[derive(Debug, Clone)]
pub struct Segmented {
    pub lines: Vec<SegmentedLine>,
    pub map: SourceMap,
}

/// Segment raw text into tagged lines.
///
/// A line starting with `Scenario:`, `Definition:`, or `Schedule:` (after
/// trim) opens a new block and closes the previous one. Blank lines and
/// comments stay inside the current block.
pub fn segment(text: &str) -> Segmented {
    let raw_lines: Vec<&str> = text.split('\n').collect();
    let map = SourceMap::from_lines(&raw_lines);

    let mut lines = Vec::with_capacity(raw_lines.len());
    let mut context: Option<BlockKind> = None;

    for (index, raw) in raw_lines.iter().enumerate() {
        let trimmed = raw.trim();
        let indent = raw.chars().take_while(|c| c.is_whitespace()).count();

        let kind = if trimmed.is_empty() {
            LineKind::Blank
        } else if trimmed.starts_with('#') {
            LineKind::Comment
        } else if let Some(block) = BlockKind::from_header(trimmed) {
            context = Some(block);
            LineKind::Header(block)
        } else {
            LineKind::Text
        };

        lines.push(SegmentedLine {
            index,
            raw: (*raw).to_owned(),
            trimmed: trimmed.to_owned(),
            indent,
            kind,
            context,
        });
    }

    Segmented { lines, map }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_open_blocks() {
        let seg = segment("Scenario: Age Pension\n  When age >= 67\nSchedule: Rates\n");
        assert_eq!(seg.lines[0].kind, LineKind::Header(BlockKind::Scenario));
        assert_eq!(seg.lines[0].header_name(), Some("Age Pension"));
        assert_eq!(seg.lines[1].kind, LineKind::Text);
        assert_eq!(seg.lines[1].context, Some(BlockKind::Scenario));
        assert_eq!(seg.lines[2].kind, LineKind::Header(BlockKind::Schedule));
        assert_eq!(seg.lines[2].context, Some(BlockKind::Schedule));
    }

    #[test]
    fn blank_and_comment_lines_keep_context() {
        let seg = segment("Scenario: S\n\n# note\nWhen age >= 10\n");
        assert_eq!(seg.lines[1].kind, LineKind::Blank);
        assert_eq!(seg.lines[1].context, Some(BlockKind::Scenario));
        assert_eq!(seg.lines[2].kind, LineKind::Comment);
        assert_eq!(seg.lines[2].context, Some(BlockKind::Scenario));
    }

    #[test]
    fn lines_before_any_header_have_no_context() {
        let seg = segment("free text\nScenario: S\n");
        assert_eq!(seg.lines[0].context, None);
        assert_eq!(seg.lines[1].context, Some(BlockKind::Scenario));
    }

    #[test]
    fn empty_header_name() {
        let seg = segment("Scenario:\n");
        assert_eq!(seg.lines[0].header_name(), Some(""));
    }

    #[test]
    fn offsets_sum_prior_lines_plus_newlines() {
        let seg = segment("abc\nde\nfgh");
        assert_eq!(seg.map.offset(0, 0), 0);
        assert_eq!(seg.map.offset(1, 0), 4);
        assert_eq!(seg.map.offset(2, 2), 9);
        assert_eq!(seg.map.line_len(1), 2);
    }

    #[test]
    fn indent_counts_leading_whitespace() {
        let seg = segment("    - is_student == true\n");
        assert_eq!(seg.lines[0].indent, 4);
        assert_eq!(seg.lines[0].trimmed, "- is_student == true");
    }
}
