//! Block assembly and the output line buffer
//!
//! A block is the non-empty words of one event joined by the word separator,
//! optionally prefixed by an N sequence number. Raw lines (the O header, the
//! `%` tape marker) and comments bypass numbering.

use super::format::FormatSpec;

/// Monotonic N-word generator
#[derive(Debug)]
pub struct SequenceCounter {
    spec: FormatSpec,
    next: u32,
    step: u32,
}

impl SequenceCounter {
    pub fn new(start: u32, step: u32) -> Self {
        Self {
            spec: FormatSpec::integer("N", 4),
            next: start,
            step,
        }
    }

    fn next_word(&mut self) -> String {
        let word = self.spec.format(self.next as f64);
        self.next += self.step;
        word
    }
}

#[derive(Debug)]
pub struct BlockWriter {
    lines: Vec<String>,
    sequence: Option<SequenceCounter>,
    separator: &'static str,
}

impl BlockWriter {
    pub fn new(separate_words: bool, sequence: Option<SequenceCounter>) -> Self {
        Self {
            lines: Vec::new(),
            sequence,
            separator: if separate_words { " " } else { "" },
        }
    }

    /// Write one block from the given words, skipping suppressed ones.
    /// A block with no words writes nothing and consumes no sequence number.
    pub fn block<I>(&mut self, words: I)
    where
        I: IntoIterator<Item = Option<String>>,
    {
        let mut tokens: Vec<String> = words.into_iter().flatten().collect();
        if tokens.is_empty() {
            return;
        }

        if let Some(seq) = &mut self.sequence {
            tokens.insert(0, seq.next_word());
        }
        self.lines.push(tokens.join(self.separator));
    }

    /// Write a raw line without numbering
    pub fn line(&mut self, text: &str) {
        self.lines.push(text.to_string());
    }

    /// Write a comment line; inner parentheses would terminate the comment
    /// on the control, so they are stripped
    pub fn comment(&mut self, text: &str) {
        let inner: String = text.chars().filter(|c| *c != '(' && *c != ')').collect();
        self.lines.push(format!("({})", inner));
    }

    pub fn output(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_block_writes_nothing() {
        let mut writer = BlockWriter::new(true, Some(SequenceCounter::new(10, 5)));

        writer.block([None, None]);
        writer.block([Some("G01".to_string()), None, Some("X5.000".to_string())]);

        // The empty block consumed no sequence number
        assert_eq!(writer.output(), "N0010 G01 X5.000\n");
    }

    #[test]
    fn test_sequence_numbers_step() {
        let mut writer = BlockWriter::new(true, Some(SequenceCounter::new(10, 5)));

        writer.block([Some("G21".to_string())]);
        writer.block([Some("G90".to_string())]);
        writer.block([Some("M30".to_string())]);

        assert_eq!(writer.output(), "N0010 G21\nN0015 G90\nN0020 M30\n");
    }

    #[test]
    fn test_packed_words() {
        let mut writer = BlockWriter::new(false, None);

        writer.block([
            Some("G01".to_string()),
            Some("X5.000".to_string()),
            Some("F1000.0".to_string()),
        ]);

        assert_eq!(writer.output(), "G01X5.000F1000.0\n");
    }

    #[test]
    fn test_comments_skip_numbering_and_strip_parens() {
        let mut writer = BlockWriter::new(true, Some(SequenceCounter::new(10, 5)));

        writer.comment("SHEET 1 (REV A)");
        writer.block([Some("M30".to_string())]);

        assert_eq!(writer.output(), "(SHEET 1 REV A)\nN0010 M30\n");
    }

    #[test]
    fn test_raw_lines_unnumbered() {
        let mut writer = BlockWriter::new(true, Some(SequenceCounter::new(10, 5)));

        writer.line("O0012");
        writer.block([Some("G21".to_string())]);
        writer.line("%");

        assert_eq!(writer.output(), "O0012\nN0010 G21\n%\n");
    }
}
