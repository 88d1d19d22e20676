/* 📖 # How are text blocks determined?

Structured text like source code or YAML is split into logical units that can be
reordered without breaking them apart:

- A leading `---` document marker is a block of its own.
- Otherwise a block starts at the first non-blank line after a blank-line gap.
- If the first non-comment line of a block ends with `{` or `(`, the block runs until a
  line consisting of exactly the matching `}` or `)`, blank lines included.
- Any other block ends at the next blank line.
- `//` comment lines at the start of a block are skipped when looking for the opener.
*/

const DOCUMENT_MARKER: &str = "---";

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with("//")
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// The closing marker line for a block whose opening line is `line`.
fn close_marker(line: &str) -> Option<&'static str> {
    let line = line.trim_end();
    if line.ends_with('{') {
        Some("}")
    } else if line.ends_with('(') {
        Some(")")
    } else {
        None
    }
}

#[derive(Default)]
struct BlockBuilder<'a> {
    lines: Vec<&'a str>,
    close_marker: Option<&'static str>,
    opener_seen: bool,
}

impl<'a> BlockBuilder<'a> {
    fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn push(&mut self, line: &'a str) {
        if !self.opener_seen && !is_comment(line) {
            self.opener_seen = true;
            self.close_marker = close_marker(line);
        }
        self.lines.push(line);
    }

    fn finish(&mut self) -> Option<String> {
        if self.lines.is_empty() {
            return None;
        }
        let block = self.lines.join("\n");
        *self = Self::default();
        Some(block)
    }
}

/// Splits `content` into text blocks, in input order.
pub fn text_blocks(content: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut lines = content.lines().peekable();

    if lines.peek() == Some(&DOCUMENT_MARKER) {
        blocks.push(DOCUMENT_MARKER.to_string());
        lines.next();
    }

    let mut current = BlockBuilder::default();
    for line in lines {
        if current.is_empty() {
            if !is_blank(line) {
                current.push(line);
            }
            continue;
        }

        if let Some(marker) = current.close_marker {
            current.lines.push(line);
            if line == marker {
                blocks.extend(current.finish());
            }
            continue;
        }

        if is_blank(line) {
            blocks.extend(current.finish());
        } else {
            current.push(line);
        }
    }
    blocks.extend(current.finish());

    blocks
}

/// Sorts the text blocks of `content` and renders them separated by one blank line,
/// with exactly one trailing newline.
///
/// A leading `---` document marker is deliberately kept in front instead of taking
/// part in the lexicographic sort, so front matter stays a valid document start.
pub fn sort_text_blocks(content: &str) -> String {
    let mut blocks = text_blocks(content);
    if blocks.is_empty() {
        return String::new();
    }
    let sortable_start = usize::from(blocks[0] == DOCUMENT_MARKER);
    blocks[sortable_start..].sort();

    let mut sorted = blocks.join("\n\n");
    sorted.push('\n');
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    #[test]
    fn test_source_code_with_braced_function() {
        let blocks = text_blocks("package main\n\n//this comment\nfunc f() {\n\n\treturn nil\n}\n");
        assert_eq!(
            blocks,
            vec![
                "package main".to_string(),
                "//this comment\nfunc f() {\n\n\treturn nil\n}".to_string(),
            ]
        );
    }

    #[test]
    fn test_yaml_blocks() {
        assert_eq!(text_blocks("a: b\n\nc: d\n"), vec!["a: b", "c: d"]);
        assert_eq!(
            text_blocks("---\na: b\n\nc: d\n"),
            vec!["---", "a: b", "c: d"]
        );
    }

    #[test]
    fn test_multiple_blank_lines_and_trailing_block() {
        assert_eq!(
            text_blocks("\n\nfirst\nsecond\n\n\n\nthird"),
            vec!["first\nsecond", "third"]
        );
    }

    #[test]
    fn test_paren_block_keeps_blank_lines() {
        let content = "import (\n\t\"fmt\"\n\n\t\"os\"\n)\n\nvar x = 1\n";
        assert_eq!(
            text_blocks(content),
            vec!["import (\n\t\"fmt\"\n\n\t\"os\"\n)", "var x = 1"]
        );
    }

    #[test]
    fn test_indented_closing_brace_does_not_close_block() {
        let content = "func a() {\n\tif x {\n\t}\n\n\ty()\n}\n";
        assert_eq!(text_blocks(content).len(), 1);
    }

    #[test]
    fn test_unterminated_marker_block_closes_at_end() {
        assert_eq!(text_blocks("func a() {\n\n\tx()\n"), vec!["func a() {\n\n\tx()"]);
    }

    #[test]
    fn test_document_marker_stays_before_lower_sorting_blocks() {
        assert_eq!(
            sort_text_blocks("---\nz: 1\n\n# comment\n\na: 2\n"),
            "---\n\n# comment\n\na: 2\n\nz: 1\n"
        );
    }

    #[test]
    fn test_empty_content() {
        assert!(text_blocks("").is_empty());
        assert!(text_blocks("\n\n  \n").is_empty());
        assert_eq!(sort_text_blocks(""), "");
    }

    #[test]
    fn test_sort_text_blocks() {
        let sorted = sort_text_blocks("---\nzeta: 1\n\nalpha: 2\nbeta: 3\n\n\nmid: 4");
        expect![[r#"
            ---

            alpha: 2
            beta: 3

            mid: 4

            zeta: 1
        "#]]
        .assert_eq(&sorted);
    }

    #[test]
    fn test_sort_text_blocks_is_stable_on_sorted_input() {
        let content = "a: 1\n\nb: 2\n";
        assert_eq!(sort_text_blocks(content), content);
    }
}
