// ABOUTME: Code block tracking for line-based plugin passes
// ABOUTME: Lets plugins leave directive and delimiter syntax inside fenced and indented code alone

/// Tracks whether a line-by-line scan is inside a fenced code block
#[derive(Debug, Default)]
pub struct FenceTracker {
    open: Option<(char, usize)>,
}

impl FenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_fence(&self) -> bool {
        self.open.is_some()
    }

    /// Feed the next line. Returns true when the line opens or closes a fence.
    pub fn update(&mut self, line: &str) -> bool {
        let trimmed = line.trim_start();
        let Some(first) = trimmed.chars().next() else {
            return false;
        };
        if first != '`' && first != '~' {
            return false;
        }
        let run = trimmed.chars().take_while(|&c| c == first).count();

        match self.open {
            Some((ch, len)) => {
                // Closing fences carry no info string
                if ch == first && run >= len && trimmed[run..].trim().is_empty() {
                    self.open = None;
                    return true;
                }
                false
            }
            None => {
                // Backtick fences cannot have backticks in their info string
                if run >= 3 && !(first == '`' && trimmed[run..].contains('`')) {
                    self.open = Some((first, run));
                    return true;
                }
                false
            }
        }
    }
}

/// Columns of leading whitespace, tabs advancing to the next multiple of four
pub fn indent_width(line: &str) -> usize {
    let mut width = 0;
    for c in line.chars() {
        match c {
            ' ' => width += 1,
            '\t' => width += 4 - width % 4,
            _ => break,
        }
    }
    width
}

/// Leading whitespace of a line
pub fn indentation(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

/// `- `, `* `, `+ `, `1. ` or `1) ` at the start of an already trimmed line
pub fn starts_list_item(trimmed: &str) -> bool {
    let mut chars = trimmed.chars();
    match chars.next() {
        Some('-' | '*' | '+') => matches!(chars.next(), None | Some(' ' | '\t')),
        Some(c) if c.is_ascii_digit() => {
            let rest = trimmed.trim_start_matches(|c: char| c.is_ascii_digit());
            let digits = trimmed.len() - rest.len();
            digits <= 9
                && (rest.starts_with(". ") || rest.starts_with(") ") || rest == "." || rest == ")")
        }
        _ => false,
    }
}

/// Tracks indented code blocks in a line-by-line scan.
///
/// A line indented four or more columns starts code only after a blank line
/// and outside a list; inside a list it is item content, and right after
/// paragraph text it is a continuation line.
#[derive(Debug)]
pub struct IndentedCode {
    in_code: bool,
    after_blank: bool,
    in_list: bool,
}

impl Default for IndentedCode {
    fn default() -> Self {
        Self {
            in_code: false,
            after_blank: true,
            in_list: false,
        }
    }
}

impl IndentedCode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next line. Returns true when the line belongs to indented code.
    pub fn update(&mut self, line: &str) -> bool {
        if line.trim().is_empty() {
            self.after_blank = true;
            return self.in_code;
        }

        let indent = indent_width(line);
        let after_blank = std::mem::replace(&mut self.after_blank, false);
        if indent >= 4 && (self.in_code || (after_blank && !self.in_list)) {
            self.in_code = true;
            return true;
        }

        self.in_code = false;
        if starts_list_item(line.trim_start()) {
            self.in_list = true;
        } else if indent == 0 && after_blank {
            self.in_list = false;
        }
        false
    }

    /// A line consumed by another block construct, such as a fence
    pub fn boundary(&mut self) {
        self.in_code = false;
        self.after_blank = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indented_lines_after_blank_are_code() {
        let mut code = IndentedCode::new();
        assert!(!code.update("Intro"));
        assert!(!code.update("    continuation"));
        assert!(!code.update(""));
        assert!(code.update("    ::: info"));
        assert!(code.update("\tx"));
        assert!(!code.update("back out"));
    }

    #[test]
    fn indented_lines_in_lists_are_content() {
        let mut code = IndentedCode::new();
        assert!(!code.update("- item"));
        assert!(!code.update(""));
        assert!(!code.update("    nested paragraph"));
        assert!(!code.update(""));
        assert!(!code.update("Outside"));
        assert!(!code.update(""));
        assert!(code.update("    now code"));
    }

    #[test]
    fn list_item_markers() {
        assert!(starts_list_item("- item"));
        assert!(starts_list_item("12. item"));
        assert!(starts_list_item("3) item"));
        assert!(!starts_list_item("---"));
        assert!(!starts_list_item("-item"));
        assert!(!starts_list_item("2024 was good"));
        assert_eq!(indent_width("  \tx"), 4);
    }

    #[test]
    fn tracks_backtick_fence() {
        let mut fence = FenceTracker::new();
        assert!(fence.update("```rust"));
        assert!(fence.in_fence());
        assert!(!fence.update("::: info"));
        assert!(fence.in_fence());
        assert!(fence.update("```"));
        assert!(!fence.in_fence());
    }

    #[test]
    fn shorter_or_different_fence_does_not_close() {
        let mut fence = FenceTracker::new();
        fence.update("~~~~");
        assert!(!fence.update("~~~"));
        assert!(!fence.update("````"));
        assert!(fence.in_fence());
        assert!(fence.update("~~~~~"));
    }

    #[test]
    fn inline_code_is_not_a_fence() {
        let mut fence = FenceTracker::new();
        assert!(!fence.update("``code``"));
        assert!(!fence.in_fence());
    }
}
