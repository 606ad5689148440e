use super::scan::Lines;

/// Marker that introduces a parameter declaration inside a shader comment.
pub const DECORATOR_PREFIX: &str = "// @param ";

/// A declaration payload and the 1-based line it was found on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Payload<'a> {
    pub line: usize,
    pub text: &'a str,
}

/// Text following the first decorator marker on a line, if any.
pub fn decorator_payload(line: &str) -> Option<&str> {
    line.find(DECORATOR_PREFIX)
        .map(|pos| &line[pos + DECORATOR_PREFIX.len()..])
}

/// Every declaration payload in `source`, in line order. `\r\n` counts as a
/// single line break when numbering.
pub fn decorator_payloads(source: &str) -> impl Iterator<Item = Payload<'_>> {
    let bytes = source.as_bytes();
    let mut lines = Lines::new(source);
    let mut number = 0;
    std::iter::from_fn(move || loop {
        let start = lines.cursor().pos;
        let line = lines.next()?;
        // Empty split between the `\r` and `\n` of one line ending.
        if line.is_empty() && start > 0 && bytes[start] == b'\n' && bytes[start - 1] == b'\r' {
            continue;
        }
        number += 1;
        if let Some(text) = decorator_payload(line) {
            return Some(Payload { line: number, text });
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_marker_anywhere_on_the_line() {
        assert_eq!(
            decorator_payload("let x = 1.0; // @param name=x type=float"),
            Some("name=x type=float")
        );
        assert_eq!(decorator_payload("// @param "), Some(""));
    }

    #[test]
    fn marker_is_case_sensitive_and_needs_trailing_space() {
        assert_eq!(decorator_payload("// @Param name=x"), None);
        assert_eq!(decorator_payload("// @param"), None);
        assert_eq!(decorator_payload("//@param name=x"), None);
    }

    #[test]
    fn reports_line_numbers() {
        let source = "fn main() {}\n// @param name=a type=int\n\n  // @param name=b type=float\n";
        let payloads: Vec<_> = decorator_payloads(source).collect();
        assert_eq!(
            payloads,
            vec![
                Payload { line: 2, text: "name=a type=int" },
                Payload { line: 4, text: "name=b type=float" },
            ]
        );
    }

    #[test]
    fn crlf_counts_as_one_line_break() {
        let source = "// ok\r\n// @param name=a type=int\r\n\r\n\r// @param name=b type=float\r\n";
        let lines: Vec<_> = decorator_payloads(source).map(|p| p.line).collect();
        assert_eq!(lines, vec![2, 5]);
    }
}
