//! Dotted annotation paths (`a.b\.c` addresses key `b.c` under `a`).

/// Escape a single key so it survives being joined with `.`.
pub fn escape_key(key: &str) -> String {
    key.replace('\\', "\\\\").replace('.', "\\.")
}

/// Split a dotted path into its segments, honouring `\.` and `\\`.
pub fn parse_path(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut segment = String::new();
    let mut chars = path.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if matches!(chars.peek(), Some('.') | Some('\\')) => {
                if let Some(escaped) = chars.next() {
                    segment.push(escaped);
                }
            }
            '.' => segments.push(std::mem::take(&mut segment)),
            other => segment.push(other),
        }
    }
    segments.push(segment);
    segments
}
