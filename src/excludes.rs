//! Exclude list parsing
//!
//! `SOURCE_EXCLUDES` is a single comma-separated string. A backslash-escaped
//! comma (`\,`) stays inside its pattern, and unescaped quote characters are
//! dropped before splitting.

/// Ordered exclude patterns parsed from the raw specification
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExcludeList {
    segments: Vec<String>,
}

impl ExcludeList {
    /// Parse a raw exclude specification
    pub fn parse(spec: &str) -> Self {
        Self {
            segments: split_with_escaped_commas(spec),
        }
    }

    /// Every parsed segment, including empty ones
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Segments that become `--exclude` arguments
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.segments
            .iter()
            .map(String::as_str)
            .filter(|segment| !segment.is_empty())
    }

    /// `--exclude <pattern>` token pairs, one per non-empty pattern
    pub fn to_args(&self) -> Vec<String> {
        self.patterns()
            .flat_map(|pattern| ["--exclude".to_string(), pattern.to_string()])
            .collect()
    }

    /// The exclude arguments joined by spaces, for display
    pub fn fragment(&self) -> String {
        self.to_args().join(" ")
    }
}

/// Split on unescaped commas.
///
/// `\,` is kept verbatim (backslash included) in the segment it belongs to.
/// Separators always close a segment, even an empty one, but a trailing
/// segment is only kept when it is non-empty.
pub fn split_with_escaped_commas(input: &str) -> Vec<String> {
    let stripped = strip_unescaped_quotes(input);
    let chars: Vec<char> = stripped.chars().collect();

    let mut result = Vec::new();
    let mut current = String::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' if chars.get(i + 1) == Some(&',') => {
                current.push_str("\\,");
                i += 2;
            }
            ',' => {
                result.push(std::mem::take(&mut current));
                i += 1;
            }
            c => {
                current.push(c);
                i += 1;
            }
        }
    }

    if !current.is_empty() {
        result.push(current);
    }

    result
}

/// Drop `"` and `'` unless the preceding character is a backslash
fn strip_unescaped_quotes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev = None;

    for c in input.chars() {
        if !(matches!(c, '"' | '\'') && prev != Some('\\')) {
            out.push(c);
        }
        prev = Some(c);
    }

    out
}
