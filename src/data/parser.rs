//! Tab-delimited sample line parser
//!
//! Each tab-separated token is either `label:number` or a bare `number`.
//! Bare numbers are labelled with their 1-based token position. Anything
//! else is set aside in [`ParsedLine::rejected`].

use thiserror::Error;

/// One labelled value
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub label: String,
    pub value: f64,
}

/// Result of parsing one line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedLine {
    /// Accepted tokens in line order
    pub samples: Vec<Sample>,
    /// Tokens that were not numeric (or repeated a label)
    pub rejected: Vec<String>,
}

impl ParsedLine {
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.samples.iter().map(|s| s.label.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.value)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// A line that carried no usable value. It is dropped without touching state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty line")]
    Empty,
    #[error("no numeric tokens in {0:?}")]
    NoValues(String),
}

/// Parse one data line.
pub fn parse_line(line: &str) -> Result<ParsedLine, ParseError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let mut parsed = ParsedLine::default();
    for (idx, token) in line.split('\t').enumerate() {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        let sample = match token.rsplit_once(':') {
            Some((label, number)) if !label.is_empty() => parse_number(number).map(|value| Sample {
                label: label.to_string(),
                value,
            }),
            Some(_) => None,
            None => parse_number(token).map(|value| Sample {
                label: (idx + 1).to_string(),
                value,
            }),
        };

        match sample {
            Some(sample) if !parsed.samples.iter().any(|s| s.label == sample.label) => {
                parsed.samples.push(sample)
            }
            _ => parsed.rejected.push(token.to_string()),
        }
    }

    if parsed.samples.is_empty() {
        return Err(ParseError::NoValues(line.to_string()));
    }
    Ok(parsed)
}

/// Accepts an optional sign, digits, and an optional fraction:
/// `12`, `-3.5`, `+.25`, `7.`
fn parse_number(text: &str) -> Option<f64> {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };

    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    let valid = all_digits(int_part)
        && frac_part.map_or(true, all_digits)
        && (!int_part.is_empty() || frac_part.is_some_and(|f| !f.is_empty()));

    if valid {
        text.parse().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labelled_tokens() {
        let parsed = parse_line("temp:23.4\thumidity:67.2").unwrap();
        assert_eq!(parsed.labels().collect::<Vec<_>>(), vec!["temp", "humidity"]);
        assert_eq!(parsed.values().collect::<Vec<_>>(), vec![23.4, 67.2]);
        assert!(parsed.rejected.is_empty());
    }

    #[test]
    fn bare_numbers_use_token_position() {
        let parsed = parse_line("1.5\t-2\t+3.").unwrap();
        assert_eq!(parsed.labels().collect::<Vec<_>>(), vec!["1", "2", "3"]);
        assert_eq!(parsed.values().collect::<Vec<_>>(), vec![1.5, -2.0, 3.0]);
    }

    #[test]
    fn mixed_tokens_keep_position_labels() {
        let parsed = parse_line("v:1\t42\tbogus\t7").unwrap();
        assert_eq!(parsed.labels().collect::<Vec<_>>(), vec!["v", "2", "4"]);
        assert_eq!(parsed.rejected, vec!["bogus"]);
    }

    #[test]
    fn label_is_kept_verbatim() {
        let parsed = parse_line("Motor A (rpm):1200\tt:12:5").unwrap();
        assert_eq!(
            parsed.labels().collect::<Vec<_>>(),
            vec!["Motor A (rpm)", "t:12"]
        );
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        let parsed = parse_line("a:1e5\tb:\t:3\tc:.5\t1.2.3\tnan").unwrap();
        assert_eq!(parsed.labels().collect::<Vec<_>>(), vec!["c"]);
        assert_eq!(parsed.rejected, vec!["a:1e5", "b:", ":3", "1.2.3", "nan"]);
    }

    #[test]
    fn duplicate_label_is_rejected() {
        let parsed = parse_line("x:1\tx:2").unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.rejected, vec!["x:2"]);
    }

    #[test]
    fn carriage_return_is_stripped() {
        let parsed = parse_line("a:1\tb:2\r\n").unwrap();
        assert_eq!(parsed.values().collect::<Vec<_>>(), vec![1.0, 2.0]);
    }

    #[test]
    fn lines_without_values_are_errors() {
        assert_eq!(parse_line(""), Err(ParseError::Empty));
        assert_eq!(parse_line("  \r\n"), Err(ParseError::Empty));
        assert_eq!(
            parse_line("booting...\tok"),
            Err(ParseError::NoValues("booting...\tok".to_string()))
        );
    }

    #[test]
    fn number_grammar() {
        assert_eq!(parse_number("0"), Some(0.0));
        assert_eq!(parse_number("-.5"), Some(-0.5));
        assert_eq!(parse_number("+10"), Some(10.0));
        assert_eq!(parse_number("."), None);
        assert_eq!(parse_number("-"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("1,5"), None);
        assert_eq!(parse_number("inf"), None);
    }
}
