use crate::length::{Length, scan_number};

/// A parsed `stroke-dasharray`. `None` and an empty list both render
/// solid, but they are distinct values.
#[derive(Debug, Clone, PartialEq)]
pub enum DashArray {
    None,
    Lengths(Vec<Length>),
}

impl DashArray {
    pub fn lengths(&self) -> &[Length] {
        match self {
            DashArray::None => &[],
            DashArray::Lengths(lengths) => lengths,
        }
    }

    pub fn is_solid(&self) -> bool {
        self.lengths().is_empty()
    }
}

/// Parses a dash array. Never fails: a token that does not start with a
/// number or is negative ends the list; a numeric token with a bad unit
/// is dropped.
pub fn parse_dash_array(input: &str) -> DashArray {
    if input == "none" {
        return DashArray::None;
    }

    let mut cursor = Cursor::new(input);
    let mut out = Vec::new();
    cursor.skip_whitespace();
    while !cursor.at_end() {
        let Some(token) = cursor.scan_length_token() else {
            break;
        };
        match token.parse::<Length>() {
            Ok(length) if length.value >= 0.0 => out.push(length),
            Ok(_) => {
                log::debug!("negative dash length {token:?} ends the dash array");
                break;
            }
            Err(err) => log::debug!("dropping dash token: {err}"),
        }
        if cursor.at_end() || !cursor.skip_separator() {
            break;
        }
    }
    DashArray::Lengths(out)
}

struct Cursor<'a> {
    input: &'a str,
    i: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, i: 0 }
    }

    fn bytes(&self) -> &'a [u8] {
        self.input.as_bytes()
    }

    fn at_end(&self) -> bool {
        self.i >= self.input.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes().get(self.i).copied()
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.i;
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r' | b'\x0c')) {
            self.i += 1;
        }
        self.i > start
    }

    /// Greedy scan of a number followed by its unit suffix. Returns `None`
    /// without moving when no numeric prefix is present.
    fn scan_length_token(&mut self) -> Option<&'a str> {
        let start = self.i;
        let bytes = self.bytes();
        let mut end = scan_number(bytes, start);
        if end == start {
            return None;
        }
        if end < bytes.len() && bytes[end] == b'%' {
            end += 1;
        } else {
            while end < bytes.len() && bytes[end].is_ascii_alphabetic() {
                end += 1;
            }
        }
        self.i = end;
        Some(&self.input[start..end])
    }

    /// `ws? ','? ws?` with at least one comma or whitespace character.
    fn skip_separator(&mut self) -> bool {
        let had_space = self.skip_whitespace();
        let had_comma = if self.peek() == Some(b',') {
            self.i += 1;
            true
        } else {
            false
        };
        self.skip_whitespace();
        had_space || had_comma
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::length::LengthUnit;

    fn numbers(dash: &DashArray) -> Vec<f64> {
        dash.lengths().iter().map(|l| l.value).collect()
    }

    #[test]
    fn none_is_distinct_from_empty() {
        assert_eq!(parse_dash_array("none"), DashArray::None);
        assert_eq!(parse_dash_array(""), DashArray::Lengths(Vec::new()));
        assert_eq!(parse_dash_array("   \t"), DashArray::Lengths(Vec::new()));
        assert!(parse_dash_array("none").is_solid());
        assert!(parse_dash_array("").is_solid());
    }

    #[test]
    fn comma_and_whitespace_separators() {
        assert_eq!(numbers(&parse_dash_array("4,2")), vec![4.0, 2.0]);
        assert_eq!(numbers(&parse_dash_array("4 2 1")), vec![4.0, 2.0, 1.0]);
        assert_eq!(numbers(&parse_dash_array("  4 ,  2,1  ")), vec![4.0, 2.0, 1.0]);
    }

    #[test]
    fn units_are_kept() {
        let dash = parse_dash_array("3px 10%");
        assert_eq!(
            dash.lengths(),
            &[
                Length::new(3.0, LengthUnit::Px),
                Length::new(10.0, LengthUnit::Percentage)
            ]
        );
    }

    #[test]
    fn non_numeric_token_stops_the_list() {
        assert_eq!(numbers(&parse_dash_array("4, abc, 2")), vec![4.0]);
        assert_eq!(numbers(&parse_dash_array("abc 4")), Vec::<f64>::new());
    }

    #[test]
    fn negative_length_ends_the_list() {
        assert_eq!(numbers(&parse_dash_array("4 -2 6")), vec![4.0]);
    }

    #[test]
    fn bad_unit_token_is_dropped_and_parsing_continues() {
        assert_eq!(numbers(&parse_dash_array("4q, 2, 6")), vec![2.0, 6.0]);
    }

    #[test]
    fn missing_separator_stops_without_error() {
        // "4" then "-2": no comma or whitespace between them.
        assert_eq!(numbers(&parse_dash_array("4-2 8")), vec![4.0]);
    }
}
