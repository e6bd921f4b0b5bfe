//! Fixed-format access-log tokenizer.
//!
//! Every line is expected to look like
//!
//! ```text
//! 2024-01-15T10:30:00Z 192.168.1.1 GET /api/users 200 123
//! |<--------- PREFIX_WIDTH ------>|   |<-path->|<gap>|rt|
//! ```
//!
//! The first [`PREFIX_WIDTH`] bytes (timestamp and client address) are never
//! inspected. From there spaces are counted: the path starts after the second
//! space and ends at the third. The response time starts [`GAP_WIDTH`] bytes
//! after that third space (skipping the status code) and runs to the newline.
//!
//! Input must start at a line boundary and hold only complete lines, except
//! that a final unterminated line is tokenized as if it ended the buffer. A
//! line that ends inside the prefix is reported as
//! [`RecordError::MissingFields`].

use crate::error::RecordError;

/// Width of the timestamp/client prefix skipped at the start of each line.
pub const PREFIX_WIDTH: usize = 32;

/// Bytes from the space after the path to the first byte of the response time.
pub const GAP_WIDTH: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    pub endpoint: &'a [u8],
    pub response_time: u64,
}

/// Iterator over the lines of a buffer, yielding each line's starting offset
/// together with its record or the reason it was rejected.
#[derive(Debug, Clone)]
pub struct Records<'a> {
    data: &'a [u8],
    pos: usize,
}

pub fn records(data: &[u8]) -> Records<'_> {
    Records { data, pos: 0 }
}

impl<'a> Iterator for Records<'a> {
    type Item = (usize, Result<Record<'a>, RecordError>);

    fn next(&mut self) -> Option<Self::Item> {
        let data = self.data;
        let line_start = self.pos;
        if line_start >= data.len() {
            return None;
        }

        let prefix_end = (line_start + PREFIX_WIDTH).min(data.len());
        if let Some(nl) = memchr::memchr(b'\n', &data[line_start..prefix_end]) {
            self.pos = line_start + nl + 1;
            return Some((line_start, Err(RecordError::MissingFields)));
        }
        if prefix_end == data.len() {
            self.pos = data.len();
            return Some((line_start, Err(RecordError::MissingFields)));
        }
        let mut i = prefix_end;

        let mut spaces = 0u32;
        let mut path_start = 0;
        let mut path_end = 0;
        let mut time_start = None;

        let newline = loop {
            if i >= data.len() {
                break None;
            }
            if data[i] == b' ' {
                spaces += 1;
                match spaces {
                    2 => path_start = i + 1,
                    3 => {
                        path_end = i;
                        i += GAP_WIDTH;
                        time_start = Some(i);
                        if i >= data.len() {
                            break None;
                        }
                    }
                    _ => {}
                }
            }
            if data[i] == b'\n' {
                break Some(i);
            }
            i += 1;
        };

        let line_end = newline.unwrap_or(data.len());
        self.pos = newline.map_or(data.len(), |nl| nl + 1);

        let outcome = match time_start {
            Some(start) => {
                let field = data.get(start..line_end).unwrap_or_default();
                parse_response_time(field).map(|response_time| Record {
                    endpoint: &data[path_start..path_end],
                    response_time,
                })
            }
            None => Err(RecordError::MissingFields),
        };
        Some((line_start, outcome))
    }
}

/// Parses ASCII digits, skipping any interleaved space, tab, CR or LF.
pub fn parse_response_time(field: &[u8]) -> Result<u64, RecordError> {
    if field.is_empty() {
        return Err(RecordError::EmptyField);
    }

    let mut value: u64 = 0;
    for &b in field {
        match b {
            b' ' | b'\t' | b'\r' | b'\n' => continue,
            b'0'..=b'9' => {
                value = value
                    .checked_mul(10)
                    .and_then(|v| v.checked_add(u64::from(b - b'0')))
                    .ok_or(RecordError::Overflow)?;
            }
            other => return Err(RecordError::InvalidDigit(char::from(other))),
        }
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(path: &str, rt: &str) -> String {
        let line = format!("2024-01-15T10:30:00Z 192.168.1.1 GET {path} 200 {rt}\n");
        assert_eq!(&line[PREFIX_WIDTH..PREFIX_WIDTH + 1], " ");
        line
    }

    fn collect(data: &[u8]) -> Vec<Result<(String, u64), RecordError>> {
        records(data)
            .map(|(_, r)| {
                r.map(|rec| (String::from_utf8(rec.endpoint.to_vec()).unwrap(), rec.response_time))
            })
            .collect()
    }

    #[test]
    fn extracts_endpoint_and_response_time() {
        let data = line("/api/x", "123");
        assert_eq!(collect(data.as_bytes()), vec![Ok(("/api/x".to_string(), 123))]);
    }

    #[test]
    fn tokenizes_consecutive_lines() {
        let data = [line("/a", "10"), line("/b/c", "7"), line("/a", "50")].concat();
        assert_eq!(
            collect(data.as_bytes()),
            vec![
                Ok(("/a".to_string(), 10)),
                Ok(("/b/c".to_string(), 7)),
                Ok(("/a".to_string(), 50)),
            ]
        );
    }

    #[test]
    fn reports_line_offsets() {
        let first = line("/a", "1");
        let data = [first.clone(), line("/b", "2")].concat();
        let offsets: Vec<usize> = records(data.as_bytes()).map(|(offset, _)| offset).collect();
        assert_eq!(offsets, vec![0, first.len()]);
    }

    #[test]
    fn bad_response_time_drops_only_that_record() {
        let data = [line("/a", "10"), line("/b", "1x2"), line("/c", "30")].concat();
        assert_eq!(
            collect(data.as_bytes()),
            vec![
                Ok(("/a".to_string(), 10)),
                Err(RecordError::InvalidDigit('x')),
                Ok(("/c".to_string(), 30)),
            ]
        );
    }

    #[test]
    fn final_unterminated_line_is_tokenized() {
        let mut data = line("/a", "10");
        data.push_str(line("/tail", "99").trim_end_matches('\n'));
        assert_eq!(
            collect(data.as_bytes()),
            vec![Ok(("/a".to_string(), 10)), Ok(("/tail".to_string(), 99))]
        );
    }

    #[test]
    fn carriage_return_is_ignored() {
        let data = line("/crlf", "42\r");
        assert_eq!(collect(data.as_bytes()), vec![Ok(("/crlf".to_string(), 42))]);
    }

    #[test]
    fn short_line_reports_missing_fields() {
        let data = "2024-01-15T10:30:00Z 192.168.1.1 GET\n";
        assert_eq!(collect(data.as_bytes()), vec![Err(RecordError::MissingFields)]);
    }

    #[test]
    fn lines_shorter_than_the_prefix_are_reported() {
        let data = [
            line("/a", "1"),
            "garbage\n".to_string(),
            "\n".to_string(),
            line("/b", "2"),
        ]
        .concat();
        assert_eq!(
            collect(data.as_bytes()),
            vec![
                Ok(("/a".to_string(), 1)),
                Err(RecordError::MissingFields),
                Err(RecordError::MissingFields),
                Ok(("/b".to_string(), 2)),
            ]
        );
    }

    #[test]
    fn short_trailing_line_is_reported() {
        let data = [line("/a", "1"), "garbage\n".to_string()].concat();
        assert_eq!(
            collect(data.as_bytes()),
            vec![Ok(("/a".to_string(), 1)), Err(RecordError::MissingFields)]
        );
        assert_eq!(
            collect(b"2024-01-15T10:30:00Z"),
            vec![Err(RecordError::MissingFields)]
        );
    }

    #[test]
    fn empty_buffer_yields_nothing() {
        assert!(collect(b"").is_empty());
    }

    #[test]
    fn parse_skips_whitespace_and_rejects_garbage() {
        assert_eq!(parse_response_time(b"123"), Ok(123));
        assert_eq!(parse_response_time(b" 1 2\t3\r\n"), Ok(123));
        assert_eq!(parse_response_time(b""), Err(RecordError::EmptyField));
        assert_eq!(parse_response_time(b"-5"), Err(RecordError::InvalidDigit('-')));
        assert_eq!(parse_response_time(b"1.5"), Err(RecordError::InvalidDigit('.')));
        assert_eq!(
            parse_response_time(b"99999999999999999999999"),
            Err(RecordError::Overflow)
        );
    }
}
