//! SMTP reply parser.

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// Parses an SMTP reply from response lines.
///
/// SMTP replies can be single-line or multi-line:
/// - Single: `250 OK\r\n`
/// - Multi: `250-First line\r\n250-Second line\r\n250 Last line\r\n`
///
/// Every line must carry the same code. The code and its separator are
/// stripped from each line.
///
/// # Errors
///
/// Returns [`Error::Malformed`] if the reply is empty, a line is too short,
/// the code is not numeric, or lines disagree on the code.
pub fn parse_reply<S: AsRef<str>>(lines: &[S]) -> Result<Reply> {
    let Some(first) = lines.first() else {
        return Err(Error::Malformed("empty reply".into()));
    };
    let code = parse_code(first.as_ref())?;

    let mut message = Vec::with_capacity(lines.len());
    for line in lines {
        let line = line.as_ref();
        if parse_code(line)? != code {
            return Err(Error::Malformed(format!(
                "reply code changed mid-reply: {line}"
            )));
        }
        match line.len() {
            3 => message.push(String::new()),
            _ => match line.get(4..) {
                Some(text) if matches!(line.as_bytes()[3], b' ' | b'-') => {
                    message.push(text.to_string());
                }
                _ => return Err(Error::Malformed(format!("bad separator: {line}"))),
            },
        }
    }

    Ok(Reply::new(ReplyCode::new(code), message))
}

fn parse_code(line: &str) -> Result<u16> {
    let digits = line
        .get(0..3)
        .ok_or_else(|| Error::Malformed(format!("reply too short: {line}")))?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Malformed(format!("invalid reply code: {digits}")));
    }
    digits
        .parse()
        .map_err(|_| Error::Malformed(format!("invalid reply code: {digits}")))
}

/// Checks if a line is the last line of a multi-line reply.
///
/// Continuation lines use `-` after the code; the last line uses a space or
/// ends right after the code.
#[must_use]
pub fn is_last_reply_line(line: &str) -> bool {
    line.len() == 3 || (line.len() >= 4 && line.as_bytes()[3] != b'-')
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect
)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_single_line_reply() {
        let reply = parse_reply(&["250 OK"]).unwrap();
        assert_eq!(reply.code, ReplyCode::OK);
        assert_eq!(reply.message, vec!["OK"]);
    }

    #[test]
    fn test_parse_ehlo_reply() {
        let reply = parse_reply(&["250-greet", "250-AUTH PLAIN LOGIN", "250 SIZE 100"]).unwrap();
        assert_eq!(reply.code.as_u16(), 250);
        assert_eq!(reply.message_text(), "greet\nAUTH PLAIN LOGIN\nSIZE 100");
    }

    #[test]
    fn test_parse_bare_code() {
        let reply = parse_reply(&["334"]).unwrap();
        assert_eq!(reply.code, ReplyCode::AUTH_CONTINUE);
        assert_eq!(reply.message_text(), "");
    }

    #[test]
    fn test_is_last_reply_line() {
        assert!(is_last_reply_line("250 OK"));
        assert!(is_last_reply_line("250"));
        assert!(!is_last_reply_line("250-Continuing"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_reply::<&str>(&[]).is_err());
        assert!(parse_reply(&["25"]).is_err());
        assert!(parse_reply(&["ABC OK"]).is_err());
        assert!(parse_reply(&["250_OK"]).is_err());
        assert!(parse_reply(&["250-one", "251 two"]).is_err());
    }

    proptest! {
        #[test]
        fn multi_line_text_round_trips(
            code in 200u16..600,
            lines in proptest::collection::vec("[ -~]{0,40}", 1..6),
        ) {
            let last = lines.len() - 1;
            let wire: Vec<String> = lines
                .iter()
                .enumerate()
                .map(|(i, text)| format!("{code}{}{text}", if i == last { ' ' } else { '-' }))
                .collect();
            prop_assert!(is_last_reply_line(&wire[last]));
            let reply = parse_reply(&wire).unwrap();
            prop_assert_eq!(reply.code.as_u16(), code);
            prop_assert_eq!(reply.message_text(), lines.join("\n"));
        }
    }
}
