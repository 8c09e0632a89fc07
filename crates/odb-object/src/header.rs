use odb_types::ObjectId;

use crate::error::{ObjectError, ObjectResult};

/// Split a commit or tag body into `(key, value)` header lines and the
/// message that follows the first empty line.
///
/// Lines without a space (such as the blank continuation of a `gpgsig`
/// block) yield an empty value; callers skip keys they do not know.
pub(crate) fn split_headers(body: &[u8]) -> (Vec<(&[u8], &[u8])>, &[u8]) {
    let mut headers = Vec::new();
    let mut rest = body;
    loop {
        let (line, next) = match rest.iter().position(|&b| b == b'\n') {
            Some(nl) => (&rest[..nl], &rest[nl + 1..]),
            None => (rest, &rest[rest.len()..]),
        };
        if line.is_empty() {
            return (headers, next);
        }
        match line.iter().position(|&b| b == b' ') {
            Some(sp) => headers.push((&line[..sp], &line[sp + 1..])),
            None => headers.push((line, &line[line.len()..])),
        }
        if next.is_empty() {
            return (headers, next);
        }
        rest = next;
    }
}

pub(crate) fn header_str<'a>(key: &str, value: &'a [u8]) -> ObjectResult<&'a str> {
    std::str::from_utf8(value)
        .map_err(|_| ObjectError::MalformedHeader(format!("{key} header is not valid UTF-8")))
}

pub(crate) fn header_id(key: &str, value: &[u8]) -> ObjectResult<ObjectId> {
    ObjectId::from_hex(header_str(key, value)?)
        .map_err(|e| ObjectError::MalformedHeader(format!("{key}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_at_first_blank_line() {
        let (headers, message) = split_headers(b"a 1\nb two words\n\nbody\n\nmore");
        assert_eq!(headers, vec![(&b"a"[..], &b"1"[..]), (&b"b"[..], &b"two words"[..])]);
        assert_eq!(message, b"body\n\nmore");
    }

    #[test]
    fn missing_blank_line_means_empty_message() {
        let (headers, message) = split_headers(b"a 1\nb 2");
        assert_eq!(headers.len(), 2);
        assert!(message.is_empty());
    }

    #[test]
    fn continuation_lines_are_kept_as_headers() {
        let (headers, message) = split_headers(b"gpgsig -----BEGIN\n  \n -----END\n\nmsg");
        assert_eq!(headers.len(), 3);
        assert_eq!(headers[1].0, b"");
        assert_eq!(message, b"msg");
    }
}
