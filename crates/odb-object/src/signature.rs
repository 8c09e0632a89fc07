use std::fmt;

use chrono::{DateTime, FixedOffset};

use crate::error::{ObjectError, ObjectResult};

/// Author, committer or tagger line: `NAME <EMAIL> EPOCH +HHMM`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Signature {
    pub name: String,
    pub email: String,
    /// Seconds since the Unix epoch.
    pub time: i64,
    /// Timezone offset east of UTC, in minutes.
    pub offset_minutes: i32,
}

impl Signature {
    pub fn new(name: &str, email: &str, time: i64, offset_minutes: i32) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            time,
            offset_minutes,
        }
    }

    /// Parse the value of a signature header line (without the key).
    pub fn parse(line: &str) -> ObjectResult<Self> {
        let bad = |reason: &str| ObjectError::MalformedSignature {
            line: line.to_string(),
            reason: reason.to_string(),
        };

        let start = line.find(" <").ok_or_else(|| bad("missing '<'"))?;
        let end = line.find("> ").ok_or_else(|| bad("missing '>'"))?;
        if end < start + 2 {
            return Err(bad("'>' before '<'"));
        }

        let name = &line[..start];
        let email = &line[start + 2..end];
        let rest = &line[end + 2..];

        let (epoch, offset) = rest
            .split_once(' ')
            .ok_or_else(|| bad("missing timezone offset"))?;
        let time: i64 = epoch.parse().map_err(|_| bad("invalid epoch"))?;
        let offset_minutes = parse_offset(offset).ok_or_else(|| bad("invalid timezone offset"))?;

        Ok(Self {
            name: name.to_string(),
            email: email.to_string(),
            time,
            offset_minutes,
        })
    }

    /// The signature time in its recorded timezone.
    pub fn when(&self) -> Option<DateTime<FixedOffset>> {
        let tz = FixedOffset::east_opt(self.offset_minutes.checked_mul(60)?)?;
        Some(DateTime::from_timestamp(self.time, 0)?.with_timezone(&tz))
    }
}

/// `+HHMM` / `-HHMM` to signed minutes.
fn parse_offset(s: &str) -> Option<i32> {
    let bytes = s.as_bytes();
    if bytes.len() != 5 || !bytes[1..].iter().all(u8::is_ascii_digit) {
        return None;
    }
    let sign = match bytes[0] {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let hours: i32 = s[1..3].parse().ok()?;
    let minutes: i32 = s[3..5].parse().ok()?;
    Some(sign * (hours * 60 + minutes))
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.offset_minutes < 0 { '-' } else { '+' };
        let abs = self.offset_minutes.unsigned_abs();
        write!(
            f,
            "{} <{}> {} {}{:02}{:02}",
            self.name,
            self.email,
            self.time,
            sign,
            abs / 60,
            abs % 60
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn parses_well_formed_line() {
        let sig = Signature::parse("A U Thor <author@example.com> 1462210432 +0200").unwrap();
        assert_eq!(sig.name, "A U Thor");
        assert_eq!(sig.email, "author@example.com");
        assert_eq!(sig.time, 1462210432);
        assert_eq!(sig.offset_minutes, 120);
        assert_eq!(
            sig.to_string(),
            "A U Thor <author@example.com> 1462210432 +0200"
        );
    }

    #[test]
    fn rejects_malformed_lines() {
        for line in [
            "A U Thor <author@example.com 1462210432 +0200",
            "A U Thor author@example.com> 1462210432 +0200",
            "A U Thor <author@example.com> 1462210432 0200",
            "A U Thor <author@example.com> 1462210432",
            "A U Thor <author@example.com>",
            "A U Thor <author@example.com> soon +0200",
            "A U Thor> x <author@example.com 1462210432 +0200",
        ] {
            assert!(
                matches!(
                    Signature::parse(line),
                    Err(ObjectError::MalformedSignature { .. })
                ),
                "{line:?}"
            );
        }
    }

    #[test]
    fn negative_offset() {
        let sig = Signature::parse("X <x@y> 0 -0530").unwrap();
        assert_eq!(sig.offset_minutes, -330);
        assert_eq!(sig.to_string(), "X <x@y> 0 -0530");
    }

    #[test]
    fn when_uses_recorded_timezone() {
        let sig = Signature::parse("X <x@y> 1476441561 +0200").unwrap();
        let when = sig.when().unwrap();
        assert_eq!(when.offset().local_minus_utc(), 7200);
        assert_eq!(when.timestamp(), 1476441561);
        assert_eq!(when.hour(), 12);
    }
}
