use chrono::NaiveDateTime;
use regex::Regex;

use filekit_base::FilekitResult;

/* 📖 # Which file names carry a creation date?

Two naming schemes are recognized, tried in this order:

- Camera style: the base name starts with `YYYYmmdd_HHMMSS`, e.g. `20230401_174512.jpg`.
- Signal messenger exports: `signal-YYYY-mm-dd-HH-MM-SS` optionally followed by a
  `-nnn` counter, e.g. `signal-2023-04-01-17-45-12-123.jpg`.

A name that looks like one of these but does not form a valid date (month 13, hour 25)
is treated exactly like a name that does not match at all.
*/

fn parse_with_pattern(
    file_name: &str,
    pattern: &str,
    format: &str,
) -> FilekitResult<Option<NaiveDateTime>> {
    let re = Regex::new(pattern)
        .map_err(|e| filekit_base::err!("invalid date pattern '{}': {}", pattern, e))?;
    let Some(captures) = re.captures(file_name) else {
        return Ok(None);
    };
    let Some(timestamp) = captures.get(1) else {
        return Ok(None);
    };
    Ok(NaiveDateTime::parse_from_str(timestamp.as_str(), format).ok())
}

/// Date encoded in a camera style `YYYYmmdd_HHMMSS` prefix.
pub fn date_from_timestamp_prefix(file_name: &str) -> FilekitResult<Option<NaiveDateTime>> {
    parse_with_pattern(file_name, r"^(\d{8}_\d{6})", "%Y%m%d_%H%M%S")
}

/// Date encoded in a Signal messenger export name.
pub fn date_from_signal_name(file_name: &str) -> FilekitResult<Option<NaiveDateTime>> {
    parse_with_pattern(
        file_name,
        r"^signal-(\d{4}-\d{2}-\d{2}-\d{2}-\d{2}-\d{2})(?:-\d{3})?(?:\.|$)",
        "%Y-%m-%d-%H-%M-%S",
    )
}

/// The first date found by any known naming scheme.
pub fn date_from_file_name(file_name: &str) -> FilekitResult<Option<NaiveDateTime>> {
    if let Some(date) = date_from_timestamp_prefix(file_name)? {
        return Ok(Some(date));
    }
    date_from_signal_name(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_timestamp_prefix() {
        assert_eq!(
            date_from_file_name("20230401_174512.jpg").unwrap(),
            Some(at(2023, 4, 1, 17, 45, 12))
        );
        assert_eq!(
            date_from_file_name("20230401_174512_HDR.jpg").unwrap(),
            Some(at(2023, 4, 1, 17, 45, 12))
        );
    }

    #[test]
    fn test_signal_names() {
        assert_eq!(
            date_from_file_name("signal-2021-12-24-08-30-00.jpg").unwrap(),
            Some(at(2021, 12, 24, 8, 30, 0))
        );
        assert_eq!(
            date_from_file_name("signal-2021-12-24-08-30-00-123.mp4").unwrap(),
            Some(at(2021, 12, 24, 8, 30, 0))
        );
    }

    #[test]
    fn test_malformed_dates_count_as_no_match() {
        assert_eq!(date_from_file_name("20231301_174512.jpg").unwrap(), None);
        assert_eq!(date_from_file_name("signal-2021-02-30-08-30-00.jpg").unwrap(), None);
    }

    #[test]
    fn test_unrelated_names() {
        assert_eq!(date_from_file_name("holiday.jpg").unwrap(), None);
        assert_eq!(date_from_file_name("IMG_20230401_174512.jpg").unwrap(), None);
        assert_eq!(date_from_file_name("").unwrap(), None);
    }
}
