// macsio_etl/src/transform.rs
// Per-document reshaping of MACSio run records.

use std::str::FromStr;

use chrono::{Month, NaiveDate, Weekday};
use mongodb::bson::{Bson, Document};

use crate::error::TransformError;

/// Input key holding the asctime-style timestamp, e.g. `"Thu Jun  1 12:00:01 2023"`.
pub const SOURCE_TIMESTAMP_FIELD: &str = "now";
/// Output key holding the ISO-8601 timestamp.
pub const TIMESTAMP_FIELD: &str = "ts";
/// Keys copied verbatim from input to output, in output order.
pub const COPIED_FIELDS: [&str; 7] = ["Mi", "msecs", "Mi/sec", "procs", "args", "hostname", "rev",];

const ISO_UTC_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Reshapes one input record into an output record.
///
/// The output holds `ts` followed by the [`COPIED_FIELDS`]; every other input key,
/// `_id` included, is dropped. The input is treated as UTC: `Z` is appended, not
/// computed.
pub fn transform_doc(input: &Document,) -> Result<Document, TransformError,> {
    let now = input
        .get(SOURCE_TIMESTAMP_FIELD,)
        .ok_or_else(|| TransformError::MissingField(SOURCE_TIMESTAMP_FIELD.to_string(),),)?;
    let now = match now {
        Bson::String(s,) => s.as_str(),
        other => {
            return Err(TransformError::Parse {
                value:  other.to_string(),
                reason: format!("expected a string, found {:?}", other.element_type()),
            },);
        },
    };

    let mut out = Document::new();
    out.insert(TIMESTAMP_FIELD, parse_now(now,)?,);

    for key in COPIED_FIELDS {
        let value = input
            .get(key,)
            .ok_or_else(|| TransformError::MissingField(key.to_string(),),)?;
        out.insert(key, value.clone(),);
    }

    Ok(out,)
}

/// Converts an asctime timestamp into `YYYY-MM-DDTHH:MM:SSZ`.
///
/// The layout is five whitespace-separated fields: `<Www> <Mmm> <d> <H:MM:SS> <YYYY>`.
/// Any run of whitespace separates fields, so the space-padded day in `"Jan  5"` is
/// accepted. Leading or trailing whitespace is not.
///
/// The leading weekday must be a real weekday abbreviation but is not checked against
/// the date; upstream records are known to carry weekdays that disagree with it.
pub fn parse_now(now: &str,) -> Result<String, TransformError,> {
    let parse_err = |reason: String| TransformError::Parse {
        value: now.to_string(),
        reason,
    };

    if now.trim() != now {
        return Err(parse_err("unexpected leading or trailing whitespace".to_string(),),);
    }
    let fields: Vec<&str,> = now.split_ascii_whitespace().collect();
    let &[weekday, month, day, time, year,] = fields.as_slice() else {
        return Err(parse_err(format!(
            "expected `<weekday> <month> <day> <HH:MM:SS> <year>`, found {} fields",
            fields.len()
        ),),);
    };

    if !is_abbreviation(weekday,) || Weekday::from_str(weekday,).is_err() {
        return Err(parse_err(format!("unknown weekday `{}`", weekday),),);
    }
    let month = is_abbreviation(month,)
        .then(|| Month::from_str(month,).ok(),)
        .flatten()
        .ok_or_else(|| parse_err(format!("unknown month `{}`", month),),)?;
    let day = digits(day, 1, 2,).ok_or_else(|| parse_err(format!("invalid day `{}`", day),),)?;
    let year = digits(year, 4, 4,).ok_or_else(|| parse_err(format!("invalid year `{}`", year),),)?;

    let parts: Vec<&str,> = time.split(':',).collect();
    let (hour, minute, second,) = match parts.as_slice() {
        &[h, m, s,] => (digits(h, 1, 2,), digits(m, 2, 2,), digits(s, 2, 2,),),
        _ => (None, None, None,),
    };
    let (Some(hour,), Some(minute,), Some(second,),) = (hour, minute, second,) else {
        return Err(parse_err(format!("invalid time `{}`", time),),);
    };

    let date = NaiveDate::from_ymd_opt(year as i32, month.number_from_month(), day,)
        .ok_or_else(|| parse_err("day out of range for month".to_string(),),)?;
    let parsed = date
        .and_hms_opt(hour, minute, second,)
        .ok_or_else(|| parse_err(format!("time `{}` out of range", time),),)?;

    Ok(parsed.format(ISO_UTC_FORMAT,).to_string(),)
}

fn is_abbreviation(s: &str,) -> bool {
    s.len() == 3 && s.bytes().all(|b| b.is_ascii_alphabetic(),)
}

// Parses an unsigned field of `min..=max` ASCII digits.
fn digits(s: &str, min: usize, max: usize,) -> Option<u32,> {
    if (min..=max).contains(&s.len(),) && s.bytes().all(|b| b.is_ascii_digit(),) {
        s.parse().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::doc;

    use super::*;

    fn sample(now: &str,) -> Document {
        doc! {
            "_id": 42,
            "now": now,
            "Mi": 128.5,
            "msecs": 2_000_i64,
            "Mi/sec": 64.25,
            "procs": 8,
            "args": { "interface": "hdf5", "parallel_file_mode": ["MIF", 4] },
            "hostname": "quartz1234",
            "rev": "4.1-7-gabcdef",
            "extra": "dropped",
        }
    }

    #[test]
    fn reformats_asctime_to_iso_utc() {
        assert_eq!(parse_now("Thu Jun  1 12:00:01 2023").unwrap(), "2023-06-01T12:00:01Z");
        assert_eq!(parse_now("Mon Jan  5 00:00:00 2000").unwrap(), "2000-01-05T00:00:00Z");
        assert_eq!(parse_now("Wed Dec 25 23:59:59 1999").unwrap(), "1999-12-25T23:59:59Z");
    }

    #[test]
    fn output_has_exactly_the_reshaped_keys() {
        let out = transform_doc(&sample("Thu Jun  1 12:00:01 2023",),).unwrap();
        let keys: Vec<&str,> = out.keys().map(String::as_str,).collect();
        assert_eq!(
            keys,
            vec!["ts", "Mi", "msecs", "Mi/sec", "procs", "args", "hostname", "rev"]
        );
        assert_eq!(out.get_str("ts").unwrap(), "2023-06-01T12:00:01Z");
    }

    #[test]
    fn copies_fields_by_value() {
        let input = sample("Thu Jun  1 12:00:01 2023",);
        let out = transform_doc(&input,).unwrap();
        for key in COPIED_FIELDS {
            assert_eq!(out.get(key), input.get(key), "field {key}");
        }
    }

    #[test]
    fn numeric_revision_is_copied_verbatim() {
        let mut input = sample("Thu Jun  1 12:00:01 2023",);
        input.insert("rev", 1234_i32,);
        let out = transform_doc(&input,).unwrap();
        assert_eq!(out.get("rev"), Some(&Bson::Int32(1234)));
    }

    #[test]
    fn missing_hostname_is_rejected() {
        let mut input = sample("Thu Jun  1 12:00:01 2023",);
        input.remove("hostname",);
        assert_eq!(
            transform_doc(&input,),
            Err(TransformError::MissingField("hostname".to_string()))
        );
    }

    #[test]
    fn missing_now_is_rejected() {
        let mut input = sample("Thu Jun  1 12:00:01 2023",);
        input.remove("now",);
        assert_eq!(
            transform_doc(&input,),
            Err(TransformError::MissingField("now".to_string()))
        );
    }

    #[test]
    fn garbage_timestamp_is_a_parse_error() {
        let err = transform_doc(&sample("garbage",),).unwrap_err();
        assert!(matches!(err, TransformError::Parse { ref value, .. } if value == "garbage"));
    }

    #[test]
    fn rejects_malformed_layouts() {
        for bad in [
            "",
            "Thu",
            "Xyz Jun  1 12:00:01 2023",
            "Thu Foo  1 12:00:01 2023",
            "Thu Jun 32 12:00:01 2023",
            "Thu Jun  1 25:00:01 2023",
            "Thu Jun  1 12:00 2023",
            "Thu Jun  1 12:00:01 20x3",
            "Thu Jun  1 12:00:01 2023 extra",
            "Thu Jun 112:00:01 2023",
            "Thu Jun1 12:00:01 2023",
            "Thu Jun  1 12:00:01 23",
            "Thu Jun  1 12:00:01 +2023",
            "Thu Jun  1 12:00:01 02023",
            "Thu Jun  1 23:59:60 2023",
            "Thu Jun  1 12:0:01 2023",
            "Thu Jun  1 12:00:01:00 2023",
            "Thu Jun 001 12:00:01 2023",
            "Thu Feb 30 12:00:01 2023",
            "thursday Jun  1 12:00:01 2023",
            "Thu June  1 12:00:01 2023",
            "  Thu Jun  1 12:00:01 2023",
            "Thu Jun  1 12:00:01 2023\n",
        ] {
            assert!(
                matches!(parse_now(bad), Err(TransformError::Parse { .. })),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn run_together_fields_do_not_shift_into_a_valid_time() {
        let err = parse_now("Thu Jun 112:00:01 2023",).unwrap_err();
        assert!(matches!(err, TransformError::Parse { ref reason, .. } if reason.contains("4 fields")));
    }

    #[test]
    fn accepts_any_whitespace_between_fields() {
        assert_eq!(parse_now("Thu\tJun\t 1 12:00:01\t2023").unwrap(), "2023-06-01T12:00:01Z");
        assert_eq!(parse_now("Sat Jan 1 9:05:00 2000").unwrap(), "2000-01-01T09:05:00Z");
    }

    #[test]
    fn non_string_timestamp_is_a_parse_error() {
        let mut input = sample("Thu Jun  1 12:00:01 2023",);
        input.insert("now", 1_685_620_801_i64,);
        assert!(matches!(transform_doc(&input,), Err(TransformError::Parse { .. })));
    }

    #[test]
    fn transform_is_deterministic() {
        let input = sample("Mon Jan  5 00:00:00 2000",);
        assert_eq!(transform_doc(&input,).unwrap(), transform_doc(&input,).unwrap());
    }

    #[test]
    fn input_is_left_untouched() {
        let input = sample("Mon Jan  5 00:00:00 2000",);
        let before = input.clone();
        let _ = transform_doc(&input,);
        assert_eq!(input, before);
    }
}
