//! CSV backup format.
//!
//! Exports start with the unquoted header `id,type,startTs,endTs,side,notes`
//! followed by one fully quoted row per event, oldest first. Imports map
//! columns by header name, so reordered or missing columns are tolerated, and
//! validate every row on its own: a bad row is reported, never fatal.

use chrono::NaiveDate;
use csv::{QuoteStyle, ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use thiserror::Error;

use crate::event::{Event, FeedSide, NewEvent};
use crate::event_type::EventType;
use crate::types::{EventId, ValidationError};

/// Column names, in export order.
pub const HEADER: [&str; 6] = ["id", "type", "startTs", "endTs", "side", "notes"];

/// Prefix of exported file names.
pub const APP_NAME: &str = "babylog";

/// Failures that prevent encoding or decoding a whole document.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush csv output: {0}")]
    Flush(String),
    #[error("csv output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Why a single row was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("row {row}: {source}")]
    Invalid {
        row: usize,
        #[source]
        source: ValidationError,
    },
    #[error("row {row}: malformed record: {message}")]
    Malformed { row: usize, message: String },
}

/// A decoded row ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportCandidate {
    /// The exported id, kept so a restore reproduces the original log.
    pub id: Option<EventId>,
    pub event: NewEvent,
}

/// Encodes events in the order given; callers pass them oldest first.
pub fn encode(events: &[Event]) -> Result<String, CodecError> {
    let mut out = HEADER.join(",").into_bytes();
    out.push(b'\n');

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(out);

    for event in events {
        let id = event.id.to_string();
        let start_ts = event.start_ts.to_string();
        let end_ts = event.end_ts.map(|t| t.to_string()).unwrap_or_default();
        let side = event.side.map_or("", |s| s.as_str());
        writer.write_record([
            id.as_str(),
            event.kind.as_str(),
            start_ts.as_str(),
            end_ts.as_str(),
            side,
            event.notes.as_str(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| CodecError::Flush(err.error().to_string()))?;
    Ok(String::from_utf8(bytes)?)
}

/// Decodes a backup into one result per data row.
///
/// Input is raw bytes so that a row with invalid UTF-8 fails on its own.
/// A quoted field left open at end of input fails only the line it starts
/// on; decoding resumes on the next line. Only an unreadable header fails
/// the whole document. Blank rows are dropped.
pub fn decode(data: &[u8]) -> Result<Vec<Result<ImportCandidate, RowError>>, CodecError> {
    let mut records = split_records(data).into_iter();
    let Some(header) = records.next() else {
        return Ok(Vec::new());
    };
    let columns = match read_record(header.bytes)? {
        Some(headers) => Columns::from_headers(&headers),
        None => return Ok(Vec::new()),
    };

    let mut rows = Vec::new();
    for (idx, record) in records.enumerate() {
        let row = idx + 1;
        if record.unterminated {
            rows.push(Err(RowError::Malformed {
                row,
                message: "unterminated quoted field".to_string(),
            }));
            continue;
        }
        match read_record(record.bytes) {
            Ok(None) => {}
            Ok(Some(fields)) if is_blank(&fields) => {}
            Ok(Some(fields)) => rows.push(
                columns
                    .candidate(&fields)
                    .map_err(|source| RowError::Invalid { row, source }),
            ),
            Err(err) => rows.push(Err(RowError::Malformed {
                row,
                message: err.to_string(),
            })),
        }
    }
    Ok(rows)
}

/// One CSV record's bytes, without its terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RawRecord<'a> {
    bytes: &'a [u8],
    /// A quoted field in this line was still open at end of input.
    unterminated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    FieldStart,
    Unquoted,
    Quoted,
    QuoteInQuoted,
}

/// Splits input into records on `\n` or `\r` outside quoted fields.
///
/// Quoting follows the `csv` reader: a quote opens a field only at its
/// start, and `""` inside a quoted field is literal. When input ends inside
/// a quoted field, the record's first line becomes an unterminated record
/// and splitting restarts after it. Empty records are dropped.
fn split_records(data: &[u8]) -> Vec<RawRecord<'_>> {
    let mut records = Vec::new();
    let mut start = 0;

    while start < data.len() {
        let mut state = Scan::FieldStart;
        let mut end = data.len();
        for (offset, &byte) in data[start..].iter().enumerate() {
            state = match (state, byte) {
                (Scan::Quoted, b'"') => Scan::QuoteInQuoted,
                (Scan::Quoted, _) | (Scan::QuoteInQuoted, b'"') => Scan::Quoted,
                (_, b'\n' | b'\r') => {
                    end = start + offset;
                    break;
                }
                (_, b',') => Scan::FieldStart,
                (Scan::FieldStart, b'"') => Scan::Quoted,
                _ => Scan::Unquoted,
            };
        }

        if end == data.len() && state == Scan::Quoted {
            let line_end = data[start..]
                .iter()
                .position(|b| matches!(b, b'\n' | b'\r'))
                .map_or(data.len(), |offset| start + offset);
            records.push(RawRecord {
                bytes: &data[start..line_end],
                unterminated: true,
            });
            start = line_end + 1;
            continue;
        }

        if end > start {
            records.push(RawRecord {
                bytes: &data[start..end],
                unterminated: false,
            });
        }
        start = end + 1;
    }
    records
}

/// Parses a single record; `None` when it holds no fields.
fn read_record(bytes: &[u8]) -> Result<Option<StringRecord>, csv::Error> {
    ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes)
        .records()
        .next()
        .transpose()
}

/// File name for an export made on `date`, e.g. `babylog_2026-10-18.csv`.
pub fn export_file_name(date: NaiveDate) -> String {
    format!("{APP_NAME}_{}.csv", date.format("%Y-%m-%d"))
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|field| field.trim().is_empty())
}

/// Header positions of the known columns.
#[derive(Debug)]
struct Columns {
    id: Option<usize>,
    kind: Option<usize>,
    start_ts: Option<usize>,
    end_ts: Option<usize>,
    side: Option<usize>,
    notes: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Self {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
        };
        Self {
            id: find("id"),
            kind: find("type"),
            start_ts: find("startTs"),
            end_ts: find("endTs"),
            side: find("side"),
            notes: find("notes"),
        }
    }

    fn candidate(&self, record: &StringRecord) -> Result<ImportCandidate, ValidationError> {
        let field = |idx: Option<usize>| idx.and_then(|i| record.get(i)).unwrap_or("");

        let kind_raw = field(self.kind).trim();
        let kind: EventType = kind_raw
            .parse()
            .map_err(|_| ValidationError::UnknownType {
                value: kind_raw.to_string(),
            })?;

        let start_raw = field(self.start_ts).trim();
        let start_ts = parse_positive(start_raw).ok_or_else(|| ValidationError::NotPositive {
            field: "startTs",
            value: start_raw.to_string(),
        })?;

        let end_raw = field(self.end_ts).trim();
        let end_ts = if end_raw.is_empty() {
            None
        } else {
            let parsed = parse_number(end_raw);
            if parsed.is_none() {
                tracing::warn!(value = end_raw, "non-numeric endTs, treating as absent");
            }
            parsed
        };

        let side_raw = field(self.side);
        let side = FeedSide::parse_optional(side_raw).unwrap_or_else(|_| {
            tracing::warn!(value = side_raw, "unrecognised side, treating as none");
            None
        });

        let id_raw = field(self.id).trim();
        let id = parse_id(id_raw);
        if id.is_none() && !id_raw.is_empty() {
            tracing::warn!(value = id_raw, "unusable id, assigning a fresh one");
        }

        Ok(ImportCandidate {
            id,
            event: NewEvent {
                kind,
                start_ts,
                end_ts,
                side,
                notes: field(self.notes).to_string(),
            },
        })
    }
}

/// Parses a finite number, dropping any fractional milliseconds.
#[allow(clippy::cast_possible_truncation)]
fn parse_number(s: &str) -> Option<i64> {
    let value: f64 = s.parse().ok()?;
    value.is_finite().then(|| value.trunc() as i64)
}

fn parse_positive(s: &str) -> Option<i64> {
    parse_number(s).filter(|value| *value > 0)
}

/// Largest id kept from a backup, the largest integer an `f64` holds exactly.
///
/// Anything above is assigned a fresh id so the store's id sequence is never
/// pushed to its limit.
pub const MAX_IMPORTED_ID: i64 = (1 << 53) - 1;

/// Parses an exported id, accepting only whole numbers in
/// `1..=MAX_IMPORTED_ID`.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn parse_id(s: &str) -> Option<EventId> {
    let raw = match s.parse::<i64>() {
        Ok(raw) => raw,
        Err(_) => {
            let value: f64 = s.parse().ok()?;
            if !value.is_finite() || value.fract() != 0.0 || value.abs() > MAX_IMPORTED_ID as f64 {
                return None;
            }
            value as i64
        }
    };
    if !(1..=MAX_IMPORTED_ID).contains(&raw) {
        return None;
    }
    EventId::new(raw).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: i64, kind: EventType, start_ts: i64) -> Event {
        Event {
            id: EventId::new(id).unwrap(),
            kind,
            start_ts,
            end_ts: None,
            side: None,
            notes: String::new(),
        }
    }

    fn sample_events() -> Vec<Event> {
        vec![
            Event {
                end_ts: Some(1_700_000_060_000),
                side: Some(FeedSide::Left),
                notes: r#"said "hi", then slept"#.to_string(),
                ..event(1, EventType::Feed, 1_700_000_000_000)
            },
            event(2, EventType::Wet, 1_700_000_100_000),
            Event {
                notes: "line one\nline two".to_string(),
                ..event(5, EventType::Both, 1_700_000_200_000)
            },
        ]
    }

    fn ok_rows(text: &str) -> Vec<ImportCandidate> {
        decode(text.as_bytes())
            .unwrap()
            .into_iter()
            .map(|row| row.expect("row should be valid"))
            .collect()
    }

    #[test]
    fn encode_quotes_every_field() {
        let text = encode(&sample_events()[..2]).unwrap();
        assert_eq!(
            text,
            concat!(
                "id,type,startTs,endTs,side,notes\n",
                r#""1","feed","1700000000000","1700000060000","left","said ""hi"", then slept""#,
                "\n",
                r#""2","wet","1700000100000","","","""#,
                "\n",
            )
        );
    }

    #[test]
    fn encode_of_nothing_is_just_the_header() {
        assert_eq!(encode(&[]).unwrap(), "id,type,startTs,endTs,side,notes\n");
    }

    #[test]
    fn decode_reverses_encode() {
        let events = sample_events();
        let decoded: Vec<Event> = ok_rows(&encode(&events).unwrap())
            .into_iter()
            .map(|c| Event::from_new(c.id.unwrap(), c.event))
            .collect();
        assert_eq!(decoded, events);
    }

    #[test]
    fn decode_maps_columns_by_name() {
        let text = "notes, startTs ,type,id\n\"a, b\",1700000000000,soiled,9\n";
        let rows = ok_rows(text);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, EventId::new(9).ok());
        assert_eq!(rows[0].event.kind, EventType::Soiled);
        assert_eq!(rows[0].event.notes, "a, b");
        assert_eq!(rows[0].event.end_ts, None);
        assert_eq!(rows[0].event.side, None);
    }

    #[test]
    fn decode_accepts_all_line_endings() {
        for newline in ["\n", "\r\n", "\r"] {
            let text = format!(
                "id,type,startTs{newline}\"1\",\"wet\",\"10\"{newline}\"2\",\"feed\",\"20\"{newline}"
            );
            let rows = ok_rows(&text);
            assert_eq!(rows.len(), 2, "newline {newline:?}");
            assert_eq!(rows[1].event.start_ts, 20);
        }
    }

    #[test]
    fn decode_reports_invalid_rows_and_keeps_going() {
        let text = concat!(
            "id,type,startTs,endTs,side,notes\n",
            "1,unknown,100,,,\n",
            "2,wet,0,,,\n",
            "3,wet,abc,,,\n",
            "4,feed,400,oops,sideways,x\n",
        );
        let rows = decode(text.as_bytes()).unwrap();
        assert_eq!(rows.len(), 4);

        assert_eq!(
            rows[0],
            Err(RowError::Invalid {
                row: 1,
                source: ValidationError::UnknownType {
                    value: "unknown".to_string()
                }
            })
        );
        assert!(matches!(
            rows[1],
            Err(RowError::Invalid {
                source: ValidationError::NotPositive { .. },
                ..
            })
        ));
        assert!(rows[2].is_err());

        let last = rows[3].as_ref().unwrap();
        assert_eq!(last.event.end_ts, None);
        assert_eq!(last.event.side, None);
        assert_eq!(last.event.notes, "x");
    }

    #[test]
    fn decode_assigns_fresh_ids_for_blank_or_bad_ids() {
        let text = "id,type,startTs\n,wet,10\n-3,wet,20\nabc,wet,30\n";
        let rows = ok_rows(text);
        assert!(rows.iter().all(|row| row.id.is_none()));
    }

    #[test]
    fn decode_rejects_ids_that_are_not_whole_or_too_large() {
        let text = concat!(
            "id,type,startTs\n",
            "1e30,wet,10\n",
            "1.5,wet,20\n",
            "9223372036854775807,wet,30\n",
            "9007199254740992,wet,40\n",
            "1e3,wet,50\n",
            "9007199254740991,wet,60\n",
        );
        let ids: Vec<Option<i64>> = ok_rows(text)
            .iter()
            .map(|row| row.id.map(EventId::get))
            .collect();
        assert_eq!(
            ids,
            vec![None, None, None, None, Some(1000), Some(MAX_IMPORTED_ID)]
        );
    }

    #[test]
    fn unterminated_quote_fails_only_its_own_line() {
        let text = "id,type,startTs,endTs,side,notes\n1,wet,100,,,\"oops\n2,wet,200,,,\n3,wet,300,,,\n";
        let rows = decode(text.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(matches!(rows[0], Err(RowError::Malformed { row: 1, .. })));
        assert_eq!(rows[1].as_ref().unwrap().event.start_ts, 200);
        assert_eq!(rows[2].as_ref().unwrap().event.start_ts, 300);
        assert_eq!(rows[2].as_ref().unwrap().event.notes, "");
    }

    #[test]
    fn quoted_newlines_still_join_lines() {
        let text = "id,type,startTs,notes\r\n1,wet,10,\"a\r\nb\"\r\n2,wet,20,\"say \"\"x\"\"\"\r\n";
        let rows = ok_rows(text);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].event.notes, "a\r\nb");
        assert_eq!(rows[1].event.notes, "say \"x\"");
    }

    #[test]
    fn invalid_utf8_fails_only_its_row() {
        let data = b"id,type,startTs,endTs,side,notes\n1,wet,100,,,ok\n2,wet,200,,,caf\xE9\n3,wet,300,,,\n";
        let rows = decode(data).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].is_ok());
        assert!(matches!(rows[1], Err(RowError::Malformed { row: 2, .. })));
        assert!(rows[2].is_ok());
    }

    #[test]
    fn decode_skips_blank_lines() {
        let text = "id,type,startTs\n\n1,wet,10\n   \n";
        assert_eq!(ok_rows(text).len(), 1);
    }

    #[test]
    fn decode_of_empty_text_has_no_rows() {
        assert!(decode(b"").unwrap().is_empty());
    }

    #[test]
    fn export_file_name_uses_date() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(export_file_name(date), "babylog_2026-10-18.csv");
    }
}
