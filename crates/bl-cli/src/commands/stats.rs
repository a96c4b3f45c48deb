//! Stats command: daily, weekly and monthly aggregates.

use std::fmt::{Display, Write as _};
use std::io::Write;

use anyhow::Result;
use chrono::TimeZone;
use clap::ValueEnum;
use serde::Serialize;

use bl_core::stats::DiaperCounts;
use bl_core::{DailyCounts, DailyStats, DayBucket, MonthKey, PeriodBucket, WeekKey, format_duration};
use bl_db::Database;

use super::util::{format_clock, format_day};

/// Which aggregation to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Daily,
    Weekly,
    Monthly,
}

pub fn run<W, Tz>(
    writer: &mut W,
    db: &Database,
    view: View,
    json: bool,
    tz: &Tz,
    tz_name: &str,
) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let events = db.list_all_ascending()?;
    let stats = DailyStats::from_events(&events, tz);
    tracing::debug!(events = events.len(), days = stats.len(), ?view, "aggregated");

    if json {
        writeln!(writer, "{}", format_json(&stats, view, tz_name)?)?;
        return Ok(());
    }
    if stats.is_empty() {
        writeln!(writer, "No events logged yet.")?;
        return Ok(());
    }

    let text = match view {
        View::Daily => format_daily(&stats, tz),
        View::Weekly => format_periods(&stats.weekly(), |key| {
            format!("{key}  {}", key.range_label())
        }),
        View::Monthly => format_periods(&stats.monthly(), |key| key.label()),
    };
    write!(writer, "{text}")?;
    Ok(())
}

/// Day buckets, newest first, each with its feeds listed oldest first.
pub fn format_daily<Tz>(stats: &DailyStats, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut output = String::new();
    for (idx, day) in stats.newest_first().enumerate() {
        if idx > 0 {
            output.push('\n');
        }
        let counts = day.counts();
        let _ = writeln!(output, "{}", format_day(day.date));
        let _ = writeln!(
            output,
            "  Feeds: {} ({})   Wet: {}   Soiled: {}",
            counts.feeds,
            format_duration(minutes_to_ms(day.feed_minutes)),
            counts.wet,
            counts.soiled
        );
        for feed in &day.feeds {
            let length = feed
                .end_ts
                .map_or_else(|| "in progress".to_string(), |end| format_duration(end - feed.start_ts));
            let side = feed.side.map(|s| format!(", {s}")).unwrap_or_default();
            let _ = writeln!(output, "    {}  {length}{side}", format_clock(feed.start_ts, tz));
        }
    }
    output
}

/// Week or month buckets, newest first.
pub fn format_periods<K, F>(buckets: &[PeriodBucket<K>], header: F) -> String
where
    F: Fn(&K) -> String,
{
    let mut output = String::new();
    for (idx, bucket) in buckets.iter().enumerate() {
        if idx > 0 {
            output.push('\n');
        }
        let _ = writeln!(output, "{}", header(&bucket.key));
        let _ = writeln!(
            output,
            "  Feeds: {} ({:.1}/day)   Feed time: {} ({:.0} min/day)",
            bucket.feeds,
            bucket.feeds_per_day(),
            format_duration(minutes_to_ms(bucket.minutes)),
            bucket.minutes_per_day()
        );
        let _ = writeln!(
            output,
            "  Wet: {}   Soiled: {}   Days logged: {}",
            bucket.diapers.wet_total(),
            bucket.diapers.soiled_total(),
            bucket.days
        );
    }
    output
}

#[derive(Debug, Serialize)]
struct JsonReport<'a, T> {
    timezone: &'a str,
    view: View,
    buckets: Vec<T>,
}

#[derive(Debug, Serialize)]
struct JsonDay<'a> {
    #[serde(flatten)]
    day: &'a DayBucket,
    counts: DailyCounts,
}

#[derive(Debug, Serialize)]
struct JsonPeriod<'a, K> {
    #[serde(flatten)]
    bucket: &'a PeriodBucket<K>,
    label: String,
    totals: DailyCounts,
    feeds_per_day: f64,
    minutes_per_day: f64,
}

impl<'a, K> JsonPeriod<'a, K> {
    fn new(bucket: &'a PeriodBucket<K>, label: String) -> Self {
        Self {
            bucket,
            label,
            totals: period_totals(bucket.feeds, bucket.diapers),
            feeds_per_day: bucket.feeds_per_day(),
            minutes_per_day: bucket.minutes_per_day(),
        }
    }
}

const fn period_totals(feeds: usize, diapers: DiaperCounts) -> DailyCounts {
    DailyCounts {
        feeds,
        wet: diapers.wet_total(),
        soiled: diapers.soiled_total(),
    }
}

/// JSON report for `view`, tagged with the time zone used for bucketing.
pub fn format_json(stats: &DailyStats, view: View, tz_name: &str) -> Result<String> {
    let json = match view {
        View::Daily => {
            let buckets: Vec<JsonDay<'_>> = stats
                .newest_first()
                .map(|day| JsonDay {
                    day,
                    counts: day.counts(),
                })
                .collect();
            serde_json::to_string_pretty(&JsonReport {
                timezone: tz_name,
                view,
                buckets,
            })?
        }
        View::Weekly => {
            let weeks = stats.weekly();
            let buckets: Vec<JsonPeriod<'_, WeekKey>> = weeks
                .iter()
                .map(|week| JsonPeriod::new(week, week.key.range_label()))
                .collect();
            serde_json::to_string_pretty(&JsonReport {
                timezone: tz_name,
                view,
                buckets,
            })?
        }
        View::Monthly => {
            let months = stats.monthly();
            let buckets: Vec<JsonPeriod<'_, MonthKey>> = months
                .iter()
                .map(|month| JsonPeriod::new(month, month.key.label()))
                .collect();
            serde_json::to_string_pretty(&JsonReport {
                timezone: tz_name,
                view,
                buckets,
            })?
        }
    };
    Ok(json)
}

#[allow(clippy::cast_possible_truncation)]
fn minutes_to_ms(minutes: f64) -> i64 {
    (minutes * 60_000.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    use bl_core::{Event, EventId, EventType, FeedSide};
    use chrono::Utc;
    use insta::assert_snapshot;

    /// 2026-10-18T00:00:00Z, a Sunday.
    const DAY: i64 = 1_792_281_600_000;
    const MINUTE: i64 = 60_000;
    const HOUR: i64 = 60 * MINUTE;

    fn event(id: i64, kind: EventType, start_ts: i64, end_ts: Option<i64>) -> Event {
        Event {
            id: EventId::new(id).unwrap(),
            kind,
            start_ts,
            end_ts,
            side: None,
            notes: String::new(),
        }
    }

    /// Saturday and Sunday of ISO week 42 plus Monday of week 43.
    fn sample_stats() -> DailyStats {
        let mut feed = event(1, EventType::Feed, DAY - 24 * HOUR + 8 * HOUR, None);
        feed.end_ts = Some(feed.start_ts + 31 * MINUTE);
        feed.side = Some(FeedSide::Right);
        let events = vec![
            feed,
            event(2, EventType::Wet, DAY - 24 * HOUR + 9 * HOUR, None),
            event(3, EventType::Feed, DAY + 6 * HOUR, Some(DAY + 6 * HOUR + 95 * MINUTE)),
            event(4, EventType::Both, DAY + 7 * HOUR, None),
            event(5, EventType::Feed, DAY + 24 * HOUR + HOUR, None),
        ];
        DailyStats::from_events(&events, &Utc)
    }

    #[test]
    fn daily_view_lists_days_newest_first() {
        assert_snapshot!(format_daily(&sample_stats(), &Utc), @r"
        Mon Oct 19, 2026
          Feeds: 1 (0 min)   Wet: 0   Soiled: 0
            01:00  in progress

        Sun Oct 18, 2026
          Feeds: 1 (1h 35m)   Wet: 1   Soiled: 1
            06:00  1h 35m

        Sat Oct 17, 2026
          Feeds: 1 (31 min)   Wet: 1   Soiled: 0
            08:00  31 min, right
        ");
    }

    #[test]
    fn weekly_view_folds_days() {
        let stats = sample_stats();
        let text = format_periods(&stats.weekly(), |key| format!("{key}  {}", key.range_label()));
        assert_snapshot!(text, @r"
        2026-W43  Oct 19–Oct 25
          Feeds: 1 (1.0/day)   Feed time: 0 min (0 min/day)
          Wet: 0   Soiled: 0   Days logged: 1

        2026-W42  Oct 12–Oct 18
          Feeds: 2 (1.0/day)   Feed time: 2h 6m (63 min/day)
          Wet: 2   Soiled: 1   Days logged: 2
        ");
    }

    #[test]
    fn monthly_view_uses_month_labels() {
        let stats = sample_stats();
        let text = format_periods(&stats.monthly(), |key| key.label());
        assert!(text.starts_with("October 2026\n  Feeds: 3 (1.0/day)"));
    }

    #[test]
    fn json_report_includes_timezone_and_totals() {
        let json = format_json(&sample_stats(), View::Weekly, "Europe/Berlin").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["timezone"], "Europe/Berlin");
        assert_eq!(value["view"], "weekly");
        let week42 = &value["buckets"][1];
        assert_eq!(week42["key"], "2026-W42");
        assert_eq!(week42["label"], "Oct 12–Oct 18");
        assert_eq!(week42["totals"]["wet"], 2);
        assert_eq!(week42["diapers"]["both"], 1);
        assert_eq!(week42["days"], 2);
    }

    #[test]
    fn json_daily_report_lists_counts() {
        let json = format_json(&sample_stats(), View::Daily, "UTC").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let sunday = &value["buckets"][1];
        assert_eq!(sunday["date"], "2026-10-18");
        assert_eq!(sunday["counts"]["soiled"], 1);
        assert_eq!(sunday["feeds"][0]["minutes"], 95.0);
    }

    #[test]
    fn empty_log_has_no_stats() {
        let db = Database::open_in_memory().unwrap();
        let mut output = Vec::new();
        run(&mut output, &db, View::Monthly, false, &Utc, "UTC").unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "No events logged yet.\n");
    }
}
