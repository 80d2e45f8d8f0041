use std::cmp::Ordering;
use std::fmt::{self, Write};

use serde::{Deserialize, Serialize};

use super::timer::TimerSnapshot;

/// Column order of the tabular export.
pub const CSV_HEADER: &str = "key,count,sum,min,max,avg,rate,p95";

// ─── Stats row ───────────────────────────────────────────────────

/// One row of the stats table: an immutable copy of a timer.
/// Durations in milliseconds, `rate` in samples per second (1-minute EWMA).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub key: String,
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub rate: f64,
    pub p95: f64,
}

impl Stats {
    pub fn from_snapshot(key: impl Into<String>, s: &TimerSnapshot) -> Self {
        Self {
            key: key.into(),
            count: s.count,
            sum: s.sum,
            min: s.min,
            max: s.max,
            avg: s.mean,
            rate: s.rate1,
            p95: s.quantile,
        }
    }

    /// Write this row as one CSV line (no trailing newline).
    pub fn write_csv_row<W: Write>(&self, out: &mut W) -> fmt::Result {
        write!(
            out,
            "{},{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6}",
            self.key, self.count, self.sum, self.min, self.max, self.avg, self.rate, self.p95
        )
    }
}

// ─── Sort key ────────────────────────────────────────────────────

/// Column to order a stats table by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Key,
    Count,
    #[default]
    Sum,
    Min,
    Max,
    Avg,
    Rate,
    P95,
}

impl SortKey {
    pub const ALL: [SortKey; 8] = [
        SortKey::Key,
        SortKey::Count,
        SortKey::Sum,
        SortKey::Min,
        SortKey::Max,
        SortKey::Avg,
        SortKey::Rate,
        SortKey::P95,
    ];

    /// Look a column up by its header name. Anything unrecognised,
    /// including the empty string, sorts by `sum`.
    pub fn parse(name: &str) -> Self {
        match name {
            "key" => Self::Key,
            "count" => Self::Count,
            "min" => Self::Min,
            "max" => Self::Max,
            "avg" => Self::Avg,
            "rate" => Self::Rate,
            "p95" => Self::P95,
            _ => Self::Sum,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Key => "key",
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::Avg => "avg",
            Self::Rate => "rate",
            Self::P95 => "p95",
        }
    }

    /// Ascending comparison of two rows on this column.
    pub fn compare(self, a: &Stats, b: &Stats) -> Ordering {
        match self {
            Self::Key => a.key.cmp(&b.key),
            Self::Count => a.count.cmp(&b.count),
            Self::Sum => a.sum.total_cmp(&b.sum),
            Self::Min => a.min.total_cmp(&b.min),
            Self::Max => a.max.total_cmp(&b.max),
            Self::Avg => a.avg.total_cmp(&b.avg),
            Self::Rate => a.rate.total_cmp(&b.rate),
            Self::P95 => a.p95.total_cmp(&b.p95),
        }
    }
}

impl From<&str> for SortKey {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Direction ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    #[default]
    Desc,
}

impl Direction {
    fn apply(self, ord: Ordering) -> Ordering {
        match self {
            Self::Asc => ord,
            Self::Desc => ord.reverse(),
        }
    }
}

// ─── Sorting ─────────────────────────────────────────────────────

/// Order `stats` in place. Ties may land in any order.
pub fn sort_stats(stats: &mut [Stats], key: SortKey, direction: Direction) {
    stats.sort_unstable_by(|a, b| direction.apply(key.compare(a, b)));
}

/// Column-name sorting directly on a stats table.
pub trait StatsSliceExt {
    fn sort_asc(&mut self, key: &str);
    fn sort_desc(&mut self, key: &str);
}

impl StatsSliceExt for [Stats] {
    fn sort_asc(&mut self, key: &str) {
        sort_stats(self, SortKey::parse(key), Direction::Asc);
    }

    fn sort_desc(&mut self, key: &str) {
        sort_stats(self, SortKey::parse(key), Direction::Desc);
    }
}

// ─── CSV ─────────────────────────────────────────────────────────

/// Render a header line plus one line per row.
pub fn write_csv(stats: &[Stats]) -> String {
    let mut out = String::with_capacity(CSV_HEADER.len() + 1 + stats.len() * 64);
    out.push_str(CSV_HEADER);
    out.push('\n');
    for s in stats {
        // Writing into a String cannot fail
        let _ = s.write_csv_row(&mut out);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &str, count: u64, sum: f64) -> Stats {
        Stats {
            key: key.into(),
            count,
            sum,
            min: sum / 4.0,
            max: sum / 2.0,
            avg: sum / 3.0,
            rate: count as f64 / 10.0,
            p95: sum / 2.5,
        }
    }

    fn table() -> Vec<Stats> {
        vec![
            row("b", 3, 7.5),
            row("a", 9, 1.0),
            row("d", 1, 12.0),
            row("c", 4, 3.25),
        ]
    }

    #[test]
    fn parse_falls_back_to_sum() {
        assert_eq!(SortKey::parse("p95"), SortKey::P95);
        assert_eq!(SortKey::parse("bogus"), SortKey::Sum);
        assert_eq!(SortKey::parse(""), SortKey::Sum);
        assert_eq!(SortKey::parse("COUNT"), SortKey::Sum);
        for k in SortKey::ALL {
            assert_eq!(SortKey::parse(k.as_str()), k);
        }
    }

    #[test]
    fn every_column_sorts_both_ways() {
        for key in SortKey::ALL {
            let mut stats = table();
            sort_stats(&mut stats, key, Direction::Asc);
            for w in stats.windows(2) {
                assert_ne!(key.compare(&w[0], &w[1]), Ordering::Greater, "asc {key}");
            }
            sort_stats(&mut stats, key, Direction::Desc);
            for w in stats.windows(2) {
                assert_ne!(key.compare(&w[0], &w[1]), Ordering::Less, "desc {key}");
            }
        }
    }

    #[test]
    fn name_sorting_via_extension() {
        let mut stats = table();
        stats.sort_asc("key");
        let keys: Vec<_> = stats.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, ["a", "b", "c", "d"]);

        stats.sort_desc("unknown");
        let sums: Vec<_> = stats.iter().map(|s| s.sum).collect();
        assert_eq!(sums, [12.0, 7.5, 3.25, 1.0]);
    }

    #[test]
    fn nan_does_not_panic() {
        let mut stats = table();
        stats[0].rate = f64::NAN;
        stats.sort_desc("rate");
        assert_eq!(stats.len(), 4);
    }

    #[test]
    fn csv_layout() {
        let csv = write_csv(&[row("op", 2, 1.5)]);
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(
            lines[1],
            "op,2,1.500000,0.375000,0.750000,0.500000,0.200000,0.600000"
        );
    }

    #[test]
    fn csv_of_empty_table_is_just_the_header() {
        assert_eq!(write_csv(&[]), format!("{CSV_HEADER}\n"));
    }
}
