// Fixed-width bucketing of the reading series

use crate::core::format::{AggregateBucket, BucketWidth, Reading};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;

struct Accumulator {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    fn push(&mut self, v: f64) {
        self.count += 1;
        self.sum += v;
        self.min = self.min.min(v);
        self.max = self.max.max(v);
    }
}

/// Groups every individual value by `width.floor(timestamp)` and returns
/// count/mean/min/max per bucket, ordered by bucket start.
///
/// Pure: the whole table is rebuilt from `readings` on each call.
pub fn aggregate(readings: &[Reading], width: BucketWidth) -> Vec<AggregateBucket> {
    let mut buckets: BTreeMap<NaiveDateTime, Accumulator> = BTreeMap::new();

    for reading in readings {
        let start = width.floor(reading.timestamp);
        let acc = buckets.entry(start).or_insert_with(Accumulator::new);
        for &v in &reading.values {
            acc.push(v);
        }
    }

    buckets
        .into_iter()
        .filter(|(_, acc)| acc.count > 0)
        .map(|(bucket_start, acc)| AggregateBucket {
            bucket_start,
            count: acc.count,
            avg: acc.sum / acc.count as f64,
            min: acc.min,
            max: acc.max,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reader::parse_log;
    use chrono::NaiveDate;

    fn ts(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_minute_bucket_scenario() {
        let readings = parse_log(
            "2024-01-01T10:00:05\t23.500, 23.600\n2024-01-01T10:00:40\t24.000\n",
        );
        let table = aggregate(&readings, BucketWidth::Minute);

        assert_eq!(table.len(), 1);
        let bucket = &table[0];
        assert_eq!(bucket.bucket_start, ts(10, 0, 0));
        assert_eq!(bucket.count, 3);
        assert!((bucket.avg - 23.7).abs() < 1e-9);
        assert_eq!(bucket.min, 23.5);
        assert_eq!(bucket.max, 24.0);
    }

    #[test]
    fn test_empty_input_empty_table() {
        assert!(aggregate(&[], BucketWidth::Minute).is_empty());
        assert!(aggregate(&[], BucketWidth::Hour).is_empty());
    }

    #[test]
    fn test_boundary_reading_opens_new_bucket() {
        let readings = vec![
            Reading::new(ts(10, 0, 59), vec![1.0]),
            Reading::new(ts(10, 1, 0), vec![2.0]),
        ];
        let table = aggregate(&readings, BucketWidth::Minute);
        let starts: Vec<_> = table.iter().map(|b| b.bucket_start).collect();
        assert_eq!(starts, vec![ts(10, 0, 0), ts(10, 1, 0)]);
    }

    #[test]
    fn test_counts_sum_to_value_total() {
        let readings = vec![
            Reading::new(ts(9, 59, 30), vec![1.0, 2.0, 3.0]),
            Reading::new(ts(10, 0, 10), vec![4.0]),
            Reading::new(ts(10, 30, 0), vec![5.0, 6.0]),
            Reading::new(ts(11, 15, 0), vec![7.0]),
        ];
        let total: usize = readings.iter().map(|r| r.values.len()).sum();

        for width in BucketWidth::ALL {
            let table = aggregate(&readings, width);
            let counted: u64 = table.iter().map(|b| b.count).sum();
            assert_eq!(counted as usize, total, "{width}");
        }

        let hours = aggregate(&readings, BucketWidth::Hour);
        assert_eq!(hours.len(), 3);
        assert_eq!(hours[1].bucket_start, ts(10, 0, 0));
        assert_eq!(hours[1].count, 3);
        assert_eq!(hours[1].min, 4.0);
        assert_eq!(hours[1].max, 6.0);
    }

    #[test]
    fn test_idempotent() {
        let readings = vec![
            Reading::new(ts(10, 0, 1), vec![1.5, 2.5]),
            Reading::new(ts(10, 2, 1), vec![3.5]),
        ];
        for width in BucketWidth::ALL {
            assert_eq!(aggregate(&readings, width), aggregate(&readings, width));
        }
    }

    #[test]
    fn test_output_ordered_for_unsorted_input() {
        let readings = vec![
            Reading::new(ts(12, 0, 0), vec![1.0]),
            Reading::new(ts(10, 0, 0), vec![1.0]),
            Reading::new(ts(11, 0, 0), vec![1.0]),
        ];
        let table = aggregate(&readings, BucketWidth::Hour);
        assert!(table.windows(2).all(|w| w[0].bucket_start < w[1].bucket_start));
    }
}
