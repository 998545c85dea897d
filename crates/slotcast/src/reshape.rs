//! Reshaping raw slot-availability exports into one partition per metric.
//!
//! Every input row `country,area,day[,hour],v1..v14` contributes the line
//! `timestamp,area,vN` to partition N. Zero readings are written as empty
//! fields so the service treats them as missing values.

use snafu::ResultExt;

use crate::config::Granularity;
use crate::error::{ColumnCountSnafu, CsvSnafu, InvalidHourSnafu, ReshapeError};
use crate::metric::Metric;

/// Reshaped contents for every metric, in [`Metric::ALL`] order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricPartitions {
    granularity: Granularity,
    contents: Vec<String>,
    rows: usize,
}

impl MetricPartitions {
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Number of input rows that were reshaped.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn get(&self, metric: Metric) -> &str {
        &self.contents[metric.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, &str)> {
        Metric::ALL
            .into_iter()
            .zip(self.contents.iter().map(String::as_str))
    }
}

/// Split `input` into one `timestamp,area,value` file per metric.
pub fn reshape(input: &str, granularity: Granularity) -> Result<MetricPartitions, ReshapeError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(granularity.delimiter())
        .from_reader(input.as_bytes());

    let key_columns = granularity.key_columns();
    let expected = key_columns + Metric::ALL.len();
    let mut contents = vec![String::new(); Metric::ALL.len()];
    let mut rows = 0;

    let mut record = csv::StringRecord::new();
    loop {
        let line = reader.position().line();
        let more = reader.read_record(&mut record).context(CsvSnafu { line })?;
        if !more {
            break;
        }
        let line = record.position().map_or(line, |p| p.line());

        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        if record.len() != expected {
            return ColumnCountSnafu {
                line,
                expected,
                found: record.len(),
            }
            .fail();
        }

        let area = &record[1];
        let timestamp = match granularity {
            Granularity::Daily => record[2].to_string(),
            Granularity::Hourly => {
                let hour = &record[3];
                let value: u8 = hour
                    .trim()
                    .parse()
                    .ok()
                    .filter(|h| *h < 24)
                    .ok_or_else(|| {
                        InvalidHourSnafu {
                            line,
                            value: hour.to_string(),
                        }
                        .build()
                    })?;
                format!("{} {value:02}:00:00", &record[2])
            }
        };

        for (i, out) in contents.iter_mut().enumerate() {
            let value = &record[key_columns + i];
            let value = if value == "0" { "" } else { value };
            out.push_str(&timestamp);
            out.push(',');
            out.push_str(area);
            out.push(',');
            out.push_str(value);
            out.push('\n');
        }
        rows += 1;
    }

    Ok(MetricPartitions {
        granularity,
        contents,
        rows,
    })
}
