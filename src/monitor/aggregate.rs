// * Per-letter aggregation of measurement files

use crate::data::DataFormat;
use std::collections::BTreeMap;
use std::path::Path;

/// Count and temperature sum for one first letter
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AggregateData {
    pub count: u64,
    pub sum: f64,
}

impl AggregateData {
    pub fn record(&mut self, temperature: f64) {
        self.count += 1;
        self.sum += temperature;
    }

    pub fn merge(&mut self, other: &AggregateData) {
        self.count += other.count;
        self.sum += other.sum;
    }
}

/// Aggregates keyed by upper-cased first letter, iterated in letter order
pub type LetterMap = BTreeMap<char, AggregateData>;

/// Aggregates the data lines of one file's content
///
/// Malformed lines are skipped with a warning.
pub fn aggregate_content(content: &str, format: DataFormat) -> LetterMap {
    let mut map = LetterMap::new();

    for line in format.data_lines(content) {
        if line.trim().is_empty() {
            continue;
        }
        let measurement = match format.parse_line(line) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("{}", e);
                continue;
            }
        };

        // * Station is trimmed and non-empty, so there is a first char
        // * Multi-char uppercase forms only count under their first char
        if let Some(letter) = measurement
            .station
            .chars()
            .next()
            .and_then(|first| first.to_uppercase().next())
        {
            map.entry(letter).or_default().record(measurement.temperature);
        }
    }

    map
}

/// Reads and aggregates one data file
///
/// Files with an unknown extension yield an empty map.
pub async fn aggregate_file(path: &Path) -> std::io::Result<LetterMap> {
    let Some(format) = DataFormat::from_path(path) else {
        return Ok(LetterMap::new());
    };
    let bytes = tokio::fs::read(path).await?;
    Ok(aggregate_content(&String::from_utf8_lossy(&bytes), format))
}

/// Sums several maps into one
pub fn merge_maps<'a>(maps: impl IntoIterator<Item = &'a LetterMap>) -> LetterMap {
    let mut total = LetterMap::new();
    for map in maps {
        for (letter, data) in map {
            total.entry(*letter).or_default().merge(data);
        }
    }
    total
}
