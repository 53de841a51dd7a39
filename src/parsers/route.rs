use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use log::info;

use crate::engine::models::{Route, Segment, SegmentId};
use crate::error::{Result, TransitError};
use crate::parsers::currents::CurrentTable;

/// One leg of the passage as listed in the route file.
#[derive(Debug, Clone, PartialEq)]
pub struct Leg {
    pub start: String,
    pub end: String,
    /// Nautical miles
    pub length: f64,
}

/// Ordered legs read from `start,end,length` CSV rows. The header row and
/// lines starting with `#` are skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteFile {
    pub legs: Vec<Leg>,
}

impl RouteFile {
    pub fn load_from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading route legs from CSV: {:?}", path);
        Self::read(BufReader::new(File::open(path)?), path)
    }

    pub fn read<R: BufRead>(reader: R, path: &Path) -> Result<Self> {
        let parse_err = |line: usize, message: String| TransitError::Parse {
            path: PathBuf::from(path),
            line,
            message,
        };

        let mut legs = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if idx == 0 || line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parts: Vec<&str> = line.split(',').map(str::trim).collect();
            let [start, end, length] = parts[..] else {
                return Err(parse_err(idx + 1, format!("expected 3 columns, found {}", parts.len())));
            };
            let length: f64 = length
                .parse()
                .map_err(|_| parse_err(idx + 1, format!("bad length {:?}", length)))?;
            if !(length.is_finite() && length > 0.0) {
                return Err(parse_err(idx + 1, format!("length must be positive, got {}", length)));
            }
            legs.push(Leg { start: start.to_string(), end: end.to_string(), length });
        }
        Ok(Self { legs })
    }

    /// Binds each leg to the current predictions at its two nodes. Legs
    /// repeating a start/end pair are rejected, since artifacts are keyed by
    /// segment id.
    pub fn build(&self, currents: &CurrentTable) -> Result<Route> {
        let mut seen = HashSet::new();
        for leg in &self.legs {
            let id = SegmentId::between(&leg.start, &leg.end);
            if !seen.insert(id.clone()) {
                return Err(TransitError::DuplicateSegment(id));
            }
        }

        let segments = self
            .legs
            .iter()
            .map(|leg| {
                Ok(Segment::new(
                    leg.length,
                    currents.node(&leg.start)?.clone(),
                    currents.node(&leg.end)?.clone(),
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        info!("Route has {} segments, {:.2} nm", segments.len(), segments.iter().map(|s| s.length).sum::<f64>());
        Ok(Route::new(segments))
    }
}
