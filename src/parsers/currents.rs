use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use log::info;

use crate::engine::models::VelocitySeries;
use crate::error::{Result, TransitError};
use crate::parsers::parse_timestamp;

/// Predicted currents for every route node on a shared time axis.
///
/// CSV layout: header `time,<node>,<node>,...`, then one row per timestep.
/// An empty cell is read as a missing sample.
#[derive(Debug, Clone, Default)]
pub struct CurrentTable {
    pub times: Vec<DateTime<Utc>>,
    pub series: HashMap<String, VelocitySeries>,
}

impl CurrentTable {
    pub fn load_from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading current predictions from CSV: {:?}", path);
        let reader = BufReader::new(File::open(path)?);
        let table = Self::read(reader, path)?;
        info!("Loaded {} nodes x {} timesteps", table.series.len(), table.times.len());
        Ok(table)
    }

    pub fn read<R: BufRead>(reader: R, path: &Path) -> Result<Self> {
        let parse_err = |line: usize, message: String| TransitError::Parse {
            path: PathBuf::from(path),
            line,
            message,
        };

        let mut lines = reader.lines().enumerate();
        let header = match lines.next() {
            Some((_, line)) => line?,
            None => return Err(parse_err(1, "empty file".into())),
        };
        let nodes: Vec<String> = header.split(',').skip(1).map(|n| n.trim().to_string()).collect();
        if nodes.is_empty() {
            return Err(parse_err(1, "header names no nodes".into()));
        }

        let mut times = Vec::new();
        let mut columns: Vec<Vec<f64>> = vec![Vec::new(); nodes.len()];
        for (idx, line) in lines {
            let line = line?;
            let line_no = idx + 1;
            if line.trim().is_empty() {
                continue;
            }
            let cells: Vec<&str> = line.split(',').collect();
            if cells.len() != nodes.len() + 1 {
                return Err(parse_err(
                    line_no,
                    format!("expected {} columns, found {}", nodes.len() + 1, cells.len()),
                ));
            }
            let time = parse_timestamp(cells[0])
                .ok_or_else(|| parse_err(line_no, format!("bad timestamp {:?}", cells[0])))?;
            times.push(time);

            for (column, cell) in columns.iter_mut().zip(&cells[1..]) {
                let cell = cell.trim();
                let value = if cell.is_empty() {
                    f64::NAN
                } else {
                    cell.parse()
                        .map_err(|_| parse_err(line_no, format!("bad velocity {:?}", cell)))?
                };
                column.push(value);
            }
        }

        let series = nodes
            .into_iter()
            .zip(columns)
            .map(|(node, velocities)| (node.clone(), VelocitySeries::new(node, velocities)))
            .collect();
        Ok(Self { times, series })
    }

    /// Time of the first sample.
    pub fn epoch(&self) -> Option<DateTime<Utc>> {
        self.times.first().copied()
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Ensures every row is exactly one timestep after the previous one.
    pub fn check_timestep(&self, timestep: TimeDelta) -> Result<()> {
        if let Some((i, pair)) = self
            .times
            .windows(2)
            .enumerate()
            .find(|(_, pair)| pair[1] - pair[0] != timestep)
        {
            return Err(TransitError::InvalidConfig(format!(
                "current samples {} and {} are {}s apart, expected {}s",
                i,
                i + 1,
                (pair[1] - pair[0]).num_seconds(),
                timestep.num_seconds()
            )));
        }
        Ok(())
    }

    pub fn node(&self, name: &str) -> Result<&VelocitySeries> {
        self.series.get(name).ok_or_else(|| TransitError::UnknownNode(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const CSV: &str = "time,Admiralty,Bush Point\n\
        2024-05-01T00:00:00Z,1.5,-0.5\n\
        2024-05-01T00:05:00Z,1.25,\n\
        \n\
        2024-05-01T00:10:00Z,0.75,0.25\n";

    fn table() -> CurrentTable {
        CurrentTable::read(CSV.as_bytes(), Path::new("currents.csv")).unwrap()
    }

    #[test]
    fn test_read_wide_table() {
        let table = table();
        assert_eq!(table.len(), 3);
        assert_eq!(table.epoch(), Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()));
        assert_eq!(table.node("Admiralty").unwrap().velocities, vec![1.5, 1.25, 0.75]);

        let bush = table.node("Bush Point").unwrap();
        assert_eq!(bush.velocities[0], -0.5);
        assert!(bush.velocities[1].is_nan());
    }

    #[test]
    fn test_timestep_check() {
        let table = table();
        assert!(table.check_timestep(TimeDelta::minutes(5)).is_ok());
        assert!(table.check_timestep(TimeDelta::minutes(10)).is_err());
    }

    #[test]
    fn test_unknown_node() {
        assert!(matches!(table().node("Nowhere"), Err(TransitError::UnknownNode(_))));
    }

    #[test]
    fn test_bad_rows_report_line() {
        let csv = "time,A\n2024-05-01T00:00:00Z,1.0\n2024-05-01T00:05:00Z,fast\n";
        match CurrentTable::read(csv.as_bytes(), Path::new("c.csv")) {
            Err(TransitError::Parse { line, message, .. }) => {
                assert_eq!(line, 3);
                assert!(message.contains("fast"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }

        let csv = "time,A,B\n2024-05-01T00:00:00Z,1.0\n";
        assert!(matches!(
            CurrentTable::read(csv.as_bytes(), Path::new("c.csv")),
            Err(TransitError::Parse { line: 2, .. })
        ));
    }
}
