//! CSV tables handed to downstream consumers, one pair per boat speed.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use log::info;

use crate::engine::planner::SpeedPlan;
use crate::error::Result;

pub const TRANSIT_HEADER: [&str; 4] =
    ["departure_index", "departure_time", "transit_timesteps", "baseline"];
pub const WINDOW_HEADER: [&str; 11] = [
    "start_index",
    "min_index",
    "end_index",
    "minimum_value",
    "start_time",
    "min_time",
    "end_time",
    "window_duration",
    "start_time_rounded",
    "min_time_rounded",
    "end_time_rounded",
];

fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn write_transit<W: Write>(writer: &mut csv::Writer<W>, plan: &SpeedPlan) -> Result<()> {
    writer.write_record(TRANSIT_HEADER)?;
    for (index, (&steps, baseline)) in plan.transit.steps.iter().zip(&plan.baseline).enumerate() {
        writer.write_record([
            index.to_string(),
            timestamp(plan.departure_time(index)),
            steps.to_string(),
            format!("{:.3}", baseline),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_windows<W: Write>(writer: &mut csv::Writer<W>, plan: &SpeedPlan) -> Result<()> {
    writer.write_record(WINDOW_HEADER)?;
    for w in &plan.windows {
        writer.write_record([
            w.window.start_index.to_string(),
            w.window.min_index.to_string(),
            w.window.end_index.to_string(),
            w.window.minimum_value.to_string(),
            timestamp(w.start_time),
            timestamp(w.min_time),
            timestamp(w.end_time),
            w.window_duration.num_seconds().to_string(),
            timestamp(w.start_time_rounded),
            timestamp(w.min_time_rounded),
            timestamp(w.end_time_rounded),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes `transit_<speed>.csv` and `windows_<speed>.csv` into `dir`.
pub fn write_plan(dir: &Path, plan: &SpeedPlan) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(dir)?;
    let transit_path = dir.join(format!("transit_{}.csv", plan.speed));
    let windows_path = dir.join(format!("windows_{}.csv", plan.speed));

    let mut writer = csv::Writer::from_writer(File::create(&transit_path)?);
    write_transit(&mut writer, plan)?;

    let mut writer = csv::Writer::from_writer(File::create(&windows_path)?);
    write_windows(&mut writer, plan)?;

    info!("Wrote {} and {}", transit_path.display(), windows_path.display());
    Ok((transit_path, windows_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::models::{TransitTimeSeries, Window};
    use chrono::{TimeDelta, TimeZone};
    use tempfile::tempdir;

    fn plan() -> SpeedPlan {
        let epoch = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let timestep = TimeDelta::seconds(150);
        let window = Window { start_index: 1, min_index: 2, end_index: 4, minimum_value: 7.0 };
        SpeedPlan {
            speed: 5.5,
            transit: TransitTimeSeries::new(vec![9, 8, 7, 8, 9]),
            baseline: vec![8.5, 8.25, 8.0, 8.25, 8.5],
            windows: vec![window.timed(epoch, timestep)],
            epoch,
            timestep,
        }
    }

    #[test]
    fn test_transit_rows() {
        let mut writer = csv::Writer::from_writer(Vec::new());
        write_transit(&mut writer, &plan()).unwrap();
        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], TRANSIT_HEADER.join(","));
        assert_eq!(lines[2], "1,2024-05-01T12:02:30Z,8,8.250");
    }

    #[test]
    fn test_window_rows() {
        let mut writer = csv::Writer::from_writer(Vec::new());
        write_windows(&mut writer, &plan()).unwrap();
        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            "1,2,4,7,2024-05-01T12:02:30Z,2024-05-01T12:05:00Z,2024-05-01T12:10:00Z,450,\
             2024-05-01T12:03:00Z,2024-05-01T12:05:00Z,2024-05-01T12:10:00Z"
        );
    }

    #[test]
    fn test_write_plan_files() {
        let dir = tempdir().unwrap();
        let (transit, windows) = write_plan(&dir.path().join("out"), &plan()).unwrap();
        assert!(transit.ends_with("transit_5.5.csv"));
        assert!(windows.ends_with("windows_5.5.csv"));
        let mut reader = csv::Reader::from_path(windows).unwrap();
        let header: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(header, WINDOW_HEADER);
        assert_eq!(reader.records().count(), 1);

        let mut reader = csv::Reader::from_path(transit).unwrap();
        let first = reader.records().next().unwrap().unwrap();
        assert_eq!(&first[0], "0");
        assert_eq!(&first[3], "8.500");
    }
}
