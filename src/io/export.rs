//! CSV export for recorded step snapshots.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::error::Result;
use crate::sim::types::Snapshot;

/// Column header, one row per step.
pub const HEADER: &str = "step,timestamp,irradiance,ambient_temperature,wind_speed,\
                          cloud_cover,solar_kw,wind_kw,diesel_kw,load_kw,served_load_kw,\
                          battery_kw,soc,grid_kw,unmet_load_kw,curtailed_kw,buy_price,\
                          sell_price,period,fuel_l,step_cost,renewable_ratio,diesel_on,reward";

/// Exports snapshots to a CSV file at the given path.
///
/// # Errors
///
/// Returns `Io` if the file cannot be created, `Csv` if writing fails.
pub fn export_csv<'a, I>(history: I, path: &Path) -> Result<()>
where
    I: IntoIterator<Item = &'a Snapshot>,
{
    let file = File::create(path)?;
    write_csv(history, io::BufWriter::new(file))
}

/// Writes snapshots as CSV to any writer.
///
/// Output is deterministic for identical inputs.
///
/// # Errors
///
/// Returns `Csv` or `Io` if writing fails.
pub fn write_csv<'a, I>(history: I, writer: impl Write) -> Result<()>
where
    I: IntoIterator<Item = &'a Snapshot>,
{
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for s in history {
        wtr.write_record(&[
            s.step.to_string(),
            s.timestamp.format("%Y-%m-%dT%H:%M:%S").to_string(),
            format!("{:.2}", s.irradiance),
            format!("{:.2}", s.ambient_temperature),
            format!("{:.2}", s.wind_speed),
            format!("{:.3}", s.cloud_cover),
            format!("{:.4}", s.solar_kw),
            format!("{:.4}", s.wind_kw),
            format!("{:.4}", s.diesel_kw),
            format!("{:.4}", s.load_kw),
            format!("{:.4}", s.served_load_kw),
            format!("{:.4}", s.battery_kw),
            format!("{:.4}", s.soc),
            format!("{:.4}", s.grid_kw),
            format!("{:.4}", s.unmet_load_kw),
            format!("{:.4}", s.curtailed_kw),
            format!("{:.4}", s.buy_price),
            format!("{:.4}", s.sell_price),
            s.period.to_string(),
            format!("{:.4}", s.fuel_l),
            format!("{:.4}", s.step_cost),
            format!("{:.4}", s.renewable_ratio),
            s.diesel_on.to_string(),
            format!("{:.4}", s.reward),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
