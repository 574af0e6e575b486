use std::fmt::Display;
use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use scanlink_scan::{AnglePair, Grid};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(text: &str) {
    let mut out = std::io::stdout();
    let _ = writeln!(out, "{text}");
    let _ = out.flush();
}

/// Two-column key/value table.
pub fn print_fields(fields: &[(&str, String)], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (name, value) in fields {
                table.add_row(vec![name.to_uppercase(), value.clone()]);
            }
            println!("{table}");
        }
        _ => {
            for (name, value) in fields {
                println!("  {:<12} {value}", format!("{name}:"));
            }
        }
    }
}

/// A reading grid labelled with the angles it was measured at.
#[derive(Serialize)]
pub struct GridOutput<T: Serialize> {
    pub pitch: Vec<i32>,
    pub yaw: Vec<i32>,
    pub readings: Vec<Vec<T>>,
}

impl<T: Serialize + Clone> GridOutput<T> {
    /// Readings taken cell for cell on `angles`.
    pub fn new(angles: &Grid<AnglePair>, readings: &Grid<T>) -> Self {
        Self::smoothed(angles, readings, 1)
    }

    /// Readings averaged over `window x window` blocks of `angles`. Each
    /// reading is labelled with the centre of its block, rounded to whole
    /// degrees.
    pub fn smoothed(angles: &Grid<AnglePair>, readings: &Grid<T>, window: usize) -> Self {
        let window = window.max(1);
        let pitch_at = |row: usize| angles.get(row, 0).map(|a| a.pitch);
        let yaw_at = |col: usize| angles.get(0, col).map(|a| a.yaw);
        Self {
            pitch: (0..readings.rows())
                .filter_map(|row| centre((row..row + window).map(pitch_at)))
                .collect(),
            yaw: (0..readings.cols())
                .filter_map(|col| centre((col..col + window).map(yaw_at)))
                .collect(),
            readings: readings.to_rows(),
        }
    }
}

/// Mean of a block of angles, or `None` if the block runs off the grid.
fn centre(angles: impl Iterator<Item = Option<i32>>) -> Option<i32> {
    let mut sum = 0i64;
    let mut count = 0i64;
    for angle in angles {
        sum += i64::from(angle?);
        count += 1;
    }
    if count == 0 {
        return None;
    }
    Some((sum as f64 / count as f64).round() as i32)
}

/// Print a reading grid. `cell` renders one reading for text formats.
pub fn print_grid<T, F>(out: &GridOutput<T>, format: OutputFormat, cell: F)
where
    T: Serialize,
    F: Fn(&T) -> String,
{
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut header = vec!["PITCH \\ YAW".to_string()];
            header.extend(out.yaw.iter().map(i32::to_string));

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(header);
            for (index, row) in out.readings.iter().enumerate() {
                let mut cells = vec![label(out.pitch.get(index))];
                cells.extend(row.iter().map(&cell));
                table.add_row(cells);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for (index, row) in out.readings.iter().enumerate() {
                let cells: Vec<String> = row.iter().map(&cell).collect();
                println!("{:>5}  {}", label(out.pitch.get(index)), cells.join(" "));
            }
        }
        OutputFormat::Raw => {
            for row in &out.readings {
                let cells: Vec<String> = row.iter().map(&cell).collect();
                print_raw(&cells.join(","));
            }
        }
    }
}

fn label<T: Display>(value: Option<&T>) -> String {
    value.map(ToString::to_string).unwrap_or_default()
}

pub fn format_distance(distance: &f64) -> String {
    format!("{distance:.2}")
}

pub fn format_partial(distance: &Option<f64>) -> String {
    distance.as_ref().map_or_else(|| "-".to_string(), format_distance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_output_labels_axes() {
        let angles = Grid::from_fn(2, 3, |r, c| AnglePair::new(r as i32 * 10, c as i32 - 1));
        let readings = Grid::from_fn(2, 3, |r, c| (r * 3 + c) as f64);
        let out = GridOutput::new(&angles, &readings);

        assert_eq!(out.pitch, vec![0, 10]);
        assert_eq!(out.yaw, vec![-1, 0, 1]);
        assert_eq!(out.readings[1], vec![3.0, 4.0, 5.0]);

        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["yaw"], serde_json::json!([-1, 0, 1]));
    }

    #[test]
    fn smoothed_output_labels_block_centres() {
        let angles = Grid::from_fn(3, 4, |r, c| {
            AnglePair::new(r as i32 * 10 - 10, c as i32 * 20)
        });
        let readings = Grid::filled(2, 3, 1.0);
        let out = GridOutput::smoothed(&angles, &readings, 2);
        assert_eq!(out.pitch, vec![-5, 5]);
        assert_eq!(out.yaw, vec![10, 30, 50]);

        let odd = Grid::filled(1, 2, 1.0);
        let out = GridOutput::smoothed(&angles, &odd, 3);
        assert_eq!(out.pitch, vec![0]);
        assert_eq!(out.yaw, vec![20, 40]);
    }

    #[test]
    fn smoothing_window_of_one_keeps_cell_angles() {
        let angles = Grid::from_fn(2, 2, |r, c| AnglePair::new(r as i32, c as i32 * 3));
        let readings = Grid::filled(2, 2, 0.5);
        let out = GridOutput::smoothed(&angles, &readings, 1);
        assert_eq!(out.pitch, vec![0, 1]);
        assert_eq!(out.yaw, vec![0, 3]);
    }

    #[test]
    fn cell_formatting() {
        assert_eq!(format_distance(&35.04), "35.04");
        assert_eq!(format_partial(&None), "-");
        assert_eq!(format_partial(&Some(41.5351)), "41.54");
    }
}
