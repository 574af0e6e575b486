use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use scanlink_transport::{available_candidates, DeviceMatcher, PortCandidate};
use serde::Serialize;

use crate::cmd::PortsArgs;
use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::{print_json, print_raw, OutputFormat};

#[derive(Serialize, Debug, PartialEq)]
struct PortEntry {
    port: String,
    description: Option<String>,
    manufacturer: Option<String>,
    usb_id: Option<String>,
    /// Discovery rank, lower is preferred. `None` means discovery skips it.
    rank: Option<u32>,
}

pub fn run(args: PortsArgs, format: OutputFormat) -> CliResult<i32> {
    let candidates =
        available_candidates().map_err(|err| transport_error("port enumeration failed", err))?;
    let entries = rank_entries(candidates, &DeviceMatcher::default(), args.all);
    print_ports(&entries, format);
    Ok(SUCCESS)
}

fn rank_entries(
    candidates: Vec<PortCandidate>,
    matcher: &DeviceMatcher,
    include_rejected: bool,
) -> Vec<PortEntry> {
    let mut entries: Vec<PortEntry> = candidates
        .into_iter()
        .map(|candidate| PortEntry {
            rank: matcher.score(&candidate),
            usb_id: candidate
                .usb_id
                .map(|(vid, pid)| format!("{vid:04x}:{pid:04x}")),
            port: candidate.port,
            description: candidate.description,
            manufacturer: candidate.manufacturer,
        })
        .filter(|entry| include_rejected || entry.rank.is_some())
        .collect();
    // Stable sort keeps enumeration order within a rank; rejected ports last.
    entries.sort_by_key(|entry| entry.rank.unwrap_or(u32::MAX));
    entries
}

fn print_ports(entries: &[PortEntry], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(entries),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PORT", "RANK", "DESCRIPTION", "MANUFACTURER", "USB ID"]);
            for entry in entries {
                table.add_row(vec![
                    entry.port.clone(),
                    entry.rank.map_or_else(|| "-".to_string(), |r| r.to_string()),
                    entry.description.clone().unwrap_or_default(),
                    entry.manufacturer.clone().unwrap_or_default(),
                    entry.usb_id.clone().unwrap_or_default(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            if entries.is_empty() {
                println!("no candidate ports found");
            }
            for entry in entries {
                println!(
                    "{} rank={} description={}",
                    entry.port,
                    entry.rank.map_or_else(|| "-".to_string(), |r| r.to_string()),
                    entry.description.as_deref().unwrap_or("-"),
                );
            }
        }
        OutputFormat::Raw => {
            for entry in entries {
                print_raw(&entry.port);
            }
        }
    }
}
