use std::io::{self, Write};

use serde::Serialize;

use crate::app::RunReport;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report(report: &RunReport) -> io::Result<()> {
        Self::print_json(report)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub struct HumanOutput;

impl HumanOutput {
    pub fn print_report(report: &RunReport) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        Self::write_report(&mut stdout, report)
    }

    pub fn write_report<W: Write>(out: &mut W, report: &RunReport) -> io::Result<()> {
        let metrics = &report.metrics;
        writeln!(out, "webmentions summary")?;
        writeln!(out, "  fetched:        {}", report.fetched)?;
        writeln!(out, "  unique senders: {}", metrics.all_senders.len())?;
        writeln!(out, "  max id:         {}", metrics.max_id)?;
        if let (Some(earliest), Some(latest)) = (metrics.earliest_received, metrics.latest_received)
        {
            writeln!(out, "  received:       {earliest} .. {latest}")?;
        }
        for group in &report.groups {
            writeln!(
                out,
                "  {} +{} ({} total)",
                group.path, group.inserted, group.total
            )?;
        }
        Ok(())
    }
}
