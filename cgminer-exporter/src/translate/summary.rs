//! Summary section: rig-wide share, error and hash rate totals.

use serde_json::Value;

use crate::client::Command;

use super::{TagSet, TranslateError, element, number, write_metric};

/// Metric name and `SUMMARY[0]` field, in output order.
const SUMMARY_METRICS: [(&str, &str); 7] = [
    ("cgminer_summary_rejected", "Rejected"),
    ("cgminer_summary_found_blocks", "Found Blocks"),
    ("cgminer_summary_elapsed", "Elapsed"),
    ("cgminer_summary_hardware_errors", "Hardware Errors"),
    ("cgminer_summary_total_mh", "Total MH"),
    ("cgminer_summary_ghs_average", "GHS av"),
    ("cgminer_summary_ghs_5s", "GHS 5s"),
];

/// Render the `summary` response. Lines carry the shared tags only.
pub fn render(section: &Value, tags: &TagSet, out: &mut String) -> Result<(), TranslateError> {
    let summary = element(Some(section), Command::Summary, "SUMMARY", 0)?;

    out.push_str("#Pool Summary\n");
    for (name, key) in SUMMARY_METRICS {
        let value = number(summary, Command::Summary, key)?;
        write_metric(out, name, tags.labels(), value);
    }

    Ok(())
}
