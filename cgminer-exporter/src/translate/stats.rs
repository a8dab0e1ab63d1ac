//! Stats section: per-sensor, per-chain and per-fan hardware readings.
//!
//! The second `STATS` element holds a flat object whose keys carry an index
//! suffix (`temp2_1`, `chain_rate6`, `fan3`, ...). Every key is checked
//! against every category, so a single key may emit lines for more than one.
//! Fan and frequency readings must be numeric; a key such as `fan_mode` with
//! a text value fails the render.

use serde_json::{Map, Value};

use crate::client::Command;
use crate::mapping::is_truthy;

use super::{TagSet, TranslateError, element, field, invalid, number, numeric, write_metric};

/// Render the `stats` response.
pub fn render(section: &Value, tags: &TagSet, out: &mut String) -> Result<(), TranslateError> {
    let stats = element(Some(section), Command::Stats, "STATS", 1)?;

    out.push_str("# Stats\n");
    for (key, value) in stats {
        if key.contains("temp") {
            let index = key.replace("temp", "");
            let reading = temperature(key, value)?;
            let labels = tags.with_prefix([("temp", index)]);
            write_metric(out, "cgminer_stats_temp", labels.labels(), reading);
        }

        if key.contains("chain_hw") {
            let index = key.replace("chain_hw", "");
            render_chain(stats, &index, value, tags, out)?;
        }

        if key.contains("fan") {
            let index = key.replace("fan", "");
            let speed = numeric(value, Command::Stats, key)?;
            let labels = tags.with_prefix([("fan", index)]);
            write_metric(out, "cgminer_stats_fan", labels.labels(), speed);
        }

        if key.contains("freq_avg") {
            let index = key.replace("freq_avg", "");
            let frequency = numeric(value, Command::Stats, key)?;
            let labels = tags.with_prefix([("freq", index)]);
            write_metric(out, "cgminer_stats_freq", labels.labels(), frequency);
        }
    }

    let frequency = number(stats, Command::Stats, "frequency")?;
    write_metric(out, "cgminer_stats_frequency", tags.labels(), frequency);

    Ok(())
}

/// Emit rate, active chip count and hardware errors for one chain.
fn render_chain(
    stats: &Map<String, Value>,
    index: &str,
    hw_errors: &Value,
    tags: &TagSet,
    out: &mut String,
) -> Result<(), TranslateError> {
    let chain_tags = tags.with_prefix([("chain", index)]);
    let labels = chain_tags.labels();

    let rate_key = format!("chain_rate{}", index);
    let rate = match stats.get(&rate_key) {
        Some(rate) if is_truthy(rate) => numeric(rate, Command::Stats, &rate_key)?,
        _ => 0.0,
    };
    write_metric(out, "cgminer_stats_chain_rate", labels, rate);

    let acn_key = format!("chain_acn{}", index);
    let acn = numeric(field(stats, Command::Stats, &acn_key)?, Command::Stats, &acn_key)?;
    write_metric(out, "cgminer_stats_chain_acn", labels, acn);

    let hw_key = format!("chain_hw{}", index);
    let hw = numeric(hw_errors, Command::Stats, &hw_key)?;
    write_metric(out, "cgminer_stats_chain_hw", labels, hw);

    Ok(())
}

/// A temperature reading. Strings of `-`-separated integers (per-chip
/// readings such as `"45-52-49"`) collapse to their maximum.
fn temperature(key: &str, value: &Value) -> Result<f64, TranslateError> {
    match value {
        Value::String(text) => {
            max_of_range(text).ok_or_else(|| invalid(value, Command::Stats, key))
        }
        other => numeric(other, Command::Stats, key),
    }
}

/// The largest integer in a `-`-separated list.
pub fn max_of_range(text: &str) -> Option<f64> {
    text.split('-')
        .map(|part| part.trim().parse::<i64>().ok())
        .collect::<Option<Vec<_>>>()?
        .into_iter()
        .max()
        .map(|max| max as f64)
}
