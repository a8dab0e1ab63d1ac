//! Pools section: one block of lines per configured pool.

use serde_json::Value;

use crate::client::Command;
use crate::config::TranslateConfig;
use crate::mapping::{is_truthy, label_text};

use super::{TagSet, TranslateError, field, invalid, number, write_metric};

const SECONDS_PER_DAY: i64 = 86_400;

/// Render the `pools` response.
pub fn render(
    section: &Value,
    tags: &TagSet,
    config: &TranslateConfig,
    out: &mut String,
) -> Result<(), TranslateError> {
    let pools = section
        .get("POOLS")
        .and_then(Value::as_array)
        .ok_or_else(|| TranslateError::MissingField {
            section: Command::Pools.as_str(),
            field: "POOLS".to_string(),
        })?;

    out.push_str("# Pools Data\n");
    write_metric(out, "cgminer_pool_count", tags.labels(), pools.len() as f64);

    let rejected_key = if config.legacy_pool_rejected {
        "Difficulty Accepted"
    } else {
        "Rejected"
    };

    for entry in pools {
        let pool = entry
            .as_object()
            .ok_or_else(|| invalid(entry, Command::Pools, "POOLS[]"))?;

        let pool_tags = tags.with_prefix([
            ("pool", label_text(field(pool, Command::Pools, "POOL")?)),
            ("url", label_text(field(pool, Command::Pools, "URL")?)),
            (
                "stratum_url",
                label_text(field(pool, Command::Pools, "Stratum URL")?),
            ),
        ]);
        let labels = pool_tags.labels();

        let metric = |key: &str| number(pool, Command::Pools, key);

        write_metric(
            out,
            "cgminer_pool_diff_accepted",
            labels,
            metric("Difficulty Accepted")?,
        );
        write_metric(out, "cgminer_pool_rejected", labels, metric(rejected_key)?);
        write_metric(
            out,
            "cgminer_pool_diff_rejected",
            labels,
            metric("Difficulty Rejected")?,
        );
        write_metric(out, "cgminer_pool_stale", labels, metric("Stale")?);

        let last_share = pool
            .get("Last Share Time")
            .map(last_share_seconds)
            .unwrap_or(0);
        write_metric(out, "cgminer_pool_last_share", labels, last_share as f64);

        write_metric(out, "cgminer_pool_getworks", labels, metric("Getworks")?);
        write_metric(
            out,
            "cgminer_pool_last_diff",
            labels,
            metric("Last Share Difficulty")?,
        );

        let alive = field(pool, Command::Pools, "Status")?.as_str() == Some("Alive");
        write_metric(out, "cgminer_pool_status", labels, flag(alive));

        let active = is_truthy(field(pool, Command::Pools, "Stratum Active")?);
        write_metric(out, "cgminer_pool_stratum_active", labels, flag(active));
    }

    Ok(())
}

/// Seconds encoded by a `Last Share Time` of the form `HH:MM:SS`.
///
/// Anything else (including the epoch timestamps newer firmware reports)
/// yields 0. The result is reduced to a single day.
pub fn last_share_seconds(value: &Value) -> u64 {
    value.as_str().and_then(parse_hms).unwrap_or(0)
}

fn parse_hms(text: &str) -> Option<u64> {
    let parts = text
        .split(':')
        .map(|part| part.trim().parse::<i64>().ok())
        .collect::<Option<Vec<_>>>()?;

    let [hours, minutes, seconds] = parts.as_slice() else {
        return None;
    };

    let total = hours
        .checked_mul(3600)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(*seconds)?;

    Some(total.rem_euclid(SECONDS_PER_DAY) as u64)
}

fn flag(set: bool) -> f64 {
    if set { 1.0 } else { 0.0 }
}
