//! Human-readable byte counts.

const UNITS: [&str; 9] = ["bytes", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Formats a byte count on the 1024-based ladder, e.g. `"1.5 KB"`.
///
/// Plain byte counts stay integral (`"5 bytes"`), everything larger gets one
/// decimal place.
pub fn human_size(size: u64) -> String {
    match size {
        0 => return "0 bytes".to_string(),
        1 => return "1 byte".to_string(),
        _ => {}
    }

    // floor(log2(size)) is exact for integers, no float log needed.
    let log2 = 63 - size.leading_zeros() as usize;
    let order = (log2 / 10).min(UNITS.len() - 1);
    if order == 0 {
        return format!("{} {}", size, UNITS[0]);
    }

    let value = size as f64 / 1024f64.powi(order as i32);
    format!("{:.1} {}", value, UNITS[order])
}
