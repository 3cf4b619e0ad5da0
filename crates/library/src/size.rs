//! Human-readable byte sizes.

const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Format `bytes` in binary units, rounded to at most two decimal places.
///
/// ```
/// use keepr_library::format_size;
///
/// assert_eq!(format_size(0), "0 Bytes");
/// assert_eq!(format_size(1536), "1.5 KB");
/// assert_eq!(format_size(1_048_576), "1 MB");
/// ```
///
/// Anything from 1 TiB upwards is still given in GB.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let exponent = (bytes.ilog2() / 10).min(UNITS.len() as u32 - 1);
    #[allow(clippy::cast_precision_loss)]
    let scaled = bytes as f64 / 1024_f64.powi(exponent as i32);
    let rounded = (scaled * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[exponent as usize])
}
