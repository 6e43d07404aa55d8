pub struct FileSizeUtils;

impl FileSizeUtils {
    /// Decimal units, matching how batch ceilings are configured.
    pub fn format_size(size: u64) -> String {
        const UNITS: [&str; 5] = ["B", "kB", "MB", "GB", "TB"];
        let mut value = size as f64;
        let mut unit_index = 0;

        while value >= 1000.0 && unit_index < UNITS.len() - 1 {
            value /= 1000.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size, UNITS[0])
        } else {
            format!("{:.1} {}", value, UNITS[unit_index])
        }
    }

    pub fn format_percent(fraction: f64) -> String {
        format!("{:.0}%", (fraction.clamp(0.0, 1.0) * 100.0).floor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_bytes_and_megabytes() {
        assert_eq!(FileSizeUtils::format_size(999), "999 B");
        assert_eq!(FileSizeUtils::format_size(30_000_000), "30.0 MB");
        assert_eq!(FileSizeUtils::format_size(1_500), "1.5 kB");
    }

    #[test]
    fn percent_never_rounds_up_to_done() {
        assert_eq!(FileSizeUtils::format_percent(0.999), "99%");
        assert_eq!(FileSizeUtils::format_percent(1.0), "100%");
    }
}
