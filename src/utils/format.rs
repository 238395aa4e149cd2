//! Elapsed-time formatting

/// Format a second count as zero-padded `HH:MM:SS`. Hours do not wrap at 24.
pub fn format_time(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0), "00:00:00");
        assert_eq!(format_time(59), "00:00:59");
        assert_eq!(format_time(3600), "01:00:00");
        assert_eq!(format_time(3661), "01:01:01");
    }

    #[test]
    fn test_hours_do_not_wrap() {
        assert_eq!(format_time(90_000), "25:00:00");
        assert_eq!(format_time(360_000 + 59), "100:00:59");
    }
}
