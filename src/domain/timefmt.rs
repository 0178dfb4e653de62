use chrono::{DateTime, Utc};

/// Render a timestamp relative to `now`, bucketed the way the timeline
/// displays it. Slight clock skew (a timestamp just ahead of `now`) renders
/// as "just now" rather than something nonsensical.
pub fn format_relative_time(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now.signed_duration_since(created_at);
    if diff.num_seconds() < 60 {
        return "just now".to_string();
    }

    let days = diff.num_days();
    if days > 1 {
        format!("{}d ago", days)
    } else if days == 1 {
        "yesterday".to_string()
    } else if diff.num_hours() >= 1 {
        format!("{}h ago", diff.num_hours())
    } else {
        format!("{}m ago", diff.num_minutes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        "2024-06-01T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_just_now() {
        let n = now();
        assert_eq!(format_relative_time(n, n), "just now");
        assert_eq!(format_relative_time(n - Duration::seconds(59), n), "just now");
    }

    #[test]
    fn test_future_timestamp_is_just_now() {
        let n = now();
        assert_eq!(format_relative_time(n + Duration::seconds(30), n), "just now");
    }

    #[test]
    fn test_minutes() {
        let n = now();
        assert_eq!(format_relative_time(n - Duration::minutes(1), n), "1m ago");
        assert_eq!(format_relative_time(n - Duration::minutes(59), n), "59m ago");
    }

    #[test]
    fn test_hours() {
        let n = now();
        assert_eq!(format_relative_time(n - Duration::hours(1), n), "1h ago");
        assert_eq!(format_relative_time(n - Duration::hours(23), n), "23h ago");
    }

    #[test]
    fn test_yesterday() {
        let n = now();
        assert_eq!(format_relative_time(n - Duration::hours(30), n), "yesterday");
    }

    #[test]
    fn test_days() {
        let n = now();
        assert_eq!(format_relative_time(n - Duration::days(3), n), "3d ago");
    }
}
