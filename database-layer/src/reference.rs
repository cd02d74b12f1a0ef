use chrono::Utc;
use rand::Rng;

/// Human-facing document number: `PREFIX-YYYYMMDD-NNNNNN`
///
/// The random suffix makes collisions unlikely, not impossible; callers that
/// need uniqueness check the store and draw again.
pub fn reference_number(prefix: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{}-{}-{:06}", prefix, Utc::now().format("%Y%m%d"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_is_prefix_date_six_digits() {
        let number = reference_number("INV");
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "INV");
        assert_eq!(parts[1], Utc::now().format("%Y%m%d").to_string());
        assert_eq!(parts[2].len(), 6);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit()));
    }
}
