use chrono::Utc;
use uuid::Uuid;

/// Current UTC instant as an ISO-8601 string without a zone suffix,
/// the format stored in prediction and spin records.
pub fn utc_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Current UTC calendar day, e.g. "2025-04-01". Spin limits are scoped to this.
pub fn utc_today() -> String {
    Utc::now().date_naive().to_string()
}

/// Short shareable referral code: eight uppercase hex characters.
pub fn generate_referral_code() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referral_codes_are_short_and_uppercase() {
        let code = generate_referral_code();
        assert_eq!(code.len(), 8);
        assert_eq!(code, code.to_uppercase());
    }

    #[test]
    fn today_is_a_plain_date() {
        let today = utc_today();
        assert_eq!(today.len(), 10);
        assert_eq!(&today[4..5], "-");
    }

    #[test]
    fn timestamps_carry_a_time_component() {
        assert!(utc_timestamp().contains('T'));
    }
}
