use chrono::Utc;
use ethers::types::U256;

use crate::consts::LOCAL_RELAYER_URL;
use crate::prelude::*;

pub(crate) fn now_unix() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

pub(crate) fn parse_decimal_u256(field: &str, value: &str) -> Result<U256> {
    let trimmed = value.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Validation(format!(
            "{field} must be a non-negative decimal string, got {value:?}"
        )));
    }
    U256::from_dec_str(trimmed)
        .map_err(|e| Error::Validation(format!("{field} is out of range: {e}")))
}

pub(crate) fn parse_decimal_u64(field: &str, value: &str) -> Result<u64> {
    let parsed = parse_decimal_u256(field, value)?;
    if parsed > U256::from(u64::MAX) {
        return Err(Error::Validation(format!("{field} is out of range: {value}")));
    }
    Ok(parsed.as_u64())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BaseUrl {
    Localhost,
    Custom(String),
}

impl BaseUrl {
    pub(crate) fn get_url(&self) -> String {
        match self {
            BaseUrl::Localhost => LOCAL_RELAYER_URL.to_string(),
            BaseUrl::Custom(url) => url.trim_end_matches('/').to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_strings_parse() {
        assert_eq!(parse_decimal_u256("value", "0").unwrap(), U256::zero());
        assert_eq!(
            parse_decimal_u256("value", "115792089237316195423570985008687907853269984665640564039457584007913129639935")
                .unwrap(),
            U256::MAX
        );
        assert_eq!(parse_decimal_u64("deadline", " 1700000000 ").unwrap(), 1_700_000_000);
    }

    #[test]
    fn decimal_strings_reject_garbage() {
        assert!(matches!(parse_decimal_u256("gas", ""), Err(Error::Validation(_))));
        assert!(matches!(parse_decimal_u256("gas", "-1"), Err(Error::Validation(_))));
        assert!(matches!(parse_decimal_u256("gas", "0x10"), Err(Error::Validation(_))));
        assert!(matches!(
            parse_decimal_u64("deadline", "18446744073709551616"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn custom_url_drops_trailing_slash() {
        assert_eq!(
            BaseUrl::Custom("https://relay.example/".to_string()).get_url(),
            "https://relay.example"
        );
        assert_eq!(BaseUrl::Localhost.get_url(), "http://localhost:3001");
    }
}
