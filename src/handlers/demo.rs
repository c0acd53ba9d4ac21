//! Time-parity demo endpoint.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::http::fault::Fault;

/// `/api/hello`: succeeds on even UNIX seconds, raises a controlled fault on odd ones.
pub async fn hello() -> Result<&'static str, Fault> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?;
    hello_at(now.as_secs())
}

pub fn hello_at(unix_secs: u64) -> Result<&'static str, Fault> {
    if unix_secs % 2 == 0 {
        Ok("/hello")
    } else {
        Err(Fault::controlled_value(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_seconds_succeed() {
        assert_eq!(hello_at(1_700_000_000).unwrap(), "/hello");
    }

    #[test]
    fn odd_seconds_fault_in_a_controlled_way() {
        let fault = hello_at(1_700_000_001).unwrap_err();
        assert!(fault.is_controlled());
        assert_eq!(fault.record().message, "1");
    }
}
