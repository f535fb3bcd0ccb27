//! Identifier minting and checking

use bech32::Bech32m;
use uuid7::uuid7;

/// Mint a fresh uuid7 and encode it as bech32m under `hrp`, e.g. `leave_1...`
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

/// True when `id` is a well formed bech32 string under `hrp` carrying a 16 byte uuid.
pub fn is_bech32_uuid(id: &str, hrp: &str) -> bool {
    match bech32::decode(id) {
        Ok((decoded, payload)) => {
            decoded.as_str().eq_ignore_ascii_case(hrp) && payload.len() == 16
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_ids_check_against_their_prefix() {
        let id = new_uuid_to_bech32("leave_").unwrap();

        assert!(id.starts_with("leave_1"));
        assert!(is_bech32_uuid(&id, "leave_"));
        assert!(!is_bech32_uuid(&id, "emp_"));
    }

    #[test]
    fn garbage_is_not_an_id() {
        assert!(!is_bech32_uuid("leave_1notreallyanid", "leave_"));
        assert!(!is_bech32_uuid("", "leave_"));
    }
}
