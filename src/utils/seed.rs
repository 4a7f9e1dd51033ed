use crate::wallet::types::WalletSyncError;

use bip39::Mnemonic;
use zeroize::Zeroizing;

const MIN_SEED_LEN: usize = 16;
const MAX_SEED_LEN: usize = 64;

/// Decode user-supplied seed input into raw seed bytes.
///
/// Accepts a hex-encoded seed of 16 to 64 bytes or a BIP39 mnemonic, in which case the seed is
/// the mnemonic's entropy (32 bytes for 24 words).
pub fn decode_seed(input: &str) -> Result<Zeroizing<Vec<u8>>, WalletSyncError> {
	let input = input.trim();
	if input.is_empty() {
		return Err(WalletSyncError::EmptySeed);
	}

	if let Ok(bytes) = hex::decode(input) {
		let bytes = Zeroizing::new(bytes);
		if !(MIN_SEED_LEN..=MAX_SEED_LEN).contains(&bytes.len()) {
			return Err(WalletSyncError::InvalidSeed(format!(
				"hex seed must be between {} and {} bytes, got {}",
				MIN_SEED_LEN,
				MAX_SEED_LEN,
				bytes.len()
			)));
		}
		return Ok(bytes);
	}

	let words = Zeroizing::new(
		input
			.split_whitespace()
			.collect::<Vec<_>>()
			.join(" ")
			.to_lowercase(),
	);
	let mnemonic = Mnemonic::parse_normalized(&words)
		.map_err(|e| WalletSyncError::InvalidSeed(e.to_string()))?;
	Ok(Zeroizing::new(mnemonic.to_entropy()))
}
