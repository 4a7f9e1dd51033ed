use std::ops::Deref;
use zeroize::Zeroize;

/// Public passphrase used when the caller supplies none.
pub const INSECURE_PUBLIC_PASSPHRASE: &[u8] = b"public";

/// Borrowed, caller-owned passphrase buffer that is zeroed when dropped.
///
/// Wrapping the buffer first thing in a function guarantees the wipe on every exit path,
/// including early returns and unwinding.
pub struct Passphrase<'a> {
	bytes: &'a mut [u8],
}

impl<'a> Passphrase<'a> {
	pub fn new(bytes: &'a mut [u8]) -> Self {
		Self { bytes }
	}

	/// The passphrase, or [`INSECURE_PUBLIC_PASSPHRASE`] if it is empty.
	pub fn or_insecure_default(&self) -> &[u8] {
		if self.bytes.is_empty() {
			INSECURE_PUBLIC_PASSPHRASE
		} else {
			self.bytes
		}
	}
}

impl Deref for Passphrase<'_> {
	type Target = [u8];

	fn deref(&self) -> &[u8] {
		self.bytes
	}
}

impl Drop for Passphrase<'_> {
	fn drop(&mut self) {
		self.bytes.zeroize();
	}
}
