pub mod interface;
pub mod lifecycle;
pub mod sync;
pub mod types;

pub use interface::{
	AddressGenerator, AddressIndexStore, AddressOwnership, TxIndex, Wallet, WalletLoader,
};
pub use lifecycle::WalletLifecycle;
pub use sync::*;
pub use types::*;
