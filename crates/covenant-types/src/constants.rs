//! System-wide constants for the Covenant escrow engine.

/// Fractional decimal places of the accepted asset (6, USDC-style).
pub const AMOUNT_DECIMALS: u32 = 6;

/// Smallest units per whole unit of the accepted asset.
pub const UNITS_PER_WHOLE: u128 = 1_000_000;

/// Basis-point denominator (10 000 bps = 100%).
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Default platform fee charged on every payout, in basis points (1%).
pub const DEFAULT_PLATFORM_FEE_BPS: u32 = 100;

/// Default arbiter fee charged on dispute resolution, in basis points (2%).
pub const DEFAULT_ARBITER_FEE_BPS: u32 = 200;

/// Maximum invoice title length in bytes.
pub const MAX_TITLE_LEN: usize = 256;

/// Maximum dispute reason length in bytes.
pub const MAX_DISPUTE_REASON_LEN: usize = 1024;

/// Byte length of a [`crate::Principal`].
pub const PRINCIPAL_LEN: usize = 20;

/// Domain separator mixed into every event-chain digest.
pub const EVENT_CHAIN_DOMAIN: &[u8] = b"covenant:event:v1:";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Covenant";
