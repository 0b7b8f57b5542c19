//! Address shape matching and lookup-key normalization
//!
//! Matching is shape-only: no checksum or chain-specific validation happens
//! here. Three families are recognized and, when several shapes could start
//! at the same position, the first alternative wins (EVM, then Bitcoin-like,
//! then Solana-like).

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// Address family recognized by shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    Evm,
    BitcoinLike,
    SolanaLike,
}

impl AddressFamily {
    pub const ALL: [AddressFamily; 3] = [
        AddressFamily::Evm,
        AddressFamily::BitcoinLike,
        AddressFamily::SolanaLike,
    ];

    pub fn title(self) -> &'static str {
        match self {
            AddressFamily::Evm => "EVM",
            AddressFamily::BitcoinLike => "Bitcoin",
            AddressFamily::SolanaLike => "Solana",
        }
    }

    fn exact_re(self) -> &'static Regex {
        match self {
            AddressFamily::Evm => evm_exact_re(),
            AddressFamily::BitcoinLike => btc_exact_re(),
            AddressFamily::SolanaLike => sol_exact_re(),
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// One address-shaped span inside a text blob (byte offsets)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressMatch {
    pub start: usize,
    pub end: usize,
    pub family: AddressFamily,
}

impl AddressMatch {
    pub fn as_str<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }
}

// --- Static Regex Definitions ---

const EVM_BODY: &str = r"0x[a-fA-F0-9]{40}";
const BTC_BODY: &str = r"(?:bc1|[13])[a-zA-HJ-NP-Z0-9]{25,59}";
const SOL_BODY: &str = r"[1-9A-HJ-NP-Za-km-z]{32,44}";

static SCAN_RE: OnceLock<Regex> = OnceLock::new();
static EVM_EXACT_RE: OnceLock<Regex> = OnceLock::new();
static BTC_EXACT_RE: OnceLock<Regex> = OnceLock::new();
static SOL_EXACT_RE: OnceLock<Regex> = OnceLock::new();

fn compile(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(re) => re,
        // Patterns are compile-time constants covered by the tests below.
        Err(err) => panic!("invalid built-in address pattern {pattern}: {err}"),
    }
}

// Only ASCII letters and digits glue onto an address; CJK or accented text does not.
const ASCII_BOUNDARY: &str = r"(?-u:\b)";

fn scan_re() -> &'static Regex {
    SCAN_RE.get_or_init(|| {
        compile(&format!(
            r"(?P<evm>{B}{EVM_BODY}{B})|(?P<btc>{B}{BTC_BODY}{B})|(?P<sol>{B}{SOL_BODY}{B})",
            B = ASCII_BOUNDARY
        ))
    })
}

fn evm_exact_re() -> &'static Regex {
    EVM_EXACT_RE.get_or_init(|| compile(r"(?i)^0x[a-f0-9]{40}$"))
}

fn btc_exact_re() -> &'static Regex {
    BTC_EXACT_RE.get_or_init(|| compile(&format!("^{BTC_BODY}$")))
}

fn sol_exact_re() -> &'static Regex {
    SOL_EXACT_RE.get_or_init(|| compile(&format!("^{SOL_BODY}$")))
}

// --- Matching ---

/// All non-overlapping address-shaped spans, scanning left to right.
pub fn find_addresses(text: &str) -> Vec<AddressMatch> {
    scan_re()
        .captures_iter(text)
        .filter_map(|caps| {
            let (family, m) = if let Some(m) = caps.name("evm") {
                (AddressFamily::Evm, m)
            } else if let Some(m) = caps.name("btc") {
                (AddressFamily::BitcoinLike, m)
            } else {
                (AddressFamily::SolanaLike, caps.name("sol")?)
            };
            Some(AddressMatch {
                start: m.start(),
                end: m.end(),
                family,
            })
        })
        .collect()
}

/// Quick pre-check used before doing any DOM work on a text node.
pub fn contains_address(text: &str) -> bool {
    scan_re().is_match(text)
}

/// Strict single-value validation for user selections.
///
/// The whole trimmed value must match one family; families are tried in
/// order and the first match wins.
pub fn classify_exact(value: &str) -> Option<AddressFamily> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    AddressFamily::ALL
        .into_iter()
        .find(|family| family.exact_re().is_match(value))
}

/// Canonical lookup key for an address.
///
/// EVM addresses are case-insensitive and fold to lowercase. Every other
/// family keeps its casing, which may carry meaning.
pub fn normalize(address: &str) -> String {
    if evm_exact_re().is_match(address) {
        address.to_lowercase()
    } else {
        address.to_string()
    }
}

/// Compact `0x1234..abcd` form for listings.
pub fn short_address(value: &str) -> String {
    let value = value.trim();
    if value.chars().count() <= 12 {
        return value.to_string();
    }
    let start: String = value.chars().take(6).collect();
    let end: String = value
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("{}..{}", start, end)
}
