//! Pure address domain: shape matching and key normalization

pub mod address;

pub use address::{
    classify_exact, contains_address, find_addresses, normalize, short_address, AddressFamily,
    AddressMatch,
};
