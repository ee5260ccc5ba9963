// Adapters layer: concrete implementations for external systems (storage, http, browser).

pub mod amap;
#[cfg(feature = "browser")]
pub mod chrome;
pub mod storage;

pub use amap::AmapClient;
#[cfg(feature = "browser")]
pub use chrome::ChromeDriver;
pub use storage::LocalStorage;
