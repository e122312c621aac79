pub const BIND_ADDR: &str = "127.0.0.1:8080";
pub const REFRESH_INTERVAL_SECS: u64 = 5;
pub const MOCK_LATENCY_MS: u64 = 400;
pub const DEFAULT_UNIVERSE_SIZE: usize = 500;
pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const SETTINGS_PATH: &str = "stock-dashboard.json";
pub const QUOTE_BATCH_VERSION: u32 = 1;
