pub mod browser;
pub mod chain;
pub mod fetch;
pub mod normalize;
pub mod patterns;
pub mod table;

pub use browser::{ChromeRenderer, PageRenderer, Renderer};
pub use chain::{ChainOutcome, ChainSettings, Strategy, StrategyChain, StrategyState};
pub use fetch::{HttpFetcher, PageFetcher};
