//! Article sources.
//!
//! | Source    | Module  | Method                | Notes                    |
//! |-----------|---------|-----------------------|--------------------------|
//! | NYT       | [`nyt`] | Top Stories API       | Requires `NYT_API_KEY`   |
//! | Bloomberg | [`rss`] | RSS feeds             | markets, technology, politics |
//! | Economist | [`rss`] | RSS feeds             | finance, business, science |
//! | Guardian  | [`rss`] | RSS feeds             | Only when configured     |
//!
//! Every source is fetched sequentially and any failure aborts the run. Bad
//! entries inside an otherwise readable feed are skipped one at a time.

pub mod nyt;
pub mod rss;
