//! Terminal viewer for the live calls feed served by `callfeed-server`.

/// Reconnecting WebSocket client for server frames.
pub mod client;

/// Viewer state folded from server frames.
pub mod state;

/// Ratatui widgets for the feed panel and gainers ticker.
pub mod widget;
