//! Serve a finite m3u8 media playlist as if it were a live stream.
//!
//! ```text
//!                    first request
//!  ┌──────────────┐ ───────────────► ┌──────────┐
//!  │  HTTP server │                  │  Slider  │  every 3s: drop head,
//!  └──────┬───────┘                  └────┬─────┘  re-append next segment
//!         │ render (read lock)            │ slide (write lock)
//!         │        ┌───────────────┐      │
//!         └───────►│ PlaylistStore │◄─────┘
//!                  └───────────────┘
//! ```
pub mod error;
pub mod playlist;
pub mod server;
pub mod slider;
pub mod store;
pub mod window;

pub use error::{LiveSimError, LiveSimResult};
pub use m3u8_rs;
pub use playlist::{decode_playlist, describe_master, load_playlist, render_media, PlaylistSource};
pub use server::{router, serve, AppState, Launch, ServerConfig};
pub use slider::{Slider, SliderHandle};
pub use store::{LivePlaylist, PlaylistStore};
pub use window::SegmentWindow;
