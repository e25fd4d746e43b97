//! Host capabilities injected into the collector.
//!
//! # Data Flow
//! ```text
//! host
//!     → clock.rs     (current time: recency windows, throttle expiry)
//!     → settings.rs  (opaque key-value configuration lookup)
//!     → identity.rs  (current credential or its absence)
//!     → network.rs   (url, method, headers → status, body | transport error)
//!     → session.rs   (session-scoped persisted strings)
//! ```
//!
//! # Design Decisions
//! - Every capability is a trait object so tests inject deterministic fakes
//! - Production implementations live next to their trait
//! - Nothing here knows about checks or error entries

pub mod clock;
pub mod identity;
pub mod network;
pub mod session;
pub mod settings;

pub use clock::{Clock, ManualClock, SystemClock};
pub use identity::{AnonymousIdentity, Identity, IdentityProvider, StaticIdentity};
pub use network::{HttpRequest, HttpResponse, Method, Network, ReqwestNetwork, TransportError};
pub use session::{FileSessionStore, MemorySessionStore, SessionStore};
pub use settings::{EnvSettings, MapSettings, Settings};
