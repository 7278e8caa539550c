//! Cross-process handshake for PLAMA agents, servers and lines.
//!
//! Participants never talk to each other directly. They coordinate through
//! files in their container folders:
//!
//! - every participant owns a `proces=` field in its own record file
//!   ([`StatusReporter`])
//! - a server announces itself by writing `gotowe.txt` ([`announce`])
//! - an agent waits for that file, sends its request, and writes the answer
//!   to its own `wyjście.txt` ([`Agent`])
//! - a line copies object A's output into object B and starts B
//!   ([`LineRoute`])
//!
//! # Handshake
//!
//! 1. **Status**: the agent sets itself `on`
//! 2. **Readiness**: poll the peer's `gotowe.txt` (bounded, status `lag`)
//! 3. **Request**: `POST /run`, falling back to the chat endpoint on 404, or
//!    drop the request into the peer folder when it carries `api.txt`
//! 4. **Retry**: one retry after a backoff, for network failures only
//! 5. **Finish**: write the output, launch the next line, status `off`
//!
//! # Example
//!
//! ```no_run
//! use plama_sync::{event_channel, Agent, HandshakeConfig};
//!
//! # async fn run() -> plama_sync::HandshakeResult<()> {
//! let (events, _rx) = event_channel();
//! let outcome = Agent::new("mapa/obiekty/agent", HandshakeConfig::default())
//!     .with_events(events)
//!     .run()
//!     .await?;
//! println!("{}", outcome.output);
//! # Ok(())
//! # }
//! ```

mod agent;
mod chain;
mod config;
mod error;
mod events;
mod launcher;
mod line;
mod readiness;
mod status;
pub mod transport;

pub use agent::{clean_output, Agent, AgentOutcome};
pub use chain::{chain_next, map_root_of, next_entry_point};
pub use config::{AgentSettings, HandshakeConfig};
pub use error::{HandshakeError, HandshakeResult};
pub use events::{event_channel, AgentEvent, EventSink};
pub use launcher::{DetachedLauncher, ProcessLauncher};
pub use line::{LineRoute, RouteMode, RouteOutcome};
pub use readiness::{announce, wait_for_readiness, ReadinessInfo};
pub use status::StatusReporter;
pub use transport::{FileDropTransport, HttpTransport, InferenceRequest, InferenceTransport};
