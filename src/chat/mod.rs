//! Conversation handling.
//!
//! A [`ChatSession`] is the per-browser (or per-terminal) state, passed by
//! reference into [`TurnEngine::run_turn`]. Personas come from configuration
//! through the [`PersonaRegistry`]. [`SessionLocks`] keeps concurrent
//! requests against one session from interleaving.

pub mod lock;
pub mod persona;
pub mod prompt;
pub mod session;
pub mod turn;

pub use lock::{SessionGuard, SessionLocks};
pub use persona::{Persona, PersonaRegistry};
pub use prompt::build_system_prompt;
pub use session::{ChatSession, SESSION_KEY};
pub use turn::{CompletedTurn, TurnEngine, TurnOutcome, TurnSettings};
