pub mod dice;
pub mod functions;
pub mod games;
pub mod postprocess;
pub mod profile;
pub mod prompt;
pub mod router;

pub use dice::{Dice, SequenceDice, ThreadDice};
pub use profile::PersonaProfile;
pub use router::{MessageRouter, RouteAction, RouteOutcome, RouterLimits};
