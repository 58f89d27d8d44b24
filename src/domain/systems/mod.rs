// Game-mode systems. Each one is a set of free functions (or a small stateful
// scheduler) over `MatchState` and the platform port.

pub mod markers;
pub mod ranking;
pub mod roster;
pub mod scoring;
pub mod selection;
pub mod vip;
