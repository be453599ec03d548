//! Cross-module tests: world scenarios driven through the public API and
//! randomized properties of the broad-phase and narrow-phase.
