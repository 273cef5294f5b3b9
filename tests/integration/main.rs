//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a slice of the controller
//! against mock adapters.  All tests run on the host (x86_64) with no real
//! hardware required.

mod extraction_tests;
mod mock_hw;
mod persistence_tests;
mod rectification_tests;
mod safety_tests;
