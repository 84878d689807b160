//! Unit tests for the binding stores.
//!
//! The interaction cycle is checked against both variants through the
//! shared trait; variant tests cover representation details.

mod sg_tests;
