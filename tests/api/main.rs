// fn main not required
mod authorization;
mod health_check;
mod helpers;

// all api tests live in one binary (tests/api); "While each executable is
// compiled in parallel, the linking phase is instead entirely sequential!"
//
// tests/secure_erase.rs is deliberately separate: it installs its own global
// allocator, which must not leak into these tests.
