//! Integration tests
//!
//! `router_tests` run offline. `ledger_tests` need `DATABASE_URL` pointing at
//! a disposable Postgres server and `api_tests` a running server; both are
//! ignored by default (run with `cargo test -- --ignored`).

mod api_tests;
mod ledger_tests;
mod router_tests;
