//! Integration tests for dircontacts-google
//!
//! Uses wiremock to simulate the Admin SDK, People API, token endpoint and
//! opt-out endpoint, and verifies the adapters end to end.

mod common;

mod test_client;
mod test_delegation;
mod test_directory;
mod test_optout;
mod test_people;
