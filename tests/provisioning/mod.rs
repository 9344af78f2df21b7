//! Provisioning workflow scenarios backed by the recording cloud.

mod bdd_steps;
mod scenarios;
mod test_helpers;
