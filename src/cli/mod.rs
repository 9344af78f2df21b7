//! Command-line interface definitions for the `rigger` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `rigger` binary.
///
/// Every input parses: unknown words, flags and an empty command line all
/// select [`Mode::Ignore`].
#[derive(Debug, Parser)]
#[command(
    name = "rigger",
    about = "Provision an Azure virtual machine and its network, or tear them down",
    disable_help_flag = true,
    disable_version_flag = true
)]
pub(crate) struct Cli {
    /// `create` provisions every resource and powers the machine off;
    /// `delete` removes the resource group. Anything else does nothing.
    #[arg(
        value_name = "MODE",
        num_args = 0..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub(crate) args: Vec<String>,
}

/// Action selected by the first argument.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Mode {
    /// Provision the deployment, then power off the machine.
    Create,
    /// Delete the resource group.
    Delete,
    /// Do nothing.
    Ignore,
}

impl Cli {
    /// Maps the first argument to a mode. Matching is exact and
    /// case-sensitive; later arguments are ignored.
    pub(crate) fn mode(&self) -> Mode {
        match self.args.first().map(String::as_str) {
            Some("create") => Mode::Create,
            Some("delete") => Mode::Delete,
            _ => Mode::Ignore,
        }
    }
}
