//! Behavioural scenarios for `rigger create` and `rigger delete`.

mod provisioning;
