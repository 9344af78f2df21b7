//! Newtypes for Resource Manager status values to avoid stringly-typed code.

use std::ops::Deref;

macro_rules! newtype {
    ($name:ident) => {
        #[derive(Clone, Debug, Eq, PartialEq)]
        pub(crate) struct $name(String);

        impl $name {
            pub(crate) fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &Self::Target {
                self.as_str()
            }
        }
    };
}

newtype!(ProvisioningState);
newtype!(PowerState);

impl ProvisioningState {
    pub(crate) fn is_succeeded(&self) -> bool {
        self.as_str().eq_ignore_ascii_case("Succeeded")
    }

    pub(crate) fn is_failed(&self) -> bool {
        self.as_str().eq_ignore_ascii_case("Failed") || self.as_str().eq_ignore_ascii_case("Canceled")
    }
}

impl PowerState {
    /// Instance view status codes look like `PowerState/stopped`.
    pub(crate) fn from_status_code(code: &str) -> Option<Self> {
        code.strip_prefix("PowerState/").map(Self::from)
    }

    pub(crate) fn is_stopped(&self) -> bool {
        matches!(self.as_str(), "stopped" | "deallocated")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Succeeded", true, false)]
    #[case("succeeded", true, false)]
    #[case("Updating", false, false)]
    #[case("Failed", false, true)]
    #[case("Canceled", false, true)]
    fn provisioning_state_classification(
        #[case] raw: &str,
        #[case] succeeded: bool,
        #[case] failed: bool,
    ) {
        let state = ProvisioningState::from(raw);
        assert_eq!(state.is_succeeded(), succeeded);
        assert_eq!(state.is_failed(), failed);
    }

    #[rstest]
    #[case("PowerState/stopped", Some(true))]
    #[case("PowerState/deallocated", Some(true))]
    #[case("PowerState/running", Some(false))]
    #[case("ProvisioningState/succeeded", None)]
    fn power_state_from_status_code(#[case] code: &str, #[case] stopped: Option<bool>) {
        let state = PowerState::from_status_code(code);
        assert_eq!(state.map(|value| value.is_stopped()), stopped);
    }
}
