use crate::spec::CommandSpec;
use serde::{Deserialize, Serialize};

/// How mutating commands obtain root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privilege {
    /// Graphical polkit prompt.
    #[default]
    Pkexec,
    /// Non-interactive sudo; fails instead of prompting.
    Sudo,
    /// Already running as root.
    None,
}

impl Privilege {
    pub fn wrap(self, spec: CommandSpec) -> CommandSpec {
        match self {
            Privilege::Pkexec => spec.prefixed("pkexec", &[]),
            Privilege::Sudo => spec.prefixed("sudo", &["-n"]),
            Privilege::None => spec,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_variants() {
        let base = || CommandSpec::new("systemctl").args(["enable", "icenet-thermal"]);
        assert_eq!(
            Privilege::Pkexec.wrap(base()).argv(),
            vec!["pkexec", "systemctl", "enable", "icenet-thermal"]
        );
        assert_eq!(
            Privilege::Sudo.wrap(base()).argv(),
            vec!["sudo", "-n", "systemctl", "enable", "icenet-thermal"]
        );
        assert_eq!(
            Privilege::None.wrap(base()).argv(),
            vec!["systemctl", "enable", "icenet-thermal"]
        );
    }
}
