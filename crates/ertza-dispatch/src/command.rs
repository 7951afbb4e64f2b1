use std::fmt;

/// A command produced by a transport and routed by alias.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Command {
    /// Handler alias, e.g. `machine/set`.
    pub alias: String,
    /// Positional arguments following the alias.
    pub args: Vec<String>,
    /// Transport the command arrived on.
    pub sender: Option<String>,
    /// Addressee, when the transport carries one.
    pub receiver: Option<String>,
}

impl Command {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            ..Self::default()
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn with_receiver(mut self, receiver: impl Into<String>) -> Self {
        self.receiver = Some(receiver.into());
        self
    }

    /// Argument at `index`, if present.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.alias)?;
        for arg in &self.args {
            write!(f, ":{arg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_every_field() {
        let cmd = Command::new("machine/set")
            .with_args(["velocity_ref", "3.0"])
            .with_sender("serial")
            .with_receiver("drive");

        assert_eq!(cmd.alias, "machine/set");
        assert_eq!(cmd.arg(1), Some("3.0"));
        assert_eq!(cmd.arg(2), None);
        assert_eq!(cmd.sender.as_deref(), Some("serial"));
        assert_eq!(cmd.receiver.as_deref(), Some("drive"));
    }

    #[test]
    fn display_uses_wire_layout() {
        let cmd = Command::new("machine/get").with_args(["torque_ref"]);
        assert_eq!(cmd.to_string(), "machine/get:torque_ref");
    }
}
