use std::fmt;

/// AudioDeviceName is one entry of the playout or recording device list.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct AudioDeviceName {
    pub index: u16,
    pub name: String,
    pub guid: String,
}

impl fmt::Display for AudioDeviceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} {}", self.index, self.name, self.guid)
    }
}
