use std::fmt;

/// Operating systems xpiup has host adapters for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
  Linux,
  MacOs,
  Windows,
}

impl Os {
  /// Detect the current operating system at runtime
  pub fn current() -> Option<Self> {
    match std::env::consts::OS {
      "linux" => Some(Self::Linux),
      "macos" => Some(Self::MacOs),
      "windows" => Some(Self::Windows),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Linux => "linux",
      Self::MacOs => "macos",
      Self::Windows => "windows",
    }
  }

  /// Program and arguments that open `url` in the default browser.
  pub fn open_command(&self, url: &str) -> (&'static str, Vec<String>) {
    match self {
      // `start` takes the first quoted argument as the window title.
      Self::Windows => (
        "cmd",
        vec!["/C".to_string(), "start".to_string(), String::new(), url.to_string()],
      ),
      Self::MacOs => ("open", vec![url.to_string()]),
      Self::Linux => ("xdg-open", vec![url.to_string()]),
    }
  }
}

impl fmt::Display for Os {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
