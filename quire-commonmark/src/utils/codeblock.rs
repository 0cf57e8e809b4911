/// Line-level state machine for fenced code blocks.
///
/// Every line-oriented scan in the compiler (figure detection, aside closing,
/// chapter boundaries, footnote definitions, chapter titles) threads one of
/// these through the lines it visits so that nothing inside a fence is ever
/// rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FenceState {
  /// Outside any fenced block.
  #[default]
  Normal,

  /// Inside a fence opened by `len` repetitions of `marker`.
  InFence { marker: char, len: usize },
}

impl FenceState {
  /// Create a tracker in the [`FenceState::Normal`] state.
  #[must_use]
  pub const fn new() -> Self {
    Self::Normal
  }

  /// Check if currently inside a fenced block.
  #[must_use]
  pub const fn in_fence(&self) -> bool {
    matches!(self, Self::InFence { .. })
  }

  /// Feed one line and return the state that applies to the next line.
  ///
  /// A line is literal when the state *before* it is `InFence`, or when it
  /// is itself a delimiter (see [`FenceState::is_delimiter`]).
  #[must_use]
  pub fn advance(self, line: &str) -> Self {
    let trimmed = line.trim_start();
    let Some(first) = trimmed.chars().next() else {
      return self;
    };
    if first != '`' && first != '~' {
      return self;
    }

    let run = trimmed.chars().take_while(|&c| c == first).count();
    if run < 3 {
      return self;
    }

    match self {
      Self::Normal => {
        Self::InFence {
          marker: first,
          len:    run,
        }
      },
      Self::InFence { marker, len } => {
        // A closing fence may carry nothing but whitespace after the run
        let rest = &trimmed[run * first.len_utf8()..];
        if first == marker && run >= len && rest.trim().is_empty() {
          Self::Normal
        } else {
          self
        }
      },
    }
  }

  /// Whether `line` opens or closes a fence given the current state.
  #[must_use]
  pub fn is_delimiter(self, line: &str) -> bool {
    self.advance(line).in_fence() != self.in_fence()
  }
}
