use super::error::SoundError;
use async_trait::async_trait;

#[async_trait(?Send)]
pub trait SoundPlayer {
    async fn play(&self) -> Result<(), SoundError>;
}

/// Plays a sound file through a page-level `Audio` element.
///
/// The element is created once and reused so back-to-back snapshots do not
/// stack up players.
pub struct EvalSound {
    src: String,
}

impl EvalSound {
    pub fn new(src: impl Into<String>) -> Self {
        Self { src: src.into() }
    }

    fn script(&self) -> String {
        let src = &self.src;
        format!(
            r#"
            try {{
              let a = window.__adminbell_audio;
              if (!a || a.__src !== {src:?}) {{
                a = new Audio({src:?});
                a.__src = {src:?};
                window.__adminbell_audio = a;
              }}
              a.currentTime = 0;
              await a.play();
              return "";
            }} catch (e) {{
              return String((e && e.message) || e || "play() rejected");
            }}
            "#
        )
    }
}

#[async_trait(?Send)]
impl SoundPlayer for EvalSound {
    async fn play(&self) -> Result<(), SoundError> {
        let outcome = dioxus::document::eval(&self.script())
            .join::<String>()
            .await
            .map_err(|e| SoundError::Rejected(e.to_string()))?;

        if outcome.is_empty() {
            Ok(())
        } else {
            Err(SoundError::Rejected(outcome))
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Counts playback attempts; optionally refuses them all.
    #[derive(Default, Clone)]
    pub struct CountingSound {
        attempts: Rc<Cell<usize>>,
        reject: Rc<Cell<bool>>,
    }

    impl CountingSound {
        pub fn attempts(&self) -> usize {
            self.attempts.get()
        }

        pub fn reject_all(&self) {
            self.reject.set(true);
        }
    }

    #[async_trait(?Send)]
    impl SoundPlayer for CountingSound {
        async fn play(&self) -> Result<(), SoundError> {
            self.attempts.set(self.attempts.get() + 1);
            if self.reject.get() {
                return Err(SoundError::Rejected("NotAllowedError".to_string()));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_quotes_the_source() {
        let s = EvalSound::new("/admin/assets/sounds/notification.wav").script();
        assert!(s.contains(r#"new Audio("/admin/assets/sounds/notification.wav")"#));
        assert!(s.contains("await a.play()"));
    }
}
