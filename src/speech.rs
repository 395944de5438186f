//! Voice interface seams
//!
//! The study context never talks to audio hardware directly; callers plug
//! in whatever capture/playback backend they have. Text flows through the
//! rest of the pipeline identically whether it was typed or spoken.

/// Speech-to-text capture. Returns None on silence or timeout; "no speech"
/// is an expected outcome, not an error.
pub trait Transcriber: Send + Sync {
    fn listen(&self, timeout_secs: u64) -> Option<String>;
}

/// Text-to-speech playback, fire-and-forget. Returns false when the
/// backend could not speak; callers carry on regardless.
pub trait Synthesizer: Send + Sync {
    fn speak(&self, text: &str) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedTranscriber(Option<String>);

    impl Transcriber for CannedTranscriber {
        fn listen(&self, _timeout_secs: u64) -> Option<String> {
            self.0.clone()
        }
    }

    struct SilentSynthesizer;

    impl Synthesizer for SilentSynthesizer {
        fn speak(&self, _text: &str) -> bool {
            true
        }
    }

    #[test]
    fn test_trait_objects_compose() {
        let t: Box<dyn Transcriber> = Box::new(CannedTranscriber(Some("what is gravity".to_string())));
        let s: Box<dyn Synthesizer> = Box::new(SilentSynthesizer);

        assert_eq!(t.listen(5).as_deref(), Some("what is gravity"));
        assert!(s.speak("Gravity pulls objects together."));
    }

    #[test]
    fn test_silence_is_none_not_error() {
        let t = CannedTranscriber(None);
        assert!(t.listen(5).is_none());
    }
}
