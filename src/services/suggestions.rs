use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::models::daily_log::Mood;

/// Emotion vocabulary of the external classifier. Distinct from `Mood`,
/// which is what users log; free text maps to one of these.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Anger,
    Sadness,
    Fear,
    Joy,
    Love,
}

#[derive(Debug, Deserialize)]
pub struct EmotionScore {
    pub label: Emotion,
    pub score: f64,
}

pub fn suggestions_for_emotion(emotion: Emotion) -> &'static [&'static str] {
    match emotion {
        Emotion::Anger => &[
            "Take a few deep breaths and try to relax.",
            "Go for a walk or do some physical activity.",
            "Write down what's making you angry and reflect on it.",
        ],
        Emotion::Sadness => &[
            "Reach out to a friend or loved one.",
            "Listen to your favorite music.",
            "Take some time for self-care.",
        ],
        Emotion::Fear => &[
            "Talk to someone you trust about your fears.",
            "Practice grounding techniques.",
            "Remind yourself of times you've overcome challenges.",
        ],
        Emotion::Joy => &[
            "Share your happiness with someone.",
            "Celebrate your achievements.",
            "Keep a gratitude journal.",
        ],
        Emotion::Love => &[
            "Express your feelings to someone you care about.",
            "Do something kind for yourself or others.",
            "Reflect on positive relationships in your life.",
        ],
    }
}

fn suggestions_for_mood(mood: Mood) -> &'static [&'static str] {
    match mood {
        Mood::Happy => &[
            "Share your happiness with someone.",
            "Celebrate your achievements.",
            "Keep a gratitude journal.",
        ],
        Mood::Good => &[
            "Keep doing what's working for you today.",
            "Note one thing that went well so you can repeat it.",
            "Use this momentum to tackle something you've been putting off.",
        ],
        Mood::Okay => &[
            "A short walk can shift a neutral day.",
            "Check in with yourself: is there something small weighing on you?",
            "Try doing one thing you usually enjoy, even briefly.",
        ],
        Mood::Sad => &[
            "Reach out to a friend or loved one.",
            "Listen to your favorite music.",
            "Take some time for self-care.",
        ],
        Mood::Terrible => &[
            "Be gentle with yourself today.",
            "Talk to someone you trust about how you're feeling.",
            "If these feelings persist, consider reaching out to a professional.",
        ],
    }
}

/// Keyword classification of free text, used when the external classifier is
/// unconfigured or fails. Defaults to joy, matching the original behavior.
pub fn classify_text(text: &str) -> Emotion {
    let lower = text.to_lowercase();
    if lower.contains("angry") || lower.contains("mad") {
        Emotion::Anger
    } else if lower.contains("sad") || lower.contains("down") {
        Emotion::Sadness
    } else if lower.contains("fear") || lower.contains("scared") {
        Emotion::Fear
    } else if lower.contains("love") {
        Emotion::Love
    } else {
        Emotion::Joy
    }
}

/// Candidate suggestions for a logged mood, with extras appended when the
/// notes mention recognizable themes.
pub fn build_candidates(mood: Option<Mood>, notes: &str) -> Vec<&'static str> {
    let mut candidates: Vec<&'static str> = mood
        .map(suggestions_for_mood)
        .unwrap_or(&["Take care of yourself!"])
        .to_vec();

    let lower = notes.to_lowercase();
    if lower.contains("sleep") || lower.contains("tired") {
        candidates.push("A consistent bedtime can do more for mood than almost anything else.");
    }
    if lower.contains("work") || lower.contains("stress") {
        candidates.push("Try a five-minute break away from your screen between tasks.");
    }
    if lower.contains("exercise") || lower.contains("gym") {
        candidates.push("Even ten minutes of movement counts — keep it up.");
    }
    if lower.contains("friend") || lower.contains("family") {
        candidates.push("Connection is protective; a short call goes a long way.");
    }

    candidates
}

/// Pick one suggestion uniformly at random from the candidate pool.
pub fn pick_suggestion(mood: Option<Mood>, notes: &str) -> String {
    let candidates = build_candidates(mood, notes);
    candidates
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("Take care of yourself!")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_keywords() {
        assert_eq!(classify_text("I am so ANGRY about this"), Emotion::Anger);
        assert_eq!(classify_text("feeling down lately"), Emotion::Sadness);
        assert_eq!(classify_text("I'm scared of tomorrow"), Emotion::Fear);
        assert_eq!(classify_text("I love my life"), Emotion::Love);
    }

    #[test]
    fn test_classify_defaults_to_joy() {
        assert_eq!(classify_text("just a normal day"), Emotion::Joy);
        assert_eq!(classify_text(""), Emotion::Joy);
    }

    #[test]
    fn test_every_emotion_has_suggestions() {
        for emotion in [
            Emotion::Anger,
            Emotion::Sadness,
            Emotion::Fear,
            Emotion::Joy,
            Emotion::Love,
        ] {
            assert!(!suggestions_for_emotion(emotion).is_empty());
        }
    }

    #[test]
    fn test_keyword_extras_extend_candidates() {
        let base = build_candidates(Some(Mood::Okay), "");
        let with_extra = build_candidates(Some(Mood::Okay), "stressed about work and sleep");
        assert!(with_extra.len() > base.len());
        assert!(with_extra
            .iter()
            .any(|s| s.contains("bedtime")));
    }

    #[test]
    fn test_no_mood_no_notes_has_fallback() {
        let candidates = build_candidates(None, "");
        assert_eq!(candidates, vec!["Take care of yourself!"]);
    }

    #[test]
    fn test_pick_comes_from_candidates() {
        for _ in 0..20 {
            let pick = pick_suggestion(Some(Mood::Sad), "");
            assert!(suggestions_for_mood(Mood::Sad).contains(&pick.as_str()));
        }
    }
}
