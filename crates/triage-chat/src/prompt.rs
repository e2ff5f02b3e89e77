//! Prompt construction for persona replies and free-form consultations.

use triage_core::SpecialistProfile;

use crate::generator::GenerationRequest;

/// Number of scope keywords the persona is told it may discuss.
pub const MAX_PROMPT_TOPICS: usize = 6;

const PERSONA_CUE: &str = "Your SHORT response (max 25 words):";

const CONSULTATION_CUE: &str = "Please provide helpful guidance, possible considerations, and recommended next steps. Remember to be empathetic and thorough while encouraging professional medical consultation.";

const CONSULTATION_GUIDELINES: &str = "\
You are a friendly and knowledgeable healthcare advisor based in Rwanda. You provide helpful medical guidance while always encouraging users to seek professional medical care when needed.

IMPORTANT GUIDELINES:
1. Always be empathetic, warm, and professional
2. Provide general health information and guidance
3. Never diagnose conditions, only suggest possibilities
4. Always recommend consulting a healthcare professional for serious symptoms
5. Reference Rwandan healthcare resources when relevant (hospitals, clinics in Kigali)
6. Respond in clear, simple English that's easy to understand
7. If someone describes emergency symptoms, urge them to go to the nearest hospital immediately

CONTEXT: You are serving patients in Rwanda, primarily in Kigali. Common health concerns include malaria, respiratory infections, and general wellness questions.

DISCLAIMER TO INCLUDE: Always end your response with a brief note that this is AI-powered guidance and not a replacement for professional medical consultation.";

/// Standing rules for a persona turn.
fn persona_instructions(language: &str) -> String {
    format!(
        "STRICT RULES:
- Respond ONLY in {language}
- Do NOT recommend or mention any medicines
- Keep responses SHORT (1-2 sentences only)
- NEVER say \"Hello\", \"Hi\", or greetings after the first message
- Ask only ONE follow-up question at a time
- Be caring but concise

CONVERSATION FLOW (ask 4-7 questions total):
1. Ask how long they have had the symptoms
2. Ask about severity (1-10)
3. Ask what triggers or worsens it
4. Ask about related symptoms
5. Ask about previous treatments
6. After 5+ questions, ask \"Is there anything else you'd like to share?\"
7. When the patient says no, nothing else, that's all, or done, respond: \"Thank you for sharing. Click 'Get Prescription' to download your medical report.\""
    )
}

/// Note added to the prompt when the message belongs to another specialist.
pub fn referral_note(
    current: &SpecialistProfile,
    recommended: &SpecialistProfile,
    general_key: &str,
) -> String {
    if current.key == general_key {
        format!(
            "NOTE: The patient's symptoms suggest they may benefit from seeing our {title}. \
             After providing initial advice, mention that you recommend they also consult \
             with the {title} for specialized care. Include this referral suggestion \
             naturally in your response.",
            title = recommended.title
        )
    } else {
        format!(
            "NOTE: These symptoms are slightly outside your specialty. Provide what help you \
             can, but mention that you recommend seeing our {} for more specialized care \
             related to these specific symptoms.",
            recommended.title
        )
    }
}

/// Request for one persona reply in a specialist consultation.
pub fn persona_request(
    profile: &SpecialistProfile,
    message: &str,
    language: &str,
    note: Option<&str>,
) -> GenerationRequest {
    let mut instructions = persona_instructions(language);
    if let Some(note) = note {
        instructions.push_str("\n\n");
        instructions.push_str(note);
    }

    GenerationRequest {
        persona_title: profile.title.clone(),
        allowed_topics: profile
            .scope
            .iter()
            .take(MAX_PROMPT_TOPICS)
            .cloned()
            .collect(),
        instructions,
        patient_message: message.to_string(),
        response_cue: PERSONA_CUE.to_string(),
    }
}

/// Request for a single-shot guidance answer to a spoken transcript.
pub fn consultation_request(transcript: &str) -> GenerationRequest {
    GenerationRequest {
        persona_title: "Kigali AI Medical Assistant".to_string(),
        allowed_topics: Vec::new(),
        instructions: CONSULTATION_GUIDELINES.to_string(),
        patient_message: transcript.to_string(),
        response_cue: CONSULTATION_CUE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_core::config::default_specialists;

    fn profile(key: &str) -> SpecialistProfile {
        default_specialists()
            .into_iter()
            .find(|p| p.key == key)
            .unwrap()
    }

    #[test]
    fn test_persona_request_limits_topics() {
        let eye = profile("eye");
        let request = persona_request(&eye, "my eye hurts", "English", None);
        assert_eq!(request.persona_title, "Eye Doctor");
        assert_eq!(request.allowed_topics.len(), MAX_PROMPT_TOPICS);
        assert_eq!(request.allowed_topics[0], "eye");
        assert_eq!(request.allowed_topics, eye.scope[..MAX_PROMPT_TOPICS].to_vec());
    }

    #[test]
    fn test_persona_prompt_carries_rules() {
        let prompt = persona_request(&profile("eye"), "my eye hurts", "Kinyarwanda", None).render();
        assert!(prompt.contains("Respond ONLY in Kinyarwanda"));
        assert!(prompt.contains("Do NOT recommend or mention any medicines"));
        assert!(prompt.contains("Ask only ONE follow-up question at a time"));
        assert!(prompt.contains("Ask about severity (1-10)"));
        assert!(prompt.contains("Ask about previous treatments"));
        assert!(prompt.contains("Patient says: \"my eye hurts\""));
        assert!(!prompt.contains("NOTE:"));
    }

    #[test]
    fn test_short_scope_uses_all_topics() {
        let small = SpecialistProfile::new("skin", "Skin Doctor", &["rash"], &[]);
        let request = persona_request(&small, "a rash", "English", None);
        assert_eq!(request.allowed_topics, vec!["rash".to_string()]);
    }

    #[test]
    fn test_referral_note_from_general_persona() {
        let note = referral_note(&profile("general"), &profile("eye"), "general");
        assert!(note.contains("benefit from seeing our Eye Doctor"));
        assert!(note.contains("also consult with the Eye Doctor"));
    }

    #[test]
    fn test_referral_note_from_specialist_persona() {
        let note = referral_note(&profile("eye"), &profile("orthopedic"), "general");
        assert!(note.contains("slightly outside your specialty"));
        assert!(note.contains("seeing our Bone Doctor"));
    }

    #[test]
    fn test_note_is_appended_to_instructions() {
        let note = referral_note(&profile("eye"), &profile("digestive"), "general");
        let request = persona_request(&profile("eye"), "nausea", "English", Some(&note));
        assert!(request.instructions.ends_with(&note));
    }

    #[test]
    fn test_consultation_request() {
        let request = consultation_request("I have had malaria symptoms");
        assert!(request.allowed_topics.is_empty());
        let prompt = request.render();
        assert!(prompt.starts_with("You are Kigali AI Medical Assistant."));
        assert!(prompt.contains("Never diagnose conditions"));
        assert!(prompt.contains("AI-powered guidance"));
        assert!(prompt.contains("\"I have had malaria symptoms\""));
    }
}
