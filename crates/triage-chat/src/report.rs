//! Plain-text prescription report.

use chrono::{DateTime, TimeZone};
use serde::Serialize;
use triage_core::config::ReportConfig;
use triage_core::{ConversationTurn, SpecialistProfile};

use crate::session::ConsultationSession;

const WIDTH: usize = 50;
const EMPTY_SECTION: &str = "None recorded";

/// A rendered report and its download filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrescriptionReport {
    pub text: String,
    pub filename: String,
}

impl PrescriptionReport {
    /// Render a report from the turns of one consultation.
    ///
    /// Consultation notes skip the persona's opening line and any reply
    /// that suggested another specialist.
    pub fn render<Tz>(
        profile: &SpecialistProfile,
        turns: &[ConversationTurn],
        config: &ReportConfig,
        now: DateTime<Tz>,
    ) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let opening = profile.opening_line();

        let symptoms = bullets(turns.iter().filter(|t| t.is_patient()).map(|t| t.content.as_str()));
        let notes = bullets(
            turns
                .iter()
                .filter(|t| !t.is_patient() && t.referral.is_none() && t.content != opening)
                .map(|t| t.content.as_str()),
        );
        let medicines = if profile.medicines.is_empty() {
            EMPTY_SECTION.to_string()
        } else {
            profile
                .medicines
                .iter()
                .enumerate()
                .map(|(i, m)| format!("{}. {}", i + 1, m))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let heavy = "═".repeat(WIDTH);
        let mut text = String::new();
        text.push_str(&format!("{heavy}\n"));
        text.push_str(&format!("{}\n", centered("MEDICAL PRESCRIPTION")));
        text.push_str(&format!("{}\n", centered(&config.clinic_name)));
        text.push_str(&format!("{heavy}\n\n"));
        text.push_str(&format!("Date: {}\n", now.format("%A, %B %-d, %Y")));
        text.push_str(&format!("Time: {}\n", now.format("%I:%M %p")));
        text.push_str(&format!("Specialist: {}\n", profile.title));
        text.push_str(&section("PATIENT SYMPTOMS", &symptoms));
        text.push_str(&section("CONSULTATION NOTES", &notes));
        text.push_str(&section("PRESCRIBED MEDICINES", &medicines));
        text.push_str(&section(
            "INSTRUCTIONS",
            &format!(
                "• Take all medicines as prescribed\n\
                 • Complete full course of treatment\n\
                 • Return if symptoms persist\n\
                 • Emergency: Call {}",
                config.emergency_number
            ),
        ));
        text.push_str(&format!("\n{heavy}\n"));

        Self {
            text,
            filename: format!("prescription-{}-{}.txt", profile.key, now.timestamp_millis()),
        }
    }

    /// Render the report for a session's current turns.
    pub fn from_session<Tz>(
        session: &ConsultationSession,
        profile: &SpecialistProfile,
        config: &ReportConfig,
        now: DateTime<Tz>,
    ) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        Self::render(profile, session.turns(), config, now)
    }
}

fn bullets<'a>(lines: impl Iterator<Item = &'a str>) -> String {
    let joined: Vec<String> = lines.map(|l| format!("• {}", l)).collect();
    if joined.is_empty() {
        EMPTY_SECTION.to_string()
    } else {
        joined.join("\n")
    }
}

fn centered(text: &str) -> String {
    format!("{:^width$}", text, width = WIDTH).trim_end().to_string()
}

fn section(title: &str, body: &str) -> String {
    let light = "─".repeat(WIDTH);
    format!("\n{light}\n{title}:\n{light}\n{body}\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn eye() -> SpecialistProfile {
        SpecialistProfile::new(
            "eye",
            "Eye Doctor",
            &["eye"],
            &[
                "Artificial Tears - Apply 1-2 drops 4 times daily",
                "Tobramycin drops - 1 drop 3 times daily for 7 days",
            ],
        )
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).unwrap()
    }

    fn turns() -> Vec<ConversationTurn> {
        vec![
            ConversationTurn::assistant(eye().opening_line(), None),
            ConversationTurn::patient("my eye is red"),
            ConversationTurn::assistant("How long has it been red?", None),
            ConversationTurn::patient("I also have a fever"),
            ConversationTurn::assistant("Please see the General Doctor.", Some("general".into())),
            ConversationTurn::patient("nothing else"),
        ]
    }

    #[test]
    fn test_report_sections() {
        let report = PrescriptionReport::render(&eye(), &turns(), &ReportConfig::default(), fixed_time());
        let text = &report.text;

        assert!(text.contains("MEDICAL PRESCRIPTION"));
        assert!(text.contains("Rwanda Digital Health"));
        assert!(text.contains("Date: Tuesday, March 5, 2024"));
        assert!(text.contains("Time: 02:07 PM"));
        assert!(text.contains("Specialist: Eye Doctor"));
        assert!(text.contains("PATIENT SYMPTOMS:\n"));
        assert!(text.contains("• my eye is red\n• I also have a fever\n• nothing else"));
        assert!(text.contains("• How long has it been red?"));
        assert!(text.contains("1. Artificial Tears - Apply 1-2 drops 4 times daily\n2. Tobramycin"));
        assert!(text.contains("• Emergency: Call 912"));
    }

    #[test]
    fn test_notes_skip_opening_and_referrals() {
        let report = PrescriptionReport::render(&eye(), &turns(), &ReportConfig::default(), fixed_time());
        assert!(!report.text.contains("• Hello! I'm your Eye Doctor"));
        assert!(!report.text.contains("General Doctor"));
    }

    #[test]
    fn test_empty_sections_read_none_recorded() {
        let mut profile = eye();
        profile.medicines.clear();
        let turns = vec![ConversationTurn::assistant(profile.opening_line(), None)];
        let report = PrescriptionReport::render(&profile, &turns, &ReportConfig::default(), fixed_time());
        assert_eq!(report.text.matches(EMPTY_SECTION).count(), 3);
    }

    #[test]
    fn test_custom_clinic_and_emergency_number() {
        let config = ReportConfig {
            clinic_name: "Kigali Clinic".to_string(),
            emergency_number: "114".to_string(),
        };
        let report = PrescriptionReport::render(&eye(), &turns(), &config, fixed_time());
        assert!(report.text.contains("Kigali Clinic"));
        assert!(report.text.contains("Emergency: Call 114"));
    }

    #[test]
    fn test_filename_uses_key_and_millis() {
        let now = fixed_time();
        let report = PrescriptionReport::render(&eye(), &turns(), &ReportConfig::default(), now);
        assert_eq!(
            report.filename,
            format!("prescription-eye-{}.txt", now.timestamp_millis())
        );
    }

    #[test]
    fn test_centered_header() {
        assert_eq!(centered("MEDICAL PRESCRIPTION"), format!("{}MEDICAL PRESCRIPTION", " ".repeat(15)));
    }
}
