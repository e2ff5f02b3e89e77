//! Terminal consultation: a text stand-in for the voice UI.

use std::io::Write;

use chrono::Local;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

use triage_chat::{
    ConsultationSession, DialogueRouter, DialogueState, PrescriptionReport, CLOSING_LINE,
};
use triage_core::config::ReportConfig;
use triage_core::TriageError;
use triage_storage::ConsultationRepository;

const HELP: &str = "Commands: /switch [key], /report, /reset, /quit";

pub struct ChatConsole<'a> {
    router: &'a DialogueRouter,
    report: &'a ReportConfig,
    consultations: Option<&'a ConsultationRepository>,
    patient_id: String,
}

impl<'a> ChatConsole<'a> {
    pub fn new(
        router: &'a DialogueRouter,
        report: &'a ReportConfig,
        consultations: Option<&'a ConsultationRepository>,
        patient_id: &str,
    ) -> Self {
        Self {
            router,
            report,
            consultations,
            patient_id: patient_id.to_string(),
        }
    }

    /// Read patient lines from `input` until EOF or `/quit`.
    pub async fn run<R, W>(&self, specialty: &str, input: R, out: &mut W) -> Result<(), TriageError>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut session = ConsultationSession::start(self.router.catalog().resolve(specialty));
        writeln!(out, "{}", HELP)?;
        self.say(out, &session, session.opening_line())?;

        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            match line.split_once(' ').map_or((line, ""), |(cmd, arg)| (cmd, arg.trim())) {
                ("/quit", _) => break,
                ("/reset", _) => {
                    session.reset();
                    self.say(out, &session, session.opening_line())?;
                }
                ("/switch", key) => self.switch(out, &mut session, key)?,
                ("/report", _) => self.report(out, &mut session)?,
                _ => self.exchange(out, &mut session, line).await?,
            }
        }

        writeln!(out, "Goodbye.")?;
        Ok(())
    }

    async fn exchange<W: Write>(
        &self,
        out: &mut W,
        session: &mut ConsultationSession,
        line: &str,
    ) -> Result<(), TriageError> {
        match session.state() {
            DialogueState::Reported => {
                writeln!(out, "This consultation is finished. Use /reset or /switch.")?;
                return Ok(());
            }
            DialogueState::Closing => {
                self.say(out, session, CLOSING_LINE)?;
                return Ok(());
            }
            _ => {}
        }

        let decision = self.router.decide(line, session.specialist_key()).await;
        if let Err(e) = session.record_exchange(line, &decision) {
            writeln!(out, "{}", e)?;
            return Ok(());
        }
        self.say(out, session, &decision.message)?;

        if let Some(key) = decision.suggested_specialist() {
            let title = &self.router.catalog().resolve(key).title;
            writeln!(out, "  (type /switch to talk to the {})", title)?;
        }
        debug!(state = ?session.state(), topic = ?session.expected_topic(), "Session updated");
        Ok(())
    }

    fn switch<W: Write>(
        &self,
        out: &mut W,
        session: &mut ConsultationSession,
        key: &str,
    ) -> Result<(), TriageError> {
        let target = if key.is_empty() {
            session.pending_referral().map(str::to_string)
        } else {
            Some(key.to_string())
        };

        match target {
            Some(key) => {
                let profile = self.router.catalog().resolve(&key);
                session.switch_specialist(profile);
                self.say(out, session, session.opening_line())?;
            }
            None => writeln!(out, "No specialist switch is pending.")?,
        }
        Ok(())
    }

    fn report<W: Write>(
        &self,
        out: &mut W,
        session: &mut ConsultationSession,
    ) -> Result<(), TriageError> {
        if let Err(e) = session.mark_reported() {
            writeln!(out, "Report not available: {}", e)?;
            return Ok(());
        }

        let profile = self.router.catalog().resolve(session.specialist_key());
        let report = PrescriptionReport::from_session(session, profile, self.report, Local::now());
        writeln!(out, "{}", report.text)?;
        writeln!(out, "({})", report.filename)?;

        if let Some(repo) = self.consultations {
            if let Err(e) = repo.record_consultation(
                &self.patient_id,
                &session.transcript(),
                &report.text,
                Some(&profile.key),
            ) {
                warn!(error = %e, "Failed to save consultation");
            }
        }
        Ok(())
    }

    fn say<W: Write>(
        &self,
        out: &mut W,
        session: &ConsultationSession,
        message: &str,
    ) -> Result<(), TriageError> {
        writeln!(out, "{}: {}", session.specialist_title(), message)?;
        Ok(())
    }
}
