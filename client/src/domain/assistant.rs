//! Health assistant conversations.
//!
//! A [`Conversation`] keeps the transcript and delegates answers to a
//! [`Responder`]. Responders either ask the backend ([`RemoteResponder`]) or
//! pick a canned answer by keyword ([`KeywordResponder`]) when working
//! offline.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

use crate::domain::Error;
use crate::domain::PatientId;
use crate::domain::ports::AssistantApi;

/// Produces an answer for one question.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Answer `question`.
    async fn respond(&self, question: &str) -> Result<String, Error>;
}

/// Topic rule: any keyword hit selects `answer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordRule {
    keywords: Vec<String>,
    answer: String,
}

impl KeywordRule {
    /// Build a rule. Keywords are matched case-insensitively.
    pub fn new<I, S>(keywords: I, answer: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|keyword| keyword.as_ref().to_lowercase())
                .filter(|keyword| !keyword.is_empty())
                .collect(),
            answer: answer.into(),
        }
    }

    fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|keyword| lowered.contains(keyword))
    }
}

const MEDICATION_ANSWER: &str = "Your prescriptions are listed under Medications on your dashboard. \
Take them exactly as directed and finish the full course. Contact your doctor if you notice side effects.";
const TEST_ANSWER: &str = "Your latest results are listed under Tests on your dashboard. \
Your doctor adds notes when a value needs follow-up. Would you like help reading a specific result?";
const VISIT_ANSWER: &str = "Your scheduled and past visits are listed under Visits on your dashboard. \
Contact the clinic to change an appointment.";
const SYMPTOM_ANSWER: &str = "I'm sorry to hear you're not feeling well. \
Please consult your doctor about these symptoms, and seek emergency care if they are severe.";
const DOCUMENT_LAB_ANSWER: &str = "your lab report lists each measured value next to its reference range. \
Values outside the range are flagged, and your doctor's notes explain whether any follow-up is needed.";
const DOCUMENT_MEDICATION_ANSWER: &str = "your prescription lists the dose, how often to take it and for how long. \
Complete the full course even if you feel better, and contact your doctor about severe side effects.";
const DOCUMENT_DIAGNOSIS_ANSWER: &str = "your diagnosis is recorded with the date it was made and the expected recovery time. \
Book a follow-up if your symptoms last longer than your doctor expected.";
const DOCUMENT_HISTORY_ANSWER: &str = "your medical history records past conditions, procedures, known allergies and family history. \
Your most recent check-up is listed with its findings.";
const DOCUMENT_FALLBACK_ANSWER: &str = "I've reviewed your documents. \
Is there something specific about your medical documents you'd like to know more about?";
const FALLBACK_ANSWER: &str = "Thank you for your question. \
Is there anything specific about your health condition or treatment plan you'd like to know more about?";

/// Offline responder that picks the first rule whose keyword appears in the
/// question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordResponder {
    rules: Vec<KeywordRule>,
    fallback: String,
}

impl KeywordResponder {
    /// Build a responder from ordered rules and a fallback answer.
    pub fn new(rules: Vec<KeywordRule>, fallback: impl Into<String>) -> Self {
        Self {
            rules,
            fallback: fallback.into(),
        }
    }

    /// Pick an answer without going through the async trait.
    pub fn answer(&self, question: &str) -> &str {
        let lowered = question.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&lowered))
            .map_or(self.fallback.as_str(), |rule| rule.answer.as_str())
    }

    /// Rules for questions asked about selected documents.
    ///
    /// Answers are phrased to follow the "Based on your ..." prefix added by
    /// [`DocumentResponder`].
    pub fn documents() -> Self {
        Self::new(
            vec![
                KeywordRule::new(["blood", "test result"], DOCUMENT_LAB_ANSWER),
                KeywordRule::new(["medication", "prescription"], DOCUMENT_MEDICATION_ANSWER),
                KeywordRule::new(["diagnosis", "condition"], DOCUMENT_DIAGNOSIS_ANSWER),
                KeywordRule::new(["history", "record"], DOCUMENT_HISTORY_ANSWER),
            ],
            DOCUMENT_FALLBACK_ANSWER,
        )
    }
}

impl Default for KeywordResponder {
    fn default() -> Self {
        Self::new(
            vec![
                KeywordRule::new(["medication", "medicine", "prescription"], MEDICATION_ANSWER),
                KeywordRule::new(["test", "result"], TEST_ANSWER),
                KeywordRule::new(["appointment", "visit"], VISIT_ANSWER),
                KeywordRule::new(["symptom", "pain", "feel"], SYMPTOM_ANSWER),
            ],
            FALLBACK_ANSWER,
        )
    }
}

#[async_trait]
impl Responder for KeywordResponder {
    async fn respond(&self, question: &str) -> Result<String, Error> {
        Ok(self.answer(question).to_owned())
    }
}

/// Responder backed by the portal's assistant endpoint.
pub struct RemoteResponder<A> {
    api: Arc<A>,
    patient: PatientId,
}

impl<A> RemoteResponder<A> {
    /// Ask questions about `patient` through `api`.
    pub fn new(api: Arc<A>, patient: PatientId) -> Self {
        Self { api, patient }
    }
}

#[async_trait]
impl<A: AssistantApi> Responder for RemoteResponder<A> {
    async fn respond(&self, question: &str) -> Result<String, Error> {
        self.api
            .interact(self.patient, question)
            .await
            .map(|reply| reply.answer)
            .map_err(|err| err.to_domain("Error getting AI response"))
    }
}

const SELECT_DOCUMENT_PROMPT: &str = "Please select at least one document for me to analyze and provide relevant information.";

/// Responder that answers in the context of selected documents.
pub struct DocumentResponder<R> {
    inner: R,
    selected: Vec<String>,
}

impl<R> DocumentResponder<R> {
    /// Wrap `inner`; no documents are selected initially.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            selected: Vec::new(),
        }
    }

    /// Toggle a document in or out of the selection.
    pub fn toggle(&mut self, name: impl Into<String>) {
        let name = name.into();
        if let Some(position) = self.selected.iter().position(|selected| *selected == name) {
            self.selected.remove(position);
        } else {
            self.selected.push(name);
        }
    }

    /// Names of selected documents, in selection order.
    pub fn selected(&self) -> &[String] {
        &self.selected
    }
}

#[async_trait]
impl<R: Responder> Responder for DocumentResponder<R> {
    async fn respond(&self, question: &str) -> Result<String, Error> {
        if self.selected.is_empty() {
            return Ok(SELECT_DOCUMENT_PROMPT.to_owned());
        }
        let answer = self.inner.respond(question).await?;
        Ok(format!(
            "Based on your {}, {}",
            self.selected.join(", "),
            lower_first(&answer)
        ))
    }
}

/// Lower-case the first letter so the answer continues a sentence. The
/// pronoun "I" keeps its capital.
fn lower_first(text: &str) -> String {
    let first_word = text.split(|c: char| c.is_whitespace() || c == '\'').next();
    if first_word == Some("I") {
        return text.to_owned();
    }
    let mut chars = text.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_lowercase().chain(chars).collect()
    })
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// The person asking.
    User,
    /// The assistant.
    Bot,
}

/// One entry in a conversation transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Sequential id starting at one.
    pub id: u64,
    /// Author.
    pub sender: Sender,
    /// Message body.
    pub text: String,
    /// When the message was recorded.
    pub timestamp: DateTime<Utc>,
}

/// Transcript of questions and answers with one responder.
pub struct Conversation<R> {
    responder: R,
    clock: Arc<dyn Clock>,
    messages: Vec<ChatMessage>,
}

impl<R: Responder> Conversation<R> {
    /// Start an empty conversation.
    pub fn new(responder: R, clock: Arc<dyn Clock>) -> Self {
        Self {
            responder,
            clock,
            messages: Vec::new(),
        }
    }

    /// Start with a greeting from the assistant.
    pub fn with_greeting(responder: R, clock: Arc<dyn Clock>, greeting: &str) -> Self {
        let mut conversation = Self::new(responder, clock);
        conversation.push(Sender::Bot, greeting.to_owned());
        conversation
    }

    /// Ask a question and record the reply.
    ///
    /// Blank questions are ignored and return `Ok(None)`. When the responder
    /// fails the question stays in the transcript and the error is returned.
    pub async fn ask(&mut self, question: &str) -> Result<Option<&ChatMessage>, Error> {
        let question = question.trim();
        if question.is_empty() {
            return Ok(None);
        }
        self.push(Sender::User, question.to_owned());
        let answer = self.responder.respond(question).await?;
        self.push(Sender::Bot, answer);
        Ok(self.messages.last())
    }

    /// Every message so far.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The underlying responder.
    pub fn responder_mut(&mut self) -> &mut R {
        &mut self.responder
    }

    fn push(&mut self, sender: Sender, text: String) {
        let id = u64::try_from(self.messages.len()).map_or(u64::MAX, |len| len + 1);
        self.messages.push(ChatMessage {
            id,
            sender,
            text,
            timestamp: self.clock.utc(),
        });
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::{AssistantReply, MockAssistantApi, PortalApiError};
    use mockable::{DefaultClock, MockClock};
    use rstest::rstest;

    #[rstest]
    #[case("What MEDICATION am I on?", MEDICATION_ANSWER)]
    #[case("my blood test", TEST_ANSWER)]
    #[case("show results", TEST_ANSWER)]
    #[case("next appointment?", VISIT_ANSWER)]
    #[case("I feel dizzy", SYMPTOM_ANSWER)]
    #[case("hello", FALLBACK_ANSWER)]
    fn keyword_responder_picks_topic(#[case] question: &str, #[case] expected: &str) {
        assert_eq!(KeywordResponder::default().answer(question), expected);
    }

    #[rstest]
    fn earlier_rules_win() {
        let responder = KeywordResponder::new(
            vec![
                KeywordRule::new(["pain"], "first"),
                KeywordRule::new(["pain", "medicine"], "second"),
            ],
            "none",
        );
        assert_eq!(responder.answer("medicine for PAIN"), "first");
        assert_eq!(responder.answer("medicine"), "second");
        assert_eq!(responder.answer("other"), "none");
    }

    #[tokio::test]
    async fn remote_responder_returns_answer() {
        let mut api = MockAssistantApi::new();
        api.expect_interact()
            .withf(|patient, question| patient.get() == 3 && question == "Any results?")
            .return_once(|_, _| {
                Ok(AssistantReply {
                    answer: "All normal.".to_owned(),
                })
            });
        let responder = RemoteResponder::new(Arc::new(api), PatientId::new(3).expect("id"));

        let answer = responder.respond("Any results?").await.expect("answer");
        assert_eq!(answer, "All normal.");
    }

    #[tokio::test]
    async fn remote_responder_maps_failures() {
        let mut api = MockAssistantApi::new();
        api.expect_interact()
            .return_once(|_, _| Err(PortalApiError::rejected(502_u16, "")));
        let responder = RemoteResponder::new(Arc::new(api), PatientId::new(3).expect("id"));

        let err = responder.respond("?").await.expect_err("failure");
        assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
        assert_eq!(err.message(), "Error getting AI response");
    }

    #[tokio::test]
    async fn document_responder_requires_selection() {
        let mut responder = DocumentResponder::new(KeywordResponder::new(Vec::new(), "All good."));
        assert_eq!(
            responder.respond("anything").await.expect("prompt"),
            SELECT_DOCUMENT_PROMPT
        );

        responder.toggle("labs.pdf");
        responder.toggle("scan.pdf");
        assert_eq!(
            responder.respond("anything").await.expect("answer"),
            "Based on your labs.pdf, scan.pdf, all good."
        );

        responder.toggle("labs.pdf");
        assert_eq!(responder.selected(), ["scan.pdf".to_owned()]);
    }

    #[rstest]
    #[case("Is my BLOOD sugar ok?", DOCUMENT_LAB_ANSWER)]
    #[case("what does the test result say", DOCUMENT_LAB_ANSWER)]
    #[case("which prescription?", DOCUMENT_MEDICATION_ANSWER)]
    #[case("explain my diagnosis", DOCUMENT_DIAGNOSIS_ANSWER)]
    #[case("is the condition serious", DOCUMENT_DIAGNOSIS_ANSWER)]
    #[case("show my history", DOCUMENT_HISTORY_ANSWER)]
    #[case("anything in the record?", DOCUMENT_HISTORY_ANSWER)]
    #[case("hello", DOCUMENT_FALLBACK_ANSWER)]
    fn document_rules_pick_topic(#[case] question: &str, #[case] expected: &str) {
        assert_eq!(KeywordResponder::documents().answer(question), expected);
    }

    #[rstest]
    fn document_rules_check_blood_before_medication() {
        assert_eq!(
            KeywordResponder::documents().answer("blood test medication"),
            DOCUMENT_LAB_ANSWER
        );
    }

    #[tokio::test]
    async fn document_answers_continue_the_prefix() {
        let mut responder = DocumentResponder::new(KeywordResponder::documents());
        responder.toggle("discharge.pdf");

        let answer = responder.respond("my diagnosis").await.expect("answer");
        assert_eq!(
            answer,
            format!("Based on your discharge.pdf, {DOCUMENT_DIAGNOSIS_ANSWER}")
        );

        let fallback = responder.respond("hi").await.expect("answer");
        assert!(fallback.starts_with("Based on your discharge.pdf, I've reviewed"));
    }

    #[rstest]
    #[case("Your results", "your results")]
    #[case("I've checked", "I've checked")]
    #[case("I am sure", "I am sure")]
    #[case("Ideas", "ideas")]
    #[case("", "")]
    fn lower_first_keeps_the_pronoun(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(lower_first(input), expected);
    }

    #[tokio::test]
    async fn conversation_records_both_sides() {
        let mut conversation = Conversation::with_greeting(
            KeywordResponder::default(),
            Arc::new(DefaultClock),
            "Hello! How can I help?",
        );

        let reply = conversation
            .ask("  which medicine?  ")
            .await
            .expect("reply")
            .cloned()
            .expect("message");
        assert_eq!(reply.sender, Sender::Bot);
        assert_eq!(reply.text, MEDICATION_ANSWER);

        let ids: Vec<_> = conversation.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, [1, 2, 3]);
        assert_eq!(conversation.messages()[1].text, "which medicine?");
    }

    #[tokio::test]
    async fn blank_questions_are_ignored() {
        let mut conversation = Conversation::new(KeywordResponder::default(), Arc::new(DefaultClock));
        assert!(conversation.ask("   ").await.expect("ok").is_none());
        assert!(conversation.messages().is_empty());
    }

    #[tokio::test]
    async fn responder_failure_keeps_question() {
        let mut api = MockAssistantApi::new();
        api.expect_interact()
            .return_once(|_, _| Err(PortalApiError::transport("connection refused")));
        let responder = RemoteResponder::new(Arc::new(api), PatientId::new(3).expect("id"));
        let mut conversation = Conversation::new(responder, Arc::new(DefaultClock));

        conversation.ask("hello").await.expect_err("failure");
        assert_eq!(conversation.messages().len(), 1);
        assert_eq!(conversation.messages()[0].sender, Sender::User);
    }

    #[tokio::test]
    async fn messages_are_stamped_by_the_clock() {
        let instant = DateTime::parse_from_rfc3339("2025-03-15T09:30:00Z")
            .expect("timestamp")
            .with_timezone(&Utc);
        let mut clock = MockClock::new();
        clock.expect_utc().times(2).return_const(instant);
        let mut conversation = Conversation::new(KeywordResponder::default(), Arc::new(clock));

        conversation.ask("any results?").await.expect("answer");
        assert!(
            conversation
                .messages()
                .iter()
                .all(|message| message.timestamp == instant)
        );
    }
}
