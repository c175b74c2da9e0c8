//! Conversational question answering.
//!
//! A [`Session`] keeps the ordered history of a conversation. Follow-up
//! questions are first rewritten into standalone questions so retrieval is
//! not confused by pronouns ("what about its price?"), then answered with the
//! history in the prompt.
//!
//! ```text
//! ask("who makes the iPhone?")   -> retrieve("who makes the iPhone?")
//! ask("when was it founded?")    -> condense -> "When was Apple founded?"
//!                                -> retrieve("When was Apple founded?")
//! handle("exit")                 -> Turn::Exit, session closed
//! ```

use tracing::debug;

use crate::{Answer, Error, Message, Pipeline, Result, Role};

const EXIT_COMMAND: &str = "exit";

const CONDENSE_PROMPT: &str = "Given the following conversation and a follow up question, \
rephrase the follow up question to be a standalone question, in its original language.";

/// Outcome of [`Session::handle`].
#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    /// The question was answered.
    Answer(Answer),
    /// Blank input; nothing was asked.
    Skip,
    /// The user asked to stop. The session is now closed.
    Exit,
}

/// A conversation over a [`Pipeline`].
pub struct Session {
    pipeline: Pipeline,
    history: Vec<Message>,
    max_history: usize,
    top_k: usize,
    closed: bool,
}

impl Session {
    /// Start a conversation keeping at most `max_history` messages.
    ///
    /// Retrieval uses the pipeline's `top_k` until [`with_top_k`](Self::with_top_k).
    pub fn new(pipeline: Pipeline, max_history: usize) -> Self {
        let top_k = pipeline.options().top_k;
        Self {
            pipeline,
            history: Vec::new(),
            max_history,
            top_k,
            closed: false,
        }
    }

    /// Retrieve `k` chunks per question.
    pub fn with_top_k(mut self, k: usize) -> Result<Self> {
        if k == 0 {
            return Err(Error::InvalidArgument("top_k must be > 0".into()));
        }
        self.top_k = k;
        Ok(self)
    }

    /// Chunks retrieved per question.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Ask a question, remembering it and the answer.
    ///
    /// # Errors
    ///
    /// [`Error::SessionClosed`] after [`close`](Self::close) or an exit turn,
    /// [`Error::EmptyIndex`] before anything was ingested, otherwise whatever
    /// retrieval or generation fails with. A failed turn leaves the history
    /// unchanged.
    pub async fn ask(&mut self, question: &str) -> Result<Answer> {
        if self.closed {
            return Err(Error::SessionClosed);
        }
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidArgument("question must not be empty".into()));
        }
        self.pipeline.ensure_indexed().await?;

        let standalone = self.standalone_question(question).await?;
        let answer = self
            .pipeline
            .answer_in_context(&standalone, question, &self.history, self.top_k)
            .await?;

        self.history.push(Message::user(question));
        self.history.push(Message::assistant(answer.text.clone()));
        self.trim_history();
        Ok(answer)
    }

    /// Interpret one line of user input.
    pub async fn handle(&mut self, input: &str) -> Result<Turn> {
        let input = input.trim();
        if input.eq_ignore_ascii_case(EXIT_COMMAND) {
            self.close();
            return Ok(Turn::Exit);
        }
        if input.is_empty() {
            return Ok(Turn::Skip);
        }
        self.ask(input).await.map(Turn::Answer)
    }

    /// End the conversation.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Whether the conversation has ended.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Messages so far, oldest first.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Forget the conversation but keep the session open.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    async fn standalone_question(&self, question: &str) -> Result<String> {
        if self.history.is_empty() {
            return Ok(question.to_string());
        }

        let transcript = self
            .history
            .iter()
            .map(|m| {
                let speaker = match m.role {
                    Role::User => "Human",
                    Role::Assistant => "Assistant",
                    Role::System => "System",
                };
                format!("{speaker}: {}", m.content)
            })
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "{CONDENSE_PROMPT}\n\nChat History:\n{transcript}\nFollow Up Input: {question}\nStandalone question:"
        );

        let rewritten = self
            .pipeline
            .chat()?
            .complete(&[Message::user(prompt)], 0.0)
            .await?;
        let rewritten = rewritten.trim();
        debug!(original = question, standalone = rewritten, "Condensed follow-up");

        Ok(if rewritten.is_empty() {
            question.to_string()
        } else {
            rewritten.to_string()
        })
    }

    fn trim_history(&mut self) {
        let excess = self.history.len().saturating_sub(self.max_history);
        // Drop whole question/answer pairs.
        let drop = excess.div_ceil(2) * 2;
        self.history.drain(..drop.min(self.history.len()));
    }
}
