//! Turn controller and the interactive `gamemaster play` loop.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::{debug, info, instrument, warn};

use crate::core::message::Message;
use crate::core::session::SessionState;
use crate::core::turn::{QUIT_SENTINEL, TurnPhase};
use crate::io::llm::{Invoker, LlmClient, LlmError};
use crate::io::prompt::PromptBuilder;
use crate::io::transcript_store::TranscriptSink;

/// What one call to [`TurnController::take_turn`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The gamemaster answered; the reply was appended to the transcript.
    Replied(String),
    /// The model call failed. The human message stays, no AI message was added,
    /// and the session continues.
    Failed(LlmError),
    /// The quit sentinel was received and the transcript was exported.
    Ended { exported_to: PathBuf },
}

/// Drives one session: owns the state, the client, and the transcript sink.
pub struct TurnController<I, S> {
    state: SessionState,
    client: LlmClient<I>,
    sink: S,
    prompts: PromptBuilder,
    phase: TurnPhase,
    turns: usize,
}

impl<I: Invoker, S: TranscriptSink> TurnController<I, S> {
    pub fn new(state: SessionState, client: LlmClient<I>, sink: S) -> Result<Self> {
        Ok(Self::with_prompts(state, client, sink, PromptBuilder::new()?))
    }

    pub fn with_prompts(
        state: SessionState,
        client: LlmClient<I>,
        sink: S,
        prompts: PromptBuilder,
    ) -> Self {
        Self {
            state,
            client,
            sink,
            prompts,
            phase: TurnPhase::AwaitingHuman,
            turns: 0,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn client(&self) -> &LlmClient<I> {
        &self.client
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Human utterances accepted so far, including failed turns and the quit.
    pub fn turns(&self) -> usize {
        self.turns
    }

    /// Run one turn for a human utterance.
    ///
    /// Model failures come back as [`TurnOutcome::Failed`]; only prompt
    /// rendering or transcript export errors are returned as `Err`. After a
    /// rendering error the session still awaits the next human turn.
    #[instrument(skip_all, fields(turn = self.turns + 1))]
    pub fn take_turn(&mut self, utterance: &str) -> Result<TurnOutcome> {
        if self.phase.is_ended() {
            bail!("session already ended");
        }

        self.turns += 1;
        self.state.add_message(Message::human(utterance));
        self.phase = self.phase.after_human(utterance);

        if self.phase.is_ended() {
            let records = self.state.transcript().to_records();
            let exported_to = self.sink.export(&records).context("export transcript")?;
            info!(messages = records.len(), "session ended");
            return Ok(TurnOutcome::Ended { exported_to });
        }

        let prompt = match self.prompts.build(&self.state, utterance) {
            Ok(prompt) => prompt,
            Err(err) => {
                self.phase = self.phase.after_ai();
                return Err(err);
            }
        };
        let outcome = match self.client.run(&prompt) {
            Ok(reply) => {
                debug!(bytes = reply.len(), "gamemaster replied");
                self.state.add_message(Message::ai(reply.clone()));
                TurnOutcome::Replied(reply)
            }
            Err(err) => {
                warn!(err = %err, "gamemaster call failed");
                TurnOutcome::Failed(err)
            }
        };
        self.phase = self.phase.after_ai();
        Ok(outcome)
    }
}

/// Run the read-prompt/print-response loop until the quit sentinel.
///
/// End of input counts as the quit sentinel so the transcript is still exported.
pub fn play_session<I, S, R, W>(
    controller: &mut TurnController<I, S>,
    mut input: R,
    mut output: W,
) -> Result<PathBuf>
where
    I: Invoker,
    S: TranscriptSink,
    R: BufRead,
    W: Write,
{
    writeln!(output, "Welcome to the Physics Problem-Solving Game!")?;
    writeln!(output, "\n--- The Problem ---\n{}", controller.state().problem())?;
    writeln!(
        output,
        "\nDescribe your actions to the AI (e.g., 'measure mass', 'what are the forces?'). Type '{QUIT_SENTINEL}' to exit."
    )?;

    loop {
        write!(output, "> ")?;
        output.flush()?;

        let mut line = String::new();
        let read = input.read_line(&mut line).context("read input")?;
        let utterance = if read == 0 {
            debug!("end of input, ending session");
            QUIT_SENTINEL
        } else {
            line.trim_end_matches(['\r', '\n'])
        };

        let outcome = match controller.take_turn(utterance) {
            Ok(outcome) => outcome,
            Err(err) if !controller.phase().is_ended() => {
                warn!("turn failed: {err:#}");
                writeln!(output, "Error preparing the turn: {err:#}")?;
                continue;
            }
            Err(err) => return Err(err),
        };
        match outcome {
            TurnOutcome::Replied(reply) => writeln!(output, "\n{reply}\n")?,
            TurnOutcome::Failed(err) => {
                writeln!(output, "Error communicating with the AI: {err}")?;
            }
            TurnOutcome::Ended { exported_to } => {
                writeln!(output, "\nThanks for playing!")?;
                writeln!(output, "Transcript saved to {}", exported_to.display())?;
                return Ok(exported_to);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Speaker;
    use crate::core::session::Scenario;
    use crate::test_support::{MemorySink, ScriptedInvoker};

    fn controller(invoker: ScriptedInvoker) -> TurnController<ScriptedInvoker, MemorySink> {
        TurnController::new(
            SessionState::new(Scenario::default()),
            LlmClient::new(invoker),
            MemorySink::default(),
        )
        .expect("controller")
    }

    #[test]
    fn reply_appends_human_and_ai() {
        let mut ctl = controller(ScriptedInvoker::new().reply(" The block is 10 kg. "));
        let outcome = ctl.take_turn("measure mass").expect("turn");

        assert_eq!(outcome, TurnOutcome::Replied("The block is 10 kg.".to_string()));
        let records = ctl.state().transcript().to_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].speaker, Speaker::Human);
        assert_eq!(records[1].content, "The block is 10 kg.");
        assert_eq!(ctl.phase(), TurnPhase::AwaitingHuman);
    }

    #[test]
    fn prompt_includes_the_new_human_message() {
        let mut ctl = controller(ScriptedInvoker::echo());
        ctl.take_turn("measure mass").expect("turn");

        let prompts = ctl.client().invoker().prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains(r#"[{"speaker":"human","content":"measure mass"}]"#));
    }

    #[test]
    fn failure_keeps_human_message_only() {
        let mut ctl = controller(ScriptedInvoker::new().fail(LlmError::invocation("boom")));
        let outcome = ctl.take_turn("what are the forces?").expect("turn");

        assert_eq!(outcome, TurnOutcome::Failed(LlmError::invocation("boom")));
        assert_eq!(ctl.state().transcript().len(), 1);
        assert_eq!(ctl.phase(), TurnPhase::AwaitingHuman);
    }

    #[test]
    fn quit_exports_without_calling_model() {
        let mut ctl = controller(ScriptedInvoker::echo());
        ctl.take_turn("measure mass").expect("turn");
        let outcome = ctl.take_turn("  Quit ").expect("quit");

        assert!(matches!(outcome, TurnOutcome::Ended { .. }));
        assert_eq!(ctl.client().invoker().prompts().len(), 1);
        assert_eq!(ctl.sink().exports.len(), 1);
        assert_eq!(ctl.sink().exports[0].len(), 3);
        assert_eq!(ctl.sink().exports[0][2].content, "  Quit ");
        assert!(ctl.phase().is_ended());
    }

    #[test]
    fn turn_after_end_is_rejected() {
        let mut ctl = controller(ScriptedInvoker::echo());
        ctl.take_turn("quit").expect("quit");
        let err = ctl.take_turn("measure mass").unwrap_err();
        assert!(err.to_string().contains("session already ended"));
        assert_eq!(ctl.state().transcript().len(), 1);
    }

    #[test]
    fn export_failure_is_an_error() {
        let mut ctl = TurnController::new(
            SessionState::new(Scenario::default()),
            LlmClient::new(ScriptedInvoker::echo()),
            MemorySink::failing(),
        )
        .expect("controller");
        let err = ctl.take_turn("quit").unwrap_err();
        assert!(format!("{err:#}").contains("disk full"));
    }

    #[test]
    fn session_loop_prints_replies_and_errors() {
        let invoker = ScriptedInvoker::new()
            .reply("Mass is 10 kg.")
            .fail(LlmError::InvocationNotFound {
                command: "gemini".to_string(),
            });
        let mut ctl = controller(invoker);
        let input = b"measure mass\nmeasure angle\nquit\n";
        let mut out = Vec::new();

        play_session(&mut ctl, &input[..], &mut out).expect("play");

        let out = String::from_utf8(out).expect("utf8");
        assert!(out.contains("--- The Problem ---"));
        assert!(out.contains("\nMass is 10 kg.\n"));
        assert!(out.contains("Error communicating with the AI: the 'gemini' command was not found"));
        assert!(out.contains("Thanks for playing!"));
        assert!(out.contains("Transcript saved to memory://transcript.json"));
        // human, ai, human (failed turn), quit
        assert_eq!(ctl.sink().exports[0].len(), 4);
    }

    #[test]
    fn turn_counter_includes_failed_turns() {
        let invoker = ScriptedInvoker::new()
            .fail(LlmError::invocation("boom"))
            .fail(LlmError::invocation("boom"))
            .reply("Friction balances gravity.");
        let mut ctl = controller(invoker);
        ctl.take_turn("measure mass").expect("turn");
        ctl.take_turn("measure angle").expect("turn");
        assert_eq!(ctl.turns(), 2);
        ctl.take_turn("what are the forces?").expect("turn");

        // Two failed turns leave four messages, not six.
        assert_eq!(ctl.state().transcript().len(), 4);
        assert_eq!(ctl.turns(), 3);
    }

    fn broken_template_controller() -> TurnController<ScriptedInvoker, MemorySink> {
        let prompts = PromptBuilder::from_template("{{ problem(1) }}").expect("template");
        TurnController::with_prompts(
            SessionState::new(Scenario::default()),
            LlmClient::new(ScriptedInvoker::echo()),
            MemorySink::default(),
            prompts,
        )
    }

    #[test]
    fn render_error_leaves_session_awaiting_human() {
        let mut ctl = broken_template_controller();
        let err = ctl.take_turn("measure mass").unwrap_err();
        assert!(format!("{err:#}").contains("render gamemaster prompt"));
        assert_eq!(ctl.phase(), TurnPhase::AwaitingHuman);
        assert!(ctl.client().invoker().prompts().is_empty());
    }

    #[test]
    fn session_loop_survives_render_errors_and_still_exports() {
        let mut ctl = broken_template_controller();
        let mut out = Vec::new();
        play_session(&mut ctl, &b"measure mass
quit
"[..], &mut out).expect("play");

        let out = String::from_utf8(out).expect("utf8");
        assert!(out.contains("Error preparing the turn: render gamemaster prompt"));
        assert!(out.contains("Thanks for playing!"));
        assert_eq!(ctl.sink().exports.len(), 1);
        assert_eq!(ctl.sink().exports[0].len(), 2);
    }

    #[test]
    fn end_of_input_ends_session() {
        let mut ctl = controller(ScriptedInvoker::echo());
        let mut out = Vec::new();
        play_session(&mut ctl, &b"measure mass\n"[..], &mut out).expect("play");

        assert!(ctl.phase().is_ended());
        let exported = &ctl.sink().exports[0];
        assert_eq!(exported.last().map(|r| r.content.as_str()), Some(QUIT_SENTINEL));
    }
}
