mod command;
mod events;

pub use command::*;
pub use events::*;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::ProtocolInconsistency;

const EVENT_CAPACITY: usize = 256;

/// Owns every command of the session and applies proxy events to them.
///
/// Ids are handed out from 0 in submission order and never reused, so a
/// command's id is also its index in the history.
#[derive(Debug)]
pub struct CommandLifecycle {
    next_id: u32,
    history: Vec<Command>,
    events: broadcast::Sender<CommandEvent>,
}

impl Default for CommandLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandLifecycle {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            next_id: 0,
            history: Vec::new(),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CommandEvent> {
        self.events.subscribe()
    }

    /// Records a new command in the `Entered` state.
    ///
    /// Blank input (empty or whitespace only) is not a command: no id is
    /// consumed and no event is emitted. The text is otherwise kept verbatim.
    pub fn submit(&mut self, text: &str) -> Option<Command> {
        if text.trim().is_empty() {
            return None;
        }

        let command = Command::new(self.next_id, text.to_string());
        self.next_id += 1;
        self.history.push(command.clone());

        debug!(id = command.id(), command = command.text(), "command entered");
        let _ = self.events.send(CommandEvent::Entered(command.clone()));
        Some(command)
    }

    /// Applies one inbound event and returns the transitions it caused, in
    /// ascending id order.
    ///
    /// Events that do not apply to the command's current state are ignored and
    /// produce no transitions. An event naming an id this session never issued
    /// is reported as a [`ProtocolInconsistency`] and changes nothing.
    pub fn apply(&mut self, event: LifecycleEvent) -> Result<Vec<Transition>, ProtocolInconsistency> {
        let id = event.id();
        if self.get(id).is_none() {
            return Err(self.inconsistency(id, event.name()));
        }

        let transitions = match event {
            LifecycleEvent::Ack { status, message, .. } => {
                let command = &mut self.history[id as usize];
                match command.state().on_ack(status) {
                    Some(next) => {
                        command.set_response(message);
                        vec![self.transition(id, next)]
                    }
                    None => {
                        debug!(id, state = %command.state(), "ack ignored");
                        Vec::new()
                    }
                }
            }
            LifecycleEvent::Finished { .. } => {
                let state = self.history[id as usize].state();
                match state.on_finished() {
                    Some(next) => vec![self.transition(id, next)],
                    None if state == CommandState::Entered => {
                        warn!(id, "command finished before it was acknowledged");
                        Vec::new()
                    }
                    None => {
                        debug!(id, %state, "finish ignored");
                        Vec::new()
                    }
                }
            }
            LifecycleEvent::Undo { .. } => {
                let mut transitions = Vec::new();
                for index in id as usize..self.history.len() {
                    if let Some(next) = self.history[index].state().on_undo() {
                        transitions.push(self.transition(index as u32, next));
                    }
                }
                transitions
            }
        };

        Ok(transitions)
    }

    /// Appends a `Feedback` message to its command.
    pub fn record_feedback(&mut self, id: u32, message: String) -> Result<(), ProtocolInconsistency> {
        let Some(command) = self.history.get_mut(id as usize) else {
            return Err(self.inconsistency(id, "Feedback"));
        };
        command.push_feedback(message.clone());
        let _ = self.events.send(CommandEvent::Feedback { id, message });
        Ok(())
    }

    /// All commands of the session in id order.
    pub fn history(&self) -> &[Command] {
        &self.history
    }

    pub fn get(&self, id: u32) -> Option<&Command> {
        self.history.get(id as usize)
    }

    pub fn latest_id(&self) -> Option<u32> {
        self.history.last().map(Command::id)
    }

    fn transition(&mut self, id: u32, to: CommandState) -> Transition {
        let command = &mut self.history[id as usize];
        let transition = Transition {
            id,
            from: command.state(),
            to,
        };
        command.set_state(to);

        debug!(id, from = %transition.from, to = %transition.to, "command transition");
        let _ = self.events.send(CommandEvent::Transition(transition));
        transition
    }

    fn inconsistency(&self, id: u32, event: &str) -> ProtocolInconsistency {
        let inconsistency = ProtocolInconsistency::UnknownCommand {
            id,
            event: event.to_string(),
        };
        warn!("{}", inconsistency);
        let _ = self
            .events
            .send(CommandEvent::Inconsistency(inconsistency.clone()));
        inconsistency
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::AckStatus;

    fn ack(id: u32, status: AckStatus) -> LifecycleEvent {
        LifecycleEvent::Ack {
            id,
            status,
            message: format!("ack: {}", id),
        }
    }

    #[test]
    fn ids_start_at_zero_and_skip_blank_input() {
        let mut lifecycle = CommandLifecycle::new();
        let mut events = lifecycle.subscribe();

        assert_eq!(lifecycle.submit("movej(a)").map(|c| c.id()), Some(0));
        assert!(lifecycle.submit("").is_none());
        assert!(lifecycle.submit("  \t ").is_none());
        assert_eq!(lifecycle.submit("movej(b)").map(|c| c.id()), Some(1));
        assert_eq!(lifecycle.latest_id(), Some(1));

        assert!(matches!(events.try_recv(), Ok(CommandEvent::Entered(c)) if c.id() == 0));
        assert!(matches!(events.try_recv(), Ok(CommandEvent::Entered(c)) if c.id() == 1));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn text_is_kept_verbatim() {
        let mut lifecycle = CommandLifecycle::new();
        let command = lifecycle.submit("  popup(\"hi\")  ").unwrap();
        assert_eq!(command.text(), "  popup(\"hi\")  ");
    }

    #[test]
    fn rejection_keeps_reason() {
        let mut lifecycle = CommandLifecycle::new();
        lifecycle.submit("bogus()");
        let transitions = lifecycle
            .apply(LifecycleEvent::Ack {
                id: 0,
                status: AckStatus::Error,
                message: "error: name 'bogus' is not defined".to_string(),
            })
            .unwrap();

        assert_eq!(
            transitions,
            vec![Transition { id: 0, from: CommandState::Entered, to: CommandState::Rejected }]
        );
        let command = lifecycle.get(0).unwrap();
        assert_eq!(command.response(), Some("error: name 'bogus' is not defined"));

        // Absorbing: nothing moves it any more.
        assert!(lifecycle.apply(LifecycleEvent::Finished { id: 0 }).unwrap().is_empty());
        assert!(lifecycle.apply(LifecycleEvent::Undo { id: 0 }).unwrap().is_empty());
        assert_eq!(lifecycle.get(0).unwrap().state(), CommandState::Rejected);
    }

    #[test]
    fn acks_match_by_id_out_of_order() {
        let mut lifecycle = CommandLifecycle::new();
        lifecycle.submit("a");
        lifecycle.submit("b");

        lifecycle.apply(ack(1, AckStatus::Ok)).unwrap();
        lifecycle.apply(ack(0, AckStatus::Error)).unwrap();

        assert_eq!(lifecycle.get(0).unwrap().state(), CommandState::Rejected);
        assert_eq!(lifecycle.get(1).unwrap().state(), CommandState::Accepted);
    }

    #[test]
    fn finish_before_ack_is_ignored() {
        let mut lifecycle = CommandLifecycle::new();
        lifecycle.submit("a");
        assert!(lifecycle.apply(LifecycleEvent::Finished { id: 0 }).unwrap().is_empty());
        assert_eq!(lifecycle.get(0).unwrap().state(), CommandState::Entered);
    }

    #[test]
    fn undo_cascades_over_later_commands() {
        let mut lifecycle = CommandLifecycle::new();
        for text in ["a", "b", "c", "d"] {
            lifecycle.submit(text);
        }
        lifecycle.apply(ack(0, AckStatus::Ok)).unwrap();
        lifecycle.apply(ack(1, AckStatus::Error)).unwrap();
        lifecycle.apply(ack(2, AckStatus::Ok)).unwrap();
        lifecycle.apply(ack(3, AckStatus::Ok)).unwrap();
        lifecycle.apply(LifecycleEvent::Finished { id: 3 }).unwrap();

        let transitions = lifecycle.apply(LifecycleEvent::Undo { id: 1 }).unwrap();
        assert_eq!(
            transitions,
            vec![
                Transition { id: 2, from: CommandState::Accepted, to: CommandState::Undone },
                Transition { id: 3, from: CommandState::Finished, to: CommandState::Undone },
            ]
        );

        let states: Vec<_> = lifecycle.history().iter().map(Command::state).collect();
        assert_eq!(
            states,
            vec![
                CommandState::Accepted,
                CommandState::Rejected,
                CommandState::Undone,
                CommandState::Undone,
            ]
        );
    }

    #[test]
    fn unknown_ids_are_inconsistencies() {
        let mut lifecycle = CommandLifecycle::new();
        let mut events = lifecycle.subscribe();
        lifecycle.submit("a");
        let _ = events.try_recv();

        let error = lifecycle.apply(ack(5, AckStatus::Ok)).unwrap_err();
        assert_eq!(error.id(), 5);
        assert!(matches!(
            events.try_recv(),
            Ok(CommandEvent::Inconsistency(ProtocolInconsistency::UnknownCommand { id: 5, .. }))
        ));

        assert!(lifecycle.apply(LifecycleEvent::Undo { id: 9 }).is_err());
        assert!(lifecycle.record_feedback(3, "hello".to_string()).is_err());
        assert_eq!(lifecycle.get(0).unwrap().state(), CommandState::Entered);
    }

    #[test]
    fn feedback_is_appended_in_order() {
        let mut lifecycle = CommandLifecycle::new();
        lifecycle.submit("textmsg(1)");
        lifecycle.record_feedback(0, "1".to_string()).unwrap();
        lifecycle.record_feedback(0, "done".to_string()).unwrap();
        assert_eq!(lifecycle.get(0).unwrap().feedback(), ["1", "done"]);
    }
}
