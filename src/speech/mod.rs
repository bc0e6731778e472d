//! Best-effort spoken feedback for the live camera path

mod dispatcher;
mod sink;


pub use dispatcher::FeedbackDispatcher;
pub use sink::{sink_from_config, CommandSpeechSink, LogSpeechSink, SinkFactory, SpeechSink};
